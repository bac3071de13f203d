//! Post-build hook execution.
//!
//! Hooks are user-supplied shell commands from the configuration, keyed by
//! trigger kind. At most one runs per cycle, fire-and-forget: the orchestrator
//! never observes a hook's result, it only logs it.

use crate::config::Config;
use crate::models::Trigger;
use std::process::Command;
use std::thread::JoinHandle;

/// Pick the hook command for a trigger.
pub fn select_hook<'a>(config: &'a Config, trigger: &Trigger) -> Option<&'a str> {
    match trigger {
        Trigger::Full => config.post_all.as_deref(),
        Trigger::Add(_) => config.post_add.as_deref(),
        Trigger::Edit(_) => config.post_edit.as_deref(),
    }
}

/// Run a hook command on a detached thread. Failures are logged at WARN and
/// never surface to the caller; the returned handle lets one-shot callers wait
/// for the hook before the process exits.
pub fn fire(command: &str) -> JoinHandle<()> {
    let command = command.to_string();
    std::thread::spawn(move || {
        tracing::info!("running post-build hook: {command}");
        match shell(&command).output() {
            Ok(output) => {
                if !output.stdout.is_empty() {
                    tracing::debug!("hook stdout: {}", String::from_utf8_lossy(&output.stdout));
                }
                if !output.status.success() {
                    tracing::warn!("hook exited with {}: {command}", output.status);
                }
            }
            Err(err) => tracing::warn!("failed to run hook '{command}': {err}"),
        }
    })
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_with_hooks() -> Config {
        serde_json::from_str(
            r#"{"post_all": "echo all", "post_add": "echo add", "post_edit": "echo edit"}"#,
        )
        .unwrap()
    }

    #[test]
    fn hook_is_selected_by_trigger_kind() {
        let config = config_with_hooks();
        assert_eq!(select_hook(&config, &Trigger::Full), Some("echo all"));
        assert_eq!(
            select_hook(&config, &Trigger::Add("a.md".into())),
            Some("echo add")
        );
        assert_eq!(
            select_hook(&config, &Trigger::Edit("a.md".into())),
            Some("echo edit")
        );
    }

    #[test]
    fn unset_hook_selects_nothing() {
        let config: Config = serde_json::from_str(r#"{"post_all": "echo all"}"#).unwrap();
        assert_eq!(select_hook(&config, &Trigger::Edit("a.md".into())), None);
    }

    #[cfg(unix)]
    #[test]
    fn fired_hook_actually_runs() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("marker");
        let handle = fire(&format!("touch {}", marker.display()));
        handle.join().unwrap();
        assert!(marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn failing_hook_does_not_panic() {
        fire("exit 3").join().unwrap();
    }
}
