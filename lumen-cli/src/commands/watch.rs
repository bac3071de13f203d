//! Watch loop: filesystem events in, serialized build cycles out.

use anyhow::{Context, Result};
use lumen_core::{Config, SiteBuilder, Trigger};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsStr;
use std::path::Path;
use tokio::sync::mpsc;

/// Run an initial full build, then watch the source directory until killed.
///
/// Cycle errors are logged and the loop keeps waiting for the next trigger;
/// only a failure to load the initial configuration or to install the watcher
/// is fatal.
pub async fn watch(site: &Path, run_hooks: bool) -> Result<()> {
    let config = Config::load(site).context("failed to load configuration")?;
    let config_path = config.path().to_path_buf();
    let source_dir = config.source_dir();
    tracing::info!("source directory: {:?}", source_dir);
    tracing::info!("dest directory: {:?}", config.dest_dir());

    let mut builder = SiteBuilder::new(config).with_hooks(run_hooks);

    // Initial cycle. Under watch a failure is not fatal: the next save retries.
    builder = run_cycle(builder, Trigger::Full).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut _watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )
    .context("failed to initialize file watcher")?;

    // The source tree is flat and the config file lives in it, so one
    // non-recursive watch covers both signal kinds.
    _watcher
        .watch(&source_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {:?}", source_dir))?;

    tracing::info!("watching {:?} for changes (Ctrl+C to stop)", source_dir);

    while let Some(event) = rx.recv().await {
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!("watcher error: {err}");
                continue;
            }
        };

        for trigger in classify(&event, &config_path) {
            if trigger == Trigger::Full {
                // config change: reload wholesale; on failure keep the old one
                match Config::load(&config_path) {
                    Ok(config) => builder.set_config(config),
                    Err(err) => {
                        tracing::error!("configuration reload failed: {err}");
                        continue;
                    }
                }
            }
            builder = run_cycle(builder, trigger).await?;
        }
    }

    Ok(())
}

/// Run one cycle on the blocking pool. The builder is moved in and back out,
/// so at most one cycle is ever in flight; events arriving meanwhile queue in
/// the channel and run afterwards, in order.
async fn run_cycle(builder: SiteBuilder, trigger: Trigger) -> Result<SiteBuilder> {
    let (builder, outcome) = tokio::task::spawn_blocking(move || {
        let mut builder = builder;
        let outcome = builder.run_build(trigger);
        (builder, outcome)
    })
    .await
    .context("build task panicked")?;

    if let Err(err) = outcome {
        tracing::error!("build failed: {err}");
    }
    Ok(builder)
}

/// Map one watcher event onto build triggers. Markdown additions and edits
/// become incremental triggers; a change to the configuration file becomes a
/// full-mode trigger; everything else is ignored.
fn classify(event: &Event, config_path: &Path) -> Vec<Trigger> {
    let config_name = config_path.file_name();
    let mut triggers = Vec::new();

    for path in &event.paths {
        if config_name.is_some() && path.file_name() == config_name {
            if matches!(event.kind, EventKind::Modify(_)) {
                tracing::info!("{path:?} changed");
                triggers.push(Trigger::Full);
            }
            continue;
        }

        if path.extension() != Some(OsStr::new("md")) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        match event.kind {
            EventKind::Create(_) => {
                tracing::info!("{path:?} added");
                triggers.push(Trigger::Add(name.to_string()));
            }
            EventKind::Modify(_) => {
                tracing::info!("{path:?} changed");
                triggers.push(Trigger::Edit(name.to_string()));
            }
            _ => {}
        }
    }

    triggers
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
    use std::path::PathBuf;

    const CONFIG: &str = "/src/site.json";

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn markdown_create_is_an_add_trigger() {
        let ev = event(EventKind::Create(CreateKind::File), "/src/a.md");
        assert_eq!(
            classify(&ev, Path::new(CONFIG)),
            vec![Trigger::Add("a.md".into())]
        );
    }

    #[test]
    fn markdown_modify_is_an_edit_trigger() {
        let ev = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/src/a.md",
        );
        assert_eq!(
            classify(&ev, Path::new(CONFIG)),
            vec![Trigger::Edit("a.md".into())]
        );
    }

    #[test]
    fn config_modify_is_a_full_trigger() {
        let ev = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            CONFIG,
        );
        assert_eq!(classify(&ev, Path::new(CONFIG)), vec![Trigger::Full]);
    }

    #[test]
    fn other_files_and_kinds_are_ignored() {
        let ignored = [
            event(EventKind::Create(CreateKind::File), "/src/notes.txt"),
            event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                "/src/photo.png",
            ),
            event(EventKind::Remove(RemoveKind::File), "/src/a.md"),
            event(EventKind::Create(CreateKind::File), CONFIG),
        ];
        for ev in &ignored {
            assert!(classify(ev, Path::new(CONFIG)).is_empty());
        }
    }
}
