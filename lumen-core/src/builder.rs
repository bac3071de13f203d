//! The incremental build orchestrator.
//!
//! [`SiteBuilder`] owns the site index across build cycles. Each cycle runs
//! thumbnail preparation, then renders either the whole source tree or the one
//! changed document, merges the result into the index, and publishes every
//! dirty page plus the shared navigation artifacts. Failures abort the rest of
//! the cycle; a full-mode failure leaves the previous index untouched because
//! the fresh index only replaces it after the write phase succeeds.

use crate::assets::{self, AssetError};
use crate::config::{Config, Layout};
use crate::hooks;
use crate::markdown::{MarkdownRenderer, RenderError};
use crate::models::{fallback_title, Page, SiteIndex, Trigger};
use askama::Template;
use lumen_render::{
    FramesetTemplate, MenuEntry, MenuTemplate, PageTemplate, ShellNavTemplate, ShellPageTemplate,
};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("resource conversion failed: {0}")]
    Resource(#[from] AssetError),

    #[error("failed to scan source directory: {0}")]
    Scan(#[from] walkdir::Error),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("template expansion failed: {0}")]
    Template(#[from] askama::Error),

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Which render mode a cycle ran in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Full,
    Incremental,
}

/// Per-cycle summary.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub mode: BuildMode,
    /// Document pages published this cycle; shared artifacts not counted.
    pub pages_written: usize,
    pub duration: Duration,
}

/// Builds the site and carries the index from one cycle to the next.
///
/// Not internally synchronized: callers must run one cycle at a time.
pub struct SiteBuilder {
    config: Config,
    renderer: MarkdownRenderer,
    index: Option<SiteIndex>,
    run_hooks: bool,
    pending_hook: Option<JoinHandle<()>>,
}

impl SiteBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            renderer: MarkdownRenderer::new(),
            index: None,
            run_hooks: true,
            pending_hook: None,
        }
    }

    pub fn with_hooks(mut self, run_hooks: bool) -> Self {
        self.run_hooks = run_hooks;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The committed index, absent until the first successful full build.
    pub fn index(&self) -> Option<&SiteIndex> {
        self.index.as_ref()
    }

    /// Swap in a freshly reloaded configuration. Callers follow up with a
    /// full-mode trigger, since any option may have changed.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Run one build cycle.
    pub fn run_build(&mut self, trigger: Trigger) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        tracing::info!("build started: {trigger}");

        assets::prepare_thumbnails(&self.config.source_dir())?;

        let (mode, pages_written) = match &trigger {
            Trigger::Add(source) | Trigger::Edit(source) if self.index.is_some() => {
                (BuildMode::Incremental, self.incremental_cycle(source)?)
            }
            _ => (BuildMode::Full, self.full_cycle()?),
        };

        let duration = started.elapsed();
        tracing::info!(
            "build finished: {pages_written} pages in {} ms",
            duration.as_millis()
        );

        if self.run_hooks {
            if let Some(command) = hooks::select_hook(&self.config, &trigger) {
                self.pending_hook = Some(hooks::fire(command));
            }
        }

        Ok(BuildReport {
            mode,
            pages_written,
            duration,
        })
    }

    /// Block until the hook spawned by the last cycle finishes, if any.
    /// One-shot callers use this so process exit does not cut the hook short.
    pub fn wait_for_hook(&mut self) {
        if let Some(handle) = self.pending_hook.take() {
            let _ = handle.join();
        }
    }

    /// Render every source and replace the index wholesale. The swap happens
    /// after the write phase, so a failed cycle leaves the old index intact.
    fn full_cycle(&mut self) -> Result<usize, BuildError> {
        let sources = discover_sources(&self.config.source_dir())?;
        tracing::info!("found {} markdown files", sources.len());

        let pages = sources
            .par_iter()
            .map(|source| self.render_page(source))
            .collect::<Result<Vec<Page>, RenderError>>()?;

        let mut index = SiteIndex::from_pages(pages);
        let written = write_pages(&self.config, &mut index)?;
        self.index = Some(index);
        Ok(written)
    }

    /// Render the one changed document and merge it into the index in place.
    /// The render completes before any mutation, so a failed render leaves the
    /// index exactly as it was.
    fn incremental_cycle(&mut self, source: &str) -> Result<usize, BuildError> {
        let page = self.render_page(source)?;
        let ripple = self.config.layout() == Layout::Shell;

        let index = self.index.get_or_insert_with(SiteIndex::new);
        index.merge(page, ripple);

        write_pages(&self.config, index)
    }

    fn render_page(&self, source: &str) -> Result<Page, RenderError> {
        let path = self.config.source_dir().join(source);
        let rendered = self.renderer.render_file(&path)?;
        Ok(Page {
            source: source.to_string(),
            title: rendered.title.unwrap_or_else(|| fallback_title(source)),
            html: rendered.html,
            dirty: true,
        })
    }
}

/// Markdown sources directly inside `dir`, sorted by name so full builds are
/// deterministic.
fn discover_sources(dir: &Path) -> Result<Vec<String>, BuildError> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "md") {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            sources.push(name.to_string());
        }
    }
    sources.sort();
    Ok(sources)
}

/// Publish every dirty page plus the shared navigation artifacts, clearing
/// dirty flags as pages land on disk.
fn write_pages(config: &Config, index: &mut SiteIndex) -> Result<usize, BuildError> {
    let dest = config.dest_dir();
    fs::create_dir_all(&dest).map_err(|source| BuildError::Write {
        path: dest.clone(),
        source,
    })?;

    match config.layout() {
        Layout::Classic => write_classic(config, index, &dest),
        Layout::Shell => write_shell(config, index, &dest),
    }
}

fn write_classic(config: &Config, index: &mut SiteIndex, dest: &Path) -> Result<usize, BuildError> {
    let head = head_html(config, config.page_head_html());

    let mut written = 0;
    for page in index.pages_mut() {
        if !page.dirty {
            continue;
        }
        let html = PageTemplate {
            title: page.title.clone(),
            head: head.clone(),
            content: page.html.clone(),
        }
        .render()?;
        write_file(&dest.join(page.output_name()), &html)?;
        page.dirty = false;
        written += 1;
    }

    // Both shared artifacts derive from the whole index, so they are
    // refreshed every cycle no matter which page changed.
    let menu = MenuTemplate {
        head: head_html(config, config.menu_head_html()),
        menu_title: config.menu_title().to_string(),
        top_title: config.top_title().to_string(),
        entries: menu_entries(index),
    }
    .render()?;
    write_file(&dest.join("menu.html"), &menu)?;

    let frameset = FramesetTemplate {
        title: config.site_title().to_string(),
    }
    .render()?;
    write_file(&dest.join("index.html"), &frameset)?;

    Ok(written)
}

fn write_shell(config: &Config, index: &mut SiteIndex, dest: &Path) -> Result<usize, BuildError> {
    let head = head_html(config, config.page_head_html());
    let nav = ShellNavTemplate {
        menu_title: config.menu_title().to_string(),
        top_title: config.top_title().to_string(),
        entries: menu_entries(index),
    }
    .render()?;

    let mut written = 0;
    for page in index.pages_mut() {
        let entry_page = page.is_top();
        if !page.dirty && !entry_page {
            continue;
        }
        let html = ShellPageTemplate {
            title: page.title.clone(),
            head: head.clone(),
            nav: nav.clone(),
            content: page.html.clone(),
        }
        .render()?;

        // The entry page embeds the shared navigation, so it is refreshed
        // every cycle.
        if entry_page {
            write_file(&dest.join("index.html"), &html)?;
        }
        if page.dirty {
            write_file(&dest.join(page.output_name()), &html)?;
            page.dirty = false;
            written += 1;
        }
    }

    Ok(written)
}

/// Navigation entries in index order; the top page links to itself from the
/// fixed home entry instead.
fn menu_entries(index: &SiteIndex) -> Vec<MenuEntry> {
    index
        .pages()
        .iter()
        .filter(|page| !page.is_top())
        .map(|page| MenuEntry {
            href: page.output_name(),
            title: page.title.clone(),
        })
        .collect()
}

/// Assemble the configured `<head>` additions: stylesheet links, inlined
/// payload styles, preload links, scripts, then the raw injection block.
fn head_html(config: &Config, inject: Option<&str>) -> String {
    let mut head = String::new();

    for href in config.css.iter() {
        head.push_str(&format!("<link href=\"{href}\" rel=\"stylesheet\">\n"));
    }
    for name in config.payload_css.iter() {
        let path = config.source_dir().join(name);
        match fs::read_to_string(&path) {
            Ok(css) => head.push_str(&format!("<style>{css}</style>\n")),
            Err(err) => tracing::debug!("skipping payload css {path:?}: {err}"),
        }
    }
    for href in config.async_css.iter() {
        head.push_str(&format!(
            "<link rel=\"preload\" as=\"style\" href=\"{href}\" type=\"text/css\" media=\"all\" onload=\"this.rel='stylesheet'\">\n"
        ));
    }
    for src in config.js.iter() {
        head.push_str(&format!("<script src=\"{src}\"></script>\n"));
    }
    if let Some(extra) = inject {
        head.push_str(extra);
        head.push('\n');
    }

    head
}

fn write_file(path: &Path, contents: &str) -> Result<(), BuildError> {
    fs::write(path, contents).map_err(|source| BuildError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("wrote {path:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn site(config_json: &str, files: &[(&str, &str)]) -> (TempDir, SiteBuilder) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("site.json"), config_json).unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        let config = Config::load(dir.path()).unwrap();
        (dir, SiteBuilder::new(config))
    }

    fn remove_outputs(dir: &Path) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().is_some_and(|ext| ext == "html") {
                fs::remove_file(path).unwrap();
            }
        }
    }

    const TOP: (&str, &str) = ("top.md", "# Welcome\n\nhello\n");
    const A: (&str, &str) = ("a.md", "# Alpha\n\nalpha body\n");
    const B: (&str, &str) = ("b.md", "# Beta\n\nbeta body\n");

    #[test]
    fn full_build_classic_writes_expected_tree() {
        let (dir, mut builder) = site("{}", &[TOP, A]);
        let report = builder.run_build(Trigger::Full).unwrap();

        assert_eq!(report.mode, BuildMode::Full);
        assert_eq!(report.pages_written, 2);
        for name in ["top.html", "a.html", "menu.html", "index.html"] {
            assert!(dir.path().join(name).is_file(), "missing {name}");
        }

        let menu = fs::read_to_string(dir.path().join("menu.html")).unwrap();
        assert!(menu.contains(r#"<a href="a.html" target="top">Alpha</a>"#));
        assert!(!menu.contains("Welcome"), "top page must not be listed");

        let index_html = fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert!(index_html.contains("<frameset"));
        assert!(index_html.contains(r#"<frame src="menu.html""#));
    }

    #[test]
    fn shell_mode_entry_page_is_the_top_page() {
        let (dir, mut builder) = site(r#"{"html5": true}"#, &[TOP, A]);
        builder.run_build(Trigger::Full).unwrap();

        let index_html = fs::read_to_string(dir.path().join("index.html")).unwrap();
        let top_html = fs::read_to_string(dir.path().join("top.html")).unwrap();
        assert_eq!(index_html, top_html);
        assert!(index_html.contains("hello"));
        assert!(index_html.contains(r#"<div class="menu">"#));

        let a_html = fs::read_to_string(dir.path().join("a.html")).unwrap();
        assert!(a_html.contains(r#"<div class="menu">"#));
        assert!(a_html.contains(r#"<a href="a.html"><span>Alpha</span></a>"#));
        assert!(!a_html.contains("<span>Welcome</span>"));

        assert!(!dir.path().join("menu.html").exists());
    }

    #[test]
    fn full_builds_are_idempotent() {
        let (dir, mut builder) = site("{}", &[TOP, A, B]);
        builder.run_build(Trigger::Full).unwrap();

        let names = ["top.html", "a.html", "b.html", "menu.html", "index.html"];
        let snapshot: Vec<String> = names
            .into_iter()
            .map(|name| fs::read_to_string(dir.path().join(name)).unwrap())
            .collect();

        builder.run_build(Trigger::Full).unwrap();
        for (name, before) in names.into_iter().zip(snapshot) {
            let after = fs::read_to_string(dir.path().join(name)).unwrap();
            assert_eq!(before, after, "{name} changed across identical builds");
        }
    }

    #[test]
    fn incremental_edit_rewrites_only_the_changed_page() {
        let (dir, mut builder) = site("{}", &[TOP, A, B]);
        builder.run_build(Trigger::Full).unwrap();
        remove_outputs(dir.path());

        // same title, new body: no ripple in any layout
        fs::write(dir.path().join("b.md"), "# Beta\n\nrevised body\n").unwrap();
        let report = builder.run_build(Trigger::Edit("b.md".into())).unwrap();

        assert_eq!(report.mode, BuildMode::Incremental);
        assert_eq!(report.pages_written, 1);
        assert!(dir.path().join("b.html").is_file());
        assert!(!dir.path().join("a.html").exists());
        assert!(!dir.path().join("top.html").exists());
        // shared artifacts are always refreshed
        assert!(dir.path().join("menu.html").is_file());
        assert!(dir.path().join("index.html").is_file());
    }

    #[test]
    fn classic_title_change_rewrites_changed_page_plus_shared() {
        let (dir, mut builder) = site("{}", &[TOP, A, B]);
        builder.run_build(Trigger::Full).unwrap();
        remove_outputs(dir.path());

        fs::write(dir.path().join("a.md"), "# Alpha Prime\n\nalpha body\n").unwrap();
        builder.run_build(Trigger::Edit("a.md".into())).unwrap();

        assert!(dir.path().join("a.html").is_file());
        assert!(!dir.path().join("b.html").exists());
        assert!(!dir.path().join("top.html").exists());
        let menu = fs::read_to_string(dir.path().join("menu.html")).unwrap();
        assert!(menu.contains("Alpha Prime"));
    }

    #[test]
    fn shell_title_change_rewrites_every_page() {
        let (dir, mut builder) = site(r#"{"html5": true}"#, &[TOP, A, B]);
        builder.run_build(Trigger::Full).unwrap();
        remove_outputs(dir.path());

        fs::write(dir.path().join("a.md"), "# Alpha Prime\n\nalpha body\n").unwrap();
        let report = builder.run_build(Trigger::Edit("a.md".into())).unwrap();

        assert_eq!(report.pages_written, 3);
        for name in ["top.html", "a.html", "b.html", "index.html"] {
            assert!(dir.path().join(name).is_file(), "missing {name}");
        }
        let b_html = fs::read_to_string(dir.path().join("b.html")).unwrap();
        assert!(b_html.contains("Alpha Prime"), "navigation must carry the new title");
    }

    #[test]
    fn incremental_edit_matches_a_fresh_full_build() {
        let (dir, mut builder) = site("{}", &[TOP, A, B]);
        builder.run_build(Trigger::Full).unwrap();

        fs::write(dir.path().join("b.md"), "# Beta Two\n\nchanged\n").unwrap();
        builder.run_build(Trigger::Edit("b.md".into())).unwrap();

        let mut fresh = SiteBuilder::new(Config::load(dir.path()).unwrap());
        fresh.run_build(Trigger::Full).unwrap();

        assert_eq!(builder.index(), fresh.index());
    }

    #[test]
    fn new_document_is_appended_last() {
        let (dir, mut builder) = site("{}", &[B, ("c.md", "# Gamma\n\nbody\n")]);
        builder.run_build(Trigger::Full).unwrap();

        // sorts before the existing sources, must still land at the end
        fs::write(dir.path().join("a.md"), "# Alpha\n\nbody\n").unwrap();
        builder.run_build(Trigger::Add("a.md".into())).unwrap();

        let order: Vec<_> = builder
            .index()
            .unwrap()
            .pages()
            .iter()
            .map(|p| p.source.as_str())
            .collect();
        assert_eq!(order, vec!["b.md", "c.md", "a.md"]);
    }

    #[test]
    fn failed_full_render_leaves_index_and_output_untouched() {
        let (dir, mut builder) = site("{}", &[A, B]);
        builder.run_build(Trigger::Full).unwrap();
        let before = builder.index().cloned();
        fs::remove_file(dir.path().join("a.html")).unwrap();

        // invalid UTF-8 makes the renderer fail on b.md
        fs::write(dir.path().join("b.md"), [0xff, 0xfe, 0x00, 0x01]).unwrap();
        let err = builder.run_build(Trigger::Full).unwrap_err();
        assert!(matches!(err, BuildError::Render(_)));

        assert_eq!(builder.index(), before.as_ref());
        assert!(
            !dir.path().join("a.html").exists(),
            "no write may happen in a failed cycle"
        );
    }

    #[test]
    fn vanished_sources_are_pruned_by_a_full_rebuild() {
        let (dir, mut builder) = site("{}", &[A, B]);
        builder.run_build(Trigger::Full).unwrap();
        assert_eq!(builder.index().unwrap().len(), 2);

        fs::remove_file(dir.path().join("b.md")).unwrap();
        builder.run_build(Trigger::Full).unwrap();

        let sources: Vec<_> = builder
            .index()
            .unwrap()
            .pages()
            .iter()
            .map(|p| p.source.as_str())
            .collect();
        assert_eq!(sources, vec!["a.md"]);
    }

    #[test]
    fn incremental_trigger_without_baseline_runs_full() {
        let (dir, mut builder) = site("{}", &[TOP, A]);
        let report = builder.run_build(Trigger::Edit("a.md".into())).unwrap();

        assert_eq!(report.mode, BuildMode::Full);
        assert!(dir.path().join("top.html").is_file());
        assert!(dir.path().join("a.html").is_file());
    }

    #[test]
    fn pages_are_clean_after_a_successful_build() {
        let (_dir, mut builder) = site("{}", &[TOP, A]);
        builder.run_build(Trigger::Full).unwrap();
        assert!(builder.index().unwrap().pages().iter().all(|p| !p.dirty));
    }

    #[test]
    fn thumbnails_are_prepared_every_cycle() {
        let (dir, mut builder) = site("{}", &[A]);
        image::RgbImage::new(600, 400)
            .save(dir.path().join("photo.png"))
            .unwrap();

        builder.run_build(Trigger::Full).unwrap();
        assert!(dir.path().join("photo_sum.png").is_file());
    }

    #[test]
    fn resource_failure_aborts_before_render() {
        let (dir, mut builder) = site("{}", &[A]);
        fs::write(dir.path().join("photo.png"), "not an image").unwrap();

        let err = builder.run_build(Trigger::Full).unwrap_err();
        assert!(matches!(err, BuildError::Resource(_)));
        assert!(builder.index().is_none());
        assert!(!dir.path().join("a.html").exists());
    }

    #[test]
    fn head_html_collects_links_styles_and_scripts() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("site.json"),
            r#"{
                "css": "main.css",
                "payload_css": ["inline.css", "missing.css"],
                "async_css": "slow.css",
                "js": ["app.js"],
                "head": "<meta name=\"robots\" content=\"none\">"
            }"#,
        )
        .unwrap();
        fs::write(dir.path().join("inline.css"), "body{margin:0}").unwrap();
        let config = Config::load(dir.path()).unwrap();

        let head = head_html(&config, config.page_head_html());
        assert!(head.contains(r#"<link href="main.css" rel="stylesheet">"#));
        assert!(head.contains("<style>body{margin:0}</style>"));
        assert!(!head.contains("missing.css"));
        assert!(head.contains(r#"<link rel="preload" as="style" href="slow.css""#));
        assert!(head.contains(r#"<script src="app.js"></script>"#));
        assert!(head.ends_with("<meta name=\"robots\" content=\"none\">\n"));
    }
}
