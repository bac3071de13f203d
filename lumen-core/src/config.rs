//! Site configuration loaded from `site.json`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up when the configuration path is a directory.
pub const CONFIG_FILE_NAME: &str = "site.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no configuration file at {0:?}")]
    NotFound(PathBuf),

    #[error("destination {0:?} exists and is not a directory")]
    DestNotDir(PathBuf),

    #[error("cannot create destination {path:?}: {source}")]
    DestCreate {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Which page layout the site uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Frameset entry page plus a standalone menu document.
    Classic,
    /// Sidebar navigation embedded in every page; the top page doubles as the
    /// entry page.
    Shell,
}

/// One-or-many string values: `"main.css"` and `["a.css", "b.css"]` both parse.
#[derive(Debug, Clone, Default)]
pub struct StringList(Vec<String>);

impl StringList {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(value) => StringList(vec![value]),
            Repr::Many(values) => StringList(values),
        })
    }
}

/// Flat site-level configuration; every key is optional.
///
/// Reloaded wholesale when the backing file changes, never mutated in place.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output directory, relative to the config file location.
    pub dest: Option<PathBuf>,

    /// Selects the shell layout.
    pub html5: bool,

    /// Recognized but currently not applied to output text.
    pub minify: bool,
    pub pretty: bool,

    pub title: Option<String>,
    pub menutitle: Option<String>,
    pub toptitle: Option<String>,

    /// Raw HTML injected into every `<head>`; the page and menu variants take
    /// precedence where set.
    pub head: Option<String>,
    pub page_head: Option<String>,
    pub menu_head: Option<String>,

    pub css: StringList,
    pub async_css: StringList,
    /// Stylesheet files inlined as `<style>` blocks, read from the source dir.
    pub payload_css: StringList,
    pub js: StringList,

    /// Shell commands run after a build, keyed by trigger kind.
    pub post_all: Option<String>,
    pub post_add: Option<String>,
    pub post_edit: Option<String>,

    #[serde(skip)]
    config_path: PathBuf,
}

impl Config {
    /// Load configuration from a file path, or from `site.json` inside a
    /// directory. The destination directory is created and validated here, so
    /// a successfully loaded config always has a usable destination.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut path = path.as_ref().to_path_buf();
        if path.is_dir() {
            path = path.join(CONFIG_FILE_NAME);
        }
        if !path.is_file() {
            return Err(ConfigError::NotFound(path));
        }

        let contents = std::fs::read_to_string(&path)?;
        let mut config: Config = serde_json::from_str(&contents)?;
        config.config_path = path;
        config.ensure_dest()?;

        Ok(config)
    }

    /// Path of the loaded configuration file.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// The source directory: wherever the config file lives.
    pub fn source_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The output directory: `dest` resolved relative to the config location,
    /// defaulting to the source directory itself.
    pub fn dest_dir(&self) -> PathBuf {
        match &self.dest {
            Some(dest) if dest.is_absolute() => dest.clone(),
            Some(dest) => self.source_dir().join(dest),
            None => self.source_dir(),
        }
    }

    pub fn layout(&self) -> Layout {
        if self.html5 {
            Layout::Shell
        } else {
            Layout::Classic
        }
    }

    pub fn site_title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn menu_title(&self) -> &str {
        self.menutitle.as_deref().unwrap_or("MENU")
    }

    pub fn top_title(&self) -> &str {
        self.toptitle.as_deref().unwrap_or("TOP")
    }

    /// Head injection for document pages: `page_head`, falling back to `head`.
    pub fn page_head_html(&self) -> Option<&str> {
        self.page_head.as_deref().or(self.head.as_deref())
    }

    /// Head injection for the menu document: `menu_head`, falling back to `head`.
    pub fn menu_head_html(&self) -> Option<&str> {
        self.menu_head.as_deref().or(self.head.as_deref())
    }

    fn ensure_dest(&self) -> Result<(), ConfigError> {
        let dest = self.dest_dir();
        if dest.is_file() {
            return Err(ConfigError::DestNotDir(dest));
        }
        std::fs::create_dir_all(&dest).map_err(|source| ConfigError::DestCreate {
            path: dest,
            source,
        })?;
        Ok(())
    }
}
