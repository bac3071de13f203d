//! Content model: pages, the site index, and build triggers.

use std::fmt;
use std::path::Path;

/// Source name of the reserved top document. It is excluded from navigation
/// links and doubles as the entry page in the shell layout.
pub const TOP_SOURCE: &str = "top.md";

/// The event that starts a build cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Rebuild everything from a fresh scan of the source directory.
    Full,
    /// A new document appeared; the string is its source file name.
    Add(String),
    /// An existing document's content changed.
    Edit(String),
}

impl Trigger {
    /// The source file a non-full trigger names.
    pub fn changed_source(&self) -> Option<&str> {
        match self {
            Trigger::Full => None,
            Trigger::Add(source) | Trigger::Edit(source) => Some(source),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Full => write!(f, "full rebuild"),
            Trigger::Add(source) => write!(f, "add {source}"),
            Trigger::Edit(source) => write!(f, "edit {source}"),
        }
    }
}

/// One source document and its rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Source file name relative to the source directory, e.g. `"a.md"`.
    /// Unique key within the index.
    pub source: String,

    /// Display title: the first heading of the document, else the file stem.
    pub title: String,

    /// Rendered body markup.
    pub html: String,

    /// Not yet published to the output tree this cycle.
    pub dirty: bool,
}

impl Page {
    /// Output file name: source name with the markdown extension replaced.
    pub fn output_name(&self) -> String {
        output_name(&self.source)
    }

    pub fn is_top(&self) -> bool {
        self.source == TOP_SOURCE
    }
}

/// `"a.md"` to `"a.html"`.
pub fn output_name(source: &str) -> String {
    let stem = Path::new(source)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source);
    format!("{stem}.html")
}

/// Title used when a document has no heading: its file stem.
pub fn fallback_title(source: &str) -> String {
    Path::new(source)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source)
        .to_string()
}

/// Ordered collection of all known pages.
///
/// Order is discovery/insertion order and drives the navigation menu; new
/// pages are appended, never reordered. Sources are unique: [`SiteIndex::merge`]
/// replaces a known source in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteIndex {
    pages: Vec<Page>,
}

impl SiteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a freshly enumerated page list.
    pub fn from_pages(pages: Vec<Page>) -> Self {
        debug_assert!(
            {
                let mut sources: Vec<_> = pages.iter().map(|p| p.source.as_str()).collect();
                sources.sort_unstable();
                sources.windows(2).all(|w| w[0] != w[1])
            },
            "duplicate source in page list"
        );
        Self { pages }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, source: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.source == source)
    }

    /// Merge one freshly rendered page. Unknown sources are appended; known
    /// sources are replaced in place, preserving their position. When
    /// `ripple_titles` is set and the stored title differs from the new one,
    /// every page is marked dirty, because the shared navigation embeds
    /// titles.
    pub fn merge(&mut self, page: Page, ripple_titles: bool) {
        match self.pages.iter().position(|p| p.source == page.source) {
            None => self.pages.push(page),
            Some(idx) => {
                let title_changed = self.pages[idx].title != page.title;
                self.pages[idx] = page;
                if ripple_titles && title_changed {
                    self.mark_all_dirty();
                }
            }
        }
    }

    pub fn mark_all_dirty(&mut self) {
        for page in &mut self.pages {
            page.dirty = true;
        }
    }
}
