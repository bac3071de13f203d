//! Markdown rendering and title extraction.

use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of rendering one document.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Plain text of the first heading, if the document has one.
    pub title: Option<String>,
    pub html: String,
}

/// Markdown to HTML converter.
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        Self { options }
    }

    /// Convert markdown to HTML, capturing the first heading as the title.
    pub fn render(&self, markdown: &str) -> Rendered {
        let events: Vec<Event> = Parser::new_ext(markdown, self.options).collect();
        let title = first_heading(&events);

        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());

        Rendered { title, html: out }
    }

    /// Read a document from disk and render it. Unreadable or non-UTF-8 input
    /// is the renderer's only failure mode.
    pub fn render_file(&self, path: &Path) -> Result<Rendered, RenderError> {
        let text = std::fs::read_to_string(path).map_err(|source| RenderError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.render(&text))
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain text of the first heading in the event stream.
fn first_heading(events: &[Event]) -> Option<String> {
    let mut inside = false;
    let mut title = String::new();

    for event in events {
        match event {
            Event::Start(Tag::Heading { .. }) => inside = true,
            Event::End(TagEnd::Heading(_)) => {
                let trimmed = title.trim();
                return if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                };
            }
            Event::Text(text) | Event::Code(text) if inside => title.push_str(text),
            _ => {}
        }
    }

    None
}
