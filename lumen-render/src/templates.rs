//! Askama template definitions.

use askama::Template;

/// One navigation link, in index order.
#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub href: String,
    pub title: String,
}

/// A document page in the classic frameset layout.
///
/// `head` and `content` are pre-built HTML fragments and are inserted
/// unescaped; the caller is responsible for their contents.
#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub title: String,
    pub head: String,
    pub content: String,
}

/// A document page in the shell layout: sidebar navigation plus content.
#[derive(Template)]
#[template(path = "shell_page.html")]
pub struct ShellPageTemplate {
    pub title: String,
    pub head: String,
    pub nav: String,
    pub content: String,
}

/// The sidebar navigation fragment embedded in every shell-layout page.
#[derive(Template, Clone)]
#[template(path = "nav.html")]
pub struct ShellNavTemplate {
    pub menu_title: String,
    pub top_title: String,
    pub entries: Vec<MenuEntry>,
}

/// The standalone menu document of the classic layout.
#[derive(Template)]
#[template(path = "menu.html")]
pub struct MenuTemplate {
    pub head: String,
    pub menu_title: String,
    pub top_title: String,
    pub entries: Vec<MenuEntry>,
}

/// The frameset entry document of the classic layout.
#[derive(Template)]
#[template(path = "frameset.html")]
pub struct FramesetTemplate {
    pub title: String,
}
