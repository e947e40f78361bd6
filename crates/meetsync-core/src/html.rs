//! HTML-to-text conversion for event bodies.
//!
//! Calendar clients store descriptions either as plain text or as an HTML
//! fragment. [`html_to_text`] renders the HTML case into readable plain text
//! (paragraphs and list items on their own lines, links as `text (href)`)
//! and passes plain text through untouched apart from trimming.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?[a-z][a-z0-9]*(\s[^<>]*)?/?>|&(?:[a-z]+|#\d+|#x[0-9a-f]+);")
        .expect("valid tag regex")
});

static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));

/// Returns true when the input contains markup or character entities.
pub fn looks_like_html(input: &str) -> bool {
    TAG_RE.is_match(input)
}

/// Converts an event body to plain text.
///
/// Returns an empty string for empty or whitespace-only input.
pub fn html_to_text(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return String::new();
    }
    if !looks_like_html(input) {
        return input.replace("\r\n", "\n");
    }

    let fragment = Html::parse_fragment(input);
    let mut renderer = Renderer::default();
    renderer.walk(fragment.root_element());
    finish(&renderer.out)
}

#[derive(Debug, Clone, Copy)]
enum ListKind {
    Bullet,
    Ordered(usize),
}

#[derive(Debug, Default)]
struct Renderer {
    out: String,
    lists: Vec<ListKind>,
}

impl Renderer {
    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                self.push_text(text);
            } else if let Some(el) = ElementRef::wrap(child) {
                self.element(el);
            }
        }
    }

    fn element(&mut self, el: ElementRef<'_>) {
        match el.value().name() {
            "script" | "style" | "head" | "title" | "template" => {}
            "br" => self.out.push('\n'),
            "p" | "blockquote" | "pre" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "table" => {
                self.paragraph_break();
                self.walk(el);
                self.paragraph_break();
            }
            "div" | "tr" | "section" | "article" | "header" | "footer" => {
                self.line_break();
                self.walk(el);
                self.line_break();
            }
            "hr" => self.paragraph_break(),
            "ul" => self.list(el, ListKind::Bullet),
            "ol" => self.list(el, ListKind::Ordered(0)),
            "li" => self.list_item(el),
            "a" => self.link(el),
            _ => self.walk(el),
        }
    }

    fn list(&mut self, el: ElementRef<'_>, kind: ListKind) {
        self.line_break();
        self.lists.push(kind);
        self.walk(el);
        self.lists.pop();
        self.line_break();
    }

    fn list_item(&mut self, el: ElementRef<'_>) {
        self.line_break();
        let depth = self.lists.len().saturating_sub(1);
        let marker = match self.lists.last_mut() {
            Some(ListKind::Ordered(n)) => {
                *n += 1;
                format!("{n}. ")
            }
            Some(ListKind::Bullet) | None => "• ".to_string(),
        };
        self.out.push_str(&"  ".repeat(depth));
        self.out.push_str(&marker);
        self.walk(el);
        self.line_break();
    }

    fn link(&mut self, el: ElementRef<'_>) {
        let text = collapse(&el.text().collect::<String>());
        let text = text.trim();
        let href = el.value().attr("href").map(str::trim).unwrap_or_default();
        let bare_href = href.strip_prefix("mailto:").unwrap_or(href);

        if href.is_empty() || bare_href == text {
            self.push_text(text);
        } else if text.is_empty() {
            self.push_text(href);
        } else {
            self.push_text(&format!("{text} ({href})"));
        }
    }

    fn push_text(&mut self, text: &str) {
        let text = collapse(text);
        if text.is_empty() {
            return;
        }
        let at_line_start = self.out.is_empty() || self.out.ends_with('\n');
        let text = if at_line_start || self.out.ends_with(' ') {
            text.trim_start()
        } else {
            &text
        };
        self.out.push_str(text);
    }

    fn line_break(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn paragraph_break(&mut self) {
        if self.out.is_empty() {
            return;
        }
        self.line_break();
        if !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }
}

/// Collapses runs of whitespace (including newlines) to a single space.
fn collapse(text: &str) -> String {
    let text = text.replace('\u{a0}', " ");
    let mut result = String::with_capacity(text.len());
    let mut prev_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                result.push(' ');
            }
            prev_space = true;
        } else {
            result.push(ch);
            prev_space = false;
        }
    }
    result
}

fn finish(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().map(str::trim_end).collect();
    let joined = lines.join("\n");
    BLANK_LINES_RE
        .replace_all(joined.trim(), "\n\n")
        .into_owned()
}
