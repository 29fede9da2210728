//! Inline text: emphasis delimiters, escaping and code spans.

use crate::model::TextStyle;

/// An emphasis delimiter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delim {
    Underline,
    Superscript,
    Subscript,
    Bold,
    Italic,
    Strikethrough,
}

impl Delim {
    /// Outermost first.
    const ORDER: [Delim; 6] = [
        Delim::Underline,
        Delim::Superscript,
        Delim::Subscript,
        Delim::Bold,
        Delim::Italic,
        Delim::Strikethrough,
    ];

    fn active(self, style: &TextStyle) -> bool {
        match self {
            Delim::Underline => style.underline,
            Delim::Superscript => style.superscript,
            Delim::Subscript => style.subscript,
            Delim::Bold => style.bold,
            Delim::Italic => style.italic,
            Delim::Strikethrough => style.strikethrough,
        }
    }

    fn close(self, opened_with: &'static str) -> &'static str {
        match self {
            Delim::Underline => "</u>",
            Delim::Superscript => "</sup>",
            Delim::Subscript => "</sub>",
            _ => opened_with,
        }
    }
}

/// Writes a sequence of styled runs, keeping emphasis delimiters balanced.
///
/// Open delimiters are kept on a stack. When the style changes, delimiters
/// are closed innermost first and the ones still wanted are re-opened.
/// Whitespace at the edges of a run is moved outside the delimiters so
/// emphasis never starts or ends on a space.
#[derive(Debug, Default)]
pub(crate) struct EmphasisWriter {
    out: String,
    /// Open delimiters with the byte offset of each opener.
    open: Vec<(Delim, &'static str, usize)>,
    /// Offsets of the last `_` pair, while nothing has been written after its closer.
    underscore_pair: Option<(usize, usize)>,
    pending_space: String,
    escape: bool,
}

impl EmphasisWriter {
    pub(crate) fn new(escape: bool) -> Self {
        Self {
            escape,
            ..Default::default()
        }
    }

    /// Append a styled run.
    pub(crate) fn text(&mut self, text: &str, style: &TextStyle) {
        let core = text.trim();
        if core.is_empty() {
            self.pending_space.push_str(text);
            return;
        }
        let lead = &text[..text.len() - text.trim_start().len()];
        let trail = &text[text.trim_end().len()..];

        self.transition(style, lead);

        if style.code {
            self.push(&code_span(core));
        } else if self.escape {
            self.push(&escape_markdown(core));
        } else {
            self.push(core);
        }
        self.pending_space.push_str(trail);
    }

    /// Append pre-rendered markup (a link, an image) inside the current emphasis.
    pub(crate) fn raw(&mut self, markup: &str) {
        if markup.is_empty() {
            return;
        }
        let space = std::mem::take(&mut self.pending_space);
        self.push(&space);
        self.push(markup);
    }

    /// Close every open delimiter and return the text.
    pub(crate) fn finish(mut self) -> String {
        self.close_from(0);
        self.out.push_str(&self.pending_space);
        self.out
    }

    fn transition(&mut self, style: &TextStyle, lead: &str) {
        let keep = self
            .open
            .iter()
            .position(|(d, _, _)| !d.active(style))
            .unwrap_or(self.open.len());
        self.close_from(keep);

        let space = std::mem::take(&mut self.pending_space);
        self.push(&space);
        self.push(lead);

        for delim in Delim::ORDER {
            if delim.active(style) && !self.open.iter().any(|(d, _, _)| *d == delim) {
                let opener = self.opener(delim);
                self.open.push((delim, opener, self.out.len()));
                self.push(opener);
            }
        }
    }

    fn close_from(&mut self, index: usize) {
        while self.open.len() > index {
            if let Some((delim, opener, at)) = self.open.pop() {
                if opener == "_" {
                    self.underscore_pair = Some((at, self.out.len()));
                }
                self.out.push_str(delim.close(opener));
            }
        }
    }

    /// Append text, first turning a just-closed `_` pair into `*` when the
    /// text would continue the word (`_` cannot close inside a word).
    fn push(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some((open, close)) = self.underscore_pair.take() {
            if close + 1 == self.out.len() && text.starts_with(|c: char| c.is_alphanumeric()) {
                self.out.replace_range(open..=open, "*");
                self.out.replace_range(close..=close, "*");
            }
        }
        self.out.push_str(text);
    }

    fn opener(&self, delim: Delim) -> &'static str {
        match delim {
            Delim::Underline => "<u>",
            Delim::Superscript => "<sup>",
            Delim::Subscript => "<sub>",
            Delim::Bold => "**",
            // `_` does not open emphasis inside a word.
            Delim::Italic if self.out.ends_with(|c: char| c.is_alphanumeric()) => "*",
            Delim::Italic => "_",
            Delim::Strikethrough => "~~",
        }
    }
}

/// Escape special Markdown characters.
/// Only escape characters that could be misinterpreted as Markdown syntax.
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

/// Wrap text in a code span whose fence is longer than any backtick run inside.
pub fn code_span(text: &str) -> String {
    let fence = "`".repeat(longest_backtick_run(text) + 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{} {} {}", fence, text, fence)
    } else {
        format!("{}{}{}", fence, text, fence)
    }
}

/// Fence for a code block holding `code`.
pub fn code_fence(code: &str) -> String {
    "`".repeat((longest_backtick_run(code) + 1).max(3))
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// GitHub-style heading anchor.
pub fn heading_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().to_lowercase().chars() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            slug.push(c);
        } else if c.is_whitespace() {
            slug.push('-');
        }
    }
    slug
}
