use std::io::IsTerminal;

const RED: &str = "\x1b[0;31m";
const GREEN: &str = "\x1b[0;32m";
const YELLOW: &str = "\x1b[1;33m";
const BLUE: &str = "\x1b[0;34m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Info,
    Success,
    Warning,
    Error,
}

impl Tag {
    fn label(&self) -> &'static str {
        match self {
            Tag::Info => "[INFO]",
            Tag::Success => "[SUCCESS]",
            Tag::Warning => "[WARNING]",
            Tag::Error => "[ERROR]",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            Tag::Info => BLUE,
            Tag::Success => GREEN,
            Tag::Warning => YELLOW,
            Tag::Error => RED,
        }
    }
}

pub fn format_line(tag: Tag, message: &str, color: bool) -> String {
    if color {
        format!("{}{}{} {}", tag.color(), tag.label(), RESET, message)
    } else {
        format!("{} {}", tag.label(), message)
    }
}

/// Tagged status lines on stdout, colored only when stdout is a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    color: bool,
}

impl Console {
    pub fn new() -> Self {
        Self {
            color: std::io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn info(&self, message: &str) {
        self.tagged(Tag::Info, message);
    }

    pub fn success(&self, message: &str) {
        self.tagged(Tag::Success, message);
    }

    pub fn warning(&self, message: &str) {
        self.tagged(Tag::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.tagged(Tag::Error, message);
    }

    /// Untagged text such as status blocks and container logs.
    pub fn print(&self, text: &str) {
        println!("{}", text.trim_end_matches('\n'));
    }

    fn tagged(&self, tag: Tag, message: &str) {
        println!("{}", format_line(tag, message, self.color));
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
