use super::Transform;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Mutex;

const CONTROL_PICTURES: u32 = 0x2400;
const SUBSCRIPT_ZERO: u32 = 0x2080;

fn control_picture(c: char) -> char {
    char::from_u32(CONTROL_PICTURES + c as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn translate(text: String, map: &HashMap<char, char>) -> String {
    if !text.chars().any(|c| map.contains_key(&c)) {
        return text;
    }
    text.chars().map(|c| *map.get(&c).unwrap_or(&c)).collect()
}

/// Forward all data unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct Direct;

impl Transform for Direct {}

/// Remove typical terminal control codes from received and echoed text
#[derive(Debug, Clone)]
pub struct NoTerminal {
    replacements: HashMap<char, char>,
}

impl NoTerminal {
    pub fn new() -> Self {
        let mut replacements: HashMap<char, char> = (0u8..32)
            .map(char::from)
            .filter(|c| !matches!(c, '\r' | '\n' | '\x08' | '\t'))
            .map(|c| (c, control_picture(c)))
            .collect();
        replacements.insert('\x7f', '\u{2421}'); // DEL
        replacements.insert('\u{9b}', '\u{2425}'); // CSI
        Self { replacements }
    }
}

impl Default for NoTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for NoTerminal {
    fn rx(&self, text: String) -> String {
        translate(text, &self.replacements)
    }

    fn echo(&self, text: String) -> String {
        translate(text, &self.replacements)
    }
}

/// Remove all control codes, including CR and LF, and make spaces visible
#[derive(Debug, Clone)]
pub struct NoControls {
    replacements: HashMap<char, char>,
}

impl NoControls {
    pub fn new() -> Self {
        let mut replacements: HashMap<char, char> = (0u8..32)
            .map(char::from)
            .map(|c| (c, control_picture(c)))
            .collect();
        replacements.insert(' ', '\u{2423}'); // visible space
        replacements.insert('\x7f', '\u{2421}');
        replacements.insert('\u{9b}', '\u{2425}');
        Self { replacements }
    }
}

impl Default for NoControls {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for NoControls {
    fn rx(&self, text: String) -> String {
        translate(text, &self.replacements)
    }

    fn echo(&self, text: String) -> String {
        translate(text, &self.replacements)
    }
}

/// Show decimal codes for all non-ASCII characters and replace most control codes
#[derive(Debug, Default, Clone, Copy)]
pub struct Printable;

impl Printable {
    fn escape(text: String) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if (' '..'\x7f').contains(&c) || matches!(c, '\r' | '\n' | '\x08' | '\t') {
                out.push(c);
            } else if c < ' ' {
                out.push(control_picture(c));
            } else {
                for digit in (c as u32).to_string().bytes() {
                    let subscript = SUBSCRIPT_ZERO + u32::from(digit - b'0');
                    out.push(char::from_u32(subscript).unwrap_or('?'));
                }
                out.push(' ');
            }
        }
        out
    }
}

impl Transform for Printable {
    fn rx(&self, text: String) -> String {
        Self::escape(text)
    }

    fn echo(&self, text: String) -> String {
        Self::escape(text)
    }
}

/// Apply different colors for received and echoed text
#[derive(Debug, Clone)]
pub struct Colorize {
    input_color: &'static str,
    echo_color: &'static str,
}

impl Colorize {
    pub fn new() -> Self {
        Self {
            input_color: "\x1b[37m",
            echo_color: "\x1b[31m",
        }
    }
}

impl Default for Colorize {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Colorize {
    fn rx(&self, text: String) -> String {
        let mut out = String::with_capacity(self.input_color.len() + text.len());
        out.push_str(self.input_color);
        out.push_str(&text);
        out
    }

    fn echo(&self, text: String) -> String {
        let mut out = String::with_capacity(self.echo_color.len() + text.len());
        out.push_str(self.echo_color);
        out.push_str(&text);
        out
    }
}

/// Print what is sent and received to a diagnostic stream
pub struct DebugIo {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl DebugIo {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    pub fn stderr() -> Self {
        Self::new(Box::new(io::stderr()))
    }

    fn report(&self, tag: &str, text: &str) {
        if let Ok(mut sink) = self.sink.lock() {
            // Diagnostics must never break the data path
            let _ = write!(sink, " [{}:{:?}] ", tag, text);
            let _ = sink.flush();
        }
    }
}

impl Transform for DebugIo {
    fn rx(&self, text: String) -> String {
        self.report("RX", &text);
        text
    }

    fn tx(&self, text: String) -> String {
        self.report("TX", &text);
        text
    }
}
