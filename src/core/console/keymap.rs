//! Translation of host key events to the bytes a terminal would send.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Map a key event to the text sent for it, or `None` for keys without a
/// translation
pub fn translate(event: &KeyEvent) -> Option<String> {
    let text = match event.code {
        KeyCode::Char(ch) => return Some(map_char(ch, event.modifiers)),
        KeyCode::Enter => "\n",
        KeyCode::Backspace => "\x08",
        KeyCode::Tab => "\t",
        KeyCode::Esc => "\x1b",
        KeyCode::F(n) => function_key(n)?,
        KeyCode::Up => "\x1b[A",
        KeyCode::Down => "\x1b[B",
        KeyCode::Left => "\x1b[D",
        KeyCode::Right => "\x1b[C",
        KeyCode::Home => "\x1b[H",
        KeyCode::End => "\x1b[F",
        KeyCode::Insert => "\x1b[2~",
        KeyCode::Delete => "\x1b[3~",
        KeyCode::PageUp => "\x1b[5~",
        KeyCode::PageDown => "\x1b[6~",
        _ => return None,
    };
    Some(text.to_string())
}

fn function_key(n: u8) -> Option<&'static str> {
    let code = match n {
        1 => "\x1bOP",
        2 => "\x1bOQ",
        3 => "\x1bOR",
        4 => "\x1bOS",
        5 => "\x1b[15~",
        6 => "\x1b[17~",
        7 => "\x1b[18~",
        8 => "\x1b[19~",
        9 => "\x1b[20~",
        10 => "\x1b[21~",
        _ => return None,
    };
    Some(code)
}

fn map_char(ch: char, modifiers: KeyModifiers) -> String {
    if modifiers.contains(KeyModifiers::CONTROL) && !modifiers.contains(KeyModifiers::ALT) {
        if ch.is_ascii_alphabetic() {
            let code = ch.to_ascii_lowercase() as u8 - b'a' + 1;
            return char::from(code).to_string();
        }
        let code = match ch {
            '@' | '`' | ' ' | '2' => Some(0x00),
            '[' | '3' => Some(0x1b),
            '\\' | '4' => Some(0x1c),
            ']' | '5' => Some(0x1d),
            '^' | '~' | '6' => Some(0x1e),
            '_' | '?' | '7' => Some(0x1f),
            _ => None,
        };
        if let Some(code) = code {
            return char::from(code).to_string();
        }
    }

    if ch == '\x7f' {
        return "\x08".to_string();
    }

    ch.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_plain_characters() {
        assert_eq!(translate(&key(KeyCode::Char('a'))).as_deref(), Some("a"));
        assert_eq!(translate(&key(KeyCode::Char('ß'))).as_deref(), Some("ß"));
        assert_eq!(
            translate(&KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT)).as_deref(),
            Some("A")
        );
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(translate(&ctrl('c')).as_deref(), Some("\x03"));
        assert_eq!(translate(&ctrl('T')).as_deref(), Some("\x14"));
        assert_eq!(translate(&ctrl(']')).as_deref(), Some("\x1d"));
        assert_eq!(translate(&ctrl('5')).as_deref(), Some("\x1d"));
    }

    #[test]
    fn test_enter_and_backspace_are_normalized() {
        assert_eq!(translate(&key(KeyCode::Enter)).as_deref(), Some("\n"));
        assert_eq!(translate(&key(KeyCode::Backspace)).as_deref(), Some("\x08"));
        assert_eq!(translate(&key(KeyCode::Char('\x7f'))).as_deref(), Some("\x08"));
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(translate(&key(KeyCode::Up)).as_deref(), Some("\x1b[A"));
        assert_eq!(translate(&key(KeyCode::Left)).as_deref(), Some("\x1b[D"));
        assert_eq!(translate(&key(KeyCode::Delete)).as_deref(), Some("\x1b[3~"));
        assert_eq!(translate(&key(KeyCode::PageDown)).as_deref(), Some("\x1b[6~"));
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(translate(&key(KeyCode::F(1))).as_deref(), Some("\x1bOP"));
        assert_eq!(translate(&key(KeyCode::F(10))).as_deref(), Some("\x1b[21~"));
        assert_eq!(translate(&key(KeyCode::F(11))), None);
    }

    #[test]
    fn test_unmappable_keys_are_dropped() {
        assert_eq!(translate(&key(KeyCode::CapsLock)), None);
        assert_eq!(translate(&key(KeyCode::Null)), None);
    }
}
