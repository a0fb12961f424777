use super::Transform;

/// ENTER sends CR+LF
#[derive(Debug, Default, Clone, Copy)]
pub struct Crlf;

impl Transform for Crlf {
    fn tx(&self, text: String) -> String {
        if text.contains('\n') {
            text.replace('\n', "\r\n")
        } else {
            text
        }
    }
}

/// ENTER sends CR; received CR is shown as a newline
#[derive(Debug, Default, Clone, Copy)]
pub struct Cr;

impl Transform for Cr {
    fn rx(&self, text: String) -> String {
        if text.contains('\r') {
            text.replace('\r', "\n")
        } else {
            text
        }
    }

    fn tx(&self, text: String) -> String {
        if text.contains('\n') {
            text.replace('\n', "\r")
        } else {
            text
        }
    }
}

/// ENTER sends LF
#[derive(Debug, Default, Clone, Copy)]
pub struct Lf;

impl Transform for Lf {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crlf() {
        assert_eq!(Crlf.tx("a\nb".to_string()), "a\r\nb");
        assert_eq!(Crlf.rx("a\r\nb".to_string()), "a\r\nb");
        assert_eq!(Crlf.echo("a\nb".to_string()), "a\nb");
    }

    #[test]
    fn test_cr() {
        assert_eq!(Cr.tx("a\nb".to_string()), "a\rb");
        assert_eq!(Cr.rx("a\rb".to_string()), "a\nb");
        assert_eq!(Cr.echo("\n".to_string()), "\n");
    }

    #[test]
    fn test_lf() {
        assert_eq!(Lf.tx("a\nb".to_string()), "a\nb");
        assert_eq!(Lf.rx("a\r\nb".to_string()), "a\r\nb");
    }
}
