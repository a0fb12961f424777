use linkterm::core::codec::TextCodec;
use linkterm::domain::config::{EolMode, FilterKind};
use linkterm::Pipeline;
use proptest::prelude::*;

/// Property tests for the transform pipeline and codecs
#[cfg(test)]
mod transform_tests {
    use super::*;

    proptest! {
        #[test]
        fn lf_direct_round_trip(text in "[ -~\n]{0,64}") {
            let pipeline = Pipeline::new(EolMode::Lf, &[FilterKind::Direct]);
            prop_assert_eq!(pipeline.rx(pipeline.tx(text.clone())), text);
        }

        #[test]
        fn cr_round_trip_without_carriage_returns(text in "[ -~\n]{0,64}") {
            let pipeline = Pipeline::new(EolMode::Cr, &[FilterKind::Direct]);
            let sent = pipeline.tx(text.clone());
            prop_assert!(!sent.contains('\n'));
            prop_assert_eq!(pipeline.rx(sent), text);
        }

        #[test]
        fn crlf_doubles_nothing_but_newlines(text in "[ -~\n]{0,64}") {
            let pipeline = Pipeline::new(EolMode::Crlf, &[FilterKind::Direct]);
            let newlines = text.matches('\n').count();
            prop_assert_eq!(pipeline.tx(text.clone()).len(), text.len() + newlines);
        }

        #[test]
        fn default_filter_leaves_printable_ascii_alone(text in "[ -~]{0,64}") {
            let pipeline = Pipeline::new(EolMode::Crlf, &[FilterKind::Default]);
            prop_assert_eq!(pipeline.rx(text.clone()), text);
        }

        #[test]
        fn nocontrol_output_has_no_control_characters(text in "\\PC{0,32}[\\x00-\\x1f\\x7f]{0,8}") {
            let pipeline = Pipeline::new(EolMode::Lf, &[FilterKind::NoControl]);
            let shown = pipeline.rx(text);
            prop_assert!(!shown.chars().any(|c| c.is_ascii_control()));
        }

        #[test]
        fn decoding_is_independent_of_chunking(text in "\\PC{0,48}", split in 0usize..256) {
            let bytes = text.as_bytes();
            let split = split % (bytes.len() + 1);

            let mut decoder = TextCodec::default().decoder();
            let mut decoded = decoder.decode(&bytes[..split]);
            decoded.push_str(&decoder.decode(&bytes[split..]));

            prop_assert_eq!(decoded, text);
        }
    }

    #[test]
    fn test_filter_order_matters() {
        let colored_first = Pipeline::new(EolMode::Lf, &[FilterKind::Colorize, FilterKind::NoControl]);
        let colored_last = Pipeline::new(EolMode::Lf, &[FilterKind::NoControl, FilterKind::Colorize]);

        // rx runs the filter list back to front
        assert_eq!(colored_last.rx("x".to_string()), "\u{241b}[37mx");
        assert_eq!(colored_first.rx("x".to_string()), "\x1b[37mx");
    }

    #[test]
    fn test_printable_shows_codes() {
        let pipeline = Pipeline::new(EolMode::Lf, &[FilterKind::Printable]);
        assert_eq!(pipeline.rx("a\x01".to_string()), "a\u{2401}");
        assert_eq!(pipeline.rx("\u{e9}".to_string()), "\u{2082}\u{2083}\u{2083} ");
    }
}
