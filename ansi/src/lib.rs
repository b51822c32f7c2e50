//! Streaming parser for the ANSI escape subset found in terminal-BBS
//! articles.
//!
//! The input is a byte stream mixing UTF-8 text with ESC sequences. The
//! parser is total: malformed sequences degrade to at most one emitted
//! character, and invalid UTF-8 bytes are skipped without emission. Only the
//! framing is handled here; interpreting the finished sequence (e.g. SGR
//! attributes) is the caller's business.

const ESC: char = '\u{1b}';

/// A finished control sequence, reported through [`Visitor::escape`].
///
/// For a CSI sequence `ESC [ 1 ; 3 7 m` this carries `nums = [1, 37]` and
/// `mode = 'm'`. Intermediate bytes (0x20..=0x2F) between the parameters and
/// the final byte are collected into `trailings`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscapeSequence {
    pub nums: Vec<i32>,
    pub trailings: Vec<char>,
    pub mode: char,
}

impl EscapeSequence {
    fn reset(&mut self) {
        self.nums.clear();
        self.trailings.clear();
        self.mode = '\0';
    }

    /// Splits the raw parameter accumulator on `;` and parses each piece.
    /// An empty piece counts as `0` (common in ANSI art in the wild); pieces
    /// that are not integers are dropped.
    fn parse_numbers(&mut self, buf: &str) {
        for part in buf.split(';') {
            if part.is_empty() {
                self.nums.push(0);
            } else if let Ok(num) = part.parse::<i32>() {
                self.nums.push(num);
            }
        }
    }
}

/// Receives the parse events. One visitor drives one render.
pub trait Visitor {
    /// A printable character outside any escape sequence.
    fn print(&mut self, ch: char);
    /// A completed control sequence.
    fn escape(&mut self, esc: &EscapeSequence);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Default,
    Escaping,
    ParsingControl,
    SkipOne,
}

/// Feeds `input` through the state machine, emitting events on `visitor`.
pub fn parse(input: &[u8], visitor: &mut impl Visitor) {
    let mut state = State::Default;
    let mut buf = String::with_capacity(16);
    let mut esc = EscapeSequence::default();

    for chunk in input.utf8_chunks() {
        for ch in chunk.valid().chars() {
            match state {
                State::Default => match ch {
                    ESC => {
                        state = State::Escaping;
                        buf.clear();
                        esc.reset();
                    }
                    _ => visitor.print(ch),
                },
                State::Escaping => match ch {
                    // BBS-specific sequence: discard the next character.
                    '*' => state = State::SkipOne,
                    // Control sequence introducer.
                    '[' => state = State::ParsingControl,
                    '@'..='_' => {
                        // 2-char control code, not supported.
                        state = State::SkipOne;
                    }
                    _ => {
                        // Not a sequence after all; emit as plain text.
                        visitor.print(ch);
                        state = State::Default;
                    }
                },
                State::ParsingControl => match ch {
                    ' '..='/' => esc.trailings.push(ch),
                    '@'..='~' => {
                        esc.mode = ch;
                        esc.parse_numbers(&buf);
                        visitor.escape(&esc);
                        state = State::Default;
                    }
                    _ => buf.push(ch),
                },
                State::SkipOne => state = State::Default,
            }
        }
        // Invalid bytes in the chunk are dropped without emission.
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Print(char),
        Escape(EscapeSequence),
    }

    #[derive(Default)]
    struct Recorder(Vec<Event>);

    impl Visitor for Recorder {
        fn print(&mut self, ch: char) {
            self.0.push(Event::Print(ch));
        }

        fn escape(&mut self, esc: &EscapeSequence) {
            self.0.push(Event::Escape(esc.clone()));
        }
    }

    fn events(input: &[u8]) -> Vec<Event> {
        let mut rec = Recorder::default();
        parse(input, &mut rec);
        rec.0
    }

    fn sgr(nums: &[i32]) -> Event {
        Event::Escape(EscapeSequence {
            nums: nums.to_vec(),
            trailings: Vec::new(),
            mode: 'm',
        })
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(
            events("ab".as_bytes()),
            vec![Event::Print('a'), Event::Print('b')]
        );
    }

    #[test]
    fn sgr_sequence_with_parameters() {
        assert_eq!(
            events(b"\x1b[1;37ma"),
            vec![sgr(&[1, 37]), Event::Print('a')]
        );
    }

    #[test]
    fn empty_parameters_count_as_zero() {
        assert_eq!(events(b"\x1b[;1m"), vec![sgr(&[0, 1])]);
        assert_eq!(events(b"\x1b[m"), vec![sgr(&[0])]);
    }

    #[test]
    fn star_skips_one_character() {
        assert_eq!(events(b"\x1b*sa"), vec![Event::Print('a')]);
    }

    #[test]
    fn two_char_control_codes_are_dropped() {
        // ESC M (reverse index) has no CSI body; discard its argument.
        assert_eq!(events(b"\x1bMxa"), vec![Event::Print('a')]);
    }

    #[test]
    fn stray_escape_emits_following_character() {
        assert_eq!(
            events(b"\x1bza"),
            vec![Event::Print('z'), Event::Print('a')]
        );
    }

    #[test]
    fn intermediate_bytes_are_collected() {
        assert_eq!(
            events(b"\x1b[4 q"),
            vec![Event::Escape(EscapeSequence {
                nums: vec![4],
                trailings: vec![' '],
                mode: 'q',
            })]
        );
    }

    #[test]
    fn invalid_utf8_is_skipped() {
        assert_eq!(
            events(b"a\xff\xfeb"),
            vec![Event::Print('a'), Event::Print('b')]
        );
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(
            events("安\x1b[31m安".as_bytes()),
            vec![Event::Print('安'), sgr(&[31]), Event::Print('安')]
        );
    }

    #[test]
    fn truncated_sequence_at_end_of_input_is_silent() {
        assert_eq!(events(b"\x1b[31"), Vec::new());
    }
}
