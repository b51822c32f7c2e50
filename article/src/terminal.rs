use bbsweb_ansi::EscapeSequence;

pub const DEFAULT_FG: u8 = 7;
pub const DEFAULT_BG: u8 = 0;

/// Current SGR attributes while scanning an article: 3-bit foreground and
/// background colors plus the highlight flag. Only SGR (`m`) sequences are
/// interpreted; every other mode is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalState {
    fg: u8,
    bg: u8,
    highlighted: bool,
}

impl Default for TerminalState {
    fn default() -> Self {
        Self {
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
            highlighted: false,
        }
    }
}

impl TerminalState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn set_color(&mut self, fg: u8, bg: u8, highlighted: bool) {
        self.fg = fg;
        self.bg = bg;
        self.highlighted = highlighted;
    }

    pub fn apply_escape_sequence(&mut self, esc: &EscapeSequence) {
        if esc.mode != 'm' {
            return;
        }
        if esc.nums.is_empty() {
            self.reset();
            return;
        }
        for &ctl in &esc.nums {
            match ctl {
                0 => self.reset(),
                1 => self.highlighted = true,
                22 => self.highlighted = false,
                30..=37 => self.fg = (ctl % 10) as u8,
                40..=47 => self.bg = (ctl % 10) as u8,
                _ => {}
            }
        }
    }

    pub fn fg(&self) -> u8 {
        self.fg
    }

    pub fn bg(&self) -> u8 {
        self.bg
    }

    pub fn highlighted(&self) -> bool {
        self.highlighted
    }
}
