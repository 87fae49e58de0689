#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusLevel {
    #[default]
    Good,
    Warning,
    Error,
}

impl StatusLevel {
    /// Display colour of the level as RGB
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Self::Good => [0x30, 0xC3, 0x00],
            Self::Warning => [0xC2, 0x8E, 0x00],
            Self::Error => [0xC3, 0x00, 0x00],
        }
    }
}

/// The one-line message shown at the bottom of a console
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusLine {
    pub fn new(level: StatusLevel, text: &str) -> Self {
        Self {
            level,
            text: text.to_string(),
        }
    }
}
