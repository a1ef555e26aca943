//! Printer directives
//!
//! A ticket is rendered into a flat list of directives. They are device
//! independent: [`crate::encode_directives`] turns them into ESC/POS bytes,
//! [`to_plain_text`] into a text preview.

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Character size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Normal,
    DoubleHeight,
    DoubleWidth,
    Double,
}

/// One printer instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Alignment for the following lines
    Align(Align),
    /// Bold on/off
    Bold(bool),
    /// Character size for the following lines
    Size(TextSize),
    /// Text followed by a newline
    Line(String),
    /// Print and feed n lines
    Feed(u8),
    /// Full paper cut
    Cut,
}

impl Directive {
    /// Text line
    pub fn line(text: impl Into<String>) -> Self {
        Directive::Line(text.into())
    }

    /// Line made of `width` repetitions of `ch`
    pub fn separator(ch: char, width: usize) -> Self {
        Directive::Line(std::iter::repeat_n(ch, width).collect())
    }
}

/// Text-only view of a ticket, one entry per printed line
pub fn to_plain_text(directives: &[Directive]) -> String {
    let mut out = String::new();
    for d in directives {
        if let Directive::Line(text) = d {
            out.push_str(text);
            out.push('\n');
        }
    }
    out
}
