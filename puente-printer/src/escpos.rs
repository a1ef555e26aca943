//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data.

use crate::directive::{Align, Directive, TextSize};
use crate::encoding::convert_to_cp437;

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
/// All text is converted to CP437 on [`EscPosBuilder::build`].
pub struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(1024);
        // Initialize printer (ESC @)
        buf.extend_from_slice(&[0x1B, 0x40]);
        Self { buf }
    }

    // === Text Output ===

    /// Write text (CP437 encoded on build)
    ///
    /// Control characters other than `\n` are dropped so ticket text can't
    /// inject printer commands.
    pub fn text(&mut self, s: &str) -> &mut Self {
        if s.chars().any(is_stripped_control) {
            let clean: String = s.chars().filter(|c| !is_stripped_control(*c)).collect();
            self.buf.extend_from_slice(clean.as_bytes());
        } else {
            self.buf.extend_from_slice(s.as_bytes());
        }
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Print and feed n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        // ESC d n
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    // === Alignment ===

    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    pub fn right(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x02]);
        self
    }

    // === Text Style ===

    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x01]);
        self
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x00]);
        self
    }

    /// Select character size (GS ! n)
    pub fn size(&mut self, size: TextSize) -> &mut Self {
        let n = match size {
            TextSize::Normal => 0x00,
            TextSize::DoubleHeight => 0x01,
            TextSize::DoubleWidth => 0x10,
            TextSize::Double => 0x11,
        };
        self.buf.extend_from_slice(&[0x1D, 0x21, n]);
        self
    }

    // === Paper Control ===

    /// Cut paper (full cut)
    pub fn cut(&mut self) -> &mut Self {
        // GS V 0
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x00]);
        self
    }

    /// Append one directive
    pub fn directive(&mut self, directive: &Directive) -> &mut Self {
        match directive {
            Directive::Align(Align::Left) => self.left(),
            Directive::Align(Align::Center) => self.center(),
            Directive::Align(Align::Right) => self.right(),
            Directive::Bold(true) => self.bold(),
            Directive::Bold(false) => self.bold_off(),
            Directive::Size(size) => self.size(*size),
            Directive::Line(text) => self.line(text),
            Directive::Feed(lines) => self.feed(*lines),
            Directive::Cut => self.cut(),
        }
    }

    // === Build ===

    /// Build the final byte buffer with CP437 encoding
    pub fn build(self) -> Vec<u8> {
        convert_to_cp437(&self.buf)
    }

    /// Build without conversion (for debugging or ASCII-only content)
    pub fn build_raw(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn is_stripped_control(c: char) -> bool {
    (c.is_ascii_control() && c != '\n') || matches!(c, '\u{80}'..='\u{9F}')
}

/// Encode a rendered ticket into printer bytes
pub fn encode_directives(directives: &[Directive]) -> Vec<u8> {
    let mut b = EscPosBuilder::new();
    for d in directives {
        b.directive(d);
    }
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let mut b = EscPosBuilder::new();
        b.center()
            .size(TextSize::Double)
            .line("COCINA")
            .size(TextSize::Normal)
            .left()
            .line("Mesa: 1");

        let data = b.build_raw();
        assert_eq!(&data[..2], &[0x1B, 0x40]);
        let s = String::from_utf8_lossy(&data);
        assert!(s.contains("COCINA\n"));
        assert!(s.contains("Mesa: 1\n"));
    }

    #[test]
    fn test_directives_map_to_commands() {
        let mut b = EscPosBuilder::new();
        b.directive(&Directive::Align(Align::Right))
            .directive(&Directive::Bold(true))
            .directive(&Directive::Feed(2))
            .directive(&Directive::Cut);

        assert_eq!(
            b.build_raw(),
            vec![
                0x1B, 0x40, // init
                0x1B, 0x61, 0x02, // right
                0x1B, 0x45, 0x01, // bold
                0x1B, 0x64, 0x02, // feed
                0x1D, 0x56, 0x00, // cut
            ]
        );
    }

    #[test]
    fn test_encode_directives_converts_text() {
        let data = encode_directives(&[Directive::line("¡Gracias!"), Directive::Cut]);
        // code page select, re-selected after init
        assert_eq!(&data[..3], &[0x1B, 0x74, 0x00]);
        assert!(data.contains(&0xAD));
        assert!(data.ends_with(&[0x1D, 0x56, 0x00]));
    }

    #[test]
    fn test_text_drops_control_characters() {
        let mut b = EscPosBuilder::new();
        b.line("Sin hielo\x1dV\x00\x1b@\tya\x7f");
        assert_eq!(b.build_raw(), b"\x1b@Sin hieloV@ya\n".to_vec());

        let data = encode_directives(&[
            Directive::line("Nota: \x1dV\x00 corte"),
            Directive::line("linea\r"),
            Directive::Cut,
        ]);
        let cuts = data.windows(3).filter(|w| *w == [0x1D, 0x56, 0x00]).count();
        assert_eq!(cuts, 1);
        assert!(data.ends_with(&[0x1D, 0x56, 0x00]));
        assert!(!data.contains(&b'\r'));
    }
}
