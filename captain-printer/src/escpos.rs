//! ESC/POS command builder
//!
//! Only the subset a 58mm receipt needs:
//!
//! | Command | Bytes |
//! |---|---|
//! | Initialize | `1B 40` |
//! | Center align | `1B 61 01` |
//! | Left align | `1B 61 00` |
//! | Double height | `1B 21 08` |
//! | Double width+height | `1B 21 10` |
//! | Normal text | `1B 21 00` |
//! | Cut paper | `1D 56 42 40` |

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;

/// Horizontal alignment (ESC a n)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

impl Align {
    fn command(self) -> [u8; 3] {
        match self {
            Self::Left => [ESC, b'a', 0x00],
            Self::Center => [ESC, b'a', 0x01],
        }
    }
}

/// Character size (ESC ! n)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Normal,
    DoubleHeight,
    /// Double width and height
    Double,
}

impl TextSize {
    fn command(self) -> [u8; 3] {
        match self {
            Self::Normal => [ESC, b'!', 0x00],
            Self::DoubleHeight => [ESC, b'!', 0x08],
            Self::Double => [ESC, b'!', 0x10],
        }
    }
}

/// Accumulates one flat ESC/POS byte stream
///
/// Text is written as UTF-8. The stream always starts with Initialize.
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
}

impl EscPosBuilder {
    /// Start a stream for paper `width` characters wide
    pub fn new(width: usize) -> Self {
        let mut buf = Vec::with_capacity(1024);
        buf.extend_from_slice(&[ESC, b'@']);
        Self { buf, width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn align(&mut self, align: Align) -> &mut Self {
        self.buf.extend_from_slice(&align.command());
        self
    }

    pub fn size(&mut self, size: TextSize) -> &mut Self {
        self.buf.extend_from_slice(&size.command());
        self
    }

    /// Write one line of text in the given size, then return to normal size
    pub fn sized_line(&mut self, size: TextSize, s: &str) -> &mut Self {
        self.size(size).line(s).size(TextSize::Normal)
    }

    /// Write text followed by a newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(b'\n');
        self
    }

    /// Advance the paper `lines` blank lines
    pub fn feed(&mut self, lines: usize) -> &mut Self {
        self.buf.extend(std::iter::repeat_n(b'\n', lines));
        self
    }

    /// A full-width row of '-'
    pub fn separator(&mut self) -> &mut Self {
        let rule = "-".repeat(self.width);
        self.line(&rule)
    }

    /// Full cut (GS V 66 64)
    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[GS, b'V', 0x42, 0x40]);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}
