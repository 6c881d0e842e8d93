//! ESC/POS command encoder for 58mm thermal receipt printers
//! Paper width: 58mm = ~32 characters per line (monospace)

/// ESC - command prefix
pub const ESC: u8 = 0x1B;
/// GS - extended command prefix
pub const GS: u8 = 0x1D;
/// LF - print buffer and feed one line
pub const LF: u8 = 0x0A;

/// Characters per line for 58mm paper
pub const CHARS_PER_LINE: usize = 32;

/// Blank lines fed before a cut so the last printed line clears the blade
const FEED_BEFORE_CUT: usize = 3;

/// Byte emitted for characters outside the Latin-1 range
const REPLACEMENT_BYTE: u8 = b'?';

/// Character-size bits for `GS ! n`
const SIZE_NORMAL: u8 = 0x00;
const SIZE_DOUBLE_HEIGHT: u8 = 0x01;
const SIZE_DOUBLE_WIDTH: u8 = 0x10;

/// Text justification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    /// The `n` parameter of `ESC a n`
    pub fn code(self) -> u8 {
        match self {
            Self::Left => 0x00,
            Self::Center => 0x01,
            Self::Right => 0x02,
        }
    }
}

/// ESC/POS command builder for thermal receipt printers.
///
/// Every operation appends command or text bytes to an internal buffer and
/// returns the builder for chaining. Formatting is not tracked here: the
/// printer holds that state, so callers must pair toggles like
/// `bold(true)` / `bold(false)` themselves.
///
/// One encoder is meant to build one receipt; `clear()` allows reuse.
#[derive(Debug, Clone, Default)]
pub struct EscPosEncoder {
    buffer: Vec<u8>,
}

impl EscPosEncoder {
    /// Creates an empty encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize the printer (ESC @)
    pub fn init(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x40]);
        self
    }

    /// Select justification (ESC a n)
    pub fn align(&mut self, align: Align) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x61, align.code()]);
        self
    }

    /// Turn emphasized mode on/off (ESC E n)
    pub fn bold(&mut self, on: bool) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x45, u8::from(on)]);
        self
    }

    /// Select double-height characters (GS ! n).
    ///
    /// The size byte is written whole, so this clears any double-width
    /// setting made earlier.
    pub fn double_height(&mut self, on: bool) -> &mut Self {
        self.character_size(if on { SIZE_DOUBLE_HEIGHT } else { SIZE_NORMAL })
    }

    /// Select double-width characters (GS ! n).
    ///
    /// Like [`double_height`](Self::double_height), this overwrites the
    /// whole size byte.
    pub fn double_width(&mut self, on: bool) -> &mut Self {
        self.character_size(if on { SIZE_DOUBLE_WIDTH } else { SIZE_NORMAL })
    }

    fn character_size(&mut self, size: u8) -> &mut Self {
        self.buffer.extend_from_slice(&[GS, 0x21, size]);
        self
    }

    /// Print text without a line terminator.
    ///
    /// Characters above U+00FF are sent as `?`. Widths and replacement work
    /// per Unicode scalar value, so a character outside the Basic
    /// Multilingual Plane (an emoji, say) prints as one `?`, where a
    /// UTF-16 based encoder prints two.
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.buffer.extend(text.chars().map(latin1_byte));
        self
    }

    /// Print text followed by a line feed
    pub fn line(&mut self, text: &str) -> &mut Self {
        self.text(text).newline()
    }

    /// Single line feed
    pub fn newline(&mut self) -> &mut Self {
        self.buffer.push(LF);
        self
    }

    /// Feed `lines` line feeds
    pub fn feed(&mut self, lines: usize) -> &mut Self {
        self.buffer.extend(std::iter::repeat_n(LF, lines));
        self
    }

    /// Full-width rule made of `ch`
    pub fn separator(&mut self, ch: char) -> &mut Self {
        let rule: String = std::iter::repeat_n(ch, CHARS_PER_LINE).collect();
        self.line(&rule)
    }

    /// One row with `left` flush left and `right` flush right.
    ///
    /// When both do not fit, `left` is cut so that a single space still
    /// separates it from `right`.
    pub fn left_right(&mut self, left: &str, right: &str) -> &mut Self {
        let line = left_right_line(left, right);
        self.line(&line)
    }

    /// Print a centered line, then switch back to left alignment
    pub fn centered(&mut self, text: &str) -> &mut Self {
        self.align(Align::Center).line(text).align(Align::Left)
    }

    /// Feed and full cut (GS V 0)
    pub fn cut(&mut self) -> &mut Self {
        self.feed(FEED_BEFORE_CUT);
        self.buffer.extend_from_slice(&[GS, 0x56, 0x00]);
        self
    }

    /// Feed and partial cut (GS V 1), leaving a small tab attached
    pub fn partial_cut(&mut self) -> &mut Self {
        self.feed(FEED_BEFORE_CUT);
        self.buffer.extend_from_slice(&[GS, 0x56, 0x01]);
        self
    }

    /// Bold off, double-height off, left alignment.
    ///
    /// Double-width is not touched.
    pub fn reset(&mut self) -> &mut Self {
        self.bold(false).double_height(false).align(Align::Left)
    }

    /// Snapshot of the encoded bytes. The buffer is left intact.
    pub fn encode(&self) -> Vec<u8> {
        self.buffer.clone()
    }

    /// Empty the buffer
    pub fn clear(&mut self) -> &mut Self {
        self.buffer.clear();
        self
    }

    /// Number of bytes encoded so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn latin1_byte(ch: char) -> u8 {
    u8::try_from(u32::from(ch)).unwrap_or(REPLACEMENT_BYTE)
}

fn left_right_line(left: &str, right: &str) -> String {
    let left_len = left.chars().count();
    let right_len = right.chars().count();

    match CHARS_PER_LINE.checked_sub(left_len + right_len) {
        Some(spacing) if spacing >= 1 => {
            format!("{left}{}{right}", " ".repeat(spacing))
        }
        _ => {
            let max_left = CHARS_PER_LINE.saturating_sub(right_len + 1);
            let kept: String = left.chars().take(max_left).collect();
            format!("{kept} {right}")
        }
    }
}

/// Format an amount in rupees for receipt display, e.g. `Rs.1234.50`
pub fn format_currency(amount: f64) -> String {
    format!("Rs.{}", to_fixed_2(amount))
}

/// Two-decimal rendering that resolves exact halves away from zero,
/// e.g. 0.125 -> 0.13 and -0.125 -> -0.13. Negative zero prints as 0.00.
fn to_fixed_2(amount: f64) -> String {
    let magnitude = amount.abs();
    // only multiples of 1/8 can sit exactly on a half cent
    let scaled = magnitude * 100.0;
    let digits = if (magnitude * 8.0).fract() == 0.0 && (scaled - scaled.floor()) == 0.5 {
        format!("{:.2}", scaled.ceil() / 100.0)
    } else {
        format!("{magnitude:.2}")
    };
    if amount < 0.0 {
        format!("-{digits}")
    } else {
        digits
    }
}

/// Truncate text to fit within `max_length` characters.
///
/// Text that fits is returned unchanged. Longer text keeps its first
/// `max_length - 2` characters followed by `..`. For `max_length` of 2 or
/// less there is no room for content and the result is `max_length` dots.
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    if max_length <= 2 {
        return ".".repeat(max_length);
    }
    let mut truncated: String = text.chars().take(max_length - 2).collect();
    truncated.push_str("..");
    truncated
}
