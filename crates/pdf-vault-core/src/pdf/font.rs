//! Standard (base-14) Type1 fonts used by the watermark overlay.
//!
//! Every conforming PDF reader ships Helvetica and Helvetica-Bold, so the
//! overlay references them by name instead of embedding a font program.
//! Text is written in WinAnsiEncoding and measured with the glyph widths
//! from the Adobe Font Metrics files, in 1/1000ths of the font size.

use lopdf::{Dictionary, Object};

use crate::error::{Error, Result};

/// Helvetica widths for WinAnsi codes 0x20..=0x7E.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

/// Helvetica widths for WinAnsi codes 0x80..=0x9F (0 = unassigned code).
const HELVETICA_WIN: [u16; 32] = [
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0, // 0x80
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667, // 0x90
];

/// Helvetica widths for WinAnsi codes 0xA0..=0xFF (identical to Latin-1).
const HELVETICA_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 0xF0
];

/// Helvetica-Bold widths for WinAnsi codes 0x20..=0x7E.
const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0x30
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 0x50
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 0x60
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 0x70
];

/// Helvetica-Bold widths for WinAnsi codes 0x80..=0x9F (0 = unassigned code).
const HELVETICA_BOLD_WIN: [u16; 32] = [
    556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0, // 0x80
    0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667, // 0x90
];

/// Helvetica-Bold widths for WinAnsi codes 0xA0..=0xFF.
const HELVETICA_BOLD_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556, // 0xF0
];

/// A base-14 sans-serif face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// PostScript name used as `/BaseFont`.
    pub const fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Font dictionary suitable for a page's `/Resources /Font` entry.
    pub fn dictionary(self) -> Dictionary {
        Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(self.base_font().as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ])
    }

    /// Width of one WinAnsi code in glyph space (1/1000 em).
    fn code_width(self, code: u8) -> Option<u16> {
        let (ascii, win, latin1) = match self {
            Self::Helvetica => (&HELVETICA_ASCII, &HELVETICA_WIN, &HELVETICA_LATIN1),
            Self::HelveticaBold => (
                &HELVETICA_BOLD_ASCII,
                &HELVETICA_BOLD_WIN,
                &HELVETICA_BOLD_LATIN1,
            ),
        };

        let width = match code {
            0x20..=0x7E => ascii[usize::from(code - 0x20)],
            0x80..=0x9F => win[usize::from(code - 0x80)],
            0xA0..=0xFF => latin1[usize::from(code - 0xA0)],
            _ => 0,
        };
        (width > 0).then_some(width)
    }

    /// Encode text as WinAnsi bytes for a `Tj` operand.
    ///
    /// Fails with `RenderFailure` for characters the encoding cannot represent.
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        text.chars()
            .map(|c| {
                win_ansi_code(c).filter(|&code| self.code_width(code).is_some()).ok_or_else(|| {
                    Error::RenderFailure(format!(
                        "U+{:04X} cannot be encoded in {} (WinAnsiEncoding)",
                        u32::from(c),
                        self.base_font()
                    ))
                })
            })
            .collect()
    }

    /// Width of `text` in points when set at `font_size`.
    pub fn string_width(self, text: &str, font_size: f32) -> Result<f32> {
        let units: u32 = self
            .encode(text)?
            .into_iter()
            .filter_map(|code| self.code_width(code))
            .map(u32::from)
            .sum();

        #[allow(clippy::cast_precision_loss)] // widths stay far below 2^24
        Ok(units as f32 / 1000.0 * font_size)
    }
}

/// Map a Unicode scalar to its WinAnsiEncoding code.
fn win_ansi_code(c: char) -> Option<u8> {
    match u32::from(c) {
        cp @ (0x20..=0x7E | 0xA0..=0xFF) => u8::try_from(cp).ok(),
        _ => match c {
            '€' => Some(0x80),
            '‚' => Some(0x82),
            'ƒ' => Some(0x83),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '†' => Some(0x86),
            '‡' => Some(0x87),
            'ˆ' => Some(0x88),
            '‰' => Some(0x89),
            'Š' => Some(0x8A),
            '‹' => Some(0x8B),
            'Œ' => Some(0x8C),
            'Ž' => Some(0x8E),
            '\u{2018}' => Some(0x91),
            '\u{2019}' => Some(0x92),
            '\u{201C}' => Some(0x93),
            '\u{201D}' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '˜' => Some(0x98),
            '™' => Some(0x99),
            'š' => Some(0x9A),
            '›' => Some(0x9B),
            'œ' => Some(0x9C),
            'ž' => Some(0x9E),
            'Ÿ' => Some(0x9F),
            _ => None,
        },
    }
}
