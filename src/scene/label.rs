//! Text labels rasterized into alpha bitmaps for camera-facing quads.
//!
//! Glyphs come from a built-in 5x7 bitmap atlas covering printable ASCII.
//! Latin-1 letters are folded onto their base glyph plus an accent mark drawn
//! in the two rows above the cell, so names like "Programación" stay legible.
//! The bitmap is laid out at twice the logical canvas size, centered, and
//! shrunk until the whole string fits.

use serde::Serialize;

use crate::config::LabelStyle;

use super::material::Color;

const GLYPH_COLUMNS: usize = 5;
const GLYPH_ROWS: usize = 7;
/// Accent rows above the glyph plus the glyph itself.
const CELL_ROWS: usize = GLYPH_ROWS + 2;
/// Horizontal advance in glyph units, one unit of spacing included.
const ADVANCE: usize = GLYPH_COLUMNS + 1;
const ATLAS_COLUMNS: usize = 16;
const FIRST_GLYPH: u32 = 32;
const LAST_GLYPH: u32 = 126;
/// Label bitmaps are rendered at this multiple of the logical canvas.
pub const RESOLUTION_SCALE: u32 = 2;

/// Rows of each printable ASCII glyph, most significant of the low 5 bits on the left.
#[rustfmt::skip]
const GLYPHS: [[u8; GLYPH_ROWS]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04], [0x0a, 0x0a, 0x0a, 0x00, 0x00, 0x00, 0x00], [0x0a, 0x0a, 0x1f, 0x0a, 0x1f, 0x0a, 0x0a],
    [0x04, 0x0f, 0x14, 0x0e, 0x05, 0x1e, 0x04], [0x18, 0x19, 0x02, 0x04, 0x08, 0x13, 0x03], [0x0c, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0d], [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
    [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02], [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08], [0x00, 0x04, 0x15, 0x0e, 0x15, 0x04, 0x00], [0x00, 0x04, 0x04, 0x1f, 0x04, 0x04, 0x00],
    [0x00, 0x00, 0x00, 0x00, 0x0c, 0x04, 0x08], [0x00, 0x00, 0x00, 0x1f, 0x00, 0x00, 0x00], [0x00, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x0c], [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
    [0x0e, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0e], [0x04, 0x0c, 0x04, 0x04, 0x04, 0x04, 0x0e], [0x0e, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1f], [0x1f, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0e],
    [0x02, 0x06, 0x0a, 0x12, 0x1f, 0x02, 0x02], [0x1f, 0x10, 0x1e, 0x01, 0x01, 0x11, 0x0e], [0x06, 0x08, 0x10, 0x1e, 0x11, 0x11, 0x0e], [0x1f, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
    [0x0e, 0x11, 0x11, 0x0e, 0x11, 0x11, 0x0e], [0x0e, 0x11, 0x11, 0x0f, 0x01, 0x02, 0x0c], [0x00, 0x0c, 0x0c, 0x00, 0x0c, 0x0c, 0x00], [0x00, 0x0c, 0x0c, 0x00, 0x0c, 0x04, 0x08],
    [0x02, 0x04, 0x08, 0x10, 0x08, 0x04, 0x02], [0x00, 0x00, 0x1f, 0x00, 0x1f, 0x00, 0x00], [0x08, 0x04, 0x02, 0x01, 0x02, 0x04, 0x08], [0x0e, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    [0x0e, 0x11, 0x01, 0x0d, 0x15, 0x15, 0x0e], [0x0e, 0x11, 0x11, 0x1f, 0x11, 0x11, 0x11], [0x1e, 0x11, 0x11, 0x1e, 0x11, 0x11, 0x1e], [0x0e, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0e],
    [0x1c, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1c], [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x1f], [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x10], [0x0e, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0f],
    [0x11, 0x11, 0x11, 0x1f, 0x11, 0x11, 0x11], [0x0e, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0e], [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0c], [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1f], [0x11, 0x1b, 0x15, 0x15, 0x11, 0x11, 0x11], [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11], [0x0e, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0e],
    [0x1e, 0x11, 0x11, 0x1e, 0x10, 0x10, 0x10], [0x0e, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0d], [0x1e, 0x11, 0x11, 0x1e, 0x14, 0x12, 0x11], [0x0f, 0x10, 0x10, 0x0e, 0x01, 0x01, 0x1e],
    [0x1f, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04], [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0e], [0x11, 0x11, 0x11, 0x11, 0x11, 0x0a, 0x04], [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0a],
    [0x11, 0x11, 0x0a, 0x04, 0x0a, 0x11, 0x11], [0x11, 0x11, 0x0a, 0x04, 0x04, 0x04, 0x04], [0x1f, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1f], [0x0e, 0x08, 0x08, 0x08, 0x08, 0x08, 0x0e],
    [0x00, 0x10, 0x08, 0x04, 0x02, 0x01, 0x00], [0x0e, 0x02, 0x02, 0x02, 0x02, 0x02, 0x0e], [0x04, 0x0a, 0x11, 0x00, 0x00, 0x00, 0x00], [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1f],
    [0x08, 0x04, 0x02, 0x00, 0x00, 0x00, 0x00], [0x00, 0x00, 0x0e, 0x01, 0x0f, 0x11, 0x0f], [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x1e], [0x00, 0x00, 0x0e, 0x10, 0x10, 0x11, 0x0e],
    [0x01, 0x01, 0x0d, 0x13, 0x11, 0x11, 0x0f], [0x00, 0x00, 0x0e, 0x11, 0x1f, 0x10, 0x0e], [0x06, 0x09, 0x08, 0x1c, 0x08, 0x08, 0x08], [0x00, 0x0f, 0x11, 0x11, 0x0f, 0x01, 0x0e],
    [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x11], [0x04, 0x00, 0x0c, 0x04, 0x04, 0x04, 0x0e], [0x02, 0x00, 0x06, 0x02, 0x02, 0x12, 0x0c], [0x10, 0x10, 0x12, 0x14, 0x18, 0x14, 0x12],
    [0x0c, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0e], [0x00, 0x00, 0x1a, 0x15, 0x15, 0x11, 0x11], [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11], [0x00, 0x00, 0x0e, 0x11, 0x11, 0x11, 0x0e],
    [0x00, 0x00, 0x1e, 0x11, 0x1e, 0x10, 0x10], [0x00, 0x00, 0x0d, 0x13, 0x0f, 0x01, 0x01], [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10], [0x00, 0x00, 0x0e, 0x10, 0x0e, 0x01, 0x1e],
    [0x08, 0x08, 0x1c, 0x08, 0x08, 0x09, 0x06], [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0d], [0x00, 0x00, 0x11, 0x11, 0x11, 0x0a, 0x04], [0x00, 0x00, 0x11, 0x11, 0x15, 0x15, 0x0a],
    [0x00, 0x00, 0x11, 0x0a, 0x04, 0x0a, 0x11], [0x00, 0x00, 0x11, 0x11, 0x0f, 0x01, 0x0e], [0x00, 0x00, 0x1f, 0x02, 0x04, 0x08, 0x1f], [0x02, 0x04, 0x04, 0x08, 0x04, 0x04, 0x02],
    [0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04], [0x08, 0x04, 0x04, 0x02, 0x04, 0x04, 0x08], [0x00, 0x00, 0x08, 0x15, 0x02, 0x00, 0x00],
];

// ─── Atlas ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Accent {
    None,
    Acute,
    Grave,
    Circumflex,
    Diaeresis,
    Tilde,
}

impl Accent {
    const fn rows(self) -> [u8; 2] {
        match self {
            Self::None => [0x00, 0x00],
            Self::Acute => [0x02, 0x04],
            Self::Grave => [0x08, 0x04],
            Self::Circumflex => [0x04, 0x0a],
            Self::Diaeresis => [0x00, 0x0a],
            Self::Tilde => [0x0d, 0x16],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Glyph {
    pub codepoint: char,
    /// Base ASCII glyph drawn for this character.
    pub base: char,
    pub accent: Accent,
    /// Cell in the atlas texture as `[u_min, v_min, u_max, v_max]`.
    pub uv: [f32; 4],
}

/// Grid atlas of the built-in bitmap font: 16 cells per row, ASCII 32..=126.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphAtlas;

impl GlyphAtlas {
    #[must_use]
    pub const fn builtin() -> Self {
        Self
    }

    #[must_use]
    pub const fn glyph_count(&self) -> usize {
        GLYPHS.len()
    }

    /// Atlas texture size in pixels, one pixel per glyph unit.
    #[must_use]
    pub const fn texture_size(&self) -> [u32; 2] {
        let rows = GLYPHS.len().div_ceil(ATLAS_COLUMNS);
        [(ATLAS_COLUMNS * ADVANCE) as u32, (rows * CELL_ROWS) as u32]
    }

    /// Glyph for `ch`, folding accented Latin-1 letters onto their base.
    /// Characters outside the atlas render as `?`.
    #[must_use]
    pub fn glyph(&self, ch: char) -> Glyph {
        let (base, accent) = fold_latin1(ch);
        let base = if (FIRST_GLYPH..=LAST_GLYPH).contains(&u32::from(base)) {
            base
        } else {
            '?'
        };
        let index = (u32::from(base) - FIRST_GLYPH) as usize;
        let col = (index % ATLAS_COLUMNS) as f32;
        let row = (index / ATLAS_COLUMNS) as f32;
        let cell_w = 1.0 / ATLAS_COLUMNS as f32;
        let cell_h = 1.0 / GLYPHS.len().div_ceil(ATLAS_COLUMNS) as f32;
        Glyph {
            codepoint: ch,
            base,
            accent,
            uv: [col * cell_w, row * cell_h, (col + 1.0) * cell_w, (row + 1.0) * cell_h],
        }
    }

    /// Cell bitmap rows, accent rows first.
    #[must_use]
    pub fn cell(&self, glyph: &Glyph) -> [u8; CELL_ROWS] {
        let index = (u32::from(glyph.base) - FIRST_GLYPH) as usize;
        let mut rows = [0u8; CELL_ROWS];
        rows[..2].copy_from_slice(&glyph.accent.rows());
        rows[2..].copy_from_slice(&GLYPHS[index]);
        // Accented `i` drops its dot.
        if glyph.base == 'i' && glyph.accent != Accent::None {
            rows[2] = 0;
        }
        rows
    }
}

fn fold_latin1(ch: char) -> (char, Accent) {
    use Accent::{Acute, Circumflex, Diaeresis, Grave, Tilde};
    match ch {
        'á' => ('a', Acute),
        'à' => ('a', Grave),
        'â' => ('a', Circumflex),
        'ä' => ('a', Diaeresis),
        'ã' => ('a', Tilde),
        'é' => ('e', Acute),
        'è' => ('e', Grave),
        'ê' => ('e', Circumflex),
        'ë' => ('e', Diaeresis),
        'í' => ('i', Acute),
        'ì' => ('i', Grave),
        'î' => ('i', Circumflex),
        'ï' => ('i', Diaeresis),
        'ó' => ('o', Acute),
        'ò' => ('o', Grave),
        'ô' => ('o', Circumflex),
        'ö' => ('o', Diaeresis),
        'õ' => ('o', Tilde),
        'ú' => ('u', Acute),
        'ù' => ('u', Grave),
        'û' => ('u', Circumflex),
        'ü' => ('u', Diaeresis),
        'ñ' => ('n', Tilde),
        'Á' => ('A', Acute),
        'À' => ('A', Grave),
        'Â' => ('A', Circumflex),
        'Ä' => ('A', Diaeresis),
        'Ã' => ('A', Tilde),
        'É' => ('E', Acute),
        'È' => ('E', Grave),
        'Ê' => ('E', Circumflex),
        'Ë' => ('E', Diaeresis),
        'Í' => ('I', Acute),
        'Ì' => ('I', Grave),
        'Î' => ('I', Circumflex),
        'Ï' => ('I', Diaeresis),
        'Ó' => ('O', Acute),
        'Ò' => ('O', Grave),
        'Ô' => ('O', Circumflex),
        'Ö' => ('O', Diaeresis),
        'Õ' => ('O', Tilde),
        'Ú' => ('U', Acute),
        'Ù' => ('U', Grave),
        'Û' => ('U', Circumflex),
        'Ü' => ('U', Diaeresis),
        'Ñ' => ('N', Tilde),
        'ç' => ('c', Accent::None),
        'Ç' => ('C', Accent::None),
        '¿' => ('?', Accent::None),
        '¡' => ('!', Accent::None),
        '\u{a0}' | '\t' => (' ', Accent::None),
        other => (other, Accent::None),
    }
}

// ─── Bitmap ──────────────────────────────────────────────────────────────────

/// Pixel rectangle of one placed glyph cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlyphPlacement {
    pub codepoint: char,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub uv: [f32; 4],
}

/// Rasterized label: 8-bit coverage plus a vertical color gradient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelBitmap {
    pub text: String,
    pub width: u32,
    pub height: u32,
    /// Effective cell height in bitmap pixels after shrinking to fit.
    pub font_px: f64,
    #[serde(skip)]
    pub coverage: Vec<u8>,
    pub top_color: Color,
    pub bottom_color: Color,
    /// Quad size in world units.
    pub quad_size: [f64; 2],
    pub glyphs: Vec<GlyphPlacement>,
}

impl LabelBitmap {
    /// Renders `text` for `style`, with a gradient from `color` at the top to white.
    #[must_use]
    pub fn render(text: &str, color: Color, style: &LabelStyle) -> Self {
        let atlas = GlyphAtlas::builtin();
        let width = style.width.max(1) * RESOLUTION_SCALE;
        let height = style.height.max(1) * RESOLUTION_SCALE;
        let glyphs: Vec<Glyph> = text.trim().chars().map(|ch| atlas.glyph(ch)).collect();

        let mut bitmap = Self {
            text: text.trim().to_string(),
            width,
            height,
            font_px: 0.0,
            coverage: vec![0; (width * height) as usize],
            top_color: color,
            bottom_color: Color::WHITE,
            quad_size: [style.scale, style.scale * style.aspect],
            glyphs: Vec::with_capacity(glyphs.len()),
        };
        if glyphs.is_empty() {
            return bitmap;
        }

        let padding = f64::from(width) * 0.04;
        let units_wide = (glyphs.len() * ADVANCE - 1) as f64;
        let requested = f64::from(style.font_px * RESOLUTION_SCALE) / CELL_ROWS as f64;
        let fit_width = (f64::from(width) - 2.0 * padding) / units_wide;
        let fit_height = f64::from(height) / CELL_ROWS as f64;
        let unit = requested.min(fit_width).min(fit_height).max(0.0);
        bitmap.font_px = unit * CELL_ROWS as f64;

        let origin_x = (f64::from(width) - units_wide * unit) * 0.5;
        let origin_y = (f64::from(height) - CELL_ROWS as f64 * unit) * 0.5;

        for (i, glyph) in glyphs.iter().enumerate() {
            let x = origin_x + (i * ADVANCE) as f64 * unit;
            let rows = atlas.cell(glyph);
            bitmap.glyphs.push(GlyphPlacement {
                codepoint: glyph.codepoint,
                x,
                y: origin_y,
                width: GLYPH_COLUMNS as f64 * unit,
                height: CELL_ROWS as f64 * unit,
                uv: glyph.uv,
            });
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_COLUMNS {
                    if bits & (1 << (GLYPH_COLUMNS - 1 - col)) != 0 {
                        let x0 = x + col as f64 * unit;
                        let y0 = origin_y + row as f64 * unit;
                        bitmap.fill(x0, y0, x0 + unit, y0 + unit);
                    }
                }
            }
        }

        bitmap
    }

    /// Adds the area of `[x0, x1) x [y0, y1)` covering each pixel.
    fn fill(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        let px_start = x0.floor().max(0.0) as u32;
        let px_end = (x1.ceil() as u32).min(self.width);
        let py_start = y0.floor().max(0.0) as u32;
        let py_end = (y1.ceil() as u32).min(self.height);

        for py in py_start..py_end {
            let cover_y = overlap(y0, y1, f64::from(py));
            for px in px_start..px_end {
                let cover = overlap(x0, x1, f64::from(px)) * cover_y;
                let index = (py * self.width + px) as usize;
                let value = f64::from(self.coverage[index]) + cover * 255.0;
                self.coverage[index] = value.round().min(255.0) as u8;
            }
        }
    }

    #[must_use]
    pub fn coverage_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.coverage[(y * self.width + x) as usize]
    }

    /// Number of pixels with any ink.
    #[must_use]
    pub fn inked_pixels(&self) -> usize {
        self.coverage.iter().filter(|&&c| c > 0).count()
    }

    /// Gradient color of bitmap row `y`.
    #[must_use]
    pub fn row_color(&self, y: u32) -> Color {
        let t = if self.height > 1 {
            f64::from(y) / f64::from(self.height - 1)
        } else {
            0.0
        };
        self.top_color.lerp(self.bottom_color, t)
    }

    /// Straight-alpha RGBA8 texture data, row-major from the top.
    #[must_use]
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.coverage.len() * 4);
        for y in 0..self.height {
            let color = self.row_color(y);
            let [r, g, b] = color.to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
            for x in 0..self.width {
                out.extend_from_slice(&[r, g, b, self.coverage_at(x, y)]);
            }
        }
        out
    }
}

fn overlap(a0: f64, a1: f64, pixel: f64) -> f64 {
    (a1.min(pixel + 1.0) - a0.max(pixel)).clamp(0.0, 1.0)
}
