use std::fmt::Write as _;

use crate::charset::GlyphRamp;

/// Buffer de pixels décodé par une source. Partagé en `Arc` entre le worker
/// de décodage et la session.
///
/// Stocke les pixels en RGBA row-major, 4 bytes par pixel.
///
/// # Example
/// ```
/// use ab_core::frame::FrameBuffer;
/// let fb = FrameBuffer::new(10, 10);
/// assert_eq!(fb.data.len(), 400);
/// ```
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    /// Pixels RGBA, row-major, 4 bytes par pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Crée un buffer pré-alloué aux dimensions données.
    ///
    /// # Example
    /// ```
    /// use ab_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::new(100, 50);
    /// assert_eq!(fb.width, 100);
    /// assert_eq!(fb.height, 50);
    /// assert_eq!(fb.data.len(), 100 * 50 * 4);
    /// ```
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * 4],
            width,
            height,
        }
    }

    /// Wrap an existing RGBA buffer.
    ///
    /// Returns `None` if `data` does not hold exactly `width × height` pixels.
    #[must_use]
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize * 4).then_some(Self {
            data,
            width,
            height,
        })
    }

    /// True when the buffer has zero area or a length inconsistent with its
    /// dimensions.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.width == 0
            || self.height == 0
            || self.data.len() < self.width as usize * self.height as usize * 4
    }

    /// Accès au pixel (x, y) → (r, g, b, a).
    ///
    /// # Example
    /// ```
    /// use ab_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::new(10, 10);
    /// assert_eq!(fb.pixel(0, 0), (0, 0, 0, 0));
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8, u8) {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if idx + 3 >= self.data.len() {
            return (0, 0, 0, 0);
        }
        (
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        )
    }
}

/// Snapshot W×H des pixels échantillonnés pour un tick. Jamais muté.
///
/// # Example
/// ```
/// use ab_core::frame::SampleGrid;
/// let grid = SampleGrid::from_pixels(2, 1, vec![(0, 0, 0), (255, 255, 255)]).unwrap();
/// assert_eq!(grid.pixel(1, 0), (255, 255, 255));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleGrid {
    pixels: Vec<(u8, u8, u8)>,
    width: u16,
    height: u16,
}

impl SampleGrid {
    /// Build a grid from row-major RGB triples.
    ///
    /// Returns `None` unless `pixels.len() == width × height`.
    #[must_use]
    pub fn from_pixels(width: u16, height: u16, pixels: Vec<(u8, u8, u8)>) -> Option<Self> {
        (pixels.len() == usize::from(width) * usize::from(height)).then_some(Self {
            pixels,
            width,
            height,
        })
    }

    /// Width in samples.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in samples.
    #[inline]
    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// RGB triple at (x, y).
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u16, y: u16) -> (u8, u8, u8) {
        self.pixels[usize::from(y) * usize::from(self.width) + usize::from(x)]
    }

    /// All triples, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[(u8, u8, u8)] {
        &self.pixels
    }
}

/// Champ de luminosité W×H, valeurs dans [0, 1].
///
/// Entrée commune du mapper : produit à partir d'une `SampleGrid` ou
/// directement par le générateur procédural.
#[derive(Clone, Debug, PartialEq)]
pub struct BrightnessField {
    values: Vec<f32>,
    width: u16,
    height: u16,
}

impl BrightnessField {
    /// Build a field from row-major values. Values are clamped to [0, 1].
    ///
    /// Returns `None` unless `values.len() == width × height`.
    ///
    /// # Example
    /// ```
    /// use ab_core::frame::BrightnessField;
    /// let f = BrightnessField::from_values(2, 1, vec![-1.0, 2.0]).unwrap();
    /// assert_eq!(f.values(), &[0.0, 1.0]);
    /// ```
    #[must_use]
    pub fn from_values(width: u16, height: u16, mut values: Vec<f32>) -> Option<Self> {
        if values.len() != usize::from(width) * usize::from(height) {
            return None;
        }
        for v in &mut values {
            *v = v.clamp(0.0, 1.0);
        }
        Some(Self {
            values,
            width,
            height,
        })
    }

    /// Build a field by evaluating `f(x, y)` for every cell, row-major.
    /// Values are clamped to [0, 1].
    ///
    /// # Example
    /// ```
    /// use ab_core::frame::BrightnessField;
    /// let f = BrightnessField::from_fn(3, 2, |x, _| f32::from(x) / 2.0);
    /// assert_eq!(f.get(2, 1), 1.0);
    /// ```
    #[must_use]
    pub fn from_fn(width: u16, height: u16, mut f: impl FnMut(u16, u16) -> f32) -> Self {
        let mut values = Vec::with_capacity(usize::from(width) * usize::from(height));
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y).clamp(0.0, 1.0));
            }
        }
        Self {
            values,
            width,
            height,
        }
    }

    /// Width in cells.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in cells.
    #[inline]
    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Value at (x, y).
    #[inline(always)]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> f32 {
        self.values[usize::from(y) * usize::from(self.width) + usize::from(x)]
    }

    /// All values, row-major.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Grille de glyphes, seul artefact envoyé à la surface d'affichage.
///
/// Invariant : `height` lignes de `width` caractères.
///
/// # Example
/// ```
/// use ab_core::frame::GlyphGrid;
/// let grid = GlyphGrid::from_glyphs(2, 1, vec![' ', '#']).unwrap();
/// assert_eq!(grid.row(0), " #");
/// assert_eq!(grid.to_text(), " #\n");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphGrid {
    glyphs: Vec<char>,
    width: u16,
    height: u16,
}

impl GlyphGrid {
    /// Build a grid from row-major glyphs.
    ///
    /// Returns `None` unless `glyphs.len() == width × height`.
    #[must_use]
    pub fn from_glyphs(width: u16, height: u16, glyphs: Vec<char>) -> Option<Self> {
        (glyphs.len() == usize::from(width) * usize::from(height)).then_some(Self {
            glyphs,
            width,
            height,
        })
    }

    /// Build a grid by evaluating `f(x, y)` for every cell, row-major.
    #[must_use]
    pub fn from_fn(width: u16, height: u16, mut f: impl FnMut(u16, u16) -> char) -> Self {
        let mut glyphs = Vec::with_capacity(usize::from(width) * usize::from(height));
        for y in 0..height {
            for x in 0..width {
                glyphs.push(f(x, y));
            }
        }
        Self {
            glyphs,
            width,
            height,
        }
    }

    /// Grid filled with the ramp's darkest glyph.
    #[must_use]
    pub fn blank(width: u16, height: u16, ramp: &GlyphRamp) -> Self {
        Self {
            glyphs: vec![ramp.glyph(0); usize::from(width) * usize::from(height)],
            width,
            height,
        }
    }

    /// Width in characters.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in rows.
    #[inline]
    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Glyph at (x, y).
    #[inline(always)]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> char {
        self.glyphs[usize::from(y) * usize::from(self.width) + usize::from(x)]
    }

    /// Row `y` as a string of `width` characters.
    #[must_use]
    pub fn row(&self, y: u16) -> String {
        self.row_slice(y).iter().collect()
    }

    /// Iterator over all rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[char]> {
        // `max(1)` keeps chunks() valid for a zero-width grid (which has no rows anyway).
        self.glyphs.chunks(usize::from(self.width).max(1))
    }

    fn row_slice(&self, y: u16) -> &[char] {
        let w = usize::from(self.width);
        let start = usize::from(y) * w;
        &self.glyphs[start..start + w]
    }

    /// Serialize into `out` (cleared first): every row followed by `'\n'`.
    ///
    /// The result holds `width × height + height` characters.
    pub fn write_text(&self, out: &mut String) {
        out.clear();
        out.reserve(self.glyphs.len() + usize::from(self.height));
        for row in self.rows() {
            out.extend(row.iter());
            let _ = out.write_char('\n');
        }
    }

    /// Serialized text block (allocating). Prefer `write_text` in the tick loop.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_has_one_newline_per_row() {
        let ramp = GlyphRamp::default();
        let grid = GlyphGrid::blank(120, 50, &ramp);
        let text = grid.to_text();
        assert_eq!(text.chars().count(), 120 * 50 + 50);
        assert_eq!(text.lines().count(), 50);
        assert!(text.lines().all(|l| l.chars().count() == 120));
    }

    #[test]
    fn write_text_replaces_previous_content() {
        let grid = GlyphGrid::from_glyphs(2, 2, vec!['a', 'b', 'c', 'd']).unwrap();
        let mut out = String::from("stale");
        grid.write_text(&mut out);
        assert_eq!(out, "ab\ncd\n");
        grid.write_text(&mut out);
        assert_eq!(out, "ab\ncd\n");
    }

    #[test]
    fn constructors_reject_mismatched_lengths() {
        assert!(SampleGrid::from_pixels(2, 2, vec![(0, 0, 0); 3]).is_none());
        assert!(BrightnessField::from_values(3, 1, vec![0.5; 2]).is_none());
        assert!(GlyphGrid::from_glyphs(1, 1, vec![]).is_none());
        assert!(FrameBuffer::from_rgba(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn degenerate_frames() {
        assert!(FrameBuffer::new(0, 10).is_degenerate());
        assert!(FrameBuffer::new(10, 0).is_degenerate());
        assert!(!FrameBuffer::new(1, 1).is_degenerate());
        let truncated = FrameBuffer {
            data: vec![0; 4],
            width: 2,
            height: 2,
        };
        assert!(truncated.is_degenerate());
    }
}
