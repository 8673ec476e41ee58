use crate::error::CoreError;

/// 10 caractères, compact, bon contraste. Ramp par défaut de l'effet.
pub const CHARSET_COMPACT: &str = " .:-=+*#%@";

/// 70 caractères, Paul Bourke extended, bon équilibre.
pub const CHARSET_STANDARD: &str =
    " .'`^\",:;Il!i><~+_-?][}{1)(|/tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@$";

/// Blocs Unicode, pseudo-pixels.
pub const CHARSET_BLOCKS: &str = " ░▒▓█";

/// Minimal, haut contraste.
pub const CHARSET_MINIMAL: &str = " .:#";

/// Ordered glyphs from sparsest (darkest) to densest (brightest).
///
/// Immutable once built; the same ramp is used for every mapping call of a
/// session.
///
/// # Example
/// ```
/// use ab_core::charset::GlyphRamp;
/// let ramp = GlyphRamp::new(" .#").unwrap();
/// assert_eq!(ramp.len(), 3);
/// assert_eq!(ramp.glyph_for(0.0), ' ');
/// assert_eq!(ramp.glyph_for(1.0), '#');
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphRamp {
    glyphs: Vec<char>,
}

impl GlyphRamp {
    /// Build a ramp from a string ordered lightest→densest.
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the ramp has fewer than 2 characters,
    /// or contains a line break (which would break row alignment).
    pub fn new(chars: &str) -> Result<Self, CoreError> {
        let glyphs: Vec<char> = chars.chars().collect();
        if glyphs.len() < 2 {
            return Err(CoreError::Config(format!(
                "glyph_ramp doit contenir au moins 2 caractères (reçu {chars:?})"
            )));
        }
        if glyphs.iter().any(|&c| c == '\n' || c == '\r') {
            return Err(CoreError::Config(
                "glyph_ramp ne peut pas contenir de saut de ligne".into(),
            ));
        }
        Ok(Self { glyphs })
    }

    /// Number of glyphs (N).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false: a ramp holds at least two glyphs.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Glyph at `index`, clamped to the last glyph.
    #[inline(always)]
    #[must_use]
    pub fn glyph(&self, index: usize) -> char {
        self.glyphs[index.min(self.glyphs.len() - 1)]
    }

    /// Glyph for a brightness value in [0, 1].
    ///
    /// # Example
    /// ```
    /// use ab_core::charset::GlyphRamp;
    /// let ramp = GlyphRamp::new(" .:-=+*#%@").unwrap();
    /// assert_eq!(ramp.glyph_for(0.5), '=');
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn glyph_for(&self, brightness: f32) -> char {
        self.glyph(glyph_index(brightness, self.glyphs.len()))
    }

}

impl Default for GlyphRamp {
    fn default() -> Self {
        Self {
            glyphs: CHARSET_COMPACT.chars().collect(),
        }
    }
}

/// Characters of a named ramp preset, case-insensitive.
///
/// # Example
/// ```
/// use ab_core::charset::{named_ramp, CHARSET_MINIMAL};
/// assert_eq!(named_ramp("minimal"), Some(CHARSET_MINIMAL));
/// assert_eq!(named_ramp(" .#"), None);
/// ```
#[must_use]
pub fn named_ramp(name: &str) -> Option<&'static str> {
    match name.trim().to_ascii_lowercase().as_str() {
        "compact" => Some(CHARSET_COMPACT),
        "standard" => Some(CHARSET_STANDARD),
        "blocks" => Some(CHARSET_BLOCKS),
        "minimal" => Some(CHARSET_MINIMAL),
        _ => None,
    }
}

/// `floor(brightness × (n − 1))`, clamped to `[0, n − 1]`.
///
/// Brightness 1.0 exactly lands on the last glyph; NaN lands on the first.
///
/// # Example
/// ```
/// use ab_core::charset::glyph_index;
/// assert_eq!(glyph_index(0.0, 10), 0);
/// assert_eq!(glyph_index(1.0, 10), 9);
/// assert_eq!(glyph_index(1.5, 10), 9);
/// ```
#[inline(always)]
#[must_use]
pub fn glyph_index(brightness: f32, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let max = n - 1;
    if brightness.is_nan() {
        return 0;
    }
    if brightness.is_infinite() {
        return if brightness > 0.0 { max } else { 0 };
    }
    // `as usize` saturates negatives to 0.
    ((brightness * max as f32).floor() as usize).min(max)
}
