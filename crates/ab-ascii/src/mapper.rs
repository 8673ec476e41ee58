use ab_core::charset::GlyphRamp;
use ab_core::frame::{BrightnessField, GlyphGrid, SampleGrid};

use crate::luminance::{brightness_field, luminance};

/// Map a sample grid to glyphs: luminance, then `floor(l × (N − 1))` into the ramp.
///
/// Pure and deterministic; the output has the grid's exact dimensions.
///
/// # Example
/// ```
/// use ab_core::charset::GlyphRamp;
/// use ab_core::frame::SampleGrid;
/// use ab_ascii::mapper::map;
///
/// let ramp = GlyphRamp::new(" .#").unwrap();
/// let grid = SampleGrid::from_pixels(2, 1, vec![(0, 0, 0), (255, 255, 255)]).unwrap();
/// let glyphs = map(&grid, &ramp);
/// assert_eq!(glyphs.to_text(), " #\n");
/// ```
#[must_use]
pub fn map(grid: &SampleGrid, ramp: &GlyphRamp) -> GlyphGrid {
    GlyphGrid::from_fn(grid.width(), grid.height(), |x, y| {
        let (r, g, b) = grid.pixel(x, y);
        ramp.glyph_for(luminance(r, g, b))
    })
}

/// Same as [`map`] with luminance inverted (`1 − l`) when `invert` is set.
#[must_use]
pub fn map_with(grid: &SampleGrid, ramp: &GlyphRamp, invert: bool) -> GlyphGrid {
    if invert {
        map_field(&brightness_field(grid, true), ramp)
    } else {
        map(grid, ramp)
    }
}

/// Map a brightness field (already in [0, 1]) to glyphs.
///
/// Used by the procedural generator so that it shares the exact glyph
/// selection of the video path.
///
/// # Example
/// ```
/// use ab_core::charset::GlyphRamp;
/// use ab_core::frame::BrightnessField;
/// use ab_ascii::mapper::map_field;
///
/// let ramp = GlyphRamp::new(" .#").unwrap();
/// let field = BrightnessField::from_values(2, 1, vec![0.0, 1.0]).unwrap();
/// assert_eq!(map_field(&field, &ramp).row(0), " #");
/// ```
#[must_use]
pub fn map_field(field: &BrightnessField, ramp: &GlyphRamp) -> GlyphGrid {
    GlyphGrid::from_fn(field.width(), field.height(), |x, y| {
        ramp.glyph_for(field.get(x, y))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u16, height: u16) -> SampleGrid {
        let n = usize::from(width) * usize::from(height);
        let pixels = (0..n)
            .map(|i| {
                let v = (i * 255 / n.saturating_sub(1).max(1)) as u8;
                (v, v, v)
            })
            .collect();
        SampleGrid::from_pixels(width, height, pixels).unwrap()
    }

    #[test]
    fn output_has_grid_dimensions() {
        let ramp = GlyphRamp::default();
        for &(w, h) in &[(1, 1), (2, 1), (120, 50), (7, 13), (1, 40)] {
            let glyphs = map(&gradient(w, h), &ramp);
            assert_eq!(glyphs.height(), h);
            assert_eq!(glyphs.rows().count(), usize::from(h));
            assert!(glyphs.rows().all(|r| r.len() == usize::from(w)));
            let text = glyphs.to_text();
            assert_eq!(text.chars().count(), usize::from(w) * usize::from(h) + usize::from(h));
        }
    }

    #[test]
    fn two_cell_scenario() {
        let ramp = GlyphRamp::new(" .#").unwrap();
        let field = BrightnessField::from_values(2, 1, vec![0.0, 1.0]).unwrap();
        let glyphs = map_field(&field, &ramp);
        assert_eq!(glyphs.rows().count(), 1);
        assert_eq!(glyphs.get(0, 0), ' ');
        assert_eq!(glyphs.get(1, 0), '#');
        assert_eq!(glyphs.row(0), " #");
    }

    #[test]
    fn pixel_and_field_paths_agree() {
        let ramp = GlyphRamp::default();
        let grid = gradient(16, 4);
        assert_eq!(map(&grid, &ramp), map_field(&brightness_field(&grid, false), &ramp));
    }

    #[test]
    fn invert_flips_extremes() {
        let ramp = GlyphRamp::new(" .#").unwrap();
        let grid = SampleGrid::from_pixels(2, 1, vec![(0, 0, 0), (255, 255, 255)]).unwrap();
        assert_eq!(map_with(&grid, &ramp, true).row(0), "# ");
        assert_eq!(map_with(&grid, &ramp, false).row(0), " #");
    }

    #[test]
    fn mapping_is_deterministic() {
        let ramp = GlyphRamp::default();
        let grid = gradient(40, 10);
        assert_eq!(map(&grid, &ramp), map(&grid, &ramp));
    }
}
