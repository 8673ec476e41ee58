use ab_core::frame::{BrightnessField, SampleGrid};

/// Poids perceptuels BT.601 (R, G, B), en millièmes.
pub const LUMA_WEIGHTS: (u32, u32, u32) = (299, 587, 114);

/// Luminance perceptuelle normalisée dans [0, 1].
///
/// Calculée en entiers : le blanc pur donne exactement 1.0.
///
/// # Example
/// ```
/// use ab_ascii::luminance::luminance;
/// assert_eq!(luminance(0, 0, 0), 0.0);
/// assert_eq!(luminance(255, 255, 255), 1.0);
/// ```
#[inline(always)]
#[must_use]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    let (wr, wg, wb) = LUMA_WEIGHTS;
    let weighted = wr * u32::from(r) + wg * u32::from(g) + wb * u32::from(b);
    weighted as f32 / 255_000.0
}

/// Convert a sample grid into a brightness field, optionally inverted.
///
/// # Example
/// ```
/// use ab_core::frame::SampleGrid;
/// use ab_ascii::luminance::brightness_field;
/// let grid = SampleGrid::from_pixels(2, 1, vec![(0, 0, 0), (255, 255, 255)]).unwrap();
/// assert_eq!(brightness_field(&grid, true).values(), &[1.0, 0.0]);
/// ```
#[must_use]
pub fn brightness_field(grid: &SampleGrid, invert: bool) -> BrightnessField {
    BrightnessField::from_fn(grid.width(), grid.height(), |x, y| {
        let (r, g, b) = grid.pixel(x, y);
        let l = luminance(r, g, b);
        if invert { 1.0 - l } else { l }
    })
}
