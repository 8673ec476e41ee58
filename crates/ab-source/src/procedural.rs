use ab_core::config::FallbackConfig;
use ab_core::frame::BrightnessField;

/// Générateur procédural de secours : deux ondes croisées modulées par une
/// perturbation déterministe par cellule.
///
/// Pure function of `(tick, x, y)`: no randomness, no state between calls.
///
/// ```text
/// t          = tick · time_step
/// wave1      = sin((x + y + t) · wave1_freq)
/// wave2      = cos((x − y + wave2_phase · t) · wave2_freq)
/// noise      = (sin(x · noise_x + y · noise_y + t) + 1) / 2
/// brightness = clamp(((wave1 + wave2) / 2 + 1) / 2 · noise, 0, 1)
/// ```
///
/// # Example
/// ```
/// use ab_source::procedural::FallbackGenerator;
/// let generator = FallbackGenerator::default();
/// let field = generator.generate(0, 120, 50);
/// assert_eq!((field.width(), field.height()), (120, 50));
/// assert_eq!(field, generator.generate(0, 120, 50));
/// ```
#[derive(Clone, Debug, Default)]
pub struct FallbackGenerator {
    params: FallbackConfig,
}

impl FallbackGenerator {
    /// Create a generator with the given wave constants.
    #[must_use]
    pub fn new(params: FallbackConfig) -> Self {
        Self { params }
    }

    /// Luminosité de la cellule (x, y) au tick donné, dans [0, 1].
    #[must_use]
    pub fn brightness(&self, tick: u64, x: u16, y: u16) -> f32 {
        let p = &self.params;
        // f64 : le terme de bruit multiplie x par ~10³, la précision f32 ne suffit pas.
        let t = tick as f64 * p.time_step;
        let (x, y) = (f64::from(x), f64::from(y));

        let wave1 = ((x + y + t) * p.wave1_freq).sin();
        let wave2 = ((x - y + p.wave2_phase * t) * p.wave2_freq).cos();
        let combined = (wave1 + wave2) / 2.0;
        let noise = ((x * p.noise_x + y * p.noise_y + t).sin() + 1.0) / 2.0;

        (((combined + 1.0) / 2.0 * noise) as f32).clamp(0.0, 1.0)
    }

    /// Champ complet W×H pour un tick.
    #[must_use]
    pub fn generate(&self, tick: u64, width: u16, height: u16) -> BrightnessField {
        BrightnessField::from_fn(width, height, |x, y| self.brightness(tick, x, y))
    }
}

/// Shortcut for [`FallbackGenerator::generate`] with the default constants.
#[must_use]
pub fn generate(tick: u64, width: u16, height: u16) -> BrightnessField {
    FallbackGenerator::default().generate(tick, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tick_same_field() {
        let a = FallbackGenerator::default();
        let b = FallbackGenerator::new(FallbackConfig::default());
        for tick in [0, 1, 17, 10_000] {
            assert_eq!(a.generate(tick, 40, 12), b.generate(tick, 40, 12));
        }
    }

    #[test]
    fn field_has_requested_dimensions() {
        for &(w, h) in &[(1, 1), (120, 50), (3, 200)] {
            let field = generate(5, w, h);
            assert_eq!((field.width(), field.height()), (w, h));
            assert_eq!(field.values().len(), usize::from(w) * usize::from(h));
        }
    }

    #[test]
    fn values_stay_in_unit_range() {
        let generator = FallbackGenerator::default();
        for tick in (0..2_000).step_by(97) {
            let field = generator.generate(tick, 60, 20);
            assert!(field.values().iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn origin_at_tick_zero() {
        // wave1 = sin 0 = 0, wave2 = cos 0 = 1, noise = (sin 0 + 1) / 2 = 0.5
        let v = FallbackGenerator::default().brightness(0, 0, 0);
        assert!((v - 0.375).abs() < 1e-6);
    }

    #[test]
    fn field_moves_over_time() {
        let generator = FallbackGenerator::default();
        assert_ne!(generator.generate(0, 30, 10), generator.generate(1, 30, 10));
    }

    #[test]
    fn field_is_not_flat() {
        let field = generate(3, 40, 20);
        let min = field.values().iter().copied().fold(f32::MAX, f32::min);
        let max = field.values().iter().copied().fold(f32::MIN, f32::max);
        assert!(max - min > 0.3);
    }
}
