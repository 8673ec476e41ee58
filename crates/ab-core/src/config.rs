use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::charset::{CHARSET_COMPACT, GlyphRamp, named_ramp};

/// Stream utilisé si aucun n'est fourni.
pub const DEFAULT_STREAM_URI: &str = "assets/landing/landing1.mp4";

/// Configuration complète de l'effet, hot-rechargeable.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use ab_core::config::EffectConfig;
/// let config = EffectConfig::default();
/// assert_eq!((config.grid_width, config.grid_height), (120, 50));
/// assert_eq!(config.fallback_timeout_ms, 2000);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct EffectConfig {
    // === Grille ===
    /// Colonnes de la grille ASCII (constante quelle que soit la taille du viewport).
    pub grid_width: u16,
    /// Lignes de la grille ASCII.
    pub grid_height: u16,
    /// Ramp du plus clair au plus dense, ou un nom de preset
    /// (`compact`, `standard`, `blocks`, `minimal`).
    pub glyph_ramp: String,
    /// Inverser la luminance (pour fond clair).
    pub invert: bool,
    /// Filtre de rééchantillonnage.
    pub sample_filter: SampleFilter,

    // === Flux ===
    /// URI ou chemin du flux vidéo/image.
    pub stream_uri: String,
    /// Délai maximal avant bascule sur le générateur procédural.
    pub fallback_timeout_ms: u64,
    /// Nombre de relances de lecture autorisées après une pause subie.
    pub autoplay_retries: u32,

    // === Performance ===
    /// FPS cible de la boucle de rendu.
    pub target_fps: u32,

    // === Générateur procédural ===
    pub fallback: FallbackConfig,
}

/// Resampling filter used by the sampler.
///
/// # Example
/// ```
/// use ab_core::config::SampleFilter;
/// assert_eq!(SampleFilter::default(), SampleFilter::Area);
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum SampleFilter {
    /// Nearest neighbour: sharp, aliasing on downscale.
    Nearest,
    /// Box average over the covered source area.
    #[default]
    Area,
}

/// Constantes du champ procédural (ondes + bruit).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct FallbackConfig {
    /// Temps ajouté par tick.
    pub time_step: f64,
    /// Fréquence de l'onde diagonale `sin((x + y + t) · f)`.
    pub wave1_freq: f64,
    /// Fréquence de l'onde anti-diagonale `cos((x − y + p·t) · f)`.
    pub wave2_freq: f64,
    /// Vitesse de phase relative de la seconde onde.
    pub wave2_phase: f64,
    /// Poids de x dans la perturbation par cellule.
    pub noise_x: f64,
    /// Poids de y dans la perturbation par cellule.
    pub noise_y: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            time_step: 0.1,
            wave1_freq: 0.3,
            wave2_freq: 0.2,
            wave2_phase: 0.7,
            noise_x: 1234.5,
            noise_y: 5678.9,
        }
    }
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            grid_width: 120,
            grid_height: 50,
            glyph_ramp: CHARSET_COMPACT.to_string(),
            invert: false,
            sample_filter: SampleFilter::Area,
            stream_uri: DEFAULT_STREAM_URI.to_string(),
            fallback_timeout_ms: 2000,
            autoplay_retries: 1,
            target_fps: 30,
            fallback: FallbackConfig::default(),
        }
    }
}

impl EffectConfig {
    /// Clamp all numeric fields to their valid ranges and repair the ramp.
    /// Called after TOML deserialization to prevent out-of-range values.
    ///
    /// A ramp given by preset name is expanded to its characters.
    ///
    /// # Example
    /// ```
    /// use ab_core::config::EffectConfig;
    /// let mut config = EffectConfig::default();
    /// config.glyph_ramp = "minimal".into();
    /// config.clamp_all();
    /// assert_eq!(config.glyph_ramp, " .:#");
    /// ```
    pub fn clamp_all(&mut self) {
        self.grid_width = self.grid_width.clamp(1, 1000);
        self.grid_height = self.grid_height.clamp(1, 1000);
        self.fallback_timeout_ms = self.fallback_timeout_ms.min(60_000);
        self.autoplay_retries = self.autoplay_retries.min(10);
        self.target_fps = self.target_fps.clamp(15, 120);
        if let Some(chars) = named_ramp(&self.glyph_ramp) {
            self.glyph_ramp = chars.to_string();
        }
        if let Err(e) = GlyphRamp::new(&self.glyph_ramp) {
            log::warn!("{e}: ramp par défaut utilisée");
            self.glyph_ramp = CHARSET_COMPACT.to_string();
        }
        if self.stream_uri.trim().is_empty() {
            self.stream_uri = DEFAULT_STREAM_URI.to_string();
        }
        let f = &mut self.fallback;
        if !(f.time_step.is_finite() && f.time_step > 0.0) {
            f.time_step = FallbackConfig::default().time_step;
        }
    }

    /// The configured ramp, or the default one if it is invalid.
    ///
    /// # Example
    /// ```
    /// use ab_core::config::EffectConfig;
    /// let mut config = EffectConfig::default();
    /// config.glyph_ramp = "x".into();
    /// assert_eq!(config.ramp().len(), 10);
    /// ```
    #[must_use]
    pub fn ramp(&self) -> GlyphRamp {
        GlyphRamp::new(&self.glyph_ramp).unwrap_or_default()
    }

    /// Bounded wait before the fallback generator takes over.
    #[must_use]
    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    /// Frame period derived from `target_fps`.
    #[must_use]
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps.max(1)))
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    effect: Option<EffectSection>,
    fallback: Option<FallbackSection>,
}

/// Effect section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct EffectSection {
    grid_width: Option<u16>,
    grid_height: Option<u16>,
    glyph_ramp: Option<String>,
    invert: Option<bool>,
    sample_filter: Option<SampleFilter>,
    stream_uri: Option<String>,
    fallback_timeout_ms: Option<u64>,
    autoplay_retries: Option<u32>,
    target_fps: Option<u32>,
}

/// Fallback section of the TOML config, all fields optional.
#[derive(Deserialize)]
struct FallbackSection {
    time_step: Option<f64>,
    wave1_freq: Option<f64>,
    wave2_freq: Option<f64>,
    wave2_phase: Option<f64>,
    noise_x: Option<f64>,
    noise_y: Option<f64>,
}

/// Parse a TOML document and merge it over the defaults.
///
/// # Errors
/// Returns an error if the document is not valid TOML for this schema.
///
/// # Example
/// ```
/// use ab_core::config::parse_config;
/// let config = parse_config("[effect]\ngrid_width = 80\n").unwrap();
/// assert_eq!(config.grid_width, 80);
/// assert_eq!(config.grid_height, 50);
/// ```
pub fn parse_config(content: &str) -> Result<EffectConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;

    let mut config = EffectConfig::default();

    if let Some(e) = file.effect {
        if let Some(v) = e.grid_width {
            config.grid_width = v;
        }
        if let Some(v) = e.grid_height {
            config.grid_height = v;
        }
        if let Some(v) = e.glyph_ramp {
            config.glyph_ramp = v;
        }
        if let Some(v) = e.invert {
            config.invert = v;
        }
        if let Some(v) = e.sample_filter {
            config.sample_filter = v;
        }
        if let Some(v) = e.stream_uri {
            config.stream_uri = v;
        }
        if let Some(v) = e.fallback_timeout_ms {
            config.fallback_timeout_ms = v;
        }
        if let Some(v) = e.autoplay_retries {
            config.autoplay_retries = v;
        }
        if let Some(v) = e.target_fps {
            config.target_fps = v;
        }
    }

    if let Some(f) = file.fallback {
        if let Some(v) = f.time_step {
            config.fallback.time_step = v;
        }
        if let Some(v) = f.wave1_freq {
            config.fallback.wave1_freq = v;
        }
        if let Some(v) = f.wave2_freq {
            config.fallback.wave2_freq = v;
        }
        if let Some(v) = f.wave2_phase {
            config.fallback.wave2_phase = v;
        }
        if let Some(v) = f.noise_x {
            config.fallback.noise_x = v;
        }
        if let Some(v) = f.noise_y {
            config.fallback.noise_y = v;
        }
    }

    config.clamp_all();
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use ab_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<EffectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Config invalide : {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, EffectConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = parse_config(
            r#"
            [effect]
            glyph_ramp = " .#"
            sample_filter = "Nearest"

            [fallback]
            time_step = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(config.glyph_ramp, " .#");
        assert_eq!(config.sample_filter, SampleFilter::Nearest);
        assert!((config.fallback.time_step - 0.05).abs() < f64::EPSILON);
        assert!((config.fallback.wave1_freq - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.grid_width, 120);
        assert_eq!(config.fallback_timeout_ms, 2000);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = parse_config(
            r#"
            [effect]
            grid_width = 0
            grid_height = 5000
            fallback_timeout_ms = 999999
            target_fps = 1
            autoplay_retries = 50
            glyph_ramp = "@"
            stream_uri = "  "
            "#,
        )
        .unwrap();
        assert_eq!(config.grid_width, 1);
        assert_eq!(config.grid_height, 1000);
        assert_eq!(config.fallback_timeout_ms, 60_000);
        assert_eq!(config.target_fps, 15);
        assert_eq!(config.autoplay_retries, 10);
        assert_eq!(config.glyph_ramp, CHARSET_COMPACT);
        assert_eq!(config.stream_uri, DEFAULT_STREAM_URI);
    }

    #[test]
    fn ramp_presets_are_expanded_by_name() {
        let config = parse_config("[effect]\nglyph_ramp = \"blocks\"\n").unwrap();
        assert_eq!(config.glyph_ramp, crate::charset::CHARSET_BLOCKS);
        let config = parse_config("[effect]\nglyph_ramp = \"Standard\"\n").unwrap();
        assert_eq!(config.ramp().len(), 70);
        // Une ramp littérale reste telle quelle.
        let config = parse_config("[effect]\nglyph_ramp = \" -#\"\n").unwrap();
        assert_eq!(config.glyph_ramp, " -#");
    }

    #[test]
    fn fallback_constants_keep_double_precision() {
        let config = parse_config("[fallback]\nnoise_y = 5678.9\n").unwrap();
        assert_eq!(config.fallback.noise_y.to_bits(), 5678.9_f64.to_bits());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(parse_config("[effect\ngrid_width = 3").is_err());
        assert!(parse_config("[effect]\ngrid_width = \"wide\"").is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[effect]\ngrid_height = 24\ninvert = true").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.grid_height, 24);
        assert!(config.invert);
    }

    #[test]
    fn load_config_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn shipped_files_parse() {
        let default = parse_config(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(default, EffectConfig::default());
        for preset in [
            include_str!("../../../config/presets/calm.toml"),
            include_str!("../../../config/presets/dense_blocks.toml"),
        ] {
            let config = parse_config(preset).unwrap();
            assert!(GlyphRamp::new(&config.glyph_ramp).is_ok());
            assert!(named_ramp(&config.glyph_ramp).is_none());
        }
    }
}
