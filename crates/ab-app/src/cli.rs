use std::path::PathBuf;

use ab_core::config::EffectConfig;
use clap::Parser;

/// backscii : fond animé ASCII à partir d'une vidéo en boucle.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Flux à convertir : chemin ou URL (vidéo, GIF, image fixe).
    #[arg(long)]
    pub stream: Option<String>,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Charger un preset nommé de config/presets/ (ignore --config).
    #[arg(long)]
    pub preset: Option<String>,

    /// Taille de la grille de glyphes, ex. 120x50.
    #[arg(long, value_parser = parse_grid)]
    pub grid: Option<(u16, u16)>,

    /// Ramp de glyphes, du plus clair au plus dense, ou un preset :
    /// compact, standard, blocks, minimal.
    #[arg(long)]
    pub ramp: Option<String>,

    /// Délai (ms) avant bascule sur le générateur procédural.
    #[arg(long)]
    pub fallback_timeout_ms: Option<u64>,

    /// FPS cible.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Ignorer le flux et démarrer directement sur le générateur procédural.
    #[arg(long, default_value_t = false)]
    pub force_fallback: bool,

    /// Afficher l'overlay FPS / mode.
    #[arg(long, default_value_t = false)]
    pub show_fps: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded config, then clamp.
    ///
    /// # Example
    /// ```
    /// use ab_app::cli::Cli;
    /// use ab_core::config::EffectConfig;
    /// use clap::Parser;
    ///
    /// let cli = Cli::parse_from(["backscii", "--grid", "80x24", "--fps", "500"]);
    /// let mut config = EffectConfig::default();
    /// cli.apply_overrides(&mut config);
    /// assert_eq!((config.grid_width, config.grid_height), (80, 24));
    /// assert_eq!(config.target_fps, 120);
    /// ```
    pub fn apply_overrides(&self, config: &mut EffectConfig) {
        if let Some(ref stream) = self.stream {
            config.stream_uri.clone_from(stream);
        }
        if let Some((w, h)) = self.grid {
            config.grid_width = w;
            config.grid_height = h;
        }
        if let Some(ref ramp) = self.ramp {
            config.glyph_ramp.clone_from(ramp);
        }
        if let Some(ms) = self.fallback_timeout_ms {
            config.fallback_timeout_ms = ms;
        }
        if let Some(fps) = self.fps {
            config.target_fps = fps;
        }
        config.clamp_all();
    }
}

/// Parse `WxH` (also accepts `W×H` and `W*H`).
///
/// # Errors
/// Returns a message if the value is not two positive integers.
pub fn parse_grid(value: &str) -> Result<(u16, u16), String> {
    let (w, h) = value
        .split_once(['x', 'X', '×', '*'])
        .ok_or_else(|| format!("format attendu LARGEURxHAUTEUR, reçu '{value}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<u16>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("dimension invalide '{s}'"))
    };
    Ok((parse(w)?, parse(h)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_parsing() {
        assert_eq!(parse_grid("120x50"), Ok((120, 50)));
        assert_eq!(parse_grid("80×24"), Ok((80, 24)));
        assert_eq!(parse_grid(" 3 * 2 "), Ok((3, 2)));
        assert!(parse_grid("120").is_err());
        assert!(parse_grid("0x5").is_err());
        assert!(parse_grid("ax5").is_err());
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["backscii"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
        assert_eq!(cli.log_level, "warn");
        assert!(!cli.force_fallback && !cli.show_fps);
        let mut config = EffectConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, EffectConfig::default());
    }

    #[test]
    fn overrides_are_clamped() {
        let cli = Cli::try_parse_from([
            "backscii",
            "--stream",
            "loop.gif",
            "--ramp",
            "#",
            "--fallback-timeout-ms",
            "900000",
        ])
        .unwrap();
        let mut config = EffectConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.stream_uri, "loop.gif");
        assert_eq!(config.glyph_ramp, EffectConfig::default().glyph_ramp);
        assert_eq!(config.fallback_timeout_ms, 60_000);
    }

    #[test]
    fn ramp_accepts_preset_names() {
        let cli = Cli::try_parse_from(["backscii", "--ramp", "blocks"]).unwrap();
        let mut config = EffectConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.glyph_ramp, " ░▒▓█");
    }

    #[test]
    fn bad_grid_is_rejected_by_clap() {
        assert!(Cli::try_parse_from(["backscii", "--grid", "wide"]).is_err());
    }
}
