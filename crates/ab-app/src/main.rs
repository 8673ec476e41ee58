use std::path::PathBuf;
use std::sync::Arc;

use ab_app::{app, cli, hotreload};
use ab_core::config::EffectConfig;
use anyhow::Result;
use arc_swap::ArcSwap;
use clap::Parser;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config, puis les overrides CLI
    let (config_path, mut config) = resolve_config(&cli)?;
    cli.apply_overrides(&mut config);
    let config = Arc::new(ArcSwap::from_pointee(config));

    // 4. Hot-reload (les overrides CLI restent prioritaires)
    let _watcher = match config_path {
        Some(ref path) => {
            let overrides = cli.clone();
            Some(hotreload::spawn_config_watcher(path, &config, move |c| {
                overrides.apply_overrides(c);
            })?)
        }
        None => None,
    };

    // 5. Terminal + session
    let mut app_instance = app::App::new(config, cli.force_fallback, cli.show_fps);
    let terminal = ratatui::init();
    let result = app_instance.run(terminal);

    // 6. Restaurer le terminal (TOUJOURS, même en cas d'erreur)
    app_instance.shutdown();
    ratatui::restore();

    result
}

/// Resolve config: preset takes priority over --config.
///
/// Returns the file actually loaded (to watch), if any.
fn resolve_config(cli: &cli::Cli) -> Result<(Option<PathBuf>, EffectConfig)> {
    if let Some(ref name) = cli.preset {
        let path = PathBuf::from(format!("config/presets/{name}.toml"));
        if path.exists() {
            let config = ab_core::config::load_config(&path)?;
            Ok((Some(path), config))
        } else {
            anyhow::bail!("Preset inconnu : {name}. Voir config/presets/ (ex: calm, dense_blocks)");
        }
    } else if cli.config.exists() {
        let config = ab_core::config::load_config(&cli.config)?;
        Ok((Some(cli.config.clone()), config))
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok((None, EffectConfig::default()))
    }
}
