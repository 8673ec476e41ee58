use std::path::Path;
use std::sync::Arc;

use ab_core::config::EffectConfig;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Recharge `path` dans `config`, en réappliquant `overrides`.
///
/// On error the previous config is kept.
///
/// # Errors
/// Returns the load error (missing file, bad TOML).
pub fn reload_into(
    path: &Path,
    config: &ArcSwap<EffectConfig>,
    overrides: &dyn Fn(&mut EffectConfig),
) -> Result<()> {
    let mut new_config = ab_core::config::load_config(path)?;
    overrides(&mut new_config);
    config.store(Arc::new(new_config));
    log::info!("Config rechargée depuis {}", path.display());
    Ok(())
}

/// Lance un watcher qui surveille le fichier config et met à jour l'ArcSwap.
///
/// `overrides` is reapplied after every reload so command-line flags keep
/// winning over the file. Retourne le Watcher (doit rester vivant tant que
/// l'app tourne).
///
/// # Errors
/// Returns an error if the watcher cannot be created or the path cannot be watched.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use arc_swap::ArcSwap;
/// use ab_core::config::EffectConfig;
/// use ab_app::hotreload::spawn_config_watcher;
/// use std::path::Path;
///
/// let config = Arc::new(ArcSwap::from_pointee(EffectConfig::default()));
/// let _watcher = spawn_config_watcher(Path::new("config/default.toml"), &config, |_| {});
/// ```
pub fn spawn_config_watcher(
    config_path: &Path,
    config: &Arc<ArcSwap<EffectConfig>>,
    overrides: impl Fn(&mut EffectConfig) + Send + 'static,
) -> Result<RecommendedWatcher> {
    let config = Arc::clone(config);
    let path = config_path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res
            && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
            && let Err(e) = reload_into(&path, &config, &overrides)
        {
            // On garde l'ancienne config. Pas de panic.
            log::warn!("Erreur de rechargement config : {e:#}");
        }
    })
    .context("Impossible de créer le watcher de config")?;

    watcher
        .watch(config_path, RecursiveMode::NonRecursive)
        .with_context(|| format!("Impossible de surveiller {}", config_path.display()))?;
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reload_applies_file_then_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[effect]\ngrid_width = 64\ngrid_height = 20").unwrap();
        let config = ArcSwap::from_pointee(EffectConfig::default());

        reload_into(file.path(), &config, &|c: &mut EffectConfig| c.grid_height = 10).unwrap();
        let loaded = config.load();
        assert_eq!((loaded.grid_width, loaded.grid_height), (64, 10));
    }

    #[test]
    fn broken_file_keeps_previous_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[effect\ngrid_width = ").unwrap();
        let config = ArcSwap::from_pointee(EffectConfig::default());
        let before = config.load_full();

        assert!(reload_into(file.path(), &config, &|_: &mut EffectConfig| {}).is_err());
        assert!(Arc::ptr_eq(&before, &config.load_full()));
    }
}
