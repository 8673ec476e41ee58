use thiserror::Error;

/// Errors originating from the effect pipeline.
///
/// None of these are fatal to the host: the session recovers each of them
/// locally (fallback, skipped tick, or no-op render).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The stream never became ready, or its decoder failed.
    #[error("Flux indisponible : {0}")]
    StreamLoad(String),

    /// A frame with zero width/height (or a truncated buffer) reached the sampler.
    #[error("Frame invalide : {width}×{height}")]
    InvalidFrame {
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
    },

    /// The display surface was dropped by the host before teardown.
    #[error("Surface d'affichage indisponible")]
    SurfaceUnavailable,

    /// A frame was requested while the source is not playing.
    #[error("Source pas prête (état : {state})")]
    NotReady {
        /// Name of the state the source was in.
        state: &'static str,
    },

    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Invalid width/height dimensions.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },
}
