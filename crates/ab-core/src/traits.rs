use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::CoreError;
use crate::frame::FrameBuffer;

/// Cycle de vie d'un flux : `Loading → Ready → Playing ⇄ Paused`,
/// et `→ Failed` depuis n'importe quel état. `Failed` est terminal.
///
/// # Example
/// ```
/// use ab_core::traits::StreamState;
/// assert!(StreamState::Failed.is_terminal());
/// assert!(!StreamState::Paused.is_terminal());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamState {
    /// Stream requested, no frame decoded yet.
    #[default]
    Loading,
    /// First frame decoded, playback not started.
    Ready,
    /// Frames are flowing.
    Playing,
    /// Playback stopped; the last frame is kept.
    Paused,
    /// Decode/play error or load timeout. Never left.
    Failed,
}

impl StreamState {
    /// `true` for `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Short lowercase name, used in logs and errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fournit des frames décodées au pipeline.
///
/// Toutes les méthodes sont non-bloquantes : le chargement est asynchrone
/// et la session interroge `poll()` une fois par tick.
///
/// # Example
/// ```
/// use ab_core::traits::{FrameSource, StreamState};
/// use ab_core::frame::FrameBuffer;
/// use ab_core::error::CoreError;
/// use std::sync::Arc;
///
/// struct DeadSource;
/// impl FrameSource for DeadSource {
///     fn start(&mut self, _uri: &str) {}
///     fn poll(&mut self) {}
///     fn state(&self) -> StreamState { StreamState::Failed }
///     fn current_frame(&self) -> Result<Arc<FrameBuffer>, CoreError> {
///         Err(CoreError::NotReady { state: "failed" })
///     }
///     fn play(&mut self) -> Result<(), CoreError> { Err(CoreError::NotReady { state: "failed" }) }
///     fn pause(&mut self) {}
///     fn fail(&mut self, _reason: CoreError) {}
///     fn stop(&mut self) {}
///     fn intrinsic_size(&self) -> Option<(u32, u32)> { None }
/// }
/// assert!(!DeadSource.is_ready());
/// ```
pub trait FrameSource {
    /// Begin loading the stream at `uri`. Outcome is reported through `state()`.
    fn start(&mut self, uri: &str);

    /// Drain pending decoder events and update the state. Never blocks.
    fn poll(&mut self);

    /// Current lifecycle state.
    fn state(&self) -> StreamState;

    /// `true` once a decoded frame is available and playback has begun.
    fn is_ready(&self) -> bool {
        self.state() == StreamState::Playing
    }

    /// Latest decoded frame.
    ///
    /// # Errors
    /// `CoreError::NotReady` unless `is_ready()`.
    fn current_frame(&self) -> Result<Arc<FrameBuffer>, CoreError>;

    /// Request playback (`Ready | Paused → Playing`).
    ///
    /// # Errors
    /// `CoreError::NotReady` from `Loading` or `Failed`.
    fn play(&mut self) -> Result<(), CoreError>;

    /// Request a pause (`Playing → Paused`).
    fn pause(&mut self);

    /// Force `Failed` and release the decoder.
    fn fail(&mut self, reason: CoreError);

    /// Release the decoder. Idempotent.
    fn stop(&mut self);

    /// Native dimensions, once known.
    fn intrinsic_size(&self) -> Option<(u32, u32)>;
}

/// Surface texte monospace fournie par l'hôte. La session n'en est jamais
/// propriétaire : elle ne fait qu'en remplacer le contenu.
pub trait TextSurface {
    /// Replace the text content.
    fn set_text(&mut self, text: &str);

    /// Current text content.
    fn text(&self) -> &str;

    /// Inform the surface of the viewport size (in terminal cells).
    fn set_viewport(&mut self, cols: u16, rows: u16);
}

/// Handle of a pending frame callback (requestAnimationFrame-like).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(pub u64);

/// Handle of a pending one-shot timer (setTimeout-like).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Boucle d'événements de l'hôte : callbacks de frame et timers one-shot.
///
/// Un callback annulé n'est jamais délivré ; un handle inconnu est ignoré.
pub trait Scheduler {
    /// Ask for one callback at the next frame boundary.
    fn request_frame(&mut self) -> FrameRequestId;

    /// Cancel a pending frame callback.
    fn cancel_frame(&mut self, id: FrameRequestId);

    /// Arm a one-shot timer firing after `delay`.
    fn set_timeout(&mut self, delay: Duration) -> TimerId;

    /// Disarm a pending timer.
    fn clear_timeout(&mut self, id: TimerId);
}
