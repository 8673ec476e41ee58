use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use ab_ascii::mapper::{map_field, map_with};
use ab_ascii::sampler::Sampler;
use ab_core::charset::GlyphRamp;
use ab_core::config::EffectConfig;
use ab_core::error::CoreError;
use ab_core::traits::{FrameRequestId, FrameSource, Scheduler, StreamState, TextSurface, TimerId};
use ab_render::GlyphRenderer;
use ab_source::FallbackGenerator;

/// Origine du contenu affiché une fois la session lancée.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Frames of the stream.
    Live,
    /// Procedural field; final for this session.
    Fallback,
}

/// Cycle de vie : `Idle → Starting → Running(Live | Fallback) → Stopped`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, nothing started.
    #[default]
    Idle,
    /// Source loading, fallback timer armed.
    Starting,
    /// Rendering every frame.
    Running(Mode),
    /// Torn down. Terminal.
    Stopped,
}

impl Phase {
    /// Short name for logs and the status overlay.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running(Mode::Live) => "live",
            Self::Running(Mode::Fallback) => "fallback",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Une instance montée de l'effet de fond.
///
/// Owns its frame source, sampler, fallback generator and renderer, plus
/// the handles of its pending frame request and fallback timer. The host
/// calls `mount` once, forwards the scheduler callbacks to `on_frame` /
/// `on_timeout`, and calls `unmount` on teardown. Every callback after
/// `unmount` (or carrying a stale handle) is ignored, so nothing is ever
/// rendered once the session is `Stopped`.
///
/// The grid size and ramp are fixed for the session's lifetime; a config
/// change means a new session.
///
/// # Example
/// ```
/// use std::cell::RefCell;
/// use std::rc::{Rc, Weak};
/// use std::time::Duration;
/// use ab_core::config::EffectConfig;
/// use ab_core::traits::TextSurface;
/// use ab_render::PreSurface;
/// use ab_source::OfflineSource;
/// use ab_app::scheduler::{drive, FrameLoop};
/// use ab_app::session::{EffectSession, Mode, Phase};
///
/// let mut config = EffectConfig::default();
/// config.grid_width = 8;
/// config.grid_height = 2;
/// let surface = Rc::new(RefCell::new(PreSurface::new()));
/// let weak: Weak<RefCell<dyn TextSurface>> = Rc::downgrade(&surface) as _;
///
/// let mut host = FrameLoop::new();
/// let mut session = EffectSession::new(config, Box::new(OfflineSource::default()), weak);
/// session.mount(&mut host);
/// drive(&mut host, &mut session, Duration::from_millis(33));
/// assert_eq!(session.phase(), Phase::Running(Mode::Fallback));
/// assert_eq!(surface.borrow().text().chars().count(), 8 * 2 + 2);
///
/// session.unmount(&mut host);
/// assert_eq!(session.phase(), Phase::Stopped);
/// ```
pub struct EffectSession {
    config: EffectConfig,
    ramp: GlyphRamp,
    source: Box<dyn FrameSource>,
    sampler: Sampler,
    generator: FallbackGenerator,
    renderer: GlyphRenderer,
    phase: Phase,
    frame_request: Option<FrameRequestId>,
    fallback_timer: Option<TimerId>,
    /// Relances `play()` restantes pour la pause en cours.
    retries_left: u32,
    /// Fallback frames rendered so far; drives the procedural animation.
    tick: u64,
    fallback_activations: u32,
    renders: u64,
}

impl EffectSession {
    /// Build an idle session. `config` is clamped; nothing starts before `mount`.
    #[must_use]
    pub fn new(
        mut config: EffectConfig,
        source: Box<dyn FrameSource>,
        surface: Weak<RefCell<dyn TextSurface>>,
    ) -> Self {
        config.clamp_all();
        Self {
            ramp: config.ramp(),
            sampler: Sampler::new(config.sample_filter),
            generator: FallbackGenerator::new(config.fallback.clone()),
            renderer: GlyphRenderer::new(surface),
            retries_left: config.autoplay_retries,
            config,
            source,
            phase: Phase::Idle,
            frame_request: None,
            fallback_timer: None,
            tick: 0,
            fallback_activations: 0,
            renders: 0,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Effective (clamped) configuration.
    #[must_use]
    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    /// Handle of the pending frame request, if any.
    #[must_use]
    pub fn pending_frame(&self) -> Option<FrameRequestId> {
        self.frame_request
    }

    /// Handle of the armed fallback timer, if any.
    #[must_use]
    pub fn pending_timer(&self) -> Option<TimerId> {
        self.fallback_timer
    }

    /// Number of times the fallback was activated (0 or 1).
    #[must_use]
    pub fn fallback_activations(&self) -> u32 {
        self.fallback_activations
    }

    /// Fallback frames generated so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Successful writes to the surface.
    #[must_use]
    pub fn renders(&self) -> u64 {
        self.renders
    }

    fn set_phase(&mut self, next: Phase) {
        if self.phase != next {
            log::info!("session: {} -> {next}", self.phase);
            self.phase = next;
        }
    }

    /// Start the source, arm the fallback timer and request the first frame.
    ///
    /// Only valid from `Idle`; any other call is a no-op.
    pub fn mount(&mut self, scheduler: &mut dyn Scheduler) {
        if self.phase != Phase::Idle {
            log::debug!("session: mount ignoré en phase {}", self.phase);
            return;
        }
        self.set_phase(Phase::Starting);
        self.source.start(&self.config.stream_uri);
        self.fallback_timer = Some(scheduler.set_timeout(self.config.fallback_timeout()));
        self.frame_request = Some(scheduler.request_frame());
    }

    /// Frame callback. Runs one tick and requests the next frame.
    ///
    /// Ignored unless `id` is the pending request.
    pub fn on_frame(&mut self, id: FrameRequestId, scheduler: &mut dyn Scheduler) {
        if self.frame_request != Some(id) {
            log::trace!("session: frame {id:?} périmée");
            return;
        }
        self.frame_request = None;

        match self.phase {
            Phase::Starting => self.tick_starting(scheduler),
            Phase::Running(Mode::Live) => self.tick_live(scheduler),
            Phase::Running(Mode::Fallback) => self.tick_fallback(),
            Phase::Idle | Phase::Stopped => return,
        }

        if matches!(self.phase, Phase::Starting | Phase::Running(_)) {
            self.frame_request = Some(scheduler.request_frame());
        }
    }

    /// Fallback timer callback. While still `Starting`, gives up on the stream.
    pub fn on_timeout(&mut self, id: TimerId, scheduler: &mut dyn Scheduler) {
        if self.fallback_timer != Some(id) {
            log::trace!("session: timer {id:?} périmé");
            return;
        }
        self.fallback_timer = None;
        if self.phase == Phase::Starting {
            let reason = format!(
                "pas de frame après {} ms",
                self.config.fallback_timeout_ms
            );
            self.source.fail(CoreError::StreamLoad(reason.clone()));
            self.activate_fallback(scheduler, &reason);
        }
    }

    /// Viewport change. The glyph grid keeps its dimensions.
    pub fn on_resize(&mut self, cols: u16, rows: u16) {
        if self.phase == Phase::Stopped {
            return;
        }
        log::debug!("session: viewport {cols}×{rows}");
        self.renderer.set_viewport(cols, rows);
    }

    /// Tear down: cancel the frame request, clear the timer, release the source.
    ///
    /// Idempotent and valid from any phase.
    pub fn unmount(&mut self, scheduler: &mut dyn Scheduler) {
        if self.phase == Phase::Stopped {
            return;
        }
        if let Some(id) = self.frame_request.take() {
            scheduler.cancel_frame(id);
        }
        if let Some(id) = self.fallback_timer.take() {
            scheduler.clear_timeout(id);
        }
        self.source.stop();
        self.set_phase(Phase::Stopped);
    }

    fn tick_starting(&mut self, scheduler: &mut dyn Scheduler) {
        self.source.poll();
        match self.source.state() {
            StreamState::Ready | StreamState::Paused => {
                // Autoplay; the ack arrives on a later poll.
                if let Err(e) = self.source.play() {
                    log::debug!("session: autoplay refusé: {e}");
                }
            }
            StreamState::Failed => {
                self.activate_fallback(scheduler, "le flux a échoué");
                self.tick_fallback();
            }
            StreamState::Loading | StreamState::Playing => {}
        }

        if self.phase == Phase::Starting && self.source.is_ready() {
            if let Some(id) = self.fallback_timer.take() {
                scheduler.clear_timeout(id);
            }
            self.retries_left = self.config.autoplay_retries;
            self.set_phase(Phase::Running(Mode::Live));
            self.render_live();
        }
    }

    fn tick_live(&mut self, scheduler: &mut dyn Scheduler) {
        self.source.poll();
        match self.source.state() {
            StreamState::Failed => {
                self.activate_fallback(scheduler, "le flux a échoué en lecture");
                self.tick_fallback();
            }
            StreamState::Paused | StreamState::Ready => self.retry_play(),
            StreamState::Playing => {
                self.retries_left = self.config.autoplay_retries;
                self.render_live();
            }
            StreamState::Loading => {}
        }
    }

    /// Pause subie : au plus `autoplay_retries` relances, puis la dernière
    /// grille reste affichée.
    fn retry_play(&mut self) {
        if self.retries_left == 0 {
            return;
        }
        self.retries_left -= 1;
        log::info!(
            "session: relance de la lecture ({} restante(s))",
            self.retries_left
        );
        if let Err(e) = self.source.play() {
            log::debug!("session: relance refusée: {e}");
        }
    }

    fn render_live(&mut self) {
        let frame = match self.source.current_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::trace!("session: pas de frame ({e})");
                return;
            }
        };
        let grid = match self.sampler.sample(
            &frame,
            self.config.grid_width,
            self.config.grid_height,
        ) {
            Ok(grid) => grid,
            Err(e) => {
                // InvalidFrame : on garde la grille précédente.
                log::debug!("session: tick ignoré ({e})");
                return;
            }
        };
        let glyphs = map_with(&grid, &self.ramp, self.config.invert);
        if self.renderer.render(&glyphs).is_ok() {
            self.renders += 1;
        }
    }

    fn tick_fallback(&mut self) {
        // Le compteur avance avant le calcul : la première frame est au tick 1.
        self.tick += 1;
        let field = self
            .generator
            .generate(self.tick, self.config.grid_width, self.config.grid_height);
        let glyphs = map_field(&field, &self.ramp);
        if self.renderer.render(&glyphs).is_ok() {
            self.renders += 1;
        }
        log::trace!("session: fallback tick {}", self.tick);
    }

    /// Bascule définitive sur le générateur procédural. Au plus une fois.
    fn activate_fallback(&mut self, scheduler: &mut dyn Scheduler, reason: &str) {
        if self.fallback_activations > 0 || self.phase == Phase::Running(Mode::Fallback) {
            return;
        }
        if let Some(id) = self.fallback_timer.take() {
            scheduler.clear_timeout(id);
        }
        self.fallback_activations += 1;
        log::warn!(
            "session: {} indisponible ({reason}), générateur procédural activé",
            self.config.stream_uri
        );
        self.set_phase(Phase::Running(Mode::Fallback));
    }
}

impl Drop for EffectSession {
    fn drop(&mut self) {
        if self.phase != Phase::Stopped {
            self.source.stop();
        }
    }
}
