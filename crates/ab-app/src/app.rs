use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ab_core::config::EffectConfig;
use ab_core::traits::TextSurface;
use ab_render::PreSurface;
use ab_render::fps::FpsCounter;
use ab_render::ui::{self, StatusLine};
use ab_source::{OfflineSource, StreamSource};
use anyhow::Result;
use arc_swap::ArcSwap;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;

use crate::scheduler::{FrameLoop, drive};
use crate::session::EffectSession;

/// Hôte terminal : possède la surface, la boucle de frames et la session.
///
/// One session is mounted at a time. A config swap (hot reload) unmounts
/// it and mounts a fresh one on the same surface.
pub struct App {
    /// Config courante (écrite par le watcher, lue ici).
    pub config: Arc<ArcSwap<EffectConfig>>,
    /// Config de la session montée.
    active: Arc<EffectConfig>,
    /// Ne jamais ouvrir le flux.
    force_fallback: bool,
    surface: Rc<RefCell<PreSurface>>,
    host: FrameLoop,
    session: EffectSession,
    fps_counter: FpsCounter,
    last_renders: u64,
    /// Overlay FPS / mode visible.
    pub show_fps: bool,
    /// Sortie demandée.
    pub quitting: bool,
    viewport: (u16, u16),
}

impl App {
    /// Build the host and mount the first session.
    #[must_use]
    pub fn new(config: Arc<ArcSwap<EffectConfig>>, force_fallback: bool, show_fps: bool) -> Self {
        let active = config.load_full();
        let surface = Rc::new(RefCell::new(PreSurface::new()));
        let mut host = FrameLoop::new();
        let mut session = Self::build_session(&active, force_fallback, &surface);
        session.mount(&mut host);
        Self {
            config,
            active,
            force_fallback,
            surface,
            host,
            session,
            fps_counter: FpsCounter::new(30),
            last_renders: 0,
            show_fps,
            quitting: false,
            viewport: (0, 0),
        }
    }

    fn build_session(
        config: &EffectConfig,
        force_fallback: bool,
        surface: &Rc<RefCell<PreSurface>>,
    ) -> EffectSession {
        let weak: Weak<RefCell<dyn TextSurface>> = Rc::downgrade(surface) as _;
        let source: Box<dyn ab_core::traits::FrameSource> = if force_fallback {
            Box::new(OfflineSource::default())
        } else {
            Box::new(StreamSource::new())
        };
        EffectSession::new(config.clone(), source, weak)
    }

    /// Session montée.
    #[must_use]
    pub fn session(&self) -> &EffectSession {
        &self.session
    }

    /// Surface partagée avec la session.
    #[must_use]
    pub fn surface(&self) -> &Rc<RefCell<PreSurface>> {
        &self.surface
    }

    /// Boucle principale : événements, ticks, dessin.
    ///
    /// # Errors
    /// Returns an error if terminal operations fail.
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        let size = terminal.size()?;
        self.resize(size.width, size.height);
        let mut last_frame = Instant::now();

        while !self.quitting {
            let frame_duration = self.active.frame_period();
            let elapsed = last_frame.elapsed();

            if elapsed < frame_duration {
                // Dormir le temps restant, mais rester réactif aux événements
                if event::poll(frame_duration - elapsed)? {
                    self.handle_event(&event::read()?);
                }
                continue;
            }
            let now = Instant::now();
            let dt = now - last_frame;
            last_frame = now;

            while event::poll(Duration::ZERO)? {
                self.handle_event(&event::read()?);
            }
            self.check_reload();
            self.tick(dt, now);

            let status = self.show_fps.then(|| self.status());
            let surface = self.surface.borrow();
            terminal.draw(|frame| ui::draw(frame, &surface, status.as_ref()))?;
        }

        self.shutdown();
        Ok(())
    }

    /// Advance the host loop by `dt` and deliver due callbacks.
    pub fn tick(&mut self, dt: Duration, now: Instant) {
        drive(&mut self.host, &mut self.session, dt);
        let renders = self.session.renders();
        if renders != self.last_renders {
            self.last_renders = renders;
            self.fps_counter.record(now);
        }
    }

    fn status(&self) -> StatusLine {
        StatusLine {
            mode: self.session.phase().name(),
            fps: self.fps_counter.fps(),
            grid: (self.active.grid_width, self.active.grid_height),
        }
    }

    /// Remonte une session si la config a changé.
    pub fn check_reload(&mut self) {
        let latest = self.config.load_full();
        if Arc::ptr_eq(&latest, &self.active) {
            return;
        }
        self.active = latest;
        self.remount();
    }

    fn remount(&mut self) {
        self.session.unmount(&mut self.host);
        self.session = Self::build_session(&self.active, self.force_fallback, &self.surface);
        self.session.mount(&mut self.host);
        self.session.on_resize(self.viewport.0, self.viewport.1);
        self.last_renders = 0;
        self.fps_counter.reset();
        log::info!(
            "Session remontée ({}×{})",
            self.active.grid_width,
            self.active.grid_height
        );
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.viewport = (cols, rows);
        self.session.on_resize(cols, rows);
    }

    /// Handle a terminal event.
    pub fn handle_event(&mut self, event: &Event) {
        match *event {
            Event::Resize(cols, rows) => self.resize(cols, rows),
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) => match code {
                KeyCode::Char('q') | KeyCode::Esc => self.quitting = true,
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    self.quitting = true;
                }
                KeyCode::Char('f') => self.show_fps = !self.show_fps,
                KeyCode::Char('r') => self.remount(),
                _ => {}
            },
            _ => {}
        }
    }

    /// Démonte la session. Idempotent.
    pub fn shutdown(&mut self) {
        self.session.unmount(&mut self.host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Mode, Phase};

    fn small_config() -> Arc<ArcSwap<EffectConfig>> {
        let mut config = EffectConfig::default();
        config.grid_width = 10;
        config.grid_height = 4;
        Arc::new(ArcSwap::from_pointee(config))
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn forced_fallback_renders_on_first_tick() {
        let mut app = App::new(small_config(), true, false);
        app.tick(Duration::from_millis(33), Instant::now());
        assert_eq!(app.session().phase(), Phase::Running(Mode::Fallback));
        assert_eq!(app.surface().borrow().text().chars().count(), 10 * 4 + 4);
    }

    #[test]
    fn keys_quit_and_toggle_overlay() {
        let mut app = App::new(small_config(), true, false);
        app.handle_event(&key(KeyCode::Char('f')));
        assert!(app.show_fps);
        app.handle_event(&key(KeyCode::Char('x')));
        assert!(!app.quitting);
        app.handle_event(&key(KeyCode::Esc));
        assert!(app.quitting);
    }

    #[test]
    fn resize_reaches_surface() {
        let mut app = App::new(small_config(), true, false);
        app.handle_event(&Event::Resize(132, 43));
        assert_eq!(app.surface().borrow().viewport(), (132, 43));
    }

    #[test]
    fn config_swap_remounts_with_new_grid() {
        let config = small_config();
        let mut app = App::new(Arc::clone(&config), true, false);
        app.tick(Duration::from_millis(33), Instant::now());

        let mut next = (**config.load()).clone();
        next.grid_width = 3;
        next.grid_height = 2;
        config.store(Arc::new(next));
        app.check_reload();
        assert_eq!(app.session().phase(), Phase::Starting);

        app.tick(Duration::from_millis(33), Instant::now());
        assert_eq!(app.surface().borrow().text().chars().count(), 3 * 2 + 2);
        // Unchanged config: no remount.
        app.check_reload();
        assert_eq!(app.session().phase(), Phase::Running(Mode::Fallback));
    }

    #[test]
    fn shutdown_stops_session() {
        let mut app = App::new(small_config(), true, false);
        app.shutdown();
        app.shutdown();
        assert_eq!(app.session().phase(), Phase::Stopped);
    }
}
