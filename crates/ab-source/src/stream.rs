use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ab_core::error::CoreError;
use ab_core::frame::FrameBuffer;
use ab_core::traits::{FrameSource, StreamState};
use flume::{Receiver, Sender, TryRecvError};

/// Capacité du canal d'événements. Petite : le worker ne décode pas en avance.
const EVENT_CAPACITY: usize = 4;

/// How long `stop()` waits for the worker before detaching it.
const JOIN_GRACE: Duration = Duration::from_millis(50);

/// Événements émis par un worker de décodage vers la session.
#[derive(Clone, Debug)]
pub enum StreamEvent {
    /// Stream opened, native dimensions known.
    Loaded {
        /// Native width in pixels.
        width: u32,
        /// Native height in pixels.
        height: u32,
    },
    /// A decoded frame.
    Frame(Arc<FrameBuffer>),
    /// Playback started (ack of `Play`).
    Playing,
    /// Playback stopped: ack of `Pause`, or a stalled decoder.
    Paused,
    /// Unrecoverable error; the worker exits after sending it.
    Failed(String),
}

/// Commandes envoyées au worker.
///
/// # Example
/// ```
/// use ab_source::stream::StreamCommand;
/// let cmd = StreamCommand::Play;
/// assert!(matches!(cmd, StreamCommand::Play));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamCommand {
    /// Start or resume playback.
    Play,
    /// Pause playback, keeping the last frame.
    Pause,
    /// Stop the worker.
    Quit,
}

/// Decoder backend chosen from the URI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// ffmpeg subprocess (any URL, video containers).
    Video,
    /// `image` crate (local PNG/JPEG/BMP/GIF).
    Image,
}

impl Backend {
    /// Pick the backend for `uri`: local image files go through `image`,
    /// everything else (including remote URLs) through ffmpeg.
    ///
    /// # Example
    /// ```
    /// use ab_source::stream::Backend;
    /// assert_eq!(Backend::for_uri("assets/landing.gif"), Backend::Image);
    /// assert_eq!(Backend::for_uri("assets/landing1.mp4"), Backend::Video);
    /// assert_eq!(Backend::for_uri("https://cdn.example/loop.gif"), Backend::Video);
    /// ```
    #[must_use]
    pub fn for_uri(uri: &str) -> Self {
        if uri.contains("://") {
            return Self::Video;
        }
        let ext = Path::new(uri)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("png" | "jpg" | "jpeg" | "bmp" | "gif") => Self::Image,
            _ => Self::Video,
        }
    }
}

/// Source de frames sur un flux bouclé, décodé par un thread dédié.
///
/// The worker talks through two `flume` channels; `poll()` drains events
/// without blocking and drives the state machine.
///
/// # Example
/// ```no_run
/// use ab_core::traits::FrameSource;
/// use ab_source::stream::StreamSource;
///
/// let mut source = StreamSource::new();
/// source.start("assets/landing/landing1.mp4");
/// source.poll();
/// ```
#[derive(Default)]
pub struct StreamSource {
    uri: Option<String>,
    state: StreamState,
    size: Option<(u32, u32)>,
    frame: Option<Arc<FrameBuffer>>,
    events: Option<Receiver<StreamEvent>>,
    commands: Option<Sender<StreamCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl StreamSource {
    /// Create an idle source. Nothing is loaded until `start`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }


    fn spawn_worker(
        uri: &str,
        events: Sender<StreamEvent>,
        commands: Receiver<StreamCommand>,
    ) -> anyhow::Result<JoinHandle<()>> {
        match Backend::for_uri(uri) {
            Backend::Video => crate::video::spawn_video_thread(uri.to_string(), events, commands),
            Backend::Image => crate::image::spawn_image_thread(uri.into(), events, commands),
        }
    }

    fn handle_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Loaded { width, height } => {
                log::debug!("stream: loaded {width}x{height}");
                self.size = Some((width, height));
            }
            StreamEvent::Frame(frame) => {
                if self.size.is_none() {
                    self.size = Some((frame.width, frame.height));
                }
                self.frame = Some(frame);
                if self.state == StreamState::Loading {
                    self.transition(StreamState::Ready);
                }
            }
            StreamEvent::Playing => {
                if matches!(self.state, StreamState::Ready | StreamState::Paused) {
                    self.transition(StreamState::Playing);
                }
            }
            StreamEvent::Paused => {
                if self.state == StreamState::Playing {
                    self.transition(StreamState::Paused);
                }
            }
            StreamEvent::Failed(reason) => self.mark_failed(&reason),
        }
    }

    fn transition(&mut self, next: StreamState) {
        log::info!(
            "stream {}: {} -> {next}",
            self.uri.as_deref().unwrap_or("?"),
            self.state
        );
        self.state = next;
    }

    fn mark_failed(&mut self, reason: &str) {
        if self.state.is_terminal() {
            return;
        }
        log::warn!(
            "stream {}: échec ({reason})",
            self.uri.as_deref().unwrap_or("?")
        );
        self.transition(StreamState::Failed);
        self.release();
    }

    /// Quit the worker and drop both channel ends.
    fn release(&mut self) {
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(StreamCommand::Quit);
        }
        // Dropping the receiver unblocks a worker parked on a full channel.
        self.events = None;
        if let Some(handle) = self.worker.take() {
            let deadline = Instant::now() + JOIN_GRACE;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            if handle.is_finished() {
                if handle.join().is_err() {
                    log::warn!("stream: le worker a paniqué");
                }
            } else {
                // Blocked in a pipe read; it exits on its next channel operation.
                log::debug!("stream: worker détaché");
            }
        }
    }
}

impl FrameSource for StreamSource {
    fn start(&mut self, uri: &str) {
        if self.worker.is_some() || self.state.is_terminal() {
            log::warn!("stream: start({uri}) ignoré, source déjà utilisée");
            return;
        }
        self.uri = Some(uri.to_string());
        self.state = StreamState::Loading;

        let (event_tx, event_rx) = flume::bounded(EVENT_CAPACITY);
        let (cmd_tx, cmd_rx) = flume::bounded(8);
        match Self::spawn_worker(uri, event_tx, cmd_rx) {
            Ok(handle) => {
                log::info!("stream: chargement de {uri}");
                self.worker = Some(handle);
                self.events = Some(event_rx);
                self.commands = Some(cmd_tx);
            }
            Err(e) => self.mark_failed(&format!("{e:#}")),
        }
    }

    fn poll(&mut self) {
        loop {
            let Some(rx) = self.events.as_ref() else {
                return;
            };
            match rx.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.mark_failed("worker de décodage terminé");
                    return;
                }
            }
        }
    }

    fn state(&self) -> StreamState {
        self.state
    }

    fn current_frame(&self) -> Result<Arc<FrameBuffer>, CoreError> {
        if !self.is_ready() {
            return Err(CoreError::NotReady {
                state: self.state.name(),
            });
        }
        self.frame.clone().ok_or(CoreError::NotReady {
            state: self.state.name(),
        })
    }

    fn play(&mut self) -> Result<(), CoreError> {
        match self.state {
            StreamState::Playing => Ok(()),
            StreamState::Ready | StreamState::Paused => {
                let sent = self
                    .commands
                    .as_ref()
                    .is_some_and(|tx| tx.send(StreamCommand::Play).is_ok());
                if sent {
                    Ok(())
                } else {
                    self.mark_failed("worker injoignable");
                    Err(CoreError::StreamLoad("worker injoignable".into()))
                }
            }
            StreamState::Loading | StreamState::Failed => Err(CoreError::NotReady {
                state: self.state.name(),
            }),
        }
    }

    fn pause(&mut self) {
        if self.state == StreamState::Playing
            && let Some(tx) = self.commands.as_ref()
        {
            let _ = tx.send(StreamCommand::Pause);
        }
    }

    fn fail(&mut self, reason: CoreError) {
        self.mark_failed(&reason.to_string());
    }

    fn stop(&mut self) {
        self.release();
    }

    fn intrinsic_size(&self) -> Option<(u32, u32)> {
        self.size
    }
}

impl Drop for StreamSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Source qui échoue dès `start` (`--force-fallback`).
///
/// # Example
/// ```
/// use ab_core::traits::{FrameSource, StreamState};
/// use ab_source::stream::OfflineSource;
/// let mut source = OfflineSource::default();
/// source.start("ignored.mp4");
/// assert_eq!(source.state(), StreamState::Failed);
/// ```
#[derive(Debug, Default)]
pub struct OfflineSource {
    started: bool,
}

impl FrameSource for OfflineSource {
    fn start(&mut self, uri: &str) {
        log::info!("stream: {uri} ignoré, source hors ligne");
        self.started = true;
    }

    fn poll(&mut self) {}

    fn state(&self) -> StreamState {
        if self.started {
            StreamState::Failed
        } else {
            StreamState::Loading
        }
    }

    fn current_frame(&self) -> Result<Arc<FrameBuffer>, CoreError> {
        Err(CoreError::NotReady {
            state: self.state().name(),
        })
    }

    fn play(&mut self) -> Result<(), CoreError> {
        Err(CoreError::NotReady {
            state: self.state().name(),
        })
    }

    fn pause(&mut self) {}

    fn fail(&mut self, _reason: CoreError) {
        self.started = true;
    }

    fn stop(&mut self) {}

    fn intrinsic_size(&self) -> Option<(u32, u32)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Poll until `done` holds or two seconds elapse.
    fn poll_until(source: &mut StreamSource, done: impl Fn(&StreamSource) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            source.poll();
            if done(source) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn backend_selection() {
        assert_eq!(Backend::for_uri("a/b/LANDING.GIF"), Backend::Image);
        assert_eq!(Backend::for_uri("still.jpeg"), Backend::Image);
        assert_eq!(Backend::for_uri("clip.webm"), Backend::Video);
        assert_eq!(Backend::for_uri("no_extension"), Backend::Video);
        assert_eq!(Backend::for_uri("file:///tmp/x.png"), Backend::Video);
    }

    #[test]
    fn missing_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.png");
        let mut source = StreamSource::new();
        source.start(path.to_str().unwrap());
        assert!(poll_until(&mut source, |s| s.state() == StreamState::Failed));
        assert!(!source.is_ready());
        assert!(source.current_frame().is_err());
    }

    #[test]
    fn image_goes_ready_then_playing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        image::RgbaImage::from_pixel(8, 4, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut source = StreamSource::new();
        source.start(path.to_str().unwrap());
        assert!(poll_until(&mut source, |s| s.state() == StreamState::Ready));
        assert!(!source.is_ready());
        assert!(matches!(
            source.current_frame(),
            Err(CoreError::NotReady { state: "ready" })
        ));
        assert_eq!(source.intrinsic_size(), Some((8, 4)));

        source.play().unwrap();
        assert!(poll_until(&mut source, FrameSource::is_ready));
        let frame = source.current_frame().unwrap();
        assert_eq!((frame.width, frame.height), (8, 4));
        assert_eq!(frame.pixel(0, 0), (10, 20, 30, 255));

        source.pause();
        assert!(poll_until(&mut source, |s| s.state() == StreamState::Paused));
        source.play().unwrap();
        assert!(poll_until(&mut source, FrameSource::is_ready));
    }

    #[test]
    fn play_before_ready_is_rejected() {
        let mut source = StreamSource::new();
        assert!(matches!(
            source.play(),
            Err(CoreError::NotReady { state: "loading" })
        ));
    }

    #[test]
    fn fail_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        image::RgbaImage::new(2, 2).save(&path).unwrap();

        let mut source = StreamSource::new();
        source.start(path.to_str().unwrap());
        source.fail(CoreError::StreamLoad("timeout".into()));
        assert_eq!(source.state(), StreamState::Failed);
        source.poll();
        assert_eq!(source.state(), StreamState::Failed);
        assert!(source.play().is_err());

        // No restart once failed.
        source.start(path.to_str().unwrap());
        assert_eq!(source.state(), StreamState::Failed);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut source = StreamSource::new();
        source.stop();
        source.stop();
        assert_eq!(source.state(), StreamState::Loading);
    }
}
