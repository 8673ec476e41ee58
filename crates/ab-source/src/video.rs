// Décodage vidéo via ffmpeg en subprocess (std::process::Command).
// Prérequis : `ffmpeg` et `ffprobe` accessibles dans PATH.
//
// Architecture :
//   - `probe_video`        : interroge ffprobe pour width/height/fps
//   - `spawn_ffmpeg_pipe`  : lance ffmpeg en boucle → flux raw RGBA sur stdout
//   - `spawn_video_thread` : thread dédié, probe puis `pump`
//   - `pump`               : lecture/throttle/pause/respawn, générique sur `Read`
//   - `process_commands`   : dispatche les commandes dans la boucle principale
//   - `find_or_create_slot`: pool Arc<FrameBuffer> zero-alloc

use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ab_core::frame::FrameBuffer;
use anyhow::{Context, Result};
use flume::{Receiver, RecvTimeoutError, Sender};

use crate::stream::{StreamCommand, StreamEvent};

/// Taille du pool de frames pré-allouées.
/// Doit être > capacité du canal d'événements pour garantir un slot libre.
const POOL_SIZE: usize = 6;

/// Bornes du pipe ffmpeg. Le sampler réduit ensuite à la grille de glyphes,
/// inutile de transporter plus de pixels.
const MAX_PIPE_WIDTH: u32 = 640;
const MAX_PIPE_HEIGHT: u32 = 360;

/// Métadonnées extraites via ffprobe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    /// Native width in pixels.
    pub width: u32,
    /// Native height in pixels.
    pub height: u32,
    /// Images par seconde (ex: 23.976, 24.0, 30.0, 60.0).
    pub fps: f64,
}

/// État mutable du thread vidéo.
struct VideoState {
    w: u32,
    h: u32,
    is_paused: bool,
    target_fps: u32,
    pool: Vec<Arc<FrameBuffer>>,
}

impl VideoState {
    fn new(info: &VideoInfo) -> Self {
        let (w, h) = fit_within(info.width, info.height, MAX_PIPE_WIDTH, MAX_PIPE_HEIGHT);
        let target_fps = info.fps.clamp(1.0, 60.0).round() as u32;
        let pool = (0..POOL_SIZE)
            .map(|_| Arc::new(FrameBuffer::new(w, h)))
            .collect();
        Self {
            w,
            h,
            // Chargé mais en pause : la lecture attend `Play`.
            is_paused: true,
            target_fps,
            pool,
        }
    }

    fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps.max(1)))
    }
}

/// Scale `(w, h)` down to fit inside `(max_w, max_h)`, keeping the aspect ratio.
///
/// Never upscales; never returns a zero dimension.
///
/// # Example
/// ```
/// use ab_source::video::fit_within;
/// assert_eq!(fit_within(1920, 1080, 640, 360), (640, 360));
/// assert_eq!(fit_within(1920, 800, 640, 360), (640, 267));
/// assert_eq!(fit_within(320, 240, 640, 360), (320, 240));
/// ```
#[must_use]
pub fn fit_within(w: u32, h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if w == 0 || h == 0 {
        return (w.max(1), h.max(1));
    }
    let scale = (f64::from(max_w) / f64::from(w))
        .min(f64::from(max_h) / f64::from(h))
        .min(1.0);
    let sw = (f64::from(w) * scale).round().max(1.0) as u32;
    let sh = (f64::from(h) * scale).round().max(1.0) as u32;
    (sw, sh)
}

/// Parse the `key=value` lines printed by ffprobe.
///
/// # Errors
/// Retourne une erreur si width/height sont absents ou nuls.
pub fn parse_probe_output(text: &str) -> Result<VideoInfo> {
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;
    let mut fps: f64 = 30.0;

    for line in text.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            width = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("height=") {
            height = val.trim().parse().ok();
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            // Format: "24/1" ou "30000/1001"
            let mut parts = val.trim().splitn(2, '/');
            let num: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(30.0);
            let den: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1.0);
            if den > 0.0 && num > 0.0 {
                fps = num / den;
            }
        }
    }

    match (width, height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            Ok(VideoInfo { width, height, fps })
        }
        _ => anyhow::bail!("aucun flux vidéo décodable"),
    }
}

/// Interroge `ffprobe` pour obtenir les métadonnées du flux vidéo principal.
///
/// `uri` may be a local path or any URL ffmpeg understands.
///
/// # Errors
/// Retourne une erreur si `ffprobe` est introuvable ou si la source
/// ne contient aucun flux vidéo décodable.
pub fn probe_video(uri: &str) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "default=noprint_wrappers=1",
            "-i",
            uri,
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .context("Impossible de lancer ffprobe. Vérifiez qu'il est installé et dans le PATH.")?;

    let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("ffprobe: {uri}"))?;
    log::info!(
        "probe_video: {}x{} @ {:.3}fps ({uri})",
        info.width,
        info.height,
        info.fps
    );
    Ok(info)
}

/// Lance un processus `ffmpeg` qui écrit des frames RGBA brutes sur stdout.
///
/// Chaque frame = `w × h × 4` bytes (RGBA row-major, sans padding).
/// `-stream_loop -1` relit la source indéfiniment ; `-an` supprime l'audio.
///
/// # Errors
/// Retourne une erreur si le spawn échoue.
pub fn spawn_ffmpeg_pipe(uri: &str, w: u32, h: u32, target_fps: u32) -> Result<Child> {
    let scale_filter = format!("scale={w}:{h}:flags=bilinear");
    let fps_str = target_fps.to_string();

    let child = Command::new("ffmpeg")
        .args([
            "-stream_loop",
            "-1",
            "-i",
            uri,
            "-vf",
            &scale_filter,
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-r",
            &fps_str,
            "-an",
            "-hide_banner",
            "-loglevel",
            "error",
            "pipe:1",
        ])
        .stdout(Stdio::piped())
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("Impossible de lancer ffmpeg")?;
    log::debug!("ffmpeg spawné: {w}x{h} @ {target_fps}fps");
    Ok(child)
}

/// Lit exactement `buf.len()` bytes depuis `reader`.
///
/// # Errors
/// Retourne `Ok(true)` si lu avec succès, `Ok(false)` sur EOF avant complétion,
/// `Err` sur erreur I/O fatale.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => return Ok(false),
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Pipe ffmpeg : lit le stdout du process, le tue à la destruction.
struct FfmpegPipe(Child);

impl Read for FfmpegPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.stdout.as_mut() {
            Some(out) => out.read(buf),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stdout ffmpeg absent",
            )),
        }
    }
}

impl Drop for FfmpegPipe {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Dispatch one command. Returns `true` when the thread must exit.
fn apply_command(
    cmd: StreamCommand,
    state: &mut VideoState,
    events: &Sender<StreamEvent>,
) -> bool {
    match cmd {
        StreamCommand::Quit => {
            log::info!("Thread vidéo: Quit reçu, arrêt propre.");
            true
        }
        StreamCommand::Pause => {
            if !state.is_paused {
                state.is_paused = true;
                log::debug!("Thread vidéo: Pause");
            }
            events.send(StreamEvent::Paused).is_err()
        }
        StreamCommand::Play => {
            if state.is_paused {
                state.is_paused = false;
                log::debug!("Thread vidéo: Play");
            }
            events.send(StreamEvent::Playing).is_err()
        }
    }
}

/// Draine les commandes en attente. Retourne `true` si le thread doit quitter
/// (Quit reçu ou canal déconnecté).
fn process_commands(
    cmd_rx: &Receiver<StreamCommand>,
    state: &mut VideoState,
    events: &Sender<StreamEvent>,
) -> bool {
    loop {
        match cmd_rx.try_recv() {
            Ok(cmd) => {
                if apply_command(cmd, state, events) {
                    return true;
                }
            }
            Err(flume::TryRecvError::Empty) => return false,
            Err(flume::TryRecvError::Disconnected) => return true,
        }
    }
}

/// Trouve ou crée un slot libre dans le pool.
///
/// Invariant : retourne un index `i` tel que `Arc::strong_count(&pool[i]) == 1`.
/// Si tous les slots sont pris, alloue un nouveau slot.
fn find_or_create_slot(pool: &mut Vec<Arc<FrameBuffer>>, w: u32, h: u32) -> usize {
    let free_idx = pool.iter().position(|a| Arc::strong_count(a) == 1);
    if let Some(i) = free_idx {
        if pool[i].data.len() != w as usize * h as usize * 4 {
            pool[i] = Arc::new(FrameBuffer::new(w, h));
        }
        i
    } else {
        // Allouer plutôt que bloquer le décodeur.
        pool.push(Arc::new(FrameBuffer::new(w, h)));
        pool.len() - 1
    }
}

/// Read the next frame from `pipe` into a pool slot.
///
/// `Ok(None)` on EOF.
fn read_frame<R: Read>(state: &mut VideoState, pipe: &mut R) -> Result<Option<Arc<FrameBuffer>>> {
    let idx = find_or_create_slot(&mut state.pool, state.w, state.h);
    let fb = Arc::get_mut(&mut state.pool[idx]).context("slot de frame partagé")?;
    if read_exact_or_eof(pipe, &mut fb.data)? {
        Ok(Some(Arc::clone(&state.pool[idx])))
    } else {
        Ok(None)
    }
}

/// Spawne le thread de décodage vidéo.
///
/// The thread probes `uri`, announces `Loaded`, sends the first frame and
/// then waits paused for `Play`. Probe or spawn failures are reported as
/// `StreamEvent::Failed` on `events`.
///
/// # Errors
/// Retourne une erreur si le thread OS ne peut pas être créé.
///
/// # Example
/// ```no_run
/// use ab_source::video::spawn_video_thread;
/// let (tx, _rx) = flume::bounded(4);
/// let (_cmd_tx, cmd_rx) = flume::bounded(8);
/// let handle = spawn_video_thread("clip.mp4".into(), tx, cmd_rx).unwrap();
/// # drop(handle);
/// ```
pub fn spawn_video_thread(
    uri: String,
    events: Sender<StreamEvent>,
    cmd_rx: Receiver<StreamCommand>,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("ab-video".to_string())
        .spawn(move || {
            if let Err(e) = video_loop(&uri, &events, &cmd_rx) {
                log::warn!("Thread vidéo: {e:#}");
                let _ = events.send(StreamEvent::Failed(format!("{e:#}")));
            }
            log::info!("Thread vidéo terminé.");
        })
        .context("Impossible de spawner le thread vidéo")
}

/// Probe, annonce `Loaded`, puis délègue la lecture du pipe ffmpeg à `pump`.
///
/// `Ok(())` on Quit or when the session hung up; `Err` is a stream failure.
fn video_loop(
    uri: &str,
    events: &Sender<StreamEvent>,
    cmd_rx: &Receiver<StreamCommand>,
) -> Result<()> {
    let info = probe_video(uri)?;
    let mut state = VideoState::new(&info);
    if events
        .send(StreamEvent::Loaded {
            width: info.width,
            height: info.height,
        })
        .is_err()
    {
        return Ok(());
    }
    let (w, h, fps) = (state.w, state.h, state.target_fps);
    pump(&mut state, events, cmd_rx, || {
        spawn_ffmpeg_pipe(uri, w, h, fps).map(FfmpegPipe)
    })
}

/// Boucle de lecture : première frame, attente de `Play`, frames cadencées
/// au fps du flux.
///
/// `open` (re)lance le pipe. Sur EOF ou erreur de lecture le pipe est fermé,
/// `Paused` est émis et le prochain `Play` rouvre un pipe neuf.
fn pump<P, F>(
    state: &mut VideoState,
    events: &Sender<StreamEvent>,
    cmd_rx: &Receiver<StreamCommand>,
    mut open: F,
) -> Result<()>
where
    P: Read,
    F: FnMut() -> Result<P>,
{
    let mut pipe = Some(open()?);
    let first = match pipe.as_mut().map(|p| read_frame(state, p)).transpose()? {
        Some(Some(frame)) => frame,
        _ => anyhow::bail!("aucune frame décodée"),
    };
    if events.send(StreamEvent::Frame(first)).is_err() {
        return Ok(());
    }

    let frame_period = state.frame_period();
    let mut last_frame = Instant::now();

    loop {
        if state.is_paused {
            match cmd_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(cmd) => {
                    if apply_command(cmd, state, events) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            continue;
        }

        if process_commands(cmd_rx, state, events) {
            break;
        }
        if state.is_paused {
            continue;
        }

        let elapsed = last_frame.elapsed();
        if let Some(remaining) = frame_period.checked_sub(elapsed) {
            thread::sleep(remaining.min(Duration::from_millis(10)));
            continue;
        }
        last_frame = Instant::now();

        if pipe.is_none() {
            log::debug!("Thread vidéo: réouverture du pipe");
            pipe = Some(open()?);
        }
        match pipe.as_mut().map(|p| read_frame(state, p)).transpose() {
            Ok(Some(Some(frame))) => {
                if events.send(StreamEvent::Frame(frame)).is_err() {
                    break;
                }
            }
            Ok(_) => {
                // EOF malgré -stream_loop : la dernière frame reste affichée.
                log::info!("Thread vidéo: EOF, lecture suspendue.");
                pipe = None;
                state.is_paused = true;
                if events.send(StreamEvent::Paused).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::warn!("Thread vidéo: erreur lecture pipe: {e}");
                pipe = None;
                state.is_paused = true;
                if events.send(StreamEvent::Paused).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}
