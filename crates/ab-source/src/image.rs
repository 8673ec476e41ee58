use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ab_core::frame::FrameBuffer;
use anyhow::{Context, Result};
use flume::{Receiver, RecvTimeoutError, Sender};
use image::AnimationDecoder;
use image::codecs::gif::GifDecoder;

use crate::stream::{StreamCommand, StreamEvent};

/// Délai appliqué aux GIF qui déclarent 0 ms (convention des navigateurs).
const DEFAULT_GIF_DELAY: Duration = Duration::from_millis(100);
/// Délai minimal entre deux frames d'un GIF.
const MIN_GIF_DELAY: Duration = Duration::from_millis(20);

/// Une frame décodée et sa durée d'affichage.
pub type TimedFrame = (Arc<FrameBuffer>, Duration);

fn normalize_delay(ms: u64) -> Duration {
    if ms == 0 {
        DEFAULT_GIF_DELAY
    } else {
        Duration::from_millis(ms).max(MIN_GIF_DELAY)
    }
}

/// Decode every frame of `path`: all frames of a GIF, or one frame for a still.
///
/// # Errors
/// Returns an error if the file cannot be read or decoded, or holds no frame.
///
/// # Example
/// ```no_run
/// use ab_source::image::decode_frames;
/// use std::path::Path;
/// let frames = decode_frames(Path::new("assets/landing.gif")).unwrap();
/// assert!(!frames.is_empty());
/// ```
pub fn decode_frames(path: &Path) -> Result<Vec<TimedFrame>> {
    let is_gif = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gif"));

    let frames = if is_gif {
        let file = File::open(path)
            .with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
        let decoder = GifDecoder::new(BufReader::new(file))
            .with_context(|| format!("GIF invalide: {}", path.display()))?;
        decoder
            .into_frames()
            .collect_frames()
            .with_context(|| format!("Décodage GIF échoué: {}", path.display()))?
            .into_iter()
            .map(|frame| {
                let (num, den) = frame.delay().numer_denom_ms();
                let delay = normalize_delay(u64::from(num) / u64::from(den.max(1)));
                let buffer = frame.into_buffer();
                let (width, height) = buffer.dimensions();
                let fb = FrameBuffer {
                    data: buffer.into_raw(),
                    width,
                    height,
                };
                (Arc::new(fb), delay)
            })
            .collect::<Vec<_>>()
    } else {
        let img = image::open(path)
            .with_context(|| format!("Impossible de charger {}", path.display()))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let fb = FrameBuffer {
            data: rgba.into_raw(),
            width,
            height,
        };
        vec![(Arc::new(fb), Duration::ZERO)]
    };

    if frames.is_empty() {
        anyhow::bail!("aucune frame dans {}", path.display());
    }
    Ok(frames)
}

/// Spawne le thread qui rejoue une image fixe ou un GIF en boucle.
///
/// Same protocol as the video worker: `Loaded`, first `Frame`, then paused
/// until `Play`. Frame pacing uses `recv_timeout` so commands stay responsive.
///
/// # Errors
/// Retourne une erreur si le thread OS ne peut pas être créé.
pub fn spawn_image_thread(
    path: PathBuf,
    events: Sender<StreamEvent>,
    cmd_rx: Receiver<StreamCommand>,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("ab-image".to_string())
        .spawn(move || match decode_frames(&path) {
            Ok(frames) => image_loop(&frames, &events, &cmd_rx),
            Err(e) => {
                log::warn!("Thread image: {e:#}");
                let _ = events.send(StreamEvent::Failed(format!("{e:#}")));
            }
        })
        .context("Impossible de spawner le thread image")
}

fn image_loop(frames: &[TimedFrame], events: &Sender<StreamEvent>, cmd_rx: &Receiver<StreamCommand>) {
    let (first, _) = &frames[0];
    let loaded = StreamEvent::Loaded {
        width: first.width,
        height: first.height,
    };
    if events.send(loaded).is_err() || events.send(StreamEvent::Frame(Arc::clone(first))).is_err() {
        return;
    }

    let animated = frames.len() > 1;
    let mut index = 0usize;
    let mut paused = true;

    loop {
        let cmd = if paused || !animated {
            cmd_rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            cmd_rx.recv_timeout(frames[index].1)
        };

        let ack = match cmd {
            Ok(StreamCommand::Quit) | Err(RecvTimeoutError::Disconnected) => return,
            Ok(StreamCommand::Play) => {
                paused = false;
                StreamEvent::Playing
            }
            Ok(StreamCommand::Pause) => {
                paused = true;
                StreamEvent::Paused
            }
            Err(RecvTimeoutError::Timeout) => {
                index = (index + 1) % frames.len();
                StreamEvent::Frame(Arc::clone(&frames[index].0))
            }
        };
        if events.send(ack).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgba, RgbaImage};

    fn write_gif(path: &Path, delays_ms: &[u32]) {
        let file = File::create(path).unwrap();
        let mut encoder = GifEncoder::new(file);
        let frames = delays_ms.iter().enumerate().map(|(i, &ms)| {
            let shade = (i * 200) as u8;
            Frame::from_parts(
                RgbaImage::from_pixel(4, 3, Rgba([shade, shade, shade, 255])),
                0,
                0,
                Delay::from_numer_denom_ms(ms, 1),
            )
        });
        encoder.encode_frames(frames).unwrap();
    }

    #[test]
    fn gif_frames_and_delays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.gif");
        write_gif(&path, &[50, 0]);

        let frames = decode_frames(&path).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!((frames[0].0.width, frames[0].0.height), (4, 3));
        assert_eq!(frames[0].1, Duration::from_millis(50));
        assert_eq!(frames[1].1, DEFAULT_GIF_DELAY);
    }

    #[test]
    fn still_is_single_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255])).save(&path).unwrap();
        let frames = decode_frames(&path).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0.pixel(2, 2), (1, 2, 3, 255));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gif");
        std::fs::write(&path, b"not a gif").unwrap();
        assert!(decode_frames(&path).is_err());
    }

    #[test]
    fn delay_normalization() {
        assert_eq!(normalize_delay(0), DEFAULT_GIF_DELAY);
        assert_eq!(normalize_delay(5), MIN_GIF_DELAY);
        assert_eq!(normalize_delay(80), Duration::from_millis(80));
    }

    #[test]
    fn worker_waits_for_play_then_animates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        write_gif(&path, &[20, 20]);

        let (tx, rx) = flume::bounded(4);
        let (cmd_tx, cmd_rx) = flume::bounded(8);
        let handle = spawn_image_thread(path, tx, cmd_rx).unwrap();
        let timeout = Duration::from_secs(2);

        assert!(matches!(
            rx.recv_timeout(timeout).unwrap(),
            StreamEvent::Loaded { width: 4, height: 3 }
        ));
        assert!(matches!(rx.recv_timeout(timeout).unwrap(), StreamEvent::Frame(_)));
        // Paused: nothing until Play.
        assert!(rx.recv_timeout(Duration::from_millis(60)).is_err());

        cmd_tx.send(StreamCommand::Play).unwrap();
        assert!(matches!(rx.recv_timeout(timeout).unwrap(), StreamEvent::Playing));
        assert!(matches!(rx.recv_timeout(timeout).unwrap(), StreamEvent::Frame(_)));

        cmd_tx.send(StreamCommand::Quit).unwrap();
        drop(rx);
        handle.join().unwrap();
    }
}
