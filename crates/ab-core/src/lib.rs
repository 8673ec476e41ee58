/// Configuration, types, and shared structures for backscii.
///
/// This crate contains the frame/grid types, the glyph ramp, the seams
/// between pipeline stages (`FrameSource`, `TextSurface`, `Scheduler`) and
/// configuration logic used across the workspace.

pub mod charset;
pub mod config;
pub mod error;
pub mod frame;
pub mod traits;

pub use charset::GlyphRamp;
pub use config::EffectConfig;
pub use error::CoreError;
pub use frame::{BrightnessField, FrameBuffer, GlyphGrid, SampleGrid};
