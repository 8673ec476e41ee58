/// Rendering side of backscii.
///
/// Owns the glyph renderer (grid → text surface), the in-memory `<pre>`-like
/// surface and its ratatui drawing, plus the FPS counter.
pub mod canvas;
pub mod fps;
pub mod renderer;
pub mod surface;
pub mod ui;

pub use renderer::GlyphRenderer;
pub use surface::PreSurface;
