/// ASCII conversion engine for backscii.
///
/// Samples decoded frames down to the fixed grid and maps brightness to
/// glyphs. Everything here is pure apart from the sampler's scratch buffers.
pub mod luminance;
pub mod mapper;
pub mod sampler;
