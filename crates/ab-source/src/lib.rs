/// Visual source modules for backscii (looping video/image streams and the
/// procedural fallback field).

pub mod image;
pub mod procedural;
pub mod stream;
pub mod video;

pub use procedural::FallbackGenerator;
pub use stream::{OfflineSource, StreamSource};
