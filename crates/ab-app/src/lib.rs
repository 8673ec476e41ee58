/// Host side of backscii: the effect session, its scheduler, the terminal
/// application and config hot reload.
pub mod app;
pub mod cli;
pub mod hotreload;
pub mod scheduler;
pub mod session;

pub use scheduler::FrameLoop;
pub use session::EffectSession;
