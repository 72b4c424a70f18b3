//! Engine core: event broadcasting, per-bus sessions, the orchestrator,
//! and the history archiver.

pub mod archiver;
pub mod broadcaster;
pub mod engine;
pub mod session;

pub use broadcaster::{Broadcaster, ObserverId};
pub use engine::Engine;
