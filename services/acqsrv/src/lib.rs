//! GridLink acquisition service.
//!
//! Polls Modbus RTU slaves over per-node serial buses, caches the latest
//! typed sample per tag, archives samples periodically, and streams
//! state/value/message events to subscribed observers. See the `core`
//! module for the engine, `modbus` for the protocol stack, and `api` for
//! the control surface.

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod modbus;
pub mod transport;

pub use crate::config::ServiceConfig;
pub use crate::core::{Broadcaster, Engine};
pub use crate::error::{AcqError, Result};
