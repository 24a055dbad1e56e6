//! Plugin-side implementation of the Core Lightning plugin wire protocol:
//! a codec for the host's JSON object stream, option declarations, the
//! `getmanifest`/`init` handshake and the message-dispatch loop.

pub mod codec;
mod logging;
pub mod options;
pub mod plugin;

pub use plugin::{Builder, Configuration, ConfiguredPlugin, Plugin};
