//! Inbound protocol handler registry.
//!
//! Hosts own one registry each and consult it whenever a remote peer opens a
//! stream. The registry is created by the caller and injected into the host,
//! so tests can share one between a fake transport and the code under test.

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::RwLock;

use crate::{ProtocolTag, RawStream};

/// Callback invoked with each accepted stream for a protocol.
///
/// Runs on the host's accept task, so it must hand long-lived work off to a
/// spawned task rather than block.
pub type StreamHandler = Arc<dyn Fn(RawStream) + Send + Sync>;

/// Map of protocol tag to inbound stream handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<ProtocolTag, StreamHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `tag`.
    ///
    /// Returns `true` if a previous handler for the same tag was replaced.
    pub fn set(&self, tag: ProtocolTag, handler: StreamHandler) -> bool {
        self.handlers.write().insert(tag, handler).is_some()
    }

    /// Handler registered for `tag`, if any.
    pub fn get(&self, tag: &ProtocolTag) -> Option<StreamHandler> {
        self.handlers.read().get(tag).cloned()
    }

    /// Remove the handler for `tag`. Returns `true` if one was registered.
    pub fn remove(&self, tag: &ProtocolTag) -> bool {
        self.handlers.write().remove(tag).is_some()
    }

    /// Tags that currently have a handler.
    pub fn protocols(&self) -> Vec<ProtocolTag> {
        self.handlers.read().keys().cloned().collect()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry").field("protocols", &self.protocols()).finish()
    }
}
