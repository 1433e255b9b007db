//! Chat error types.

use std::io;

use thiserror::Error;

use crate::{AddressError, HostError};

/// Errors that end a chat process.
///
/// Everything here is fatal: setup errors happen before any conversation
/// starts, and a dead console leaves no way to drive one.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The `--dest` address did not parse.
    #[error("failed to parse peer address: {0}")]
    Address(#[from] AddressError),

    /// Identity, bind, or dial failure from the host.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The host reported no bound port to advertise.
    #[error("unable to find local port")]
    NoListenPort,

    /// Reading the next line of operator input failed.
    #[error("error reading console input: {0}")]
    Console(#[source] io::Error),

    /// A conversation task panicked or was aborted.
    #[error("conversation task failed: {0}")]
    Task(String),
}
