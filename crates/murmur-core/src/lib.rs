//! Murmur core
//!
//! Transport-agnostic core of the murmur peer-to-peer chat. Decides whether
//! a process listens for a peer or dials one, and runs the duplex line loops
//! of a single conversation over whatever byte stream the [`Host`] provides.
//!
//! # Architecture
//!
//! Network I/O lives behind the [`Host`] trait. A host owns an injected
//! [`HandlerRegistry`] (inbound protocol handlers) and a [`PeerDirectory`]
//! (where to find peers before dialing). Both sides agree on a
//! [`ProtocolTag`] through a small line-based negotiation on every new
//! stream, after which the stream becomes a [`Transcript`].
//!
//! # Components
//!
//! - [`Controller`]: Role selection and setup for listener and dialer
//! - [`Conversation`]: One inbound and one outbound loop over a transcript
//! - [`Transcript`]: Buffered line reader and writer over a raw stream
//! - [`Lifetime`]: Keeps the process alive until an exit is requested
//! - [`Shutdown`]: Cloneable cancellation signal shared by loops
//! - [`ConsoleSource`] / [`ConsoleSink`]: Operator input and display

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod address;
pub mod console;
mod controller;
mod conversation;
mod directory;
mod error;
mod host;
mod inbound;
mod lifetime;
pub mod negotiate;
mod outbound;
mod protocol;
mod registry;
mod shutdown;
mod stream;
mod transcript;

pub use address::{AddressError, PEER_ID_LEN, PeerAddress, PeerId};
pub use console::{ConsoleSink, ConsoleSource};
pub use controller::{Controller, Role, advertised_address};
pub use conversation::{Conversation, ConversationEnd};
pub use directory::{PeerDirectory, Ttl};
pub use error::ChatError;
pub use host::{Host, HostError};
pub use inbound::{InboundEnd, run_inbound};
pub use lifetime::{Exit, Lifetime, LifetimeHandle};
pub use outbound::{OutboundEnd, run_outbound};
pub use protocol::{CHAT_PROTOCOL, MAX_TAG_LEN, ProtocolTag, ProtocolTagError};
pub use registry::{HandlerRegistry, StreamHandler};
pub use shutdown::Shutdown;
pub use stream::{BoxedReader, BoxedWriter, RawStream};
pub use transcript::{Line, MAX_LINE_BYTES, Transcript, TranscriptReader, TranscriptWriter};
