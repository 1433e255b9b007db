//! Murmur QUIC transport
//!
//! [`QuicHost`] implements [`murmur_core::Host`] on top of Quinn. Every
//! process holds a self-signed [`Identity`]; its certificate fingerprint is
//! the [`PeerId`](murmur_core::PeerId) that appears in peer addresses.
//!
//! # Security
//!
//! Connections use TLS 1.3 with ALPN `murmur`. There is no certificate
//! authority: a dialer accepts exactly the certificate whose fingerprint
//! matches the peer id it was asked to dial, and still checks the handshake
//! signature against it. Listeners do not authenticate dialers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod host;
mod identity;
mod tls;

pub use config::HostConfig;
pub use host::QuicHost;
pub use identity::Identity;
pub use tls::{ALPN_PROTOCOL, SERVER_NAME};
