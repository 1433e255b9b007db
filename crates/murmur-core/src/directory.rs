//! Peer directory.
//!
//! Tells a host where a peer can be reached before it dials. Entries carry a
//! time-to-live; expired entries are treated as unknown.

use std::{collections::HashMap, net::SocketAddr, time::Duration};

use parking_lot::RwLock;
use tokio::time::Instant;

use crate::PeerId;

/// How long a directory entry stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Never expires.
    Permanent,
    /// Expires after the given duration.
    For(Duration),
}

#[derive(Debug, Clone)]
struct Entry {
    addresses: Vec<SocketAddr>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Known network locations of peers, keyed by peer id.
#[derive(Debug, Default)]
pub struct PeerDirectory {
    entries: RwLock<HashMap<PeerId, Entry>>,
}

impl PeerDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record where `peer` can be reached, replacing any previous entry.
    pub fn register(
        &self,
        peer: PeerId,
        addresses: impl IntoIterator<Item = SocketAddr>,
        ttl: Ttl,
    ) {
        let mut unique = Vec::new();
        for address in addresses {
            if !unique.contains(&address) {
                unique.push(address);
            }
        }
        let addresses = unique;

        let expires_at = match ttl {
            Ttl::Permanent => None,
            Ttl::For(duration) => Some(Instant::now() + duration),
        };

        tracing::debug!(?peer, ?addresses, ?ttl, "registered peer addresses");
        self.entries.write().insert(peer, Entry { addresses, expires_at });
    }

    /// Addresses for `peer`, empty if unknown or expired.
    pub fn addresses(&self, peer: &PeerId) -> Vec<SocketAddr> {
        let now = Instant::now();
        self.entries
            .read()
            .get(peer)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.addresses.clone())
            .unwrap_or_default()
    }

    /// Drop the entry for `peer`. Returns `true` if one existed.
    pub fn forget(&self, peer: &PeerId) -> bool {
        self.entries.write().remove(peer).is_some()
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}
