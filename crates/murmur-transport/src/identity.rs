//! Self-signed host identity.

use murmur_core::{HostError, PeerId};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use crate::SERVER_NAME;

/// Certificate and key a host presents during the TLS handshake.
///
/// Identities are generated fresh for every process; nothing is persisted,
/// so a restarted listener has a new peer id.
pub struct Identity {
    certificate: CertificateDer<'static>,
    key: PrivatePkcs8KeyDer<'static>,
    peer_id: PeerId,
}

impl Identity {
    /// Generate a new self-signed identity.
    pub fn generate() -> Result<Self, HostError> {
        let certified = rcgen::generate_simple_self_signed(vec![SERVER_NAME.to_string()])
            .map_err(|e| HostError::Identity(e.to_string()))?;

        let certificate = certified.cert.der().clone();
        let key = PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der());
        let peer_id = PeerId::from_certificate(certificate.as_ref());

        tracing::debug!(%peer_id, "generated host identity");
        Ok(Self { certificate, key, peer_id })
    }

    /// Fingerprint of the certificate.
    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// DER-encoded certificate.
    pub fn certificate(&self) -> &CertificateDer<'static> {
        &self.certificate
    }

    pub(crate) fn private_key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(self.key.clone_key())
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity").field("peer_id", &self.peer_id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_is_certificate_fingerprint() {
        let identity = Identity::generate().unwrap();
        assert_eq!(identity.peer_id(), PeerId::from_certificate(identity.certificate().as_ref()));
    }

    #[test]
    fn identities_are_unique() {
        let a = Identity::generate().unwrap();
        let b = Identity::generate().unwrap();
        assert_ne!(a.peer_id(), b.peer_id());
    }
}
