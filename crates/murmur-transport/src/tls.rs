//! TLS and QUIC endpoint configuration.
//!
//! Both directions are TLS 1.3 only with the ring provider. The server side
//! presents the host [`Identity`]; the client side pins the expected
//! [`PeerId`] through [`PeerIdVerifier`].

use std::sync::Arc;

use murmur_core::{HostError, PeerId};
use quinn::{
    ClientConfig, IdleTimeout, ServerConfig, TransportConfig,
    crypto::rustls::{QuicClientConfig, QuicServerConfig},
};
use rustls::{
    DigitallySignedStruct, SignatureScheme,
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::CryptoProvider,
    pki_types::{CertificateDer, ServerName, UnixTime},
};

use crate::{HostConfig, Identity};

/// ALPN protocol identifier for murmur connections.
pub const ALPN_PROTOCOL: &[u8] = b"murmur";

/// TLS server name carried in certificates and client hellos.
///
/// Peers are identified by fingerprint, so the name is the same for all.
pub const SERVER_NAME: &str = "murmur";

pub(crate) fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Keep-alive and idle settings shared by both directions.
pub(crate) fn transport_config(config: &HostConfig) -> Result<Arc<TransportConfig>, HostError> {
    let idle_timeout = IdleTimeout::try_from(config.idle_timeout).map_err(|e| HostError::Bind {
        addr: config.listen_addr,
        reason: format!("invalid idle timeout: {e}"),
    })?;

    let mut transport = TransportConfig::default();
    transport.keep_alive_interval(Some(config.keep_alive_interval));
    transport.max_idle_timeout(Some(idle_timeout));
    Ok(Arc::new(transport))
}

/// Server configuration presenting `identity`.
pub(crate) fn server_config(
    identity: &Identity,
    provider: Arc<CryptoProvider>,
    transport: Arc<TransportConfig>,
) -> Result<ServerConfig, HostError> {
    let tls_error = |e: rustls::Error| HostError::Identity(format!("invalid TLS config: {e}"));

    let mut tls_config = rustls::ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(tls_error)?
        .with_no_client_auth()
        .with_single_cert(vec![identity.certificate().clone()], identity.private_key())
        .map_err(tls_error)?;

    tls_config.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    let crypto = QuicServerConfig::try_from(tls_config)
        .map_err(|e| HostError::Identity(format!("QUIC config error: {e}")))?;

    let mut server_config = ServerConfig::with_crypto(Arc::new(crypto));
    server_config.transport_config(transport);
    Ok(server_config)
}

/// Client configuration that only accepts the certificate of `peer`.
pub(crate) fn client_config(
    peer: PeerId,
    provider: Arc<CryptoProvider>,
    transport: Arc<TransportConfig>,
) -> Result<ClientConfig, HostError> {
    let dial_error =
        |reason: String| HostError::Dial { peer, reason: format!("invalid TLS config: {reason}") };

    let verifier = PeerIdVerifier { expected: peer, provider: Arc::clone(&provider) };

    let mut tls_config = rustls::ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| dial_error(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();

    tls_config.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    let crypto = QuicClientConfig::try_from(tls_config).map_err(|e| dial_error(e.to_string()))?;

    let mut client_config = ClientConfig::new(Arc::new(crypto));
    client_config.transport_config(transport);
    Ok(client_config)
}

/// Accepts the server certificate only if its fingerprint is `expected`.
///
/// Chain and name validation do not apply to self-signed identities; the
/// fingerprint stands in for both. Handshake signatures are still verified
/// against the presented certificate, so the server must hold its key.
#[derive(Debug)]
struct PeerIdVerifier {
    expected: PeerId,
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for PeerIdVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let presented = PeerId::from_certificate(end_entity.as_ref());
        if presented == self.expected {
            Ok(ServerCertVerified::assertion())
        } else {
            tracing::warn!(expected = %self.expected, %presented, "peer presented wrong identity");
            Err(rustls::Error::InvalidCertificate(
                rustls::CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier_for(identity: &Identity) -> PeerIdVerifier {
        PeerIdVerifier { expected: identity.peer_id(), provider: crypto_provider() }
    }

    fn verify(verifier: &PeerIdVerifier, certificate: &CertificateDer<'_>) -> bool {
        let name = ServerName::try_from(SERVER_NAME).unwrap();
        verifier.verify_server_cert(certificate, &[], &name, &[], UnixTime::now()).is_ok()
    }

    #[test]
    fn pinned_certificate_is_accepted() {
        let identity = Identity::generate().unwrap();
        assert!(verify(&verifier_for(&identity), identity.certificate()));
    }

    #[test]
    fn other_certificate_is_rejected() {
        let expected = Identity::generate().unwrap();
        let impostor = Identity::generate().unwrap();
        assert!(!verify(&verifier_for(&expected), impostor.certificate()));
    }

    #[test]
    fn configs_build_for_generated_identity() {
        let identity = Identity::generate().unwrap();
        let transport = transport_config(&HostConfig::default()).unwrap();

        assert!(server_config(&identity, crypto_provider(), Arc::clone(&transport)).is_ok());
        assert!(client_config(identity.peer_id(), crypto_provider(), transport).is_ok());
    }
}
