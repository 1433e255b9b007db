//! Murmur chat binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen and print the address to share
//! murmur --port 4001
//!
//! # Dial the address printed by the listener
//! murmur --dest /ip4/127.0.0.1/udp/4001/quic-v1/p2p/<peer-id>
//! ```

mod console;

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use murmur_core::{ChatError, ConsoleSink, Controller, HandlerRegistry, Role};
use murmur_transport::{HostConfig, Identity, QuicHost};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::console::{StdinSource, StdoutSink};

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "warn";

/// Peer-to-peer terminal chat
#[derive(Parser, Debug)]
#[command(name = "murmur")]
#[command(about = "Peer-to-peer terminal chat over QUIC")]
#[command(version)]
struct Args {
    /// UDP port to listen on (0 picks a free port)
    #[arg(long, default_value_t = 0)]
    port: u16,

    /// Address of the peer to dial; listen for a peer when empty
    #[arg(long, default_value = "")]
    dest: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let sink = Arc::new(StdoutSink);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            sink.alert(&format!("failed to start runtime: {e}"));
            return ExitCode::FAILURE;
        },
    };

    let result = runtime.block_on(run(args, sink.clone()));

    // A pending stdin read occupies a blocking thread that only returns on the
    // next keystroke.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            sink.alert(&diagnostic(&e));
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args, sink: Arc<dyn ConsoleSink>) -> Result<(), ChatError> {
    let (role, host) = setup(&args, sink.as_ref())?;

    Controller::new(Arc::new(host), StdinSource::default(), sink).run(role, interrupted()).await
}

/// Select the role, create the identity and bind the host.
///
/// `--dest` is parsed first so a malformed address never touches the network.
/// Must be called from within a Tokio runtime.
fn setup(args: &Args, sink: &dyn ConsoleSink) -> Result<(Role, QuicHost), ChatError> {
    let role = Role::from_dest(&args.dest)?;
    if let Role::Dialer(target) = &role {
        sink.notice(&format!("Parsed peer address {target}"));
    }

    let identity = Identity::generate()?;
    sink.notice("Created identity key pair");

    let host = QuicHost::listen(
        &HostConfig::with_port(args.port),
        &identity,
        Arc::new(HandlerRegistry::new()),
    )?;
    sink.notice(&format!("Created host with peer ID {}", identity.peer_id()));

    tracing::info!(peer_id = %identity.peer_id(), ?role, "murmur starting");
    Ok((role, host))
}

/// Resolve on ctrl-C.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Operator-facing text for a fatal error.
fn diagnostic(error: &ChatError) -> String {
    match error {
        ChatError::Console(e) => format!("Error reading input from stdin: {e}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use murmur_core::{AddressError, Host};
    use murmur_harness::ConsoleRecorder;

    use super::*;

    #[test]
    fn defaults_select_listener_on_any_port() {
        let args = Args::try_parse_from(["murmur"]).unwrap();
        assert_eq!(args.port, 0);
        assert_eq!(Role::from_dest(&args.dest).unwrap(), Role::Listener);
    }

    #[test]
    fn dest_selects_dialer() {
        let dest = format!("/ip4/127.0.0.1/udp/4001/quic-v1/p2p/{}", "ab".repeat(32));
        let args = Args::try_parse_from(["murmur", "--port", "4002", "--dest", &dest]).unwrap();

        assert_eq!(args.port, 4002);
        assert!(matches!(Role::from_dest(&args.dest).unwrap(), Role::Dialer(_)));
    }

    #[test]
    fn invalid_port_is_a_usage_error() {
        assert!(Args::try_parse_from(["murmur", "--port", "70000"]).is_err());
        assert!(Args::try_parse_from(["murmur", "--port", "many"]).is_err());
    }

    #[test]
    fn help_is_reported_as_display_help() {
        let err = Args::try_parse_from(["murmur", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[tokio::test]
    async fn listener_setup_reports_identity_and_host() {
        let console = ConsoleRecorder::new();
        let args = Args::try_parse_from(["murmur"]).unwrap();

        let (role, host) = setup(&args, console.as_ref()).unwrap();

        assert_eq!(role, Role::Listener);
        assert_eq!(
            console.notices(),
            vec![
                "Created identity key pair".to_string(),
                format!("Created host with peer ID {}", host.peer_id()),
            ]
        );
        host.close().await;
    }

    #[tokio::test]
    async fn dialer_setup_reports_parsed_address_first() {
        let console = ConsoleRecorder::new();
        let dest = format!("/ip4/127.0.0.1/udp/4001/quic-v1/p2p/{}", "ab".repeat(32));
        let args = Args::try_parse_from(["murmur", "--dest", &dest]).unwrap();

        let (_role, host) = setup(&args, console.as_ref()).unwrap();

        let notices = console.notices();
        assert_eq!(notices.len(), 3);
        assert_eq!(notices[0], format!("Parsed peer address {dest}"));
        host.close().await;
    }

    #[tokio::test]
    async fn malformed_dest_reports_nothing() {
        let console = ConsoleRecorder::new();
        let args = Args::try_parse_from(["murmur", "--dest", " "]).unwrap();

        let result = setup(&args, console.as_ref());

        assert!(matches!(result, Err(ChatError::Address(AddressError::MissingLeadingSlash))));
        assert!(console.events().is_empty());
    }

    #[test]
    fn console_failure_names_stdin() {
        let error = ChatError::Console(io::Error::other("closed"));
        assert_eq!(diagnostic(&error), "Error reading input from stdin: closed");
    }

    #[test]
    fn other_failures_use_their_message() {
        let error = ChatError::Address(AddressError::MissingLeadingSlash);
        assert_eq!(diagnostic(&error), error.to_string());
        assert_eq!(diagnostic(&ChatError::NoListenPort), "unable to find local port");
    }
}
