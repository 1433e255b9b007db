//! Setup failures that happen before any network traffic.

use std::{future, sync::Arc};

use murmur_core::{
    AddressError, CHAT_PROTOCOL, ChatError, ConsoleSink, Controller, HandlerRegistry, Host, Role,
};
use murmur_harness::{ConsoleEvent, ConsoleRecorder, ScriptedConsole, SimHost, run_node};

#[tokio::test]
async fn malformed_dest_fails_before_binding() {
    let (source, _script) = ScriptedConsole::new();
    let console = ConsoleRecorder::new();

    // Binding would need a running simulation; reaching it would panic.
    let result =
        run_node("node", 4001, "not-an-address", source, Arc::clone(&console), future::pending())
            .await;

    assert!(matches!(result, Err(ChatError::Address(AddressError::MissingLeadingSlash))));
    assert!(console.events().is_empty());
}

#[tokio::test]
async fn whitespace_dest_is_dialed_and_fails_to_parse() {
    let (source, _script) = ScriptedConsole::new();
    let console = ConsoleRecorder::new();

    let result = run_node("node", 4001, "   ", source, Arc::clone(&console), future::pending()).await;

    assert!(matches!(result, Err(ChatError::Address(AddressError::MissingLeadingSlash))));
    assert!(console.events().is_empty());
}

#[tokio::test]
async fn listener_without_bound_port_fails() {
    let (source, _script) = ScriptedConsole::new();
    let console = ConsoleRecorder::new();
    let handlers = Arc::new(HandlerRegistry::new());
    let host = Arc::new(SimHost::detached("node", Arc::clone(&handlers)));

    let sink: Arc<dyn ConsoleSink> = console.clone();

    let result = Controller::new(host, source, sink)
        .run(Role::Listener, future::pending())
        .await;

    assert!(matches!(result, Err(ChatError::NoListenPort)));
    assert!(!console.events().iter().any(|e| matches!(e, ConsoleEvent::Notice(_))));
    // The chat handler was installed before the address lookup failed.
    assert!(handlers.get(&CHAT_PROTOCOL).is_some());
}

#[tokio::test]
async fn detached_host_has_no_addresses() {
    let host = SimHost::detached("node", Arc::new(HandlerRegistry::new()));

    assert!(host.listen_addresses().is_empty());
    assert_eq!(host.peer_id(), SimHost::peer_id_of("node"));
}
