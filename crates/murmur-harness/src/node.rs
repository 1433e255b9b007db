//! Whole chat processes inside the simulation.

use std::{future::Future, sync::Arc};

use murmur_core::{ChatError, Controller, HandlerRegistry, PeerAddress, Role};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::{ConsoleRecorder, ConsoleScript, ScriptedConsole, SimHost};

/// Run one chat process as the simulated host `name`.
///
/// Mirrors the binary: the role is decided from `dest` before the host is
/// bound, and the process runs until its lifetime ends.
pub async fn run_node<F>(
    name: &str,
    port: u16,
    dest: &str,
    source: ScriptedConsole,
    sink: Arc<ConsoleRecorder>,
    interrupt: F,
) -> Result<(), ChatError>
where
    F: Future<Output = ()> + Send,
{
    let role = Role::from_dest(dest)?;
    let host = SimHost::bind(name, port, Arc::new(HandlerRegistry::new())).await?;

    Controller::new(Arc::new(host), source, sink).run(role, interrupt).await
}

/// Test-side view of a simulated chat process.
///
/// Clones share the console and the interrupt.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    port: u16,
    script: ConsoleScript,
    console: Arc<ConsoleRecorder>,
    interrupt: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

/// The process half of a [`Node`], consumed by running it.
#[derive(Debug)]
pub struct NodeProcess {
    name: String,
    port: u16,
    source: ScriptedConsole,
    console: Arc<ConsoleRecorder>,
    interrupted: oneshot::Receiver<()>,
}

impl Node {
    /// Create a node called `name` that will listen on `port`.
    pub fn new(name: &str, port: u16) -> (Self, NodeProcess) {
        let (source, script) = ScriptedConsole::new();
        let console = ConsoleRecorder::new();
        let (interrupt, interrupted) = oneshot::channel();

        let node = Self {
            name: name.to_string(),
            port,
            script,
            console: Arc::clone(&console),
            interrupt: Arc::new(Mutex::new(Some(interrupt))),
        };
        let process =
            NodeProcess { name: name.to_string(), port, source, console, interrupted };

        (node, process)
    }

    /// Simulated host name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operator input.
    pub fn script(&self) -> &ConsoleScript {
        &self.script
    }

    /// Operator display.
    pub fn console(&self) -> &ConsoleRecorder {
        &self.console
    }

    /// Address other nodes dial to reach this one.
    ///
    /// Must be called from inside the simulation.
    pub fn address(&self) -> PeerAddress {
        SimHost::address_of(&self.name, self.port)
    }

    /// Deliver the external interrupt (ctrl-C).
    pub fn interrupt(&self) {
        if let Some(interrupt) = self.interrupt.lock().take() {
            let _ = interrupt.send(());
        }
    }
}

impl NodeProcess {
    /// Run the process with the given `--dest` value.
    pub async fn run(self, dest: &str) -> Result<(), ChatError> {
        let interrupted = self.interrupted;
        let interrupt = async move {
            if interrupted.await.is_err() {
                // Every node handle is gone; nobody can interrupt any more.
                std::future::pending::<()>().await;
            }
        };

        run_node(&self.name, self.port, dest, self.source, self.console, interrupt).await
    }
}
