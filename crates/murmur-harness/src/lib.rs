//! Deterministic simulation harness for murmur.
//!
//! Turmoil-based [`Host`](murmur_core::Host) and scripted console for
//! driving whole chat processes through end-to-end scenarios without real
//! sockets or a terminal.
//!
//! # Components
//!
//! - [`SimHost`]: host over turmoil's simulated TCP
//! - [`ScriptedConsole`] / [`ConsoleScript`]: operator input fed by the test
//! - [`ConsoleRecorder`]: operator display captured as [`ConsoleEvent`]s
//! - [`run_node`]: one chat process, wired the way the binary wires it

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod console;
pub mod node;
pub mod sim_host;

pub use console::{ConsoleEvent, ConsoleRecorder, ConsoleScript, ScriptedConsole, WAIT_LIMIT};
pub use node::{Node, NodeProcess, run_node};
pub use sim_host::SimHost;
