//! toolbridge — watches AI-chat pages for embedded tool-invocation markup,
//! executes each call exactly once against a local execution service, and
//! writes the result back into the conversation.
//!
//! The member crates carry the mechanics; this crate wires them into a
//! running [`Bridge`] per attached page and provides the CLI.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod detector;
pub mod executor;
pub mod sites;

pub use crate::bridge::{Bridge, PagePorts};
pub use crate::config::BridgeConfig;
pub use crate::detector::CallDetector;
pub use crate::executor::RemoteExecutor;
