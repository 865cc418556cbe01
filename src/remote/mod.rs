//! Remote runs over TCP.
//!
//! - [`protocol`] - frames and messages shared by both ends
//! - [`server`] - the listening side, serving runs with a [`Runner`](crate::runner::Runner)
//!
//! The client side is [`RemoteProxyExecutor`](crate::runner::RemoteProxyExecutor).

pub mod protocol;
pub mod server;

pub use protocol::{ClientMessage, ProtocolError, ProtocolVersion, ServerMessage};
pub use server::{RemoteRun, RunService, serve};
