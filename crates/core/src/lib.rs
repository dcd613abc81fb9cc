//! Runtime primitives shared by the auth, infra and API layers.
//!
//! This crate has no knowledge of HTTP, users or the game backend.

pub mod bridge;

pub use bridge::{BridgeCall, BridgeError, CancelOnDrop, Canceller, Completion, await_callback};
