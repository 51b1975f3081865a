// ============================
// crates/backend-lib/src/rpc/mod.rs
// ============================
//! Account RPC between the gateway and the account service.
//!
//! Requests and responses are the tagged JSON messages from
//! `kalenderium_common`, posted to a single endpoint.

pub mod client;
pub mod server;

pub use client::RpcAccountClient;
pub use server::{account_router, dispatch};

/// Path of the account RPC endpoint
pub const ACCOUNT_RPC_PATH: &str = "/rpc/account";
