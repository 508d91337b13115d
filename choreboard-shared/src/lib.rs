//! # Choreboard Shared Library
//!
//! This crate contains the types and infrastructure shared by the Choreboard
//! client: data models, the remote service contract with its backends, the
//! on-device key-value store, and authentication primitives.
//!
//! ## Module Organization
//!
//! - `models`: Table rows and view models (users, houses, members, chores)
//! - `remote`: Remote service trait, query model, REST and in-memory backends
//! - `storage`: Key-value store trait with memory and file implementations
//! - `auth`: Session tokens, password hashing and session persistence

pub mod auth;
pub mod models;
pub mod remote;
pub mod storage;

/// Current version of the Choreboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
