//! Wayfinder - a typed navigation engine
//!
//! Wayfinder keeps a tree of open destinations. Each destination is opened
//! by an instruction carrying a typed key, lives in a container of a
//! container manager, and may host nested containers of its own. Closing a
//! destination can deliver a typed result back to the destination that
//! opened it.
//!
//! # Architecture
//!
//! - [`core`] - Domain types: keys, instructions, backstacks, capabilities, config
//! - [`engine`] - The navigator: dispatch, containers, interceptors, results, flows
//! - [`state`] - Serializable snapshots of the navigation tree
//! - [`cli`] - The `wf` scenario runner
//!
//! # Correctness Invariants
//!
//! 1. Every open destination appears in exactly one backstack
//! 2. Instructions are processed one at a time, in the order issued
//! 3. A pending result is delivered at most once
//! 4. Restoring a saved state reproduces the same instruction ids

pub mod cli;
pub mod core;
pub mod engine;
pub mod state;
