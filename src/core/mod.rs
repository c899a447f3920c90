//! core
//!
//! Core domain types, schemas, and value operations for Wayfinder.
//!
//! # Modules
//!
//! - [`types`] - Strong types: KeyType, ContainerKey, InstructionId, AnyKey, etc.
//! - [`capabilities`] - Key capability markers and descriptors
//! - [`instruction`] - The instruction and direction model
//! - [`backstack`] - Immutable ordered history of open instructions
//! - [`errors`] - Navigation error taxonomy
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at construction time
//! - Everything here is a value; mutation lives in the engine
//! - Schemas are strict and self-describing

pub mod backstack;
pub mod capabilities;
pub mod config;
pub mod errors;
pub mod instruction;
pub mod types;
