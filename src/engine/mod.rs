//! engine
//!
//! Owns live navigation state and applies instructions to it.
//!
//! # Architecture
//!
//! The [`Navigator`] is the single coordinator for all navigation. Every
//! mutation flows through its dispatch queue:
//!
//! ```text
//! Instruction -> Interceptors -> Route -> Executor hooks -> Containers -> Report
//! ```
//!
//! 1. **Intercept**: Registered interceptors may continue, cancel, or
//!    substitute the instruction
//! 2. **Route**: Opens are routed to a container (walking outward from the
//!    dispatching context) or to the presentation layer
//! 3. **Execute**: The key type's [`binding::Executor`] runs around the
//!    container mutation
//! 4. **Report**: Every observable step lands in a [`report::DispatchReport`]
//!
//! Work produced while handling an instruction (root opens, deeplink
//! children, parent closes, flow steps) is queued and processed in order
//! within the same dispatch. The navigator never re-enters itself.
//!
//! # Invariants
//!
//! - All state mutation happens on the navigator's owner thread
//! - Instruction ids are unique across the whole navigation tree
//! - A destination closes at most once; its pending result resolves at most once
//! - Executors never observe a container mid-mutation
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use wayfinder::core::capabilities::Capability;
//! use wayfinder::core::types::{ContainerKey, ContextId, NavigationKey};
//! use wayfinder::engine::binding::{Binding, BindingRegistry};
//! use wayfinder::engine::container::ContainerSpec;
//! use wayfinder::engine::{Navigator, NavigatorOptions};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Home;
//!
//! impl NavigationKey for Home {
//!     const KEY_TYPE: &'static str = "demo.Home";
//!     const CAPABILITIES: &'static [Capability] = &[Capability::Push];
//! }
//!
//! let mut bindings = BindingRegistry::new();
//! bindings.register(Binding::of::<Home>()?)?;
//!
//! let mut navigator = Navigator::new(bindings, NavigatorOptions::default());
//! navigator.add_root_container(ContainerSpec::new(ContainerKey::new("main")?))?;
//! let report = navigator.push(ContextId::Root, &Home)?;
//! assert_eq!(report.opened().len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binding;
pub mod container;
pub mod flow;
pub mod guard;
pub mod interceptor;
pub mod manager;
pub mod navigator;
pub mod report;
pub mod result;

pub use navigator::Navigator;
pub use report::{DispatchReport, NavigationEvent};

/// Default cap on interceptor substitutions for one instruction.
pub const DEFAULT_MAX_SUBSTITUTIONS: u32 = 10;

/// Runtime options for a [`Navigator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorOptions {
    /// Fail on misrouted instructions and wrong-thread access instead of
    /// logging and degrading.
    pub strict: bool,
    /// How many times interceptors may substitute one instruction before
    /// dispatch fails with `UnreachableState`.
    pub max_substitutions: u32,
}

impl NavigatorOptions {
    /// Strict options.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_substitutions: DEFAULT_MAX_SUBSTITUTIONS,
        }
    }
}
