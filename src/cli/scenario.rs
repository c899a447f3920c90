//! cli::scenario
//!
//! Declarative navigation scenarios for `wf replay`.
//!
//! # Format
//!
//! ```json
//! {
//!   "keys": [
//!     { "type": "app.Home", "capabilities": ["push"] },
//!     { "type": "app.Tabs", "capabilities": ["push"],
//!       "containers": [ { "key": "tab", "accepts": ["app.Feed"], "root": { "type": "app.Feed" } } ] },
//!     { "type": "app.Feed", "capabilities": ["push"] },
//!     { "type": "app.Pick", "capabilities": ["present", "result"], "result": "app.Color" }
//!   ],
//!   "containers": [ { "key": "main", "root": { "type": "app.Home" } } ],
//!   "steps": [
//!     { "op": "push", "key": { "type": "app.Tabs" } },
//!     { "op": "present", "key": { "type": "app.Pick" } },
//!     { "op": "close_with_result", "result": { "type": "app.Color", "value": "blue" } }
//!   ]
//! }
//! ```
//!
//! Every step is dispatched from the deepest active destination at the
//! time it runs. Key types use the tracing executor, so `--debug` shows
//! every executor hook.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use serde::{Deserialize, Serialize};

use crate::core::capabilities::{Capability, CapabilitySet, KeyDescriptor};
use crate::core::instruction::{Direction, Instruction};
use crate::core::types::{AnyKey, AnyResult, ContainerKey, ContextId, KeyType, ResultType};
use crate::engine::binding::{Binding, BindingRegistry, CloseRequestPolicy, TracingExecutor};
use crate::engine::container::{AcceptPolicy, ContainerSpec, EmptyBehavior, Placement};
use crate::engine::{DispatchReport, Navigator, NavigatorOptions};

/// A replayable scenario.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Key types and their bindings
    #[serde(default)]
    pub keys: Vec<KeyManifest>,
    /// Top-level containers, the first one active
    #[serde(default)]
    pub containers: Vec<ContainerManifest>,
    /// Steps, applied in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One key type.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeyManifest {
    #[serde(rename = "type")]
    pub key_type: KeyType,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// Result type produced when the destination closes
    #[serde(default)]
    pub result: Option<ResultType>,
    /// Containers created inside each destination of this type
    #[serde(default)]
    pub containers: Vec<ContainerManifest>,
    /// Refuse close requests
    #[serde(default)]
    pub veto_close: bool,
}

/// One container.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerManifest {
    pub key: ContainerKey,
    /// Accepted key types; empty accepts everything
    #[serde(default)]
    pub accepts: Vec<KeyType>,
    #[serde(default)]
    pub empty_behavior: EmptyBehaviorManifest,
    #[serde(default)]
    pub root: Option<AnyKey>,
}

/// Declarable empty behaviors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyBehaviorManifest {
    #[default]
    AllowEmpty,
    CloseParent,
    ForceCloseParent,
}

/// One step.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Push { key: AnyKey },
    Present { key: AnyKey },
    ReplaceRoot { key: AnyKey },
    Close,
    CloseWithResult { result: AnyResult },
    RequestClose,
    SetActive { container: ContainerKey },
}

impl Step {
    /// Stable name of the step.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Push { .. } => "push",
            Step::Present { .. } => "present",
            Step::ReplaceRoot { .. } => "replace_root",
            Step::Close => "close",
            Step::CloseWithResult { .. } => "close_with_result",
            Step::RequestClose => "request_close",
            Step::SetActive { .. } => "set_active",
        }
    }
}

/// What one step did.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub from: ContextId,
    pub report: DispatchReport,
}

impl ContainerManifest {
    fn to_spec(&self) -> ContainerSpec {
        let accept = if self.accepts.is_empty() {
            AcceptPolicy::All
        } else {
            AcceptPolicy::KeyTypes(self.accepts.iter().cloned().collect::<BTreeSet<_>>())
        };
        let behavior = match self.empty_behavior {
            EmptyBehaviorManifest::AllowEmpty => EmptyBehavior::AllowEmpty,
            EmptyBehaviorManifest::CloseParent => EmptyBehavior::CloseParent,
            EmptyBehaviorManifest::ForceCloseParent => EmptyBehavior::ForceCloseParent,
        };
        let spec = ContainerSpec::new(self.key.clone())
            .accept(accept)
            .empty_behavior(behavior);
        match &self.root {
            Some(root) => spec.root(root.clone()),
            None => spec,
        }
    }
}

impl KeyManifest {
    fn to_binding(&self) -> Binding {
        let capabilities: CapabilitySet = self.capabilities.iter().copied().collect();
        let mut descriptor = KeyDescriptor::new(self.key_type.clone(), capabilities);
        if let Some(result) = &self.result {
            descriptor = descriptor.with_result(result.clone());
        }
        let mut binding = Binding::new(descriptor).executor(TracingExecutor);
        for container in &self.containers {
            binding = binding.container(container.to_spec());
        }
        if self.veto_close {
            binding = binding.close_request(CloseRequestPolicy::Veto);
        }
        binding
    }
}

impl Scenario {
    /// Load a scenario file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    /// Build the binding registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a key type is declared twice.
    pub fn bindings(&self) -> Result<BindingRegistry> {
        let mut registry = BindingRegistry::new();
        for key in &self.keys {
            registry
                .register(key.to_binding())
                .with_context(|| format!("Invalid key declaration '{}'", key.key_type))?;
        }
        Ok(registry)
    }

    /// Build a navigator with the scenario's bindings and root containers.
    ///
    /// # Errors
    ///
    /// Returns an error if a binding or container is invalid, or a root
    /// fails to open.
    pub fn navigator(&self, options: NavigatorOptions) -> Result<Navigator> {
        let mut navigator = Navigator::new(self.bindings()?, options);
        for container in &self.containers {
            navigator
                .add_root_container(container.to_spec())
                .with_context(|| format!("Failed to add container '{}'", container.key))?;
        }
        Ok(navigator)
    }

    /// Apply every step in order.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first step that fails.
    pub fn replay(&self, navigator: &mut Navigator) -> Result<Vec<StepOutcome>> {
        let mut outcomes = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let from = navigator.deepest_active();
            let report = apply_step(navigator, from, step)
                .with_context(|| format!("Step {} ({}) failed", index + 1, step.name()))?;
            outcomes.push(StepOutcome {
                index: index + 1,
                op: step.name(),
                from,
                report,
            });
        }
        Ok(outcomes)
    }
}

fn apply_step(navigator: &mut Navigator, from: ContextId, step: &Step) -> Result<DispatchReport> {
    let report = match step {
        Step::Push { key } => navigator.open_key(from, Direction::Push, key.clone())?,
        Step::Present { key } => navigator.open_key(from, Direction::Present, key.clone())?,
        Step::ReplaceRoot { key } => {
            navigator.open_key(from, Direction::ReplaceRoot, key.clone())?
        }
        Step::Close => navigator.close(from)?,
        Step::CloseWithResult { result } => navigator.dispatch(
            from,
            Instruction::CloseWithResult {
                result: result.clone(),
            },
        )?,
        Step::RequestClose => navigator.request_close(from)?,
        Step::SetActive { container } => {
            let owner = container_owner(navigator, from, container)?;
            navigator.set_active(owner, container)?
        }
    };
    Ok(report)
}

/// The nearest context owning a container, walking outward from `from`.
fn container_owner(
    navigator: &Navigator,
    from: ContextId,
    container: &ContainerKey,
) -> Result<ContextId> {
    let mut current = Some(from);
    while let Some(context) = current {
        if navigator
            .manager(context)
            .is_some_and(|m| m.contains(container))
        {
            return Ok(context);
        }
        current = match navigator.placement(context) {
            Some(Placement::Container { context, .. }) => Some(*context),
            Some(Placement::Presentation) => Some(ContextId::Root),
            None => None,
        };
    }
    bail!("No context above {from} owns container '{container}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABS: &str = r#"{
        "keys": [
            { "type": "app.Home", "capabilities": ["push"] },
            { "type": "app.Tabs", "capabilities": ["push"],
              "containers": [
                { "key": "first", "accepts": ["app.Feed"], "root": { "type": "app.Feed" } },
                { "key": "second", "accepts": ["app.Feed"] }
              ] },
            { "type": "app.Feed", "capabilities": ["push"] },
            { "type": "app.Pick", "capabilities": ["present", "result"], "result": "app.Color" }
        ],
        "containers": [ { "key": "main", "accepts": ["app.Home", "app.Tabs"], "root": { "type": "app.Home" } } ],
        "steps": [
            { "op": "push", "key": { "type": "app.Tabs" } },
            { "op": "set_active", "container": "second" },
            { "op": "present", "key": { "type": "app.Pick" } },
            { "op": "close_with_result", "result": { "type": "app.Color", "value": "blue" } }
        ]
    }"#;

    fn parse(json: &str) -> Scenario {
        serde_json::from_str(json).unwrap()
    }

    mod manifest {
        use super::*;

        #[test]
        fn parses_all_sections() {
            let scenario = parse(TABS);
            assert_eq!(scenario.keys.len(), 4);
            assert_eq!(scenario.containers.len(), 1);
            assert_eq!(scenario.steps[1].name(), "set_active");
        }

        #[test]
        fn unknown_fields_rejected() {
            let result: Result<Scenario, _> = serde_json::from_str(r#"{"kyes": []}"#);
            assert!(result.is_err());
        }

        #[test]
        fn duplicate_key_types_rejected() {
            let scenario = parse(
                r#"{"keys": [
                    {"type": "app.A", "capabilities": ["push"]},
                    {"type": "app.A", "capabilities": ["present"]}
                ]}"#,
            );
            assert!(scenario.bindings().is_err());
        }

        #[test]
        fn empty_accepts_means_all() {
            let manifest = ContainerManifest {
                key: ContainerKey::new("c").unwrap(),
                accepts: vec![],
                empty_behavior: EmptyBehaviorManifest::default(),
                root: None,
            };
            let spec = manifest.to_spec();
            let key = AnyKey::new(KeyType::new("x.Y").unwrap(), serde_json::Value::Null);
            assert!(crate::engine::container::Container::from_spec(spec).accepts(&key));
        }
    }

    mod replay {
        use super::*;

        #[test]
        fn steps_run_from_deepest_active() {
            let scenario = parse(TABS);
            let mut navigator = scenario.navigator(NavigatorOptions::default()).unwrap();
            let outcomes = scenario.replay(&mut navigator).unwrap();
            assert_eq!(outcomes.len(), 4);

            // set_active ran from the feed inside the tabs destination
            let tabs = outcomes[0].report.opened()[0];
            let manager = navigator.manager(ContextId::from(tabs)).unwrap();
            assert_eq!(manager.active_key().unwrap().as_str(), "second");

            // the picker was presented and closed again
            assert!(navigator.presented().backstack().is_empty());
            assert_eq!(outcomes[3].report.closed().len(), 1);
        }

        #[test]
        fn failing_step_is_named() {
            let scenario = parse(
                r#"{
                    "keys": [ { "type": "app.Home", "capabilities": ["push"] } ],
                    "containers": [ { "key": "main" } ],
                    "steps": [ { "op": "present", "key": { "type": "app.Home" } } ]
                }"#,
            );
            let mut navigator = scenario.navigator(NavigatorOptions::default()).unwrap();
            let error = scenario.replay(&mut navigator).unwrap_err();
            assert!(format!("{error:#}").contains("Step 1 (present)"));
        }

        #[test]
        fn set_active_unknown_container_fails() {
            let mut navigator = parse(TABS).navigator(NavigatorOptions::default()).unwrap();
            let step = Step::SetActive {
                container: ContainerKey::new("nowhere").unwrap(),
            };
            assert!(apply_step(&mut navigator, ContextId::Root, &step).is_err());
        }
    }
}
