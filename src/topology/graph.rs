//! The topology: an ordered dependency graph of resource declarations.
//!
//! The underlying provisioning engine's implicit scene graph is modeled
//! explicitly here. The one ordering guarantee this layer upholds: a node
//! that references another node's output is declared strictly after it.

use crate::error::ComposeError;
use crate::topology::canonical::to_canonical_json;
use crate::topology::node::{HealthCheckSpec, ResourceKind, ResourceNode};
use serde::{Deserialize, Serialize};

/// Dependency-ordered list of resource declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    nodes: Vec<ResourceNode>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node. Fails on a duplicate id or a forward reference.
    pub fn declare(&mut self, node: ResourceNode) -> Result<(), ComposeError> {
        if self.contains(&node.id) {
            return Err(ComposeError::Topology(format!(
                "duplicate node id: {}",
                node.id
            )));
        }
        for dep in &node.depends_on {
            if !self.contains(dep) {
                return Err(ComposeError::Topology(format!(
                    "node {} depends on undeclared node {}",
                    node.id, dep
                )));
            }
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node by id. Returns whether anything was removed.
    ///
    /// Used to prune redundant informational outputs; refuses to remove a
    /// node that other nodes depend on.
    pub fn remove(&mut self, id: &str) -> bool {
        let depended_on = self
            .nodes
            .iter()
            .any(|n| n.depends_on.iter().any(|d| d == id));
        if depended_on {
            return false;
        }
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        self.nodes.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Declaration-ordered view of the plan.
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Amend a declared target group with its health check.
    pub fn configure_health_check(
        &mut self,
        id: &str,
        health_check: HealthCheckSpec,
    ) -> Result<(), ComposeError> {
        match self.get_mut(id) {
            Some(ResourceKind::TargetGroup(spec)) => {
                spec.health_check = Some(health_check);
                Ok(())
            }
            Some(other) => Err(ComposeError::Topology(format!(
                "node {} is a {}, not a target group",
                id,
                other.name()
            ))),
            None => Err(ComposeError::Topology(format!("no such node: {}", id))),
        }
    }

    /// Amend a declared target group's deregistration delay.
    pub fn set_deregistration_delay(
        &mut self,
        id: &str,
        seconds: u32,
    ) -> Result<(), ComposeError> {
        match self.get_mut(id) {
            Some(ResourceKind::TargetGroup(spec)) => {
                spec.deregistration_delay_seconds = Some(seconds);
                Ok(())
            }
            Some(other) => Err(ComposeError::Topology(format!(
                "node {} is a {}, not a target group",
                id,
                other.name()
            ))),
            None => Err(ComposeError::Topology(format!("no such node: {}", id))),
        }
    }

    /// Render the plan as deterministic key-sorted JSON — the artifact an
    /// external provisioning engine would consume.
    pub fn render_canonical(&self) -> Result<String, ComposeError> {
        to_canonical_json(self)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut ResourceKind> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .map(|n| &mut n.kind)
    }
}
