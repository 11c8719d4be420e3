use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Entity;

// ─── RoutingAction ────────────────────────────────────────────────────────

/// What a routing request does to the target step's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingAction {
    /// Enqueue the artifacts into the target step.
    Assign,
    /// Remove the artifacts from the target step's queue. The artifacts
    /// themselves are untouched.
    Unassign,
}

impl RoutingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingAction::Assign => "assign",
            RoutingAction::Unassign => "unassign",
        }
    }
}

// ─── LimsClient ───────────────────────────────────────────────────────────

/// The LIMS seen as three operations: fetch one entity, fetch a batch, and
/// submit a routing request. Everything above this trait — history
/// traversal, routing, sample operations — is written against it, so tests
/// inject in-memory implementations and never touch the network.
#[async_trait]
pub trait LimsClient: Send + Sync {
    /// Fetch the entity at `uri`.
    async fn fetch(&self, uri: &str) -> Result<Entity>;

    /// Fetch several entities. The returned order matches the input order.
    async fn fetch_many(&self, uris: &[String]) -> Result<Vec<Entity>> {
        let mut entities = Vec::with_capacity(uris.len());
        for uri in uris {
            entities.push(self.fetch(uri).await?);
        }
        Ok(entities)
    }

    /// Submit one routing batch against `target_step_uri`. Succeeds or
    /// fails as a unit; the server owns queue transactionality.
    async fn submit_routing(
        &self,
        target_step_uri: &str,
        artifact_uris: &[String],
        action: RoutingAction,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_action_round_trips() {
        assert_eq!(RoutingAction::Assign.as_str(), "assign");
        let json = serde_json::to_string(&RoutingAction::Unassign).unwrap();
        assert_eq!(json, "\"unassign\"");
    }
}
