use crate::fanout::{FanoutReport, HubContext};
use blueprint_core::error::{BlueprintError, Result};
use blueprint_core::ledger::{validate_identity, validate_tx_id, BlueprintSource};
use blueprint_core::{ActionResolver, ActionTemplate, Blueprint, TrackingData, Viewer};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const RECEIVE_ACTION: &str = "ReceiveAction";

/// Participant, target group (`None` to broadcast) and serialized action.
type Outgoing = (Option<String>, Option<String>, serde_json::Value);

// ---------------------------------------------------------------------------
// CommittedTransaction / CommitReport
// ---------------------------------------------------------------------------

/// Notification from the replication layer that a transaction is durable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedTransaction {
    pub transaction_id: String,
    pub blueprint_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action_id: Option<u32>,
    #[serde(default = "empty_object")]
    pub tracking_data: serde_json::Value,
}

impl CommittedTransaction {
    /// Reject malformed ids and a blank sender before anything is recorded.
    pub fn validate(&self) -> Result<()> {
        validate_tx_id(&self.transaction_id)?;
        validate_identity("blueprint id", &self.blueprint_id)?;
        if let Some(sender) = &self.sender {
            validate_identity("transaction sender", sender)?;
        }
        Ok(())
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantNotice {
    /// `None` for a broadcast.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub report: FanoutReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    /// Template that was resolved; `None` when the workflow is complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_id: Option<u32>,
    pub notices: Vec<ParticipantNotice>,
}

// ---------------------------------------------------------------------------
// CommitHook
// ---------------------------------------------------------------------------

/// Turns a committed transaction into per-participant notifications.
///
/// Every action is resolved before anything is sent, so a resolution error
/// produces no notifications at all. Delivery failures never surface as
/// errors; they are reported per group.
pub struct CommitHook {
    blueprints: Arc<dyn BlueprintSource>,
    resolver: ActionResolver,
    hub: Arc<dyn HubContext>,
    method: String,
}

impl CommitHook {
    pub fn new(
        blueprints: Arc<dyn BlueprintSource>,
        resolver: ActionResolver,
        hub: Arc<dyn HubContext>,
    ) -> Self {
        Self {
            blueprints,
            resolver,
            hub,
            method: RECEIVE_ACTION.to_string(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Resolve the next eligible step of `blueprint_id`, chained to
    /// `previous_tx_id`, and fan it out to each participant's group.
    pub async fn on_transaction_committed(
        &self,
        blueprint_id: &str,
        previous_tx_id: &str,
        tracking: &TrackingData,
    ) -> Result<CommitReport> {
        self.notify(blueprint_id, previous_tx_id, None, tracking).await
    }

    /// Entry point for a full commit notification.
    pub async fn handle(&self, commit: &CommittedTransaction) -> Result<CommitReport> {
        commit.validate()?;
        let tracking = TrackingData::from_json(&commit.tracking_data)?;
        self.notify(
            &commit.blueprint_id,
            &commit.transaction_id,
            commit.next_action_id,
            &tracking,
        )
        .await
    }

    async fn notify(
        &self,
        blueprint_id: &str,
        previous_tx_id: &str,
        next_action_id: Option<u32>,
        tracking: &TrackingData,
    ) -> Result<CommitReport> {
        let blueprint = self
            .blueprints
            .get_blueprint(blueprint_id)?
            .ok_or_else(|| BlueprintError::BlueprintNotFound(blueprint_id.to_string()))?;

        let template = match next_action_id {
            Some(id) => blueprint.action(id)?,
            None => match self.resolver.next_eligible(&blueprint, tracking)? {
                Some(template) => template,
                None => {
                    tracing::info!(blueprint = blueprint_id, "workflow complete, nothing to notify");
                    return Ok(CommitReport::default());
                }
            },
        };

        let outgoing = self.resolve_all(&blueprint, template, previous_tx_id, tracking)?;
        tracing::info!(
            blueprint = blueprint_id,
            action = template.id,
            recipients = outgoing.len(),
            "notifying participants"
        );

        let sends = outgoing.into_iter().map(|(participant, group, payload)| async move {
            let report = match &group {
                Some(group) => self.hub.send_to_group(group, &self.method, payload).await,
                None => self.hub.send_to_all(&self.method, payload).await,
            };
            ParticipantNotice {
                participant,
                group,
                report,
            }
        });

        Ok(CommitReport {
            action_id: Some(template.id),
            notices: join_all(sends).await,
        })
    }

    fn resolve_all(
        &self,
        blueprint: &Blueprint,
        template: &ActionTemplate,
        previous_tx_id: &str,
        tracking: &TrackingData,
    ) -> Result<Vec<Outgoing>> {
        // Broadcast actions carry no participant identity, so only public
        // fields survive disclosure.
        if template.participants.is_empty() {
            let action = self.resolver.resolve(
                template,
                &blueprint.id,
                previous_tx_id,
                tracking,
                Viewer::Anonymous,
            )?;
            return Ok(vec![(None, None, serde_json::to_value(&action)?)]);
        }

        template
            .participants
            .iter()
            .map(|participant| -> Result<Outgoing> {
                let group = blueprint.group_key_for(participant)?.to_string();
                let action =
                    self.resolver
                        .resolve(template, &blueprint.id, previous_tx_id, tracking, participant)?;
                Ok((
                    Some(participant.clone()),
                    Some(group),
                    serde_json::to_value(&action)?,
                ))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
