use crate::condition::Condition;
use crate::error::{BlueprintError, Result};
use crate::ledger::validate_identity;
use crate::types::{FieldPointer, FieldType, TrackingData, Visibility};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// A workflow role bound to the wallet that acts for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub organisation: String,
    /// Published wallet address. Real-time notifications for this
    /// participant are addressed to the group with this key.
    pub wallet_address: String,
}

// ---------------------------------------------------------------------------
// DataSchema
// ---------------------------------------------------------------------------

/// Expected payload shape: declared type per top-level field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSchema {
    pub id: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldType>,
}

// ---------------------------------------------------------------------------
// DisclosureScope
// ---------------------------------------------------------------------------

/// A named field group with a visibility class and an optional allow-list
/// of participant roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureScope {
    pub name: String,
    /// `None` falls back to the most restrictive class: tracking data visible
    /// only to the sender and the previous transaction's author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    /// Pointers covered by this scope. Empty means the scope covers the
    /// top-level field named after the scope itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<Vec<String>>,
}

impl DisclosureScope {
    pub fn tracking(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Some(Visibility::TrackingData),
            fields: Vec::new(),
            allow: None,
        }
    }

    pub fn public(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Some(Visibility::PublicData),
            fields: Vec::new(),
            allow: None,
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn pointers(&self) -> Vec<FieldPointer> {
        if self.fields.is_empty() {
            vec![FieldPointer::parse(&self.name)]
        } else {
            self.fields.iter().map(|f| FieldPointer::parse(f)).collect()
        }
    }
}

// ---------------------------------------------------------------------------
// ActionTemplate
// ---------------------------------------------------------------------------

/// A published workflow step. Immutable once its blueprint is published;
/// resolution copies it into a fresh [`Action`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTemplate {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Role that submits this action.
    pub sender: String,
    /// Roles this action is addressed to, in declaration order.
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub data_schemas: Vec<DataSchema>,
    #[serde(default)]
    pub disclosures: Vec<DisclosureScope>,
    #[serde(default)]
    pub condition: Condition,
    /// UI schema reference. Opaque here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A resolved, viewer-specific instance of an [`ActionTemplate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(flatten)]
    pub template: ActionTemplate,
    pub previous_tx_id: String,
    pub blueprint: String,
    /// Disclosure-filtered view of the accumulated tracking data.
    pub previous_data: TrackingData,
}

// ---------------------------------------------------------------------------
// Blueprint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub actions: Vec<ActionTemplate>,
}

fn default_version() -> u32 {
    1
}

impl Blueprint {
    pub fn action(&self, action_id: u32) -> Result<&ActionTemplate> {
        self.actions
            .iter()
            .find(|a| a.id == action_id)
            .ok_or_else(|| BlueprintError::ActionNotFound {
                blueprint: self.id.clone(),
                action_id,
            })
    }

    pub fn participant(&self, participant_id: &str) -> Result<&Participant> {
        self.participants
            .iter()
            .find(|p| p.id == participant_id)
            .ok_or_else(|| BlueprintError::ParticipantNotFound(participant_id.to_string()))
    }

    /// Group key (wallet address) notifications for `participant_id` go to.
    pub fn group_key_for(&self, participant_id: &str) -> Result<&str> {
        let participant = self.participant(participant_id)?;
        if participant.wallet_address.is_empty() {
            return Err(BlueprintError::ParticipantNotFound(participant_id.to_string()));
        }
        Ok(&participant.wallet_address)
    }

    /// Templates sorted by id, the order in which eligibility is tested.
    pub fn actions_in_order(&self) -> Vec<&ActionTemplate> {
        let mut actions: Vec<_> = self.actions.iter().collect();
        actions.sort_by_key(|a| a.id);
        actions
    }

    /// Reject blank participant ids and blank roles in senders, participant
    /// lists and disclosure allow-lists.
    pub fn validate_identities(&self) -> Result<()> {
        for participant in &self.participants {
            validate_identity("participant id", &participant.id)?;
        }
        for action in &self.actions {
            validate_identity("action sender", &action.sender)?;
            for role in &action.participants {
                validate_identity("action participant", role)?;
            }
            let allowed = action.disclosures.iter().filter_map(|s| s.allow.as_ref()).flatten();
            for role in allowed {
                validate_identity("disclosure allow entry", role)?;
            }
        }
        Ok(())
    }

    /// Load a blueprint from a YAML or JSON file (chosen by extension).
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let blueprint: Self = if is_json {
            serde_json::from_str(&data)?
        } else {
            serde_yaml::from_str(&data)?
        };
        blueprint.validate_identities()?;
        Ok(blueprint)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
