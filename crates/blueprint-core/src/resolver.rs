use crate::blueprint::{Action, ActionTemplate, Blueprint};
use crate::disclosure::DisclosurePolicy;
use crate::error::{BlueprintError, Result};
use crate::ledger::{validate_tx_id, TransactionLookup};
use crate::types::{TrackingData, Viewer};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// ActionResolver
// ---------------------------------------------------------------------------

/// Builds concrete, viewer-specific [`Action`]s from published templates.
///
/// Holds no mutable state; the only collaborator is the ledger lookup used
/// to confirm the previous transaction exists and to learn its author.
#[derive(Clone)]
pub struct ActionResolver {
    ledger: Arc<dyn TransactionLookup>,
}

impl ActionResolver {
    pub fn new(ledger: Arc<dyn TransactionLookup>) -> Self {
        Self { ledger }
    }

    /// Resolve `template` for `viewer`, chained to `previous_tx_id`.
    ///
    /// Fails with `ConditionNotMet` when the template is not currently
    /// eligible; no partial action is ever returned.
    pub fn resolve<'v>(
        &self,
        template: &ActionTemplate,
        blueprint_id: &str,
        previous_tx_id: &str,
        tracking: &TrackingData,
        viewer: impl Into<Viewer<'v>>,
    ) -> Result<Action> {
        validate_tx_id(previous_tx_id)?;
        let viewer = viewer.into();

        let previous = self
            .ledger
            .get_transaction(previous_tx_id)?
            .ok_or_else(|| BlueprintError::PreviousTransactionNotFound(previous_tx_id.to_string()))?;

        if !self.is_eligible(template, tracking)? {
            return Err(BlueprintError::ConditionNotMet {
                action_id: template.id,
            });
        }

        let policy = DisclosurePolicy::for_template(template, previous.sender.as_deref());
        let previous_data = policy.filter(tracking, viewer)?;

        tracing::debug!(
            blueprint = blueprint_id,
            action = template.id,
            viewer = %viewer,
            fields = previous_data.len(),
            "resolved action"
        );

        Ok(Action {
            template: template.clone(),
            previous_tx_id: previous_tx_id.to_string(),
            blueprint: blueprint_id.to_string(),
            previous_data,
        })
    }

    /// Same as [`resolve`](Self::resolve), shaping raw JSON tracking data
    /// first. Unshapeable input fails as a payload error.
    pub fn resolve_json<'v>(
        &self,
        template: &ActionTemplate,
        blueprint_id: &str,
        previous_tx_id: &str,
        tracking: &serde_json::Value,
        viewer: impl Into<Viewer<'v>>,
    ) -> Result<Action> {
        let tracking = TrackingData::from_json(tracking)?;
        self.resolve(template, blueprint_id, previous_tx_id, &tracking, viewer)
    }

    /// Evaluate the template's condition against `tracking`.
    pub fn is_eligible(&self, template: &ActionTemplate, tracking: &TrackingData) -> Result<bool> {
        template
            .condition
            .evaluate(tracking)
            .map_err(|reason| BlueprintError::InvalidCondition {
                action_id: template.id,
                reason,
            })
    }

    /// First template, by id, whose condition holds. `None` means the
    /// workflow has no further step for this data.
    pub fn next_eligible<'b>(
        &self,
        blueprint: &'b Blueprint,
        tracking: &TrackingData,
    ) -> Result<Option<&'b ActionTemplate>> {
        for template in blueprint.actions_in_order() {
            if self.is_eligible(template, tracking)? {
                return Ok(Some(template));
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{DataSchema, DisclosureScope};
    use crate::condition::Condition;
    use crate::types::FieldType;
    use crate::ledger::{MemoryLedger, Transaction};
    use serde_json::json;

    fn tx(c: char) -> String {
        c.to_string().repeat(64)
    }

    fn template() -> ActionTemplate {
        ActionTemplate {
            id: 2,
            title: "Review".into(),
            description: "Review the application".into(),
            sender: "alice".into(),
            participants: vec!["alice".into(), "bob".into()],
            data_schemas: vec![],
            disclosures: vec![DisclosureScope::tracking("amount").allow(["alice"])],
            condition: Condition::default(),
            form: None,
        }
    }

    fn resolver() -> ActionResolver {
        let ledger = MemoryLedger::new();
        ledger
            .record_transaction(Transaction::new(tx('a'), "bp-1").with_sender("alice"))
            .unwrap();
        ActionResolver::new(Arc::new(ledger))
    }

    fn tracking() -> TrackingData {
        TrackingData::from_json(&json!({ "amount": "100", "note": "ok" })).unwrap()
    }

    #[test]
    fn previous_data_depends_on_viewer() {
        let r = resolver();
        let for_bob = r.resolve(&template(), "bp-1", &tx('a'), &tracking(), "bob").unwrap();
        assert!(for_bob.previous_data.is_empty());

        let for_alice = r.resolve(&template(), "bp-1", &tx('a'), &tracking(), "alice").unwrap();
        assert_eq!(for_alice.previous_data.to_json(), json!({ "amount": "100" }));
        assert_eq!(for_alice.blueprint, "bp-1");
        assert_eq!(for_alice.previous_tx_id, tx('a'));
        assert_eq!(for_alice.template, template());
    }

    #[test]
    fn resolution_is_idempotent() {
        let r = resolver();
        let first = r.resolve(&template(), "bp-1", &tx('a'), &tracking(), "alice").unwrap();
        let second = r.resolve(&template(), "bp-1", &tx('a'), &tracking(), "alice").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unmet_condition_fails() {
        let mut t = template();
        t.condition = Condition::new(json!({ ">": [{ "var": "amount" }, 500] }));
        let err = resolver()
            .resolve(&t, "bp-1", &tx('a'), &tracking(), "alice")
            .unwrap_err();
        assert!(matches!(err, BlueprintError::ConditionNotMet { action_id: 2 }));
    }

    #[test]
    fn malformed_condition_is_reported() {
        let mut t = template();
        t.condition = Condition::new(json!({ "==": [1] }));
        let err = resolver()
            .resolve(&t, "bp-1", &tx('a'), &tracking(), "alice")
            .unwrap_err();
        assert!(matches!(err, BlueprintError::InvalidCondition { .. }));
    }

    #[test]
    fn declared_schema_conflict_fails_for_every_viewer() {
        let mut t = template();
        t.data_schemas = vec![DataSchema {
            id: "loan".into(),
            fields: [("amount".to_string(), FieldType::Number)].into_iter().collect(),
        }];
        let r = resolver();
        for viewer in [Viewer::Role("alice"), Viewer::Role("bob"), Viewer::Anonymous] {
            let err = r
                .resolve(&t, "bp-1", &tx('a'), &tracking(), viewer)
                .unwrap_err();
            assert!(
                matches!(err, BlueprintError::SchemaMismatch { ref field, .. } if field == "amount"),
                "{viewer:?}: {err}"
            );
            assert_eq!(err.kind(), crate::error::ErrorKind::SchemaMismatch);
        }
    }

    #[test]
    fn anonymous_viewer_gets_public_fields_only() {
        let mut t = template();
        t.disclosures.push(DisclosureScope::public("note"));
        let action = resolver()
            .resolve(&t, "bp-1", &tx('a'), &tracking(), Viewer::Anonymous)
            .unwrap();
        assert_eq!(action.previous_data.to_json(), json!({ "note": "ok" }));
    }

    #[test]
    fn empty_or_malformed_previous_tx_is_rejected() {
        let r = resolver();
        for bad in ["", "not-a-tx"] {
            let err = r.resolve(&template(), "bp-1", bad, &tracking(), "alice").unwrap_err();
            assert!(matches!(err, BlueprintError::InvalidTransactionId(_)));
        }
    }

    #[test]
    fn unknown_previous_tx_is_fatal() {
        let err = resolver()
            .resolve(&template(), "bp-1", &tx('f'), &tracking(), "alice")
            .unwrap_err();
        assert!(matches!(err, BlueprintError::PreviousTransactionNotFound(_)));
    }

    #[test]
    fn ledger_outage_surfaces_as_unavailable() {
        struct Down;
        impl TransactionLookup for Down {
            fn get_transaction(&self, _: &str) -> Result<Option<Transaction>> {
                Err(BlueprintError::Unavailable {
                    service: "register".into(),
                    message: "timeout".into(),
                })
            }
        }
        let r = ActionResolver::new(Arc::new(Down));
        let err = r
            .resolve(&template(), "bp-1", &tx('a'), &tracking(), "alice")
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Unavailable);
    }

    #[test]
    fn resolve_json_rejects_unshapeable_data() {
        let err = resolver()
            .resolve_json(&template(), "bp-1", &tx('a'), &json!("100"), "alice")
            .unwrap_err();
        assert!(matches!(err, BlueprintError::Payload(_)));
    }

    #[test]
    fn next_eligible_picks_lowest_matching_id() {
        let mut high = template();
        high.id = 3;
        let mut gated = template();
        gated.id = 1;
        gated.condition = Condition::new(json!({ "==": [{ "var": "note" }, "rejected"] }));
        let bp = Blueprint {
            id: "bp-1".into(),
            title: "Loan".into(),
            description: String::new(),
            version: 1,
            participants: vec![],
            actions: vec![high, gated, template()],
        };
        let next = resolver().next_eligible(&bp, &tracking()).unwrap().unwrap();
        assert_eq!(next.id, 2);
    }
}
