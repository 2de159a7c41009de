//! Field-level disclosure policy.
//!
//! Every field of a tracking-data payload is owned by zero or more
//! [`DisclosureScope`]s. A viewer sees a field only when one of its owning
//! scopes grants visibility; fields no scope covers are never emitted.

use crate::blueprint::{ActionTemplate, DataSchema, DisclosureScope};
use crate::error::{BlueprintError, Result};
use crate::types::{FieldPointer, TrackingData, Viewer, Visibility};

// ---------------------------------------------------------------------------
// DisclosurePolicy
// ---------------------------------------------------------------------------

/// Stateless view over a template's disclosure declarations.
#[derive(Debug, Clone, Copy)]
pub struct DisclosurePolicy<'a> {
    scopes: &'a [DisclosureScope],
    schemas: &'a [DataSchema],
    participants: &'a [String],
    sender: &'a str,
    previous_author: Option<&'a str>,
}

impl<'a> DisclosurePolicy<'a> {
    pub fn new(
        scopes: &'a [DisclosureScope],
        participants: &'a [String],
        sender: &'a str,
    ) -> Self {
        Self {
            scopes,
            schemas: &[],
            participants,
            sender,
            previous_author: None,
        }
    }

    /// Policy declared by `template`. `previous_author` is the sender of the
    /// transaction the resolved action extends.
    pub fn for_template(template: &'a ActionTemplate, previous_author: Option<&'a str>) -> Self {
        Self {
            scopes: &template.disclosures,
            schemas: &template.data_schemas,
            participants: &template.participants,
            sender: &template.sender,
            previous_author,
        }
    }

    pub fn with_schemas(mut self, schemas: &'a [DataSchema]) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_previous_author(mut self, author: Option<&'a str>) -> Self {
        self.previous_author = author;
        self
    }

    /// Whether `viewer` may see the fields `scope` covers.
    ///
    /// Anything but a public scope needs a non-blank role, so an anonymous
    /// viewer never matches a blank sender, author or list entry.
    pub fn grants<'v>(&self, scope: &DisclosureScope, viewer: impl Into<Viewer<'v>>) -> bool {
        if scope.visibility == Some(Visibility::PublicData) {
            return true;
        }
        let Some(role) = viewer.into().role() else {
            return false;
        };
        let in_list = |list: &[String]| list.iter().any(|r| r == role);
        match (scope.visibility, &scope.allow) {
            (_, Some(allow)) => in_list(allow),
            (Some(_), None) => in_list(self.participants),
            (None, None) => role == self.sender || self.previous_author == Some(role),
        }
    }

    /// Reject payloads whose values disagree with a declared field type.
    pub fn validate(&self, payload: &TrackingData) -> Result<()> {
        for (field, value) in payload.iter() {
            let declared = self
                .schemas
                .iter()
                .find_map(|schema| schema.fields.get(field).copied());
            if let Some(expected) = declared {
                let actual = value.field_type();
                if expected != actual {
                    return Err(BlueprintError::SchemaMismatch {
                        field: field.clone(),
                        expected: expected.to_string(),
                        actual: actual.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The subset of `payload` that `viewer` is entitled to see.
    ///
    /// Validation runs against the whole payload before anything is copied,
    /// so a type conflict aborts the filter regardless of viewer.
    pub fn filter<'v>(
        &self,
        payload: &TrackingData,
        viewer: impl Into<Viewer<'v>>,
    ) -> Result<TrackingData> {
        self.validate(payload)?;
        let viewer = viewer.into();

        let mut visible = TrackingData::new();
        for scope in self.scopes.iter().filter(|s| self.grants(s, viewer)) {
            for pointer in scope.pointers() {
                match pointer {
                    FieldPointer::All => {
                        for (field, value) in payload.iter() {
                            visible.place(&FieldPointer::Path(vec![field.clone()]), value.clone());
                        }
                    }
                    FieldPointer::Path(_) => {
                        if let Some(value) = payload.lookup(&pointer) {
                            visible.place(&pointer, value.clone());
                        }
                    }
                }
            }
        }

        tracing::trace!(
            viewer = %viewer,
            offered = payload.len(),
            disclosed = visible.len(),
            "filtered tracking data"
        );
        Ok(visible)
    }
}

// ---------------------------------------------------------------------------
// Tracking-data extraction
// ---------------------------------------------------------------------------

/// Collect from a submission the fields covered by private scopes. These
/// are the values carried forward between chained transactions.
pub fn extract_tracking_data(scopes: &[DisclosureScope], submitted: &TrackingData) -> TrackingData {
    let mut tracked = TrackingData::new();
    let private = scopes
        .iter()
        .filter(|s| s.visibility != Some(Visibility::PublicData));
    for scope in private {
        for pointer in scope.pointers() {
            match pointer {
                FieldPointer::All => {
                    for (field, value) in submitted.iter() {
                        tracked.place(&FieldPointer::Path(vec![field.clone()]), value.clone());
                    }
                }
                FieldPointer::Path(_) => {
                    if let Some(value) = submitted.lookup(&pointer) {
                        tracked.place(&pointer, value.clone());
                    }
                }
            }
        }
    }
    tracked
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn payload() -> TrackingData {
        TrackingData::from_json(&json!({ "amount": "100", "note": "ok" })).unwrap()
    }

    #[test]
    fn allow_list_restricts_tracking_data() {
        let scopes = vec![DisclosureScope::tracking("amount").allow(["alice"])];
        let participants = roles(&["alice", "bob"]);
        let policy = DisclosurePolicy::new(&scopes, &participants, "alice");

        let bob = policy.filter(&payload(), "bob").unwrap();
        assert!(bob.is_empty());

        let alice = policy.filter(&payload(), "alice").unwrap();
        assert_eq!(alice.to_json(), json!({ "amount": "100" }));
    }

    #[test]
    fn unscoped_fields_are_dropped_for_every_viewer() {
        let scopes = vec![DisclosureScope::public("amount")];
        let participants = roles(&["alice", "bob"]);
        let policy = DisclosurePolicy::new(&scopes, &participants, "alice");
        for viewer in ["alice", "bob", "mallory"] {
            let out = policy.filter(&payload(), viewer).unwrap();
            assert!(out.get("note").is_none(), "note leaked to {viewer}");
        }
    }

    #[test]
    fn public_fields_pass_unconditionally() {
        let scopes = vec![DisclosureScope::public("note").allow(["alice"])];
        let participants = roles(&["alice"]);
        let policy = DisclosurePolicy::new(&scopes, &participants, "alice");
        let out = policy.filter(&payload(), "outsider").unwrap();
        assert_eq!(out.to_json(), json!({ "note": "ok" }));
    }

    #[test]
    fn tracking_without_allow_list_defaults_to_participants() {
        let scopes = vec![DisclosureScope::tracking("amount")];
        let participants = roles(&["alice", "bob"]);
        let policy = DisclosurePolicy::new(&scopes, &participants, "alice");
        assert!(policy.filter(&payload(), "bob").unwrap().get("amount").is_some());
        assert!(policy.filter(&payload(), "carol").unwrap().is_empty());
    }

    #[test]
    fn undeclared_visibility_limits_to_sender_and_previous_author() {
        let scopes = vec![DisclosureScope {
            name: "amount".into(),
            visibility: None,
            fields: vec![],
            allow: None,
        }];
        let participants = roles(&["alice", "bob", "carol"]);
        let policy = DisclosurePolicy::new(&scopes, &participants, "alice")
            .with_previous_author(Some("bob"));
        assert!(!policy.filter(&payload(), "alice").unwrap().is_empty());
        assert!(!policy.filter(&payload(), "bob").unwrap().is_empty());
        assert!(policy.filter(&payload(), "carol").unwrap().is_empty());
    }

    #[test]
    fn anonymous_viewer_sees_public_fields_only() {
        let scopes = vec![
            DisclosureScope::tracking("amount"),
            DisclosureScope::public("note"),
        ];
        let participants = roles(&["alice"]);
        let policy = DisclosurePolicy::new(&scopes, &participants, "alice");
        let out = policy.filter(&payload(), Viewer::Anonymous).unwrap();
        assert_eq!(out.to_json(), json!({ "note": "ok" }));
    }

    #[test]
    fn blank_identities_never_unlock_restricted_scopes() {
        let salary = DisclosureScope {
            name: "amount".into(),
            visibility: None,
            fields: vec![],
            allow: None,
        };
        let scopes = vec![salary, DisclosureScope::tracking("note").allow([""])];
        let participants = roles(&[""]);
        let policy = DisclosurePolicy::new(&scopes, &participants, "")
            .with_previous_author(Some(""));

        for viewer in [Viewer::Anonymous, Viewer::Role(""), Viewer::Role(" ")] {
            assert!(policy.filter(&payload(), viewer).unwrap().is_empty(), "{viewer:?}");
        }
    }

    #[test]
    fn nested_pointer_discloses_only_the_nested_entry() {
        let data = TrackingData::from_json(&json!({
            "address": { "zip": "EH1", "street": "1 High St" }
        }))
        .unwrap();
        let scopes = vec![DisclosureScope::public("postcode").with_fields(["/address/zip"])];
        let participants = roles(&[]);
        let policy = DisclosurePolicy::new(&scopes, &participants, "alice");
        let out = policy.filter(&data, "anyone").unwrap();
        assert_eq!(out.to_json(), json!({ "address": { "zip": "EH1" } }));
    }

    #[test]
    fn wildcard_scope_covers_everything() {
        let scopes = vec![DisclosureScope::tracking("all").with_fields(["/*"]).allow(["auditor"])];
        let participants = roles(&[]);
        let policy = DisclosurePolicy::new(&scopes, &participants, "alice");
        assert_eq!(policy.filter(&payload(), "auditor").unwrap(), payload());
        assert!(policy.filter(&payload(), "alice").unwrap().is_empty());
    }

    #[test]
    fn type_conflict_fails_closed() {
        let mut fields = BTreeMap::new();
        fields.insert("amount".to_string(), FieldType::Number);
        let schemas = vec![DataSchema {
            id: "loan".into(),
            fields,
        }];
        let scopes = vec![DisclosureScope::public("amount")];
        let participants = roles(&["alice"]);
        let policy = DisclosurePolicy::new(&scopes, &participants, "alice").with_schemas(&schemas);
        let err = policy.filter(&payload(), "alice").unwrap_err();
        assert!(matches!(err, BlueprintError::SchemaMismatch { ref field, .. } if field == "amount"));
    }

    #[test]
    fn filter_is_deterministic() {
        let scopes = vec![
            DisclosureScope::tracking("amount").allow(["alice"]),
            DisclosureScope::public("note"),
        ];
        let participants = roles(&["alice", "bob"]);
        let policy = DisclosurePolicy::new(&scopes, &participants, "alice");
        let first = policy.filter(&payload(), "alice").unwrap();
        for _ in 0..10 {
            assert_eq!(policy.filter(&payload(), "alice").unwrap(), first);
        }
    }

    #[test]
    fn extraction_keeps_private_fields_only() {
        let scopes = vec![
            DisclosureScope::tracking("amount"),
            DisclosureScope::public("note"),
        ];
        let tracked = extract_tracking_data(&scopes, &payload());
        assert_eq!(tracked.to_json(), json!({ "amount": "100" }));
    }
}
