use crate::types::TrackingData;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Eligibility predicate for an action template, written as a JSON-Logic
/// rule evaluated against the accumulated tracking data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Condition(Value);

impl Default for Condition {
    /// `{"==":[0,0]}`: always eligible.
    fn default() -> Self {
        Condition(json!({ "==": [0, 0] }))
    }
}

impl Condition {
    pub fn new(rule: Value) -> Self {
        Condition(rule)
    }

    pub fn never() -> Self {
        Condition(json!({ "!": [true] }))
    }

    pub fn rule(&self) -> &Value {
        &self.0
    }

    /// Evaluate against `data` with JSON-Logic truthiness. `Err` carries a
    /// description of a malformed rule; callers attach the action context.
    pub fn evaluate(&self, data: &TrackingData) -> Result<bool, String> {
        let rule = json!({ "!!": [self.0] });
        match jsonlogic_rs::apply(&rule, &data.to_json()) {
            Ok(Value::Bool(holds)) => Ok(holds),
            Ok(other) => Err(format!("rule evaluated to non-boolean {other}")),
            Err(err) => Err(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
