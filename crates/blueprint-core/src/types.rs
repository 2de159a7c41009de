use crate::error::{BlueprintError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

pub const TRACKING_DATA: &str = "TrackingData";
pub const PUBLIC_DATA: &str = "PublicData";

/// Visibility class of a disclosure scope. The wire names are shared with
/// every collaborator that reads blueprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Private to the workflow participants allowed by the scope.
    TrackingData,
    /// Public to every viewer.
    #[serde(alias = "Authorized")]
    PublicData,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::TrackingData => TRACKING_DATA,
            Visibility::PublicData => PUBLIC_DATA,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Viewer
// ---------------------------------------------------------------------------

/// Who a resolved action is being shaped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer<'a> {
    /// A participant role from the blueprint.
    Role(&'a str),
    /// No identity at all. Only public fields are visible.
    Anonymous,
}

impl<'a> Viewer<'a> {
    /// The role to match against disclosure lists. A blank role carries no
    /// identity and is treated as anonymous.
    pub fn role(self) -> Option<&'a str> {
        match self {
            Viewer::Role(role) if !role.trim().is_empty() => Some(role),
            _ => None,
        }
    }
}

impl<'a> From<&'a str> for Viewer<'a> {
    fn from(role: &'a str) -> Self {
        Viewer::Role(role)
    }
}

impl<'a> From<&'a String> for Viewer<'a> {
    fn from(role: &'a String) -> Self {
        Viewer::Role(role)
    }
}

impl fmt::Display for Viewer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role() {
            Some(role) => f.write_str(role),
            None => f.write_str("<anonymous>"),
        }
    }
}

// ---------------------------------------------------------------------------
// FieldType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    #[serde(alias = "bool")]
    Boolean,
    Object,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TrackingValue
// ---------------------------------------------------------------------------

/// A single tracking-data value. Arrays and nulls are not representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackingValue {
    Bool(bool),
    Number(f64),
    String(String),
    Map(BTreeMap<String, TrackingValue>),
}

impl TrackingValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            TrackingValue::Bool(_) => FieldType::Boolean,
            TrackingValue::Number(_) => FieldType::Number,
            TrackingValue::String(_) => FieldType::String,
            TrackingValue::Map(_) => FieldType::Object,
        }
    }

    fn from_json(field: &str, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;
        match value {
            Value::Bool(b) => Ok(TrackingValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(TrackingValue::Number).ok_or_else(|| {
                BlueprintError::Payload(format!("field '{field}' holds an unrepresentable number"))
            }),
            Value::String(s) => Ok(TrackingValue::String(s.clone())),
            Value::Object(obj) => {
                let mut map = BTreeMap::new();
                for (k, v) in obj {
                    map.insert(k.clone(), TrackingValue::from_json(&format!("{field}/{k}"), v)?);
                }
                Ok(TrackingValue::Map(map))
            }
            Value::Array(_) => Err(BlueprintError::Payload(format!(
                "field '{field}' holds an array; tracking data accepts strings, numbers, booleans and mappings"
            ))),
            Value::Null => Err(BlueprintError::Payload(format!("field '{field}' is null"))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            TrackingValue::Bool(b) => Value::Bool(*b),
            TrackingValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            TrackingValue::String(s) => Value::String(s.clone()),
            TrackingValue::Map(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for TrackingValue {
    fn from(s: &str) -> Self {
        TrackingValue::String(s.to_string())
    }
}

impl From<String> for TrackingValue {
    fn from(s: String) -> Self {
        TrackingValue::String(s)
    }
}

impl From<f64> for TrackingValue {
    fn from(n: f64) -> Self {
        TrackingValue::Number(n)
    }
}

impl From<bool> for TrackingValue {
    fn from(b: bool) -> Self {
        TrackingValue::Bool(b)
    }
}

// ---------------------------------------------------------------------------
// TrackingData
// ---------------------------------------------------------------------------

/// Accumulated workflow data keyed by field name. Ordered so that filtered
/// views serialize identically for identical inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingData(BTreeMap<String, TrackingValue>);

impl TrackingData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shape a raw JSON document into tracking data.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            BlueprintError::Payload("tracking data must be a JSON object".to_string())
        })?;
        let mut map = BTreeMap::new();
        for (k, v) in obj {
            map.insert(k.clone(), TrackingValue::from_json(k, v)?);
        }
        Ok(Self(map))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.0.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<TrackingValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&TrackingValue> {
        self.0.get(field)
    }

    /// Resolve a pointer to the value it addresses, if present.
    pub fn lookup(&self, pointer: &FieldPointer) -> Option<&TrackingValue> {
        let FieldPointer::Path(segments) = pointer else {
            return None;
        };
        let (first, rest) = segments.split_first()?;
        let mut current = self.0.get(first)?;
        for seg in rest {
            match current {
                TrackingValue::Map(map) => current = map.get(seg)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Write `value` at `pointer`, creating intermediate mappings.
    pub(crate) fn place(&mut self, pointer: &FieldPointer, value: TrackingValue) {
        let FieldPointer::Path(segments) = pointer else {
            return;
        };
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let mut map = &mut self.0;
        for seg in parents {
            let entry = map
                .entry(seg.clone())
                .or_insert_with(|| TrackingValue::Map(BTreeMap::new()));
            if !matches!(entry, TrackingValue::Map(_)) {
                *entry = TrackingValue::Map(BTreeMap::new());
            }
            let TrackingValue::Map(inner) = entry else {
                return;
            };
            map = inner;
        }
        map.insert(last.clone(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TrackingValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for TrackingData {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k, TrackingValue::String(v))).collect())
    }
}

impl<K: Into<String>, V: Into<TrackingValue>> FromIterator<(K, V)> for TrackingData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ---------------------------------------------------------------------------
// FieldPointer
// ---------------------------------------------------------------------------

/// A reference to a tracking-data field as written in a disclosure scope.
///
/// `amount`, `/amount` and `#/amount` all address the top-level `amount`
/// field; `/address/zip` addresses a nested entry; `/*` addresses everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldPointer {
    All,
    Path(Vec<String>),
}

impl FieldPointer {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if trimmed == "*" {
            return FieldPointer::All;
        }
        let segments = trimmed
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| s.replace("~1", "/").replace("~0", "~"))
            .collect();
        FieldPointer::Path(segments)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
