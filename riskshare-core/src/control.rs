//! Proposed controls and the hierarchy-of-controls effectiveness table

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Control type, ordered from most to least effective
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControlType {
    Eliminate,
    Substitute,
    Engineer,
    Visual,
    Admin,
    Individual,
    /// Any type string outside the hierarchy; carries no effectiveness
    Unrecognized(String),
}

/// Which multiplier a control feeds into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlBucket {
    /// Removes the hazard outright
    Elimination,
    /// Structural mitigations: Substitute, Engineer
    Hard,
    /// Behavioural and procedural mitigations: Admin, Visual, Individual
    Soft,
}

impl ControlType {
    /// Parse a type name, case-insensitively. Never fails.
    pub fn parse(name: &str) -> ControlType {
        let trimmed = name.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "eliminate" => ControlType::Eliminate,
            "substitute" => ControlType::Substitute,
            "engineer" => ControlType::Engineer,
            "visual" => ControlType::Visual,
            "admin" => ControlType::Admin,
            "individual" => ControlType::Individual,
            _ => ControlType::Unrecognized(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ControlType::Eliminate => "Eliminate",
            ControlType::Substitute => "Substitute",
            ControlType::Engineer => "Engineer",
            ControlType::Visual => "Visual",
            ControlType::Admin => "Admin",
            ControlType::Individual => "Individual",
            ControlType::Unrecognized(name) => name,
        }
    }

    pub fn bucket(&self) -> Option<ControlBucket> {
        match self {
            ControlType::Eliminate => Some(ControlBucket::Elimination),
            ControlType::Substitute | ControlType::Engineer => Some(ControlBucket::Hard),
            ControlType::Visual | ControlType::Admin | ControlType::Individual => {
                Some(ControlBucket::Soft)
            }
            ControlType::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ControlType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ControlType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ControlType::parse(&name))
    }
}

/// A proposed mitigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ControlInput")]
pub struct Control {
    #[serde(rename = "controlType")]
    pub control_type: ControlType,
    #[serde(default)]
    pub description: String,
}

impl Control {
    pub fn new(control_type: ControlType, description: impl Into<String>) -> Self {
        Control {
            control_type,
            description: description.into(),
        }
    }
}

/// Accepted input shapes: `"Engineer"` or `{"controlType": "Engineer", "description": "..."}`.
/// Anything else is kept as an unrecognized control.
#[derive(Deserialize)]
#[serde(untagged)]
enum ControlInput {
    Bare(String),
    Object {
        #[serde(rename = "controlType", alias = "control_type", alias = "type")]
        control_type: String,
        #[serde(default)]
        description: String,
    },
    Malformed(serde_json::Value),
}

impl From<ControlInput> for Control {
    fn from(input: ControlInput) -> Self {
        match input {
            ControlInput::Bare(name) => Control::new(ControlType::parse(&name), String::new()),
            ControlInput::Object {
                control_type,
                description,
            } => Control::new(ControlType::parse(&control_type), description),
            ControlInput::Malformed(value) => {
                let type_name = match &value {
                    serde_json::Value::Object(fields) => ["controlType", "control_type", "type"]
                        .iter()
                        .find_map(|key| fields.get(*key))
                        .map(json_text)
                        .unwrap_or_default(),
                    other => json_text(other),
                };
                let description = value
                    .get("description")
                    .map(json_text)
                    .unwrap_or_default();
                Control::new(ControlType::parse(&type_name), description)
            }
        }
    }
}

/// Plain text of a scalar JSON value; null is empty
fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Fractional effectiveness per control type, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectivenessTable {
    pub eliminate: f64,
    pub substitute: f64,
    pub engineer: f64,
    pub visual: f64,
    pub admin: f64,
    pub individual: f64,
}

impl Default for EffectivenessTable {
    fn default() -> Self {
        EffectivenessTable {
            eliminate: 1.00,
            substitute: 0.65,
            engineer: 0.55,
            visual: 0.45,
            admin: 0.30,
            individual: 0.15,
        }
    }
}

impl EffectivenessTable {
    pub fn effectiveness(&self, control_type: &ControlType) -> f64 {
        match control_type {
            ControlType::Eliminate => self.eliminate,
            ControlType::Substitute => self.substitute,
            ControlType::Engineer => self.engineer,
            ControlType::Visual => self.visual,
            ControlType::Admin => self.admin,
            ControlType::Individual => self.individual,
            ControlType::Unrecognized(_) => 0.0,
        }
    }
}
