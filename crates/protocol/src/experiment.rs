use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Population an experiment targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExperimentKind {
    /// Bucketed per guild (group scoped).
    Guild,
    /// Bucketed per user (individual scoped).
    User,
    /// Any other value found in the literal, kept verbatim.
    Other(String),
}

impl ExperimentKind {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "guild" => ExperimentKind::Guild,
            "user" => ExperimentKind::User,
            _ => ExperimentKind::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExperimentKind::Guild => "guild",
            ExperimentKind::User => "user",
            ExperimentKind::Other(raw) => raw,
        }
    }
}

impl Serialize for ExperimentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExperimentKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Feature-flag style definition embedded in application script text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub kind: ExperimentKind,
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_config: Option<serde_json::Value>,
    #[serde(default)]
    pub treatments: Vec<ExperimentTreatment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentTreatment {
    pub id: i64,
    pub label: String,
    pub config: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn kind_round_trips_through_plain_strings() {
        assert_eq!(ExperimentKind::parse("guild"), ExperimentKind::Guild);
        assert_eq!(ExperimentKind::parse("USER"), ExperimentKind::User);
        assert_eq!(
            ExperimentKind::parse("device"),
            ExperimentKind::Other("device".into())
        );

        let json = serde_json::to_value(ExperimentKind::Other("device".into())).unwrap();
        assert_eq!(json, json!("device"));
    }

    #[test]
    fn experiment_uses_camel_case_fields() {
        let experiment = Experiment {
            kind: ExperimentKind::User,
            id: "2023-01_demo".into(),
            label: "Demo".into(),
            default_config: Some(json!({ "enabled": false })),
            treatments: vec![],
        };
        let value = serde_json::to_value(&experiment).unwrap();
        assert_eq!(
            value,
            json!({
                "kind": "user",
                "id": "2023-01_demo",
                "label": "Demo",
                "defaultConfig": { "enabled": false },
                "treatments": []
            })
        );
    }
}
