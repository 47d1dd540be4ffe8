use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use windward_entity::template;

/// Template type tag carried inside the session snapshot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateKind {
    Placement,
    Speaking,
    Writing,
}

impl From<template::AssessmentType> for TemplateKind {
    fn from(value: template::AssessmentType) -> Self {
        match value {
            template::AssessmentType::Placement => Self::Placement,
            template::AssessmentType::Speaking => Self::Speaking,
            template::AssessmentType::Writing => Self::Writing,
        }
    }
}

/// Frozen view of the template taken when a session starts. In-flight
/// attempts keep reading this snapshot even if the template is edited or
/// archived afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSnapshot {
    pub template_id: Uuid,
    pub pathway_id: Uuid,
    pub name: String,
    pub kind: TemplateKind,
    pub version: i32,
}

impl TemplateSnapshot {
    #[must_use]
    pub fn of(template: &template::Model) -> Self {
        Self {
            template_id: template.id,
            pathway_id: template.pathway_id,
            name: template.name.clone(),
            kind: template.assessment_type.into(),
            version: template.version,
        }
    }

    pub fn encode(&self) -> serde_json::Value {
        serde_json::json!(self)
    }

    pub fn decode(value: &serde_json::Value) -> Result<Self, EngineError> {
        serde_json::from_value(value.clone()).map_err(|error| {
            tracing::error!(error = &error as &dyn std::error::Error, "corrupt template snapshot");
            EngineError::InvalidResponse("session carries an unreadable template snapshot".to_owned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn snapshot_round_trips() {
        let template = template::Model {
            id: Uuid::new_v4(),
            pathway_id: Uuid::new_v4(),
            name: "K9 placement".to_owned(),
            assessment_type: template::AssessmentType::Placement,
            rubric: None,
            version: 3,
            published_at: Some(Utc::now()),
            active: true,
            created_at: Utc::now(),
        };
        let snapshot = TemplateSnapshot::of(&template);
        let decoded = TemplateSnapshot::decode(&snapshot.encode()).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.kind, TemplateKind::Placement);
    }
}
