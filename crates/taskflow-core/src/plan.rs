use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PlanError;
use crate::task::Task;

/// Plan produced by the external planner: `{"tasks": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub tasks: Vec<Task>,
}

impl Plan {
    /// Parse planner output. Prose around the JSON object is ignored: the
    /// object is taken from the first `{` to the last `}`.
    pub fn parse(raw: &str) -> Result<Self, PlanError> {
        let start = raw.find('{').ok_or(PlanError::NoJsonObject)?;
        let end = raw.rfind('}').ok_or(PlanError::NoJsonObject)?;
        if end < start {
            return Err(PlanError::NoJsonObject);
        }
        Ok(serde_json::from_str(&raw[start..=end])?)
    }

    pub fn load_from(path: &Path) -> Result<Self, PlanError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }
}
