use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::core::{Result, SyncError};

/// A scripted collaborative session
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub participants: Vec<String>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// One step of a [`Script`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Step {
    /// A local edit typed by a participant
    Edit {
        participant: String,
        from: usize,
        to: Option<usize>,
        #[serde(default)]
        insert: String,
    },
    /// Relay every queued change
    Sync,
    /// A participant leaves the session
    Detach { participant: String },
}

impl Step {
    fn participant(&self) -> Option<&str> {
        match self {
            Step::Edit { participant, .. } | Step::Detach { participant } => Some(participant),
            Step::Sync => None,
        }
    }
}

impl Script {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self> {
        let script: Script = toml::from_str(data)?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<()> {
        if self.participants.is_empty() {
            return Err(SyncError::script("at least one participant is required"));
        }

        let mut names = HashSet::new();
        for name in &self.participants {
            if !names.insert(name.as_str()) {
                return Err(SyncError::script(format!("duplicate participant '{}'", name)));
            }
        }

        for (index, step) in self.steps.iter().enumerate() {
            if let Some(name) = step.participant() {
                if !names.contains(name) {
                    return Err(SyncError::script(format!(
                        "step {} refers to unknown participant '{}'",
                        index + 1,
                        name
                    )));
                }
            }
        }
        Ok(())
    }
}
