//! Project snapshots.
//!
//! A project bundles a business profile with the results produced for it, keyed
//! by kind (`personas`, `seo_audit`, ...). Each project is one snapshot in a
//! [`SnapshotStore`] under `project-<uuid>`.

use crate::error::{StoreError, StoreResult};
use crate::store::{SnapshotStore, load_json, save_json};
use chrono::{DateTime, Utc};
use marquee_orchestrator::BusinessProfile;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

const KEY_PREFIX: &str = "project-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub profile: BusinessProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub artifacts: BTreeMap<String, serde_json::Value>,
}

/// Listing row for a stored project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub updated_at: DateTime<Utc>,
    pub artifacts: Vec<String>,
}

impl Project {
    pub fn new(name: impl Into<String>, profile: BusinessProfile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            profile,
            created_at: now,
            updated_at: now,
            artifacts: BTreeMap::new(),
        }
    }

    fn key_for(id: Uuid) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    /// Records a result under `kind`, replacing any earlier one.
    ///
    /// # Errors
    /// Returns an error if `value` cannot be serialized.
    pub fn record_artifact<T: Serialize>(&mut self, kind: &str, value: &T) -> StoreResult<()> {
        self.artifacts.insert(kind.to_string(), serde_json::to_value(value)?);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Reads back a recorded result.
    ///
    /// # Errors
    /// Returns an error if the stored value does not decode as `T`.
    pub fn artifact<T: DeserializeOwned>(&self, kind: &str) -> StoreResult<Option<T>> {
        self.artifacts
            .get(kind)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(StoreError::from)
    }

    /// Writes the snapshot.
    ///
    /// # Errors
    /// Store or serialization failure.
    pub fn save(&self, store: &dyn SnapshotStore) -> StoreResult<()> {
        save_json(store, &Self::key_for(self.id), self)?;
        debug!(project_id = %self.id, artifacts = self.artifacts.len(), "Saved project");
        Ok(())
    }

    /// Loads the project with the given id.
    ///
    /// # Errors
    /// `NotFound` if there is none, otherwise store or decode failure.
    pub fn load(store: &dyn SnapshotStore, id: Uuid) -> StoreResult<Self> {
        load_json(store, &Self::key_for(id))?.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Loads by id string, accepting any unique id prefix.
    ///
    /// # Errors
    /// `NotFound` when nothing or more than one project matches.
    pub fn find(store: &dyn SnapshotStore, id: &str) -> StoreResult<Self> {
        if let Ok(id) = Uuid::parse_str(id) {
            return Self::load(store, id);
        }
        let wanted = id.trim().to_lowercase();
        let matches: Vec<Uuid> = project_ids(store)?
            .into_iter()
            .filter(|candidate| !wanted.is_empty() && candidate.to_string().starts_with(&wanted))
            .collect();
        match matches.as_slice() {
            [only] => Self::load(store, *only),
            _ => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Summaries of every stored project, most recently updated first.
    ///
    /// Snapshots that fail to decode are logged and skipped.
    ///
    /// # Errors
    /// Store failure while listing keys.
    pub fn list(store: &dyn SnapshotStore) -> StoreResult<Vec<ProjectSummary>> {
        let mut summaries = Vec::new();
        for id in project_ids(store)? {
            match Self::load(store, id) {
                Ok(project) => summaries.push(project.summary()),
                Err(e) => warn!(project_id = %id, error = %e, "Skipping unreadable project"),
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone(),
            updated_at: self.updated_at,
            artifacts: self.artifacts.keys().cloned().collect(),
        }
    }
}

fn project_ids(store: &dyn SnapshotStore) -> StoreResult<Vec<Uuid>> {
    Ok(store
        .keys()?
        .iter()
        .filter_map(|key| key.strip_prefix(KEY_PREFIX))
        .filter_map(|id| Uuid::parse_str(id).ok())
        .collect())
}
