//! Collaborator interfaces: event store, factor catalog and personalized
//! parameter lookup.
//!
//! The core treats these as already-resolved in-memory inputs. `InMemoryStore`
//! implements all three and can be loaded from a JSON data bundle.

use crate::error::StoreError;
use crate::impulse::ImpulseParameterSet;
use crate::models::{CheckIn, FactorDefinition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::info;

/// Source of a subject's check-ins
pub trait EventStore: Send + Sync {
    /// Check-ins for a subject ordered by timestamp
    fn check_ins(&self, subject_id: &str) -> Result<Vec<CheckIn>, StoreError>;

    /// Known subject identities
    fn subjects(&self) -> Vec<String>;
}

/// Factor catalog with default decay parameters
pub trait FactorCatalog: Send + Sync {
    fn definition(&self, factor_id: &str) -> Option<FactorDefinition>;
}

/// Per-subject personalized decay parameters
pub trait ParameterStore: Send + Sync {
    fn parameters(&self, subject_id: &str, factor_id: &str) -> Option<ImpulseParameterSet>;
}

/// Serialized form of an [`InMemoryStore`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataBundle {
    #[serde(default)]
    pub factors: Vec<FactorDefinition>,

    #[serde(default)]
    pub check_ins: BTreeMap<String, Vec<CheckIn>>,

    #[serde(default)]
    pub parameters: Vec<ImpulseParameterSet>,
}

/// In-memory store backing all three collaborator interfaces
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    factors: HashMap<String, FactorDefinition>,
    check_ins: BTreeMap<String, Vec<CheckIn>>,
    parameters: HashMap<(String, String), ImpulseParameterSet>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a data bundle
    pub fn from_bundle(bundle: DataBundle) -> Self {
        let mut store = InMemoryStore::new();
        for factor in bundle.factors {
            store.add_factor(factor);
        }
        for (subject_id, check_ins) in bundle.check_ins {
            store.add_check_ins(&subject_id, check_ins);
        }
        for set in bundle.parameters {
            store.set_parameters(set);
        }
        store
    }

    /// Load a JSON data bundle from disk
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| StoreError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let bundle: DataBundle =
            serde_json::from_str(&content).map_err(|e| StoreError::ParseFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        info!(
            path = %path.display(),
            subjects = bundle.check_ins.len(),
            factors = bundle.factors.len(),
            "Loaded data bundle"
        );

        Ok(Self::from_bundle(bundle))
    }

    /// Snapshot the store as a data bundle
    pub fn to_bundle(&self) -> DataBundle {
        let mut factors: Vec<FactorDefinition> = self.factors.values().cloned().collect();
        factors.sort_by(|a, b| a.id.cmp(&b.id));

        let mut parameters: Vec<ImpulseParameterSet> = self.parameters.values().cloned().collect();
        parameters.sort_by(|a, b| (&a.subject_id, &a.factor_id).cmp(&(&b.subject_id, &b.factor_id)));

        DataBundle {
            factors,
            check_ins: self.check_ins.clone(),
            parameters,
        }
    }

    pub fn add_factor(&mut self, definition: FactorDefinition) {
        self.factors.insert(definition.id.clone(), definition);
    }

    /// Append check-ins, keeping the subject's history ordered by timestamp
    pub fn add_check_ins(&mut self, subject_id: &str, check_ins: Vec<CheckIn>) {
        let history = self.check_ins.entry(subject_id.to_string()).or_default();
        history.extend(check_ins);
        history.sort_by_key(|check_in| check_in.timestamp);
    }

    pub fn set_parameters(&mut self, set: ImpulseParameterSet) {
        self.parameters
            .insert((set.subject_id.clone(), set.factor_id.clone()), set);
    }
}

impl EventStore for InMemoryStore {
    fn check_ins(&self, subject_id: &str) -> Result<Vec<CheckIn>, StoreError> {
        self.check_ins
            .get(subject_id)
            .cloned()
            .ok_or_else(|| StoreError::SubjectNotFound {
                subject_id: subject_id.to_string(),
            })
    }

    fn subjects(&self) -> Vec<String> {
        self.check_ins.keys().cloned().collect()
    }
}

impl FactorCatalog for InMemoryStore {
    fn definition(&self, factor_id: &str) -> Option<FactorDefinition> {
        self.factors.get(factor_id).cloned()
    }
}

impl ParameterStore for InMemoryStore {
    fn parameters(&self, subject_id: &str, factor_id: &str) -> Option<ImpulseParameterSet> {
        self.parameters
            .get(&(subject_id.to_string(), factor_id.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impulse::DecayParameters;
    use crate::models::{FactorCategory, HalfLifeUnit, MagnitudeRule};
    use chrono::{TimeZone, Utc};
    use tempfile::NamedTempFile;

    fn check_in(day: u32) -> CheckIn {
        CheckIn {
            timestamp: Utc.with_ymd_and_hms(2024, 6, day, 8, 0, 0).unwrap(),
            subjective: None,
            training: None,
            factors: Vec::new(),
        }
    }

    #[test]
    fn test_check_ins_are_kept_sorted() {
        let mut store = InMemoryStore::new();
        store.add_check_ins("a1", vec![check_in(5), check_in(2)]);
        store.add_check_ins("a1", vec![check_in(3)]);

        let history = store.check_ins("a1").unwrap();
        let days: Vec<_> = history.iter().map(|c| c.timestamp).collect();
        let mut sorted = days.clone();
        sorted.sort();
        assert_eq!(days, sorted);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_unknown_subject() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.check_ins("nobody"),
            Err(StoreError::SubjectNotFound { .. })
        ));
    }

    #[test]
    fn test_bundle_file_io() {
        let mut store = InMemoryStore::new();
        store.add_factor(FactorDefinition {
            id: "caffeine".to_string(),
            name: "Caffeine".to_string(),
            category: FactorCategory::Substance,
            k_positive: 0.5,
            tau_positive: 6.0,
            k_negative: 0.2,
            tau_negative: 12.0,
            half_life_unit: HalfLifeUnit::Hours,
            requires_quantity: true,
            requires_duration: false,
            requires_intensity: false,
            magnitude_rule: Some(MagnitudeRule::Quantity),
        });
        store.add_check_ins("a1", vec![check_in(1)]);
        store.set_parameters(ImpulseParameterSet::training("a1", DecayParameters::TRAINING));

        let file = NamedTempFile::new().unwrap();
        let json = serde_json::to_string_pretty(&store.to_bundle()).unwrap();
        std::fs::write(file.path(), json).unwrap();

        let loaded = InMemoryStore::load_from_file(file.path()).unwrap();
        assert!(loaded.definition("caffeine").is_some());
        assert!(loaded.parameters("a1", "training").is_some());
        assert_eq!(loaded.subjects(), vec!["a1".to_string()]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = InMemoryStore::load_from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(StoreError::ReadFailed { .. })));
    }
}
