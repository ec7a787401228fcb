/*
 * Copyright (C) 2023 Asim Ihsan
 * SPDX-License-Identifier: AGPL-3.0-only
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU Affero General Public License as published by the Free
 * Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A
 * PARTICULAR PURPOSE. See the GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License along
 * with this program. If not, see <https://www.gnu.org/licenses/>
 */

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Float, MarkovDecisionProcess, MdpError};

/// Bumped whenever the on-disk layout changes.
pub const POLICY_FILE_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntry<_Action> {
    pub value: Float,
    pub action: _Action,
}

#[derive(Serialize, Deserialize)]
struct PolicyFileEntry<_Key, _Action> {
    key: _Key,
    value: Float,
    action: _Action,
}

#[derive(Serialize, Deserialize)]
struct PolicyFile<_Key, _Action> {
    version: u32,
    #[serde(default)]
    settings: serde_json::Value,
    entries: Vec<PolicyFileEntry<_Key, _Action>>,
}

/// State key to (value, action) table produced by the solvers.
///
/// Entries are kept sorted by key, so the serialized form of a given table is always the same.
/// The table also carries the settings it was solved under, null unless the caller sets them.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStore<_Key: Ord, _Action> {
    entries: BTreeMap<_Key, PolicyEntry<_Action>>,
    settings: serde_json::Value,
}

impl<_Key: Ord, _Action> Default for PolicyStore<_Key, _Action> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            settings: serde_json::Value::Null,
        }
    }
}

impl<_Key, _Action> PolicyStore<_Key, _Action>
where
    _Key: Ord + Clone,
    _Action: Copy,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting table for the solvers: terminal states hold their fixed value, every other state
    /// holds zero, and all of them hold the default action.
    pub fn initial<_Mdp>(mdp: &_Mdp, states: &[_Mdp::State]) -> Self
    where
        _Mdp: MarkovDecisionProcess<Key = _Key, Action = _Action>,
    {
        let action = mdp.default_action();
        let entries = states
            .iter()
            .map(|state| {
                let value = mdp.terminal_value(state).unwrap_or(0.0);
                (mdp.key(state), PolicyEntry { value, action })
            })
            .collect();
        Self {
            entries,
            settings: serde_json::Value::Null,
        }
    }

    pub fn insert(&mut self, key: _Key, entry: PolicyEntry<_Action>) {
        self.entries.insert(key, entry);
    }

    pub fn get(&self, key: &_Key) -> Option<&PolicyEntry<_Action>> {
        self.entries.get(key)
    }

    pub fn value(&self, key: &_Key) -> Option<Float> {
        self.entries.get(key).map(|entry| entry.value)
    }

    pub fn action(&self, key: &_Key) -> Option<_Action> {
        self.entries.get(key).map(|entry| entry.action)
    }

    pub(crate) fn set_value(&mut self, key: &_Key, value: Float) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.value = value;
        }
    }

    pub(crate) fn set_action(&mut self, key: &_Key, action: _Action) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.action = action;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, _Key, PolicyEntry<_Action>> {
        self.entries.iter()
    }

    /// Fails unless this table has an entry for exactly the given keys.
    pub fn check_covers(&self, expected: &BTreeSet<_Key>) -> Result<(), MdpError> {
        let missing = expected
            .iter()
            .filter(|key| !self.entries.contains_key(key))
            .count();
        if missing > 0 || self.entries.len() != expected.len() {
            return Err(MdpError::SchemaMismatch {
                expected: expected.len(),
                found: self.entries.len(),
                missing,
            });
        }
        Ok(())
    }
}

impl<_Key, _Action> PolicyStore<_Key, _Action>
where
    _Key: Ord + Clone + Serialize + DeserializeOwned,
    _Action: Copy + Serialize + DeserializeOwned,
{
    pub fn to_json(&self) -> Result<String, MdpError> {
        let file = PolicyFile {
            version: POLICY_FILE_VERSION,
            settings: self.settings.clone(),
            entries: self
                .entries
                .iter()
                .map(|(key, entry)| PolicyFileEntry {
                    key: key.clone(),
                    value: entry.value,
                    action: entry.action,
                })
                .collect(),
        };
        Ok(serde_json::to_string(&file)?)
    }

    pub fn from_json(json: &str) -> Result<Self, MdpError> {
        let file: PolicyFile<_Key, _Action> = serde_json::from_str(json)?;
        if file.version != POLICY_FILE_VERSION {
            return Err(MdpError::UnsupportedVersion {
                expected: POLICY_FILE_VERSION,
                found: file.version,
            });
        }
        let entries = file
            .entries
            .into_iter()
            .map(|entry| {
                (
                    entry.key,
                    PolicyEntry {
                        value: entry.value,
                        action: entry.action,
                    },
                )
            })
            .collect();
        Ok(Self {
            entries,
            settings: file.settings,
        })
    }

    pub fn settings(&self) -> &serde_json::Value {
        &self.settings
    }

    /// Record the settings this table was solved under. They are written with the table and
    /// checked again by [`PolicyStore::load`].
    pub fn set_settings<_Settings: Serialize>(
        &mut self,
        settings: &_Settings,
    ) -> Result<(), MdpError> {
        self.settings = serde_json::to_value(settings)?;
        Ok(())
    }

    /// Fails unless this table was solved under exactly `settings`.
    pub fn check_settings<_Settings: Serialize>(
        &self,
        settings: &_Settings,
    ) -> Result<(), MdpError> {
        let expected = serde_json::to_value(settings)?;
        if expected != self.settings {
            return Err(MdpError::SettingsMismatch {
                expected: expected.to_string(),
                found: self.settings.to_string(),
            });
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), MdpError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        tracing::debug!(path = %path.display(), states = self.len(), "saved policy");
        Ok(())
    }

    /// Load a table and check that it was solved under `settings` and covers exactly `expected`.
    /// Any failure means the caller should solve again rather than trust the file.
    pub fn load<_Settings: Serialize>(
        path: &Path,
        expected: &BTreeSet<_Key>,
        settings: &_Settings,
    ) -> Result<Self, MdpError> {
        let json = fs::read_to_string(path)?;
        let store = Self::from_json(&json)?;
        store.check_settings(settings)?;
        store.check_covers(expected)?;
        tracing::debug!(path = %path.display(), states = store.len(), "loaded policy");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::test_mdp::{Corridor, Move};
    use crate::{value_iteration, SolverConfig};

    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("markov-decision-process-{}", std::process::id()))
            .join(name)
    }

    fn solved_corridor() -> PolicyStore<u8, Move> {
        let corridor = Corridor::default();
        value_iteration(&corridor, &SolverConfig::default())
            .unwrap()
            .policy
    }

    fn corridor_keys() -> BTreeSet<u8> {
        Corridor::default().states().into_iter().collect()
    }

    #[test]
    fn test_initial_store_holds_terminal_values() {
        let corridor = Corridor::default();
        let store = PolicyStore::initial(&corridor, &corridor.states());
        assert_eq!(store.len(), 6);
        assert_eq!(store.value(&0), Some(-200.0));
        assert_eq!(store.value(&5), Some(100.0));
        assert_eq!(store.value(&3), Some(0.0));
        assert_eq!(store.action(&3), Some(Move::Left));
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let store = solved_corridor();
        let json = store.to_json().unwrap();
        let decoded: PolicyStore<u8, Move> = PolicyStore::from_json(&json).unwrap();
        assert_eq!(decoded, store);
        assert_eq!(decoded.to_json().unwrap(), json);
    }

    #[test]
    fn test_save_then_load() {
        let store = solved_corridor();
        let path = scratch_path("round-trip.json");
        store.save(&path).unwrap();
        let loaded = PolicyStore::load(&path, &corridor_keys(), &()).unwrap();
        assert_eq!(loaded, store);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_other_state_space() {
        let store = solved_corridor();
        let path = scratch_path("other-space.json");
        store.save(&path).unwrap();
        let bigger: BTreeSet<u8> = (0..=7).collect();
        let result = PolicyStore::<u8, Move>::load(&path, &bigger, &());
        assert!(matches!(
            result,
            Err(MdpError::SchemaMismatch {
                expected: 8,
                found: 6,
                missing: 2
            })
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_settings_travel_with_the_table() {
        let mut store = solved_corridor();
        store.set_settings(&SolverConfig::default()).unwrap();
        let path = scratch_path("settings.json");
        store.save(&path).unwrap();

        let loaded =
            PolicyStore::<u8, Move>::load(&path, &corridor_keys(), &SolverConfig::default())
                .unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.settings()["max_iterations"], serde_json::json!(100));

        let stricter = SolverConfig {
            epsilon: 0.001,
            ..SolverConfig::default()
        };
        let result = PolicyStore::<u8, Move>::load(&path, &corridor_keys(), &stricter);
        assert!(matches!(result, Err(MdpError::SettingsMismatch { .. })));
        let result = PolicyStore::<u8, Move>::load(&path, &corridor_keys(), &());
        assert!(matches!(result, Err(MdpError::SettingsMismatch { .. })));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = PolicyStore::<u8, Move>::load(&scratch_path("absent.json"), &corridor_keys(), &());
        assert!(matches!(result, Err(MdpError::Io(_))));
    }

    #[test]
    fn test_corrupt_json_is_rejected() {
        let result = PolicyStore::<u8, Move>::from_json("{\"version\": 1, \"entries\": [");
        assert!(matches!(result, Err(MdpError::Serialization(_))));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let result = PolicyStore::<u8, Move>::from_json("{\"version\": 99, \"entries\": []}");
        assert!(matches!(
            result,
            Err(MdpError::UnsupportedVersion {
                expected: POLICY_FILE_VERSION,
                found: 99
            })
        ));
    }
}
