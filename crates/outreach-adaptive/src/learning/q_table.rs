//! Tabular state → action → value store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Q-values keyed by state key, then action key.
///
/// Entries are never removed. Unseen pairs read as 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QTable {
    values: BTreeMap<String, BTreeMap<String, f64>>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, state: &str, action: &str) -> f64 {
        self.values
            .get(state)
            .and_then(|actions| actions.get(action))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn contains_state(&self, state: &str) -> bool {
        self.values.contains_key(state)
    }

    /// Max over the recorded actions of `state`, 0.0 when it has none
    pub fn max_value(&self, state: &str) -> f64 {
        self.values
            .get(state)
            .and_then(|actions| actions.values().copied().reduce(f64::max))
            .unwrap_or(0.0)
    }

    /// Index into `actions` of the highest value, first wins on ties.
    ///
    /// `None` if `state` has never been updated.
    pub fn best_action(&self, state: &str, actions: &[String]) -> Option<usize> {
        let recorded = self.values.get(state)?;
        let mut best: Option<(usize, f64)> = None;
        for (index, action) in actions.iter().enumerate() {
            let value = recorded.get(action).copied().unwrap_or(0.0);
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((index, value)),
            }
        }
        best.map(|(index, _)| index)
    }

    /// Apply one Q-learning step and return the new value
    pub fn update(
        &mut self,
        state: &str,
        action: &str,
        reward: f64,
        next_state: &str,
        learning_rate: f64,
        discount_factor: f64,
    ) -> f64 {
        let next_max = self.max_value(next_state);
        let value = self
            .values
            .entry(state.to_string())
            .or_default()
            .entry(action.to_string())
            .or_insert(0.0);
        *value += learning_rate * (reward + discount_factor * next_max - *value);
        *value
    }

    pub fn state_count(&self) -> usize {
        self.values.len()
    }

    /// Number of recorded (state, action) pairs
    pub fn len(&self) -> usize {
        self.values.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn actions_for(&self, state: &str) -> Option<&BTreeMap<String, f64>> {
        self.values.get(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_unseen_pairs_read_zero() {
        let table = QTable::new();
        assert_eq!(table.get("s", "a"), 0.0);
        assert_eq!(table.max_value("s"), 0.0);
        assert_eq!(table.best_action("s", &keys(&["a"])), None);
    }

    #[test]
    fn test_update_rule() {
        let mut table = QTable::new();
        // Q = 0 + 0.5 * (10 + 0.9 * 0 - 0) = 5
        assert_eq!(table.update("s0", "a", 10.0, "s1", 0.5, 0.9), 5.0);

        table.update("s1", "b", 4.0, "s1", 1.0, 0.0);
        // Q = 5 + 0.5 * (0 + 0.9 * 4 - 5) = 4.3
        let value = table.update("s0", "a", 0.0, "s1", 0.5, 0.9);
        assert!((value - 4.3).abs() < 1e-12);
    }

    #[test]
    fn test_max_uses_recorded_values_only() {
        let mut table = QTable::new();
        table.update("s", "a", -4.0, "t", 1.0, 0.0);
        assert_eq!(table.max_value("s"), -4.0);
    }

    #[test]
    fn test_ties_break_by_enumeration_order() {
        let mut table = QTable::new();
        table.update("s", "b", 0.0, "t", 1.0, 0.0);
        let actions = keys(&["a", "b", "c"]);
        // all zero: first action wins
        assert_eq!(table.best_action("s", &actions), Some(0));

        table.update("s", "c", 2.0, "t", 1.0, 0.0);
        table.update("s", "b", 2.0, "t", 1.0, 0.0);
        assert_eq!(table.best_action("s", &actions), Some(1));
    }

    #[test]
    fn test_zero_entries_serialize() {
        let mut table = QTable::new();
        table.update("s", "a", 0.0, "t", 0.5, 0.9);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"s":{"a":0.0}}"#);
        let restored: QTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, table);
        assert_eq!(restored.len(), 1);
    }
}
