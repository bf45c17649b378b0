use crate::models::{ScoreKey, ScoreTable};
use serde_json::Value;

/// Sparse table of entered scores. Values are stored exactly as typed;
/// numeric validation only happens when a cell is classified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreStore {
    entries: ScoreTable,
}

impl ScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(entries: ScoreTable) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &ScoreKey) -> &str {
        self.get_raw(&key.composite())
    }

    pub fn get_raw(&self, composite: &str) -> &str {
        self.entries.get(composite).map(String::as_str).unwrap_or_default()
    }

    pub fn set(&mut self, key: &ScoreKey, value: impl Into<String>) {
        self.entries.insert(key.composite(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn table(&self) -> &ScoreTable {
        &self.entries
    }

    pub fn serialize(&self) -> ScoreTable {
        self.entries.clone()
    }

    /// Rebuilds a store from a persisted or imported table. Anything that is
    /// not a JSON object yields an empty store; numbers are kept in their
    /// string form and other non-string values are dropped.
    pub fn deserialize(snapshot: &Value) -> Self {
        let Some(object) = snapshot.as_object() else {
            if !snapshot.is_null() {
                tracing::warn!("score snapshot is not an object; starting empty");
            }
            return Self::new();
        };

        let mut entries = ScoreTable::new();
        for (key, value) in object {
            match value {
                Value::String(text) => {
                    entries.insert(key.clone(), text.clone());
                }
                Value::Number(number) => {
                    entries.insert(key.clone(), number.to_string());
                }
                _ => {
                    tracing::debug!(key = %key, "dropping non-scalar score entry");
                }
            }
        }
        Self { entries }
    }

    pub fn deserialize_str(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::deserialize(&value),
            Err(error) => {
                tracing::warn!(error = %error, "score snapshot is not valid json; starting empty");
                Self::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ScoreStore;
    use crate::models::ScoreKey;
    use serde_json::json;

    #[test]
    fn missing_keys_read_as_empty() {
        let store = ScoreStore::new();
        assert_eq!(store.get(&ScoreKey::metric(1, "Q1FY26")), "");
        assert_eq!(store.get(&ScoreKey::category(1, "Flex", "Q1FY26")), "");
    }

    #[test]
    fn set_overwrites_without_validation() {
        let mut store = ScoreStore::new();
        let key = ScoreKey::category(1, "Flex", "Q1FY26");
        store.set(&key, "99.2");
        store.set(&key, "pending");
        assert_eq!(store.get(&key), "pending");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn metric_and_category_keys_do_not_collide() {
        let mut store = ScoreStore::new();
        store.set(&ScoreKey::metric(1, "Q1FY26"), "99");
        store.set(&ScoreKey::category(1, "Flex", "Q1FY26"), "97");
        assert_eq!(store.get(&ScoreKey::metric(1, "Q1FY26")), "99");
        assert_eq!(store.get(&ScoreKey::category(1, "Flex", "Q1FY26")), "97");
    }

    #[test]
    fn serialized_table_survives_a_reload() {
        let mut store = ScoreStore::new();
        store.set(&ScoreKey::metric(3, "Q4FY25"), "3.8");
        store.set(&ScoreKey::category(9, "Fabrinet Interconnect", "Q2FY26"), "");
        store.set(&ScoreKey::metric(4, "Q1FY26"), "4,5");

        let serialized = store.serialize();
        let value = serde_json::to_value(&serialized).expect("to value");
        let reloaded = ScoreStore::deserialize(&value);
        assert_eq!(reloaded.serialize(), serialized);
        assert_eq!(reloaded, store);
    }

    #[test]
    fn malformed_snapshots_degrade_to_empty() {
        assert!(ScoreStore::deserialize(&json!(null)).is_empty());
        assert!(ScoreStore::deserialize(&json!(["1-Q1FY26"])).is_empty());
        assert!(ScoreStore::deserialize_str("{not json").is_empty());
        assert!(ScoreStore::deserialize_str("").is_empty());
    }

    #[test]
    fn numeric_values_are_kept_as_text() {
        let store = ScoreStore::deserialize(&json!({
            "1-Q1FY26": 99.5,
            "2-Q1FY26": "100",
            "3-Q1FY26": {"nested": true},
        }));
        assert_eq!(store.get_raw("1-Q1FY26"), "99.5");
        assert_eq!(store.get_raw("2-Q1FY26"), "100");
        assert_eq!(store.get_raw("3-Q1FY26"), "");
        assert_eq!(store.len(), 2);
    }
}
