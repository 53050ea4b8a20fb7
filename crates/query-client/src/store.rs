use std::{
    fmt::{self, Write as _},
    sync::{Arc, PoisonError, RwLock},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    operation::{Operation, Variables},
};

/// Cache key of an operation: its name followed by its variables as canonical JSON.
///
/// Object keys are sorted at every level, so structurally equal variables always
/// give the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(name: &str, variables: &Variables) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::MissingName);
        }

        Ok(Self::from_parts(name, variables))
    }

    pub(crate) fn from_parts(name: &str, variables: &Variables) -> Self {
        let mut key = String::from(name);
        write_canonical_object(&mut key, variables);
        Fingerprint(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(object) => write_canonical_object(out, object),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        // Display of scalars is their compact JSON form.
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}

fn write_canonical_object(out: &mut String, object: &serde_json::Map<String, Value>) {
    let mut entries = object.iter().collect::<Vec<_>>();
    entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}:", Value::from(key.as_str()));
        write_canonical(out, value);
    }
    out.push('}');
}

/// Dehydrated content of a [`Store`], in insertion order.
///
/// Serializes as a JSON array of `[fingerprint, payload]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheSnapshot(pub Vec<(Fingerprint, Value)>);

impl FromIterator<(Fingerprint, Value)> for CacheSnapshot {
    fn from_iter<I: IntoIterator<Item = (Fingerprint, Value)>>(iter: I) -> Self {
        CacheSnapshot(iter.into_iter().collect())
    }
}

impl IntoIterator for CacheSnapshot {
    type Item = (Fingerprint, Value);
    type IntoIter = std::vec::IntoIter<(Fingerprint, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Last known result of every operation, shared by all controllers of a client.
///
/// Cloning gives another handle to the same entries. Writes are last-write-wins
/// and nothing is ever evicted.
#[derive(Clone, Default)]
pub struct Store {
    entries: Arc<RwLock<IndexMap<Fingerprint, Value>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (Fingerprint, Value)>) -> Self {
        Store {
            entries: Arc::new(RwLock::new(entries.into_iter().collect())),
        }
    }

    /// Writes every entry of `snapshot`, overwriting existing ones.
    pub fn hydrate(&self, snapshot: CacheSnapshot) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.extend(snapshot);
        tracing::debug!(added = entries.len() - before, "hydrated store");
    }

    pub fn get(&self, operation: &Operation) -> Option<Value> {
        self.get_by_fingerprint(&operation.fingerprint())
    }

    pub fn get_by_fingerprint(&self, fingerprint: &Fingerprint) -> Option<Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(fingerprint)
            .cloned()
    }

    pub fn contains(&self, operation: &Operation) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&operation.fingerprint())
    }

    pub fn set(&self, operation: &Operation, payload: Value) {
        let fingerprint = operation.fingerprint();
        tracing::trace!(%fingerprint, "writing cache entry");

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fingerprint, payload);
    }

    pub fn export(&self) -> Vec<(Fingerprint, Value)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(fingerprint, payload)| (fingerprint.clone(), payload.clone()))
            .collect()
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot(self.export())
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<CacheSnapshot> for Store {
    fn from(snapshot: CacheSnapshot) -> Self {
        Store::from_entries(snapshot)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{operation::OperationSource, text::compose};

    fn operation(name: &str, variables: Value) -> Operation {
        let text = format!("query {name} {{ field }}");
        let source = OperationSource::try_from(compose(&[text.as_str()], vec![]).unwrap()).unwrap();
        let Value::Object(variables) = variables else {
            unreachable!("variables must be an object");
        };
        Operation::build(&source, Some(variables)).unwrap()
    }

    #[test]
    fn creates_a_cache_key() {
        let op = operation("CoolQuery", json!({"data": "rules"}));
        assert_eq!(op.fingerprint().as_str(), r#"CoolQuery{"data":"rules"}"#);
    }

    #[test]
    fn fingerprints_are_deterministic() {
        let first = operation("Q", json!({"a": 1}));
        let again = operation("Q", json!({"a": 1}));
        let other = operation("Q", json!({"a": 2}));

        assert_eq!(first.fingerprint(), again.fingerprint());
        assert_ne!(first.fingerprint(), other.fingerprint());
    }

    #[test]
    fn fingerprints_sort_nested_keys() {
        let op = operation("Q", json!({"b": {"z": 1, "y": [{"d": 1, "c": 2}]}, "a": "x"}));
        assert_eq!(op.fingerprint().as_str(), r#"Q{"a":"x","b":{"y":[{"c":2,"d":1}],"z":1}}"#);
    }

    #[test]
    fn fingerprint_requires_a_name() {
        assert_eq!(Fingerprint::new("", &Variables::new()), Err(Error::MissingName));
        assert_eq!(Fingerprint::new("Q", &Variables::new()).unwrap().as_str(), "Q{}");
    }

    #[test]
    fn reads_and_writes() {
        let store = Store::new();
        let op = operation("CoolQuery", json!({"data": "rules"}));

        assert_eq!(store.get(&op), None);
        store.set(&op, json!({"oh": "well"}));
        assert_eq!(store.get(&op), Some(json!({"oh": "well"})));

        store.set(&op, json!({"oh": "no"}));
        assert_eq!(store.get(&op), Some(json!({"oh": "no"})));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn dehydrates_and_hydrates() {
        let old = Store::new();
        let first = operation("First", json!({}));
        let second = operation("Second", json!({"page": 2}));
        old.set(&first, json!({"a": 1}));
        old.set(&second, json!({"b": 2}));

        let new = Store::from_entries(old.export());

        assert_eq!(new.get(&first), old.get(&first));
        assert_eq!(new.get(&second), old.get(&second));
        assert_eq!(Store::from_entries(new.export()).export(), old.export());
    }

    #[test]
    fn hydrating_overwrites_existing_entries() {
        let store = Store::new();
        let kept = operation("Kept", json!({}));
        let replaced = operation("Replaced", json!({}));
        store.set(&kept, json!(1));
        store.set(&replaced, json!("stale"));

        store.hydrate(CacheSnapshot(vec![(replaced.fingerprint(), json!("fresh"))]));

        assert_eq!(store.get(&kept), Some(json!(1)));
        assert_eq!(store.get(&replaced), Some(json!("fresh")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn snapshot_serialization() {
        let store = Store::new();
        store.set(&operation("CoolQuery", json!({"data": "rules"})), json!({"oh": "well"}));

        let snapshot = store.snapshot();
        insta::assert_json_snapshot!(snapshot, @r###"
        [
          [
            "CoolQuery{\"data\":\"rules\"}",
            {
              "oh": "well"
            }
          ]
        ]
        "###);

        let parsed: CacheSnapshot = serde_json::from_value(serde_json::to_value(&snapshot).unwrap()).unwrap();
        assert_eq!(Store::from(parsed).export(), store.export());
    }

    #[test]
    fn handles_are_shared_across_threads() {
        let store = Store::new();

        std::thread::scope(|scope| {
            for page in 0..8 {
                let store = store.clone();
                scope.spawn(move || store.set(&operation("Page", json!({"page": page})), json!(page)));
            }
        });

        assert_eq!(store.len(), 8);
        assert_eq!(store.get(&operation("Page", json!({"page": 3}))), Some(json!(3)));
    }
}
