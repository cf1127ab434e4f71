use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};

/// Keyed storage behind every service. `modify` and `upsert` run the closure while the
/// key is held, so a read-modify-write of one key cannot interleave with another writer.
pub trait KeyValueStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Result<Option<V>>;

    fn put(&self, key: K, value: V) -> Result<()>;

    fn delete(&self, key: &K) -> Result<Option<V>>;

    fn values(&self) -> Result<Vec<V>>;

    /// Applies `f` to the stored value and returns the updated copy, or `None` when absent.
    fn modify(&self, key: &K, f: &mut dyn FnMut(&mut V)) -> Result<Option<V>>;

    /// Applies `f` to the stored value, inserting `init()` first when the key is absent.
    fn upsert(&self, key: K, init: &dyn Fn() -> V, f: &mut dyn FnMut(&mut V)) -> Result<V>;
}

#[derive(Debug)]
pub struct MemoryStore<K, V> {
    inner: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for MemoryStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<K, V> MemoryStore<K, V> {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> Error {
    Error::Internal("store lock poisoned".to_string())
}

impl<K, V> KeyValueStore<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<V>> {
        let guard = self.inner.read().map_err(|_| poisoned())?;
        Ok(guard.get(key).cloned())
    }

    fn put(&self, key: K, value: V) -> Result<()> {
        let mut guard = self.inner.write().map_err(|_| poisoned())?;
        guard.insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &K) -> Result<Option<V>> {
        let mut guard = self.inner.write().map_err(|_| poisoned())?;
        Ok(guard.remove(key))
    }

    fn values(&self) -> Result<Vec<V>> {
        let guard = self.inner.read().map_err(|_| poisoned())?;
        Ok(guard.values().cloned().collect())
    }

    fn modify(&self, key: &K, f: &mut dyn FnMut(&mut V)) -> Result<Option<V>> {
        let mut guard = self.inner.write().map_err(|_| poisoned())?;
        Ok(guard.get_mut(key).map(|value| {
            f(value);
            value.clone()
        }))
    }

    fn upsert(&self, key: K, init: &dyn Fn() -> V, f: &mut dyn FnMut(&mut V)) -> Result<V> {
        let mut guard = self.inner.write().map_err(|_| poisoned())?;
        let value = guard.entry(key).or_insert_with(init);
        f(value);
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modify_reports_missing_keys() {
        let store: MemoryStore<String, u32> = MemoryStore::new();
        let out = store.modify(&"nope".to_string(), &mut |v| *v += 1).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn upsert_initialises_then_applies() {
        let store: MemoryStore<&'static str, Vec<u32>> = MemoryStore::new();
        store.upsert("a", &Vec::new, &mut |v| v.push(1)).unwrap();
        let v = store.upsert("a", &Vec::new, &mut |v| v.push(2)).unwrap();
        assert_eq!(v, vec![1, 2]);
        assert_eq!(store.delete(&"a").unwrap(), Some(vec![1, 2]));
        assert!(store.get(&"a").unwrap().is_none());
    }

    #[test]
    fn clones_share_state() {
        let store: MemoryStore<u8, u8> = MemoryStore::new();
        let other = store.clone();
        store.put(1, 10).unwrap();
        assert_eq!(other.get(&1).unwrap(), Some(10));
        assert_eq!(other.values().unwrap(), vec![10]);
    }
}
