use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Process-lifetime memo table
// ---------------------------------------------------------------------------

/// Memoizes the successful result of a computation per key.
///
/// Entries are never evicted. Failed computations are not stored, so the
/// next access with the same key tries again.
#[derive(Debug)]
pub struct Memo<K, V> {
    entries: HashMap<K, Arc<V>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, V> Memo<K, V> {
    /// Return the cached value for `key`, computing it with `f` on first use.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &K,
        f: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(v) = self.entries.get(key) {
            log::debug!("cache hit for {key:?}");
            return Ok(Arc::clone(v));
        }
        let value = Arc::new(f()?);
        self.entries.insert(key.clone(), Arc::clone(&value));
        Ok(value)
    }
}
