use std::fmt;
use std::sync::Arc;

/// Caller-supplied function reducing a concatenated business-key string to
/// a key.
///
/// Must be deterministic and free of side effects: deduplication relies on
/// the same input always producing the same key.
pub struct HashFunction<K> {
    inner: Arc<dyn Fn(&str) -> K + Send + Sync>,
}

impl<K> HashFunction<K> {
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&str) -> K + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(function),
        }
    }

    /// Hash a business-key (or value) string.
    pub fn hash(&self, data: &str) -> K {
        (self.inner)(data)
    }
}

impl<K> Clone for HashFunction<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> fmt::Debug for HashFunction<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashFunction")
            .field("output", &std::any::type_name::<K>())
            .finish()
    }
}
