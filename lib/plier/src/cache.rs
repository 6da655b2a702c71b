//! Single-flight method cache.
//!
//! Each [`MethodKey`] is built at most once: concurrent first callers block on
//! the same build and all receive the same `Arc`. Failed builds are cached
//! too, so a broken declaration reports the same [`BuildError`] every time.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use plier_core::{BuildError, MethodKey};
use tracing::{debug, trace, warn};

use crate::service_method::ServiceMethod;

type Slot<T> = Arc<OnceLock<Result<Arc<T>, BuildError>>>;

/// Keyed, build-once store of compiled methods.
pub struct MethodCache<T = ServiceMethod> {
    slots: Mutex<HashMap<MethodKey, Slot<T>>>,
}

impl<T> Default for MethodCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MethodCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCache")
            .field("len", &self.len())
            .finish()
    }
}

impl<T> MethodCache<T> {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Cached entry for `key`, building it with `build` on first use.
    ///
    /// The index lock is only held to find the slot; the build itself runs
    /// outside it, so different keys build in parallel.
    ///
    /// # Errors
    ///
    /// Returns the (cached) build error for `key`.
    pub fn get_or_build<F>(&self, key: &MethodKey, build: F) -> Result<Arc<T>, BuildError>
    where
        F: FnOnce() -> Result<T, BuildError>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut built = false;
        let result = slot.get_or_init(|| {
            built = true;
            debug!(method = %key, "building method");
            build().map(Arc::new)
        });

        match result {
            Err(err) if built => warn!(method = %key, error = %err, "method build failed"),
            _ if !built => trace!(method = %key, "method cache hit"),
            _ => {}
        }
        result.clone()
    }

    /// Cached entry for `key`, without building.
    #[must_use]
    pub fn get(&self, key: &MethodKey) -> Option<Result<Arc<T>, BuildError>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key)?.get().cloned()
    }

    /// Number of keys with a finished build.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.get().is_some()).count()
    }

    /// Whether no build has finished yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
