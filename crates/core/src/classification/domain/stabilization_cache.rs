use std::collections::HashMap;

use crate::classification::domain::verdict::Verdict;
use crate::detection::domain::identity_tracker::FaceIdentity;

/// Last accepted verdict per face identity.
///
/// Entries never expire on their own; the whole cache is cleared when a
/// frame has no faces or the session restarts.
#[derive(Debug, Default)]
pub struct StabilizationCache {
    verdicts: HashMap<FaceIdentity, Verdict>,
}

impl StabilizationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, identity: &FaceIdentity) -> Option<Verdict> {
        self.verdicts.get(identity).copied()
    }

    /// Overwrites any previous verdict for `identity`.
    pub fn store(&mut self, identity: FaceIdentity, verdict: Verdict) {
        self.verdicts.insert(identity, verdict);
    }

    pub fn clear(&mut self) {
        self.verdicts.clear();
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn identities(&self) -> impl Iterator<Item = &FaceIdentity> {
        self.verdicts.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(x: i32, y: i32) -> FaceIdentity {
        FaceIdentity {
            bucket_x: x,
            bucket_y: y,
        }
    }

    #[test]
    fn test_lookup_miss_on_empty() {
        let cache = StabilizationCache::new();
        assert!(cache.lookup(&id(0, 0)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_store_then_lookup() {
        let mut cache = StabilizationCache::new();
        cache.store(id(1, 2), Verdict::new(true, 0.92));

        assert_eq!(cache.lookup(&id(1, 2)), Some(Verdict::new(true, 0.92)));
        assert!(cache.lookup(&id(2, 1)).is_none());
    }

    #[test]
    fn test_store_overwrites() {
        let mut cache = StabilizationCache::new();
        cache.store(id(1, 1), Verdict::new(true, 0.8));
        cache.store(id(1, 1), Verdict::new(false, 0.6));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&id(1, 1)), Some(Verdict::new(false, 0.6)));
    }

    #[test]
    fn test_store_is_idempotent() {
        let mut cache = StabilizationCache::new();
        cache.store(id(3, 3), Verdict::new(true, 0.7));
        cache.store(id(3, 3), Verdict::new(true, 0.7));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_forgets_everyone() {
        let mut cache = StabilizationCache::new();
        cache.store(id(0, 0), Verdict::new(true, 0.9));
        cache.store(id(5, 5), Verdict::new(false, 0.9));

        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.lookup(&id(0, 0)).is_none());
        assert_eq!(cache.identities().count(), 0);
    }
}
