// ── In-memory list caches ──
//
// Each domain service keeps one ordered list. Writers swap in a whole new
// snapshot; readers hold an `Arc` and never block. Concurrent writers race
// and the last one wins.

use std::sync::Arc;

use tokio::sync::watch;

use crate::stream::{EntityStream, Snapshot};

pub struct ListCache<T: Send + Sync + 'static> {
    tx: watch::Sender<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> ListCache<T> {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(Vec::new()));
        Self { tx }
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.tx.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    pub fn subscribe(&self) -> EntityStream<T> {
        EntityStream::new(self.tx.subscribe())
    }

    /// Replace the whole list, keeping the server's order.
    pub fn replace(&self, items: impl IntoIterator<Item = T>) {
        let next: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        self.tx.send_replace(Arc::new(next));
    }

    /// Drop every entry for which `keep` returns `false`.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) {
        self.tx.send_modify(|snap| {
            let next: Vec<Arc<T>> = snap.iter().filter(|e| keep(e)).cloned().collect();
            *snap = Arc::new(next);
        });
    }

    /// Insert at the front (newest first).
    pub fn prepend(&self, item: T) {
        self.tx.send_modify(|snap| {
            let mut next = Vec::with_capacity(snap.len() + 1);
            next.push(Arc::new(item));
            next.extend(snap.iter().cloned());
            *snap = Arc::new(next);
        });
    }

    pub fn clear(&self) {
        self.tx.send_replace(Arc::new(Vec::new()));
    }
}

impl<T: Send + Sync + 'static> Default for ListCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for ListCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListCache").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(cache: &ListCache<u32>) -> Vec<u32> {
        cache.snapshot().iter().map(|v| **v).collect()
    }

    #[test]
    fn replace_retain_prepend_clear() {
        let cache = ListCache::new();
        assert!(cache.is_empty());

        cache.replace([1, 2, 3, 4]);
        assert_eq!(values(&cache), vec![1, 2, 3, 4]);

        cache.retain(|v| v % 2 == 0);
        assert_eq!(values(&cache), vec![2, 4]);

        cache.prepend(9);
        assert_eq!(values(&cache), vec![9, 2, 4]);
        assert_eq!(cache.len(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn old_snapshots_are_unaffected() {
        let cache = ListCache::new();
        cache.replace([1, 2]);
        let before = cache.snapshot();
        cache.replace([3]);
        assert_eq!(before.len(), 2);
        assert_eq!(values(&cache), vec![3]);
    }

    #[tokio::test]
    async fn stream_sees_replacements() {
        let cache = ListCache::new();
        let mut stream = cache.subscribe();
        assert!(stream.current().is_empty());

        cache.replace([7]);
        let snap = stream.changed().await.unwrap();
        assert_eq!(*snap[0], 7);
        assert_eq!(stream.latest().len(), 1);
    }

    #[test]
    fn changed_waits_for_a_write() {
        let cache = ListCache::new();
        let mut stream = cache.subscribe();
        let mut changed = tokio_test::task::spawn(stream.changed());
        tokio_test::assert_pending!(changed.poll());

        cache.prepend(5);
        assert!(changed.is_woken());
        let snap = tokio_test::assert_ready!(changed.poll()).unwrap();
        assert_eq!(*snap[0], 5);
    }
}
