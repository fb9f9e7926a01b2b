//! Bounded, non-blocking idle queue.
//!
//! Each pool tier is an [`IdleQueue`]. Both operations are a single
//! compare-and-swap on a lock-free ring buffer and fail immediately instead
//! of waiting: a push into a full queue hands the value back, a pop from an
//! empty queue returns `None`. Concurrent pushers and poppers never
//! serialize on a shared lock.

use crossbeam_queue::ArrayQueue;

/// A fixed-capacity idle-resource holding area.
///
/// Capacity zero is allowed. Such a queue is permanently full and empty,
/// which is what the overflow tier looks like when `min_idle == max_idle`.
pub struct IdleQueue<T> {
    slots: Option<ArrayQueue<T>>,
}

impl<T> IdleQueue<T> {
    /// Create a queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        // ArrayQueue rejects a zero capacity.
        let slots = (capacity > 0).then(|| ArrayQueue::new(capacity));
        Self { slots }
    }

    /// Insert `item`, or return it if the queue is full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        match &self.slots {
            Some(slots) => slots.push(item),
            None => Err(item),
        }
    }

    /// Remove an item, or return `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<T> {
        self.slots.as_ref().and_then(ArrayQueue::pop)
    }

    /// Number of items currently held.
    pub fn len(&self) -> usize {
        self.slots.as_ref().map_or(0, ArrayQueue::len)
    }

    /// Whether the queue holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a push would fail right now.
    pub fn is_full(&self) -> bool {
        self.slots.as_ref().is_none_or(ArrayQueue::is_full)
    }

    /// Maximum number of items the queue can hold.
    pub fn capacity(&self) -> usize {
        self.slots.as_ref().map_or(0, ArrayQueue::capacity)
    }

    /// Pop every item currently held.
    ///
    /// Items pushed concurrently may or may not be included.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.try_pop())
    }
}

impl<T> std::fmt::Debug for IdleQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_push_until_full() {
        let queue = IdleQueue::new(2);
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 2);

        queue.try_push(1).unwrap();
        queue.try_push(2).unwrap();
        assert!(queue.is_full());
        assert_eq!(queue.try_push(3), Err(3));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_pop_empty() {
        let queue: IdleQueue<u8> = IdleQueue::new(4);
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_zero_capacity() {
        let queue = IdleQueue::new(0);
        assert!(queue.is_full());
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 0);
        assert_eq!(queue.try_push("x"), Err("x"));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_drain() {
        let queue = IdleQueue::new(3);
        for i in 0..3 {
            queue.try_push(i).unwrap();
        }

        let mut drained: Vec<_> = queue.drain().collect();
        drained.sort_unstable();
        assert_eq!(drained, vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_push_never_exceeds_capacity() {
        let queue = Arc::new(IdleQueue::new(8));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| queue.try_push(t * 100 + i).is_ok())
                        .count()
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 8);
        assert_eq!(queue.len(), 8);
    }
}
