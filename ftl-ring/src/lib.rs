//! Bounded single-producer/single-consumer ring used for the FTL's
//! submission (`to_ftl`) and completion (`to_poller`) rings.
//!
//! The FTL worker is the sole consumer of a submission ring and the sole
//! producer of the matching completion ring, so a lock-free bounded MPMC
//! queue is overkill in theory but exactly the right fit in practice: it
//! gives us `push`/`pop` without any unsafe code of our own.

use crossbeam::queue::ArrayQueue;

pub struct Ring<T> {
    queue: ArrayQueue<T>,
}

impl<T> Ring<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Enqueue an item. Returns the item back on failure (ring full).
    pub fn enqueue(&self, item: T) -> Result<(), T> {
        self.queue.push(item)
    }

    /// Dequeue one item, if any is available.
    pub fn dequeue(&self) -> Option<T> {
        self.queue.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_dequeue_order_is_fifo() {
        let ring: Ring<u32> = Ring::new(4);
        ring.enqueue(1).unwrap();
        ring.enqueue(2).unwrap();
        assert_eq!(ring.dequeue(), Some(1));
        assert_eq!(ring.dequeue(), Some(2));
        assert_eq!(ring.dequeue(), None);
    }

    #[test]
    fn enqueue_past_capacity_fails_without_losing_item() {
        let ring: Ring<u32> = Ring::new(1);
        ring.enqueue(1).unwrap();
        let rejected = ring.enqueue(2);
        assert_eq!(rejected, Err(2));
        assert_eq!(ring.len(), 1);
    }
}
