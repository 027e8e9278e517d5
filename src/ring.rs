use std::collections::VecDeque;

/// Fixed-capacity ring: pushing into a full ring drops the oldest item.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Ring<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be positive");
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push at the back, returning the evicted front item if the ring was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// The newest `n` items, oldest of them first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_when_full() {
        let mut ring = Ring::new(3);
        for i in 1..=5 {
            ring.push(i);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(ring.front(), Some(&3));
        assert_eq!(ring.back(), Some(&5));
    }

    #[test]
    fn push_reports_eviction() {
        let mut ring = Ring::new(1);
        assert_eq!(ring.push('a'), None);
        assert_eq!(ring.push('b'), Some('a'));
    }

    #[test]
    fn tail_keeps_chronological_order() {
        let mut ring = Ring::new(10);
        for i in 0..6 {
            ring.push(i);
        }
        assert_eq!(ring.tail(2).copied().collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(ring.tail(100).count(), 6);
    }
}
