//! Binary min-heap holding the search frontier.
use bevy::math::UVec2;
use ndarray::Array2;

use crate::Cost;

/// Items that can be held in a [`PriorityQueue`].
///
/// Queued items stay in their arena; the queue stores their coordinates and
/// writes the current heap slot back through [`Queueable::set_queue_slot`]
/// whenever an item moves.
pub trait Queueable {
    /// Lexicographic priority key. Lower keys dequeue first.
    fn priority(&self) -> (Cost, Cost);
    /// Current heap slot, `None` while not enqueued.
    fn queue_slot(&self) -> Option<u32>;
    fn set_queue_slot(&mut self, slot: Option<u32>);
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    key: (Cost, Cost),
    at: UVec2,
}

/// A binary min-heap over [`Queueable`] items stored in an [`Array2`] arena.
///
/// Ordering is ascending `(f, h)`: among equal total costs the item closer
/// to the goal dequeues first.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: Vec<Entry>,
}

impl PriorityQueue {
    /// A queue with room for `capacity` items, typically `width * height`.
    pub fn with_capacity(capacity: usize) -> Self {
        PriorityQueue {
            heap: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Inserts `at` and sifts it up. The item must not already be queued.
    pub fn enqueue<T: Queueable>(&mut self, arena: &mut Array2<T>, at: UVec2) {
        let key = item(arena, at).priority();
        let slot = self.heap.len();
        self.heap.push(Entry { key, at });
        item_mut(arena, at).set_queue_slot(Some(slot as u32));
        self.sift_up(arena, slot);
    }

    /// Removes and returns the minimum-priority item.
    pub fn dequeue<T: Queueable>(&mut self, arena: &mut Array2<T>) -> Option<UVec2> {
        let first = self.heap.first()?.at;
        item_mut(arena, first).set_queue_slot(None);

        let last = self.heap.pop().expect("heap is non-empty");
        if !self.heap.is_empty() {
            self.heap[0] = last;
            item_mut(arena, last.at).set_queue_slot(Some(0));
            self.sift_down(arena, 0);
        }

        Some(first)
    }

    /// Re-sorts an already queued item whose priority improved.
    ///
    /// Sift-up only: priorities may only decrease while queued.
    pub fn reprioritize<T: Queueable>(&mut self, arena: &mut Array2<T>, at: UVec2) {
        let Some(slot) = item(arena, at).queue_slot() else {
            debug_assert!(false, "reprioritize on an item that is not queued");
            return;
        };

        let slot = slot as usize;
        self.heap[slot].key = item(arena, at).priority();
        self.sift_up(arena, slot);
    }

    /// Whether `at` is currently queued.
    ///
    /// Slot indices are authoritative: they are cleared on dequeue and by
    /// the per-run search reset, so the check cannot misreport across runs.
    pub fn contains<T: Queueable>(&self, arena: &Array2<T>, at: UVec2) -> bool {
        match item(arena, at).queue_slot() {
            Some(slot) => self.heap.get(slot as usize).is_some_and(|entry| entry.at == at),
            None => false,
        }
    }

    fn sift_up<T: Queueable>(&mut self, arena: &mut Array2<T>, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.heap[slot].key >= self.heap[parent].key {
                break;
            }
            self.swap(arena, slot, parent);
            slot = parent;
        }
    }

    fn sift_down<T: Queueable>(&mut self, arena: &mut Array2<T>, mut slot: usize) {
        loop {
            let left = slot * 2 + 1;
            let right = slot * 2 + 2;
            if left >= self.heap.len() {
                return;
            }

            let mut child = left;
            if right < self.heap.len() && self.heap[right].key < self.heap[left].key {
                child = right;
            }

            if self.heap[slot].key <= self.heap[child].key {
                return;
            }
            self.swap(arena, slot, child);
            slot = child;
        }
    }

    fn swap<T: Queueable>(&mut self, arena: &mut Array2<T>, a: usize, b: usize) {
        self.heap.swap(a, b);
        item_mut(arena, self.heap[a].at).set_queue_slot(Some(a as u32));
        item_mut(arena, self.heap[b].at).set_queue_slot(Some(b as u32));
    }
}

fn item<T>(arena: &Array2<T>, at: UVec2) -> &T {
    &arena[[at.x as usize, at.y as usize]]
}

fn item_mut<T>(arena: &mut Array2<T>, at: UVec2) -> &mut T {
    &mut arena[[at.x as usize, at.y as usize]]
}
