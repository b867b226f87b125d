use crate::core::{Event, Particle};
use crate::error::{Error, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Min-heap of tentative events with lazy invalidation.
///
/// Superseded events are never removed eagerly. [`EventQueue::pop_valid`] compares each
/// popped event's collision-count snapshots against the particles' current counters and
/// drops the ones that no longer match.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
    pushed: u64,
    discarded: u64,
}

/// Lifetime counters of an [`EventQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub pushed: u64,
    pub discarded: u64,
    pub pending: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, ev: Event) {
        self.pushed += 1;
        self.heap.push(Reverse(ev));
    }

    /// Put back an event that was popped but not processed. Not counted as a new insertion.
    #[inline]
    pub fn requeue(&mut self, ev: Event) {
        self.heap.push(Reverse(ev));
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pushed: self.pushed,
            discarded: self.discarded,
            pending: self.heap.len(),
        }
    }

    /// Pop events until one is still valid for `particles`, discarding stale ones.
    ///
    /// Returns `Ok(None)` once the queue is exhausted.
    ///
    /// Errors: `Error::UnknownParticipant` if an event names a particle id that is not in
    /// `particles`. That can only happen with corrupted state, so the event is not re-queued.
    pub fn pop_valid(&mut self, particles: &[Particle]) -> Result<Option<Event>> {
        while let Some(Reverse(ev)) = self.heap.pop() {
            let unknown = |id: u32| Error::UnknownParticipant {
                time: ev.time_f64(),
                event: format!("{} (particle {id} does not exist)", ev.kind),
            };
            let (a, _) = ev.kind.participants();
            let cc_a = particles
                .get(a as usize)
                .ok_or_else(|| unknown(a))?
                .collision_count;
            let cc_b = match ev.kind.other_particle() {
                Some(b) => Some(
                    particles
                        .get(b as usize)
                        .ok_or_else(|| unknown(b))?
                        .collision_count,
                ),
                None => None,
            };
            if ev.is_valid(cc_a, cc_b) {
                return Ok(Some(ev));
            }
            self.discarded += 1;
        }
        Ok(None)
    }
}
