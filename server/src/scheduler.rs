//! Deferred task queue for bullet expiry and respawns
//!
//! Tasks are keyed by entity id and carry no cancellation handle. Whoever runs
//! a task re-checks that the entity still exists and is in the expected state,
//! so a task outliving its entity is a no-op.

use shared::{BulletId, PlayerId, TargetId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    ExpireBullet(BulletId),
    RespawnTarget(TargetId),
    RespawnPlayer(PlayerId),
}

#[derive(Debug)]
struct Scheduled {
    due: u64,
    seq: u64,
    task: Task,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the max-heap pops the earliest due time first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` to run once the clock reaches `due`
    pub fn schedule(&mut self, due: u64, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled { due, seq, task });
    }

    /// Removes and returns every task due at or before `now`, earliest first.
    /// Tasks due at the same time come out in scheduling order.
    pub fn pop_due(&mut self, now: u64) -> Vec<Task> {
        let mut due = Vec::new();
        while let Some(next) = self.queue.peek() {
            if next.due > now {
                break;
            }
            if let Some(scheduled) = self.queue.pop() {
                due.push(scheduled.task);
            }
        }
        due
    }

    pub fn next_due(&self) -> Option<u64> {
        self.queue.peek().map(|s| s.due)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_due_orders_by_time() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(300, Task::RespawnTarget(3));
        scheduler.schedule(100, Task::ExpireBullet(1));
        scheduler.schedule(200, Task::RespawnPlayer(PlayerId::from("p1")));

        assert_eq!(scheduler.next_due(), Some(100));
        assert!(scheduler.pop_due(50).is_empty());

        let due = scheduler.pop_due(250);
        assert_eq!(
            due,
            vec![
                Task::ExpireBullet(1),
                Task::RespawnPlayer(PlayerId::from("p1"))
            ]
        );
        assert_eq!(scheduler.len(), 1);

        assert_eq!(scheduler.pop_due(300), vec![Task::RespawnTarget(3)]);
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.next_due(), None);
    }

    #[test]
    fn test_same_due_time_keeps_insertion_order() {
        let mut scheduler = Scheduler::new();
        for id in 0..5 {
            scheduler.schedule(1000, Task::ExpireBullet(id));
        }

        let due = scheduler.pop_due(1000);
        let ids: Vec<BulletId> = due
            .into_iter()
            .map(|task| match task {
                Task::ExpireBullet(id) => id,
                _ => panic!("Unexpected task"),
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }
}
