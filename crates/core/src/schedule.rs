//! Deferred work keyed by simulation time.

use crate::spawner::SpawnPlan;
use crate::types::{EnemyId, RoomId};

#[derive(Clone, Debug, PartialEq)]
pub enum ScheduledTask {
    /// Materialize a telegraphed wave.
    SpawnWave { room: RoomId, plan: SpawnPlan },
    /// Drop the knockback impulse applied to an enemy.
    ClearKnockback { enemy: EnemyId },
}

impl ScheduledTask {
    fn room(&self) -> Option<RoomId> {
        match self {
            ScheduledTask::SpawnWave { room, .. } => Some(*room),
            ScheduledTask::ClearKnockback { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Entry {
    fire_at_ms: u64,
    sequence: u64,
    task: ScheduledTask,
}

/// Tasks fire in `fire_at_ms` order; ties keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
    next_sequence: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, fire_at_ms: u64, task: ScheduledTask) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push(Entry { fire_at_ms, sequence, task });
    }

    /// Removes and returns every task due at or before `now_ms`.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<ScheduledTask> {
        let (mut due, pending): (Vec<Entry>, Vec<Entry>) =
            self.entries.drain(..).partition(|entry| entry.fire_at_ms <= now_ms);
        self.entries = pending;
        due.sort_by_key(|entry| (entry.fire_at_ms, entry.sequence));
        due.into_iter().map(|entry| entry.task).collect()
    }

    /// Drops pending tasks bound to `room`, returning how many were cancelled.
    pub fn cancel_room(&mut self, room: RoomId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.task.room() != Some(room));
        before - self.entries.len()
    }

    pub fn cancel_enemy(&mut self, enemy: EnemyId) {
        self.entries.retain(|entry| match entry.task {
            ScheduledTask::ClearKnockback { enemy: scheduled } => scheduled != enemy,
            ScheduledTask::SpawnWave { .. } => true,
        });
    }

    pub fn pending_for_room(&self, room: RoomId) -> usize {
        self.entries.iter().filter(|entry| entry.task.room() == Some(room)).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
