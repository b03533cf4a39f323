//! Snapshot history with linear undo/redo.
//!
//! Every committed mutation pushes a full serialized scene. Undo and redo
//! move the active index and restore the whole scene; nothing is diffed.

use std::collections::VecDeque;

use thiserror::Error;

use crate::scene::{ObjectId, SceneError, SceneGraph, Snapshot};

pub const DEFAULT_HISTORY_LIMIT: usize = 30;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to capture scene: {0}")]
    Capture(#[source] SceneError),
    #[error("failed to restore snapshot {index}: {source}")]
    Restore {
        index: usize,
        #[source]
        source: SceneError,
    },
}

pub type HistoryResult<T> = std::result::Result<T, HistoryError>;

/// Whether the undo and redo affordances should be enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryAvailability {
    pub can_undo: bool,
    pub can_redo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep {
    Undo,
    Redo,
}

impl HistoryStep {
    pub const fn applied_message(self) -> &'static str {
        match self {
            Self::Undo => "undo applied",
            Self::Redo => "redo applied",
        }
    }

    pub const fn boundary_message(self) -> &'static str {
        match self {
            Self::Undo => "nothing to undo",
            Self::Redo => "nothing to redo",
        }
    }
}

/// How [`HistoryManager::record_state_with`] treats a capture identical to
/// the active snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recording {
    Always,
    IfChanged,
}

/// Bounded, linear list of snapshots plus the index of the one on screen.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    snapshots: VecDeque<Snapshot>,
    active_index: usize,
    capacity: usize,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity + 1),
            active_index: 0,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `None` while the log is empty.
    pub fn active_index(&self) -> Option<usize> {
        (!self.snapshots.is_empty()).then_some(self.active_index)
    }

    pub fn active(&self) -> Option<&Snapshot> {
        self.snapshots.get(self.active_index)
    }

    /// Oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// Appends at the newest position and returns how many snapshots were
    /// dropped. A pending redo branch is dropped first, so eviction only ever
    /// happens on a push at the head of the log.
    pub fn push(&mut self, snapshot: Snapshot) -> usize {
        let before = self.snapshots.len();
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.active_index + 1);
        }
        let mut dropped = before - self.snapshots.len();
        self.snapshots.push_back(snapshot);
        self.active_index = self.snapshots.len() - 1;

        if self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
            self.active_index -= 1;
            dropped += 1;
        }
        dropped
    }

    pub fn can_undo(&self) -> bool {
        !self.snapshots.is_empty() && self.active_index > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.snapshots.is_empty() && self.active_index + 1 < self.snapshots.len()
    }

    pub fn availability(&self) -> HistoryAvailability {
        HistoryAvailability {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    fn step(&mut self, step: HistoryStep) -> Option<(usize, &Snapshot)> {
        let next = match step {
            HistoryStep::Undo if self.can_undo() => self.active_index - 1,
            HistoryStep::Redo if self.can_redo() => self.active_index + 1,
            _ => return None,
        };
        self.active_index = next;
        self.snapshots.get(next).map(|snapshot| (next, snapshot))
    }
}

#[derive(Debug, Clone)]
pub struct HistoryManager {
    log: HistoryLog,
    restoring: bool,
    dropped: bool,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryManager {
    pub fn new(limit: usize) -> Self {
        Self {
            log: HistoryLog::new(limit),
            restoring: false,
            dropped: false,
        }
    }

    pub fn log(&self) -> &HistoryLog {
        &self.log
    }

    pub fn availability(&self) -> HistoryAvailability {
        self.log.availability()
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    /// Records the starting scene as snapshot 0. Calling it again is a no-op.
    pub fn init<S: SceneGraph + ?Sized>(&mut self, scene: &S) -> HistoryResult<()> {
        if !self.log.is_empty() {
            return Ok(());
        }
        self.record_state(scene).map(|_| ())
    }

    /// Reports, once, whether a push since the last call dropped snapshots
    /// by truncation or eviction.
    pub fn take_dropped(&mut self) -> bool {
        std::mem::take(&mut self.dropped)
    }

    /// Captures the scene and pushes it. Returns `false` without touching the
    /// log while a restore is in progress.
    pub fn record_state<S: SceneGraph + ?Sized>(&mut self, scene: &S) -> HistoryResult<bool> {
        self.record_state_with(scene, None, Recording::Always)
    }

    /// Like [`HistoryManager::record_state`], leaving `transient` out of the
    /// capture. With [`Recording::IfChanged`] a capture equal to the active
    /// snapshot is not pushed.
    pub fn record_state_with<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &S,
        transient: Option<&ObjectId>,
        recording: Recording,
    ) -> HistoryResult<bool> {
        if self.restoring {
            tracing::trace!("ignoring record request during snapshot restore");
            return Ok(false);
        }
        let snapshot = match transient {
            Some(id) => scene.serialize_excluding(id),
            None => scene.serialize(),
        }
        .map_err(HistoryError::Capture)?;
        if recording == Recording::IfChanged && self.log.active() == Some(&snapshot) {
            tracing::trace!("scene unchanged since the active snapshot");
            return Ok(false);
        }
        if self.log.push(snapshot) > 0 {
            self.dropped = true;
        }
        tracing::debug!(
            index = ?self.log.active_index(),
            len = self.log.len(),
            "recorded scene snapshot"
        );
        Ok(true)
    }

    pub fn undo<S: SceneGraph + ?Sized>(&mut self, scene: &mut S) -> HistoryResult<bool> {
        self.apply(HistoryStep::Undo, scene)
    }

    pub fn redo<S: SceneGraph + ?Sized>(&mut self, scene: &mut S) -> HistoryResult<bool> {
        self.apply(HistoryStep::Redo, scene)
    }

    /// Moves one step and restores that snapshot. Returns `false` at either
    /// end of the log. Restored objects get their pointer interactivity back
    /// unless they were locked when captured.
    pub fn apply<S: SceneGraph + ?Sized>(
        &mut self,
        step: HistoryStep,
        scene: &mut S,
    ) -> HistoryResult<bool> {
        let previous = self.log.active_index;
        let Some((index, snapshot)) = self.log.step(step) else {
            tracing::debug!(?step, "history boundary reached");
            return Ok(false);
        };
        let snapshot = snapshot.clone();

        self.restoring = true;
        let restored = scene.restore(&snapshot);
        if restored.is_ok() {
            scene.for_each_object_mut(&mut |object| {
                if !object.is_locked() {
                    object.interactivity.restore_pointer();
                }
            });
            scene.request_render();
        }
        self.restoring = false;

        if let Err(source) = restored {
            self.log.active_index = previous;
            return Err(HistoryError::Restore { index, source });
        }
        tracing::debug!(?step, index, len = self.log.len(), "restored snapshot");
        Ok(true)
    }
}
