//! Undo/Redo history for the loaded image.
//!
//! History is a linear list of full annotation-list snapshots plus a cursor.
//! The store mirrors the snapshot at the cursor after every undo or redo.
//! Snapshots are deep copies, never diffs.

use crate::annotation::Annotation;

/// A deep copy of the whole annotation list.
pub type Snapshot = Vec<Annotation>;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the history
#[derive(Debug, Clone, Default)]
pub struct UndoConfig {
    /// Maximum number of snapshots kept, base snapshot included.
    /// `None` keeps every snapshot.
    pub max_history: Option<usize>,
}

// ============================================================================
// History
// ============================================================================

/// The undo/redo history.
///
/// `snapshots[cursor]` is the current state. Entries before the cursor can be
/// undone to, entries after it can be redone to. Pushing truncates the
/// entries after the cursor.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Snapshot>,
    cursor: usize,
    config: UndoConfig,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create a history holding one empty base snapshot
    pub fn new() -> Self {
        Self::with_config(UndoConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            snapshots: vec![Vec::new()],
            cursor: 0,
            config,
        }
    }

    /// Discard everything and start again from `base`.
    pub fn reset(&mut self, base: Snapshot) {
        self.snapshots.clear();
        self.snapshots.push(base);
        self.cursor = 0;
        log::debug!("🗑️ History reset");
    }

    /// Record a new state after the cursor, dropping any redo entries.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(snapshot);

        // Limit history size
        if let Some(max) = self.config.max_history {
            let excess = self.snapshots.len().saturating_sub(max.max(1));
            if excess > 0 {
                self.snapshots.drain(..excess);
            }
        }
        self.cursor = self.snapshots.len() - 1;
        log::debug!(
            "📝 History: pushed snapshot {} ({} annotations)",
            self.cursor,
            self.snapshots[self.cursor].len()
        );
    }

    /// Step back. Returns the snapshot to restore, or None at the base.
    pub fn undo(&mut self) -> Option<Snapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        log::debug!("⏪ Undo to snapshot {}", self.cursor);
        Some(self.snapshots[self.cursor].clone())
    }

    /// Step forward. Returns the snapshot to restore, or None at the end.
    pub fn redo(&mut self) -> Option<Snapshot> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        log::debug!("⏩ Redo to snapshot {}", self.cursor);
        Some(self.snapshots[self.cursor].clone())
    }

    /// The snapshot at the cursor.
    pub fn current(&self) -> &[Annotation] {
        &self.snapshots[self.cursor]
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Number of steps that can be undone
    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    /// Number of steps that can be redone
    pub fn redo_count(&self) -> usize {
        self.snapshots.len() - 1 - self.cursor
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
