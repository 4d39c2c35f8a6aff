use super::operation::{OperationGroup, SingleOperation, Step};
use crate::error::{MergeError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Transactional undo/redo history.
///
/// All state sits behind one mutex, so concurrent callers never interleave
/// operations inside a group. Replay (undo, redo, revert) holds that mutex
/// for its whole run and raises `replaying`; `record` checks the flag before
/// locking, so the primitives a replay calls back into are dropped instead of
/// deadlocking or polluting the history.
///
/// Replay callbacks may call `record` but nothing else on the log.
#[derive(Debug)]
pub struct OperationLog {
    state: Mutex<LogState>,
    replaying: AtomicBool,
}

#[derive(Debug)]
struct LogState {
    undo: VecDeque<OperationGroup>,
    redo: VecDeque<OperationGroup>,
    open: Option<OperationGroup>,
    max_size: usize,
}

impl LogState {
    fn commit_open(&mut self) -> Option<Uuid> {
        let group = self.open.take()?;
        if group.is_empty() {
            log::debug!("Discarding empty group '{}'", group.description);
            return None;
        }
        log::debug!(
            "Committed '{}' ({} operations)",
            group.description,
            group.operations.len()
        );
        let id = group.id;
        push_bounded(&mut self.undo, group, self.max_size);
        self.redo.clear();
        Some(id)
    }
}

/// Push onto a stack, evicting the oldest entries past `max`
fn push_bounded(stack: &mut VecDeque<OperationGroup>, group: OperationGroup, max: usize) {
    stack.push_back(group);
    while stack.len() > max {
        stack.pop_front();
    }
}

/// Clears the replay flag when dropped, even on early return
struct ReplayGuard<'a>(&'a AtomicBool);

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl OperationLog {
    pub fn new(max_size: usize) -> Self {
        OperationLog {
            state: Mutex::new(LogState {
                undo: VecDeque::new(),
                redo: VecDeque::new(),
                open: None,
                max_size: max_size.max(1),
            }),
            replaying: AtomicBool::new(false),
        }
    }

    /// Open a new group, committing any group that is still open.
    pub fn begin(&self, description: impl Into<String>) -> Uuid {
        let mut state = self.state.lock();
        state.commit_open();
        let group = OperationGroup::new(description);
        let id = group.id;
        state.open = Some(group);
        id
    }

    /// Add `op` to the open group, or push it as its own group when none is open.
    /// Dropped while a replay is running. Returns whether it was recorded.
    pub fn record(&self, op: SingleOperation) -> bool {
        if self.replaying.load(Ordering::SeqCst) {
            log::trace!("Ignoring {} on {} during replay", op.kind(), op.target().display());
            return false;
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        match state.open.as_mut() {
            Some(group) => group.operations.push(op),
            None => {
                let group = OperationGroup::single(op);
                log::debug!("Recorded untracked '{}'", group.description);
                push_bounded(&mut state.undo, group, state.max_size);
                state.redo.clear();
            }
        }
        true
    }

    /// Move the open group onto the undo stack. Empty groups leave no entry.
    pub fn commit(&self) -> Option<Uuid> {
        self.state.lock().commit_open()
    }

    /// Discard the open group without touching either stack.
    pub fn rollback(&self) -> Option<OperationGroup> {
        self.state.lock().open.take()
    }

    /// Discard the open group after replaying the inverse of everything it
    /// recorded, newest first. Used when a gesture fails part-way.
    pub fn revert_open<F>(&self, mut apply: F) -> Result<()>
    where
        F: FnMut(Step<'_>) -> Result<()>,
    {
        let mut state = self.state.lock();
        let Some(group) = state.open.take() else {
            return Ok(());
        };
        let _guard = self.start_replay();
        for op in group.operations.iter().rev() {
            apply(op.inverse()).map_err(|e| replay_error("roll back", &group, e))?;
        }
        Ok(())
    }

    /// Undo the most recent group: replay the inverse of each operation in
    /// reverse order, then move the group to the redo stack.
    ///
    /// On a failed step the group is dropped from history and the files stay
    /// in the partially reverted state.
    pub fn undo<F>(&self, mut apply: F) -> Result<String>
    where
        F: FnMut(Step<'_>) -> Result<()>,
    {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.commit_open();
        let group = state.undo.pop_back().ok_or(MergeError::NothingToUndo)?;

        let _replay = self.start_replay();
        for op in group.operations.iter().rev() {
            log::debug!("Undo step: {:?}", op.inverse());
            apply(op.inverse()).map_err(|e| replay_error("undo", &group, e))?;
        }

        let description = group.description.clone();
        push_bounded(&mut state.redo, group, state.max_size);
        Ok(description)
    }

    /// Redo the most recently undone group in recorded order, then move it
    /// back to the undo stack. Failure handling mirrors `undo`.
    pub fn redo<F>(&self, mut apply: F) -> Result<String>
    where
        F: FnMut(Step<'_>) -> Result<()>,
    {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.commit_open();
        let group = state.redo.pop_back().ok_or(MergeError::NothingToRedo)?;

        let _replay = self.start_replay();
        for op in &group.operations {
            log::debug!("Redo step: {:?}", op.forward());
            apply(op.forward()).map_err(|e| replay_error("redo", &group, e))?;
        }

        let description = group.description.clone();
        push_bounded(&mut state.undo, group, state.max_size);
        Ok(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.state.lock().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.state.lock().redo.is_empty()
    }

    /// Label of the group `undo` would revert
    pub fn undo_description(&self) -> Option<String> {
        self.state.lock().undo.back().map(|g| g.description.clone())
    }

    /// Label of the group `redo` would re-apply
    pub fn redo_description(&self) -> Option<String> {
        self.state.lock().redo.back().map(|g| g.description.clone())
    }

    pub fn undo_len(&self) -> usize {
        self.state.lock().undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.state.lock().redo.len()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open.is_some()
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying.load(Ordering::SeqCst)
    }

    /// Forget all history, including any open group
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.undo.clear();
        state.redo.clear();
        state.open = None;
    }

    /// Drop every group, undo and redo, that touches `path`, along with an
    /// open group that does. Returns how many groups were dropped.
    pub fn forget(&self, path: &Path) -> usize {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let touches = |group: &OperationGroup| group.operations.iter().any(|op| op.target() == path);

        let before = state.undo.len() + state.redo.len();
        state.undo.retain(|g| !touches(g));
        state.redo.retain(|g| !touches(g));
        let mut dropped = before - state.undo.len() - state.redo.len();
        if state.open.as_ref().is_some_and(touches) {
            state.open = None;
            dropped += 1;
        }
        if dropped > 0 {
            log::debug!("Forgot {dropped} group(s) touching {}", path.display());
        }
        dropped
    }

    fn start_replay(&self) -> ReplayGuard<'_> {
        self.replaying.store(true, Ordering::SeqCst);
        ReplayGuard(&self.replaying)
    }
}

fn replay_error(action: &'static str, group: &OperationGroup, source: MergeError) -> MergeError {
    log::warn!(
        "{} of '{}' stopped part-way: {}",
        action,
        group.description,
        source
    );
    MergeError::Replay {
        action,
        description: group.description.clone(),
        source: Box::new(source),
    }
}
