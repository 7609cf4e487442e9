use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};

use super::item::{BillItem, PersonId};

/// Session handle shared between the recognition orchestrator and UI surfaces.
pub type SharedSession = Arc<Mutex<BillSession>>;

/// The committed item list of one bill plus the flags the UI renders.
///
/// Every successful mutation bumps a revision published on a `watch` channel, so
/// observers can re-read the session after a change. Index-based operations are
/// no-ops on out-of-range positions and return whether anything changed.
#[derive(Debug)]
pub struct BillSession {
    items: Vec<BillItem>,
    last_error: Option<String>,
    /// Held by the one analysis allowed to run against this session.
    analysis: Arc<Mutex<()>>,
    revision: Arc<watch::Sender<u64>>,
}

/// Exclusive right to analyze into a [`BillSession`].
///
/// The session reports `is_analyzing` for as long as the permit lives. Dropping it,
/// whether the analysis committed, failed or was abandoned mid-flight, releases the
/// slot and notifies subscribers.
#[derive(Debug)]
pub struct AnalysisPermit {
    slot: Option<OwnedMutexGuard<()>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Drop for AnalysisPermit {
    fn drop(&mut self) {
        self.slot.take();
        self.revision.send_modify(|rev| *rev += 1);
    }
}

impl Default for BillSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BillSession {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            items: Vec::new(),
            last_error: None,
            analysis: Arc::new(Mutex::new(())),
            revision: Arc::new(revision),
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn items(&self) -> &[BillItem] {
        &self.items
    }

    pub fn is_analyzing(&self) -> bool {
        self.analysis.try_lock().is_err()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Current revision number; increases on every change.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ── Orchestrator-side operations ─────────────────────────────────────────

    /// Replace the whole batch with a freshly analyzed one and clear the error.
    pub fn commit_batch(&mut self, items: Vec<BillItem>) {
        self.items = items;
        self.last_error = None;
        self.notify();
    }

    /// Claim the session for one analysis. `None` while another permit is alive.
    pub fn try_begin_analysis(&self) -> Option<AnalysisPermit> {
        let slot = Arc::clone(&self.analysis).try_lock_owned().ok()?;
        self.notify();
        Some(AnalysisPermit {
            slot: Some(slot),
            revision: Arc::clone(&self.revision),
        })
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
        self.notify();
    }

    pub fn clear_error(&mut self) {
        if self.last_error.take().is_some() {
            self.notify();
        }
    }

    // ── UI-side operations ───────────────────────────────────────────────────

    pub fn toggle_selected(&mut self, index: usize) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        item.is_selected = !item.is_selected;
        self.notify();
        true
    }

    /// Set the quantity of an item; values below 1 are raised to 1.
    pub fn set_quantity(&mut self, index: usize, quantity: u32) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        item.quantity = quantity.max(1);
        self.notify();
        true
    }

    pub fn assign(&mut self, index: usize, person: PersonId) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        if !item.assigned_people.insert(person) {
            return false;
        }
        self.notify();
        true
    }

    pub fn unassign(&mut self, index: usize, person: PersonId) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        if !item.assigned_people.remove(&person) {
            return false;
        }
        self.notify();
        true
    }

    pub fn set_assigned(&mut self, index: usize, people: BTreeSet<PersonId>) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        item.assigned_people = people;
        self.notify();
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<BillItem> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        self.notify();
        Some(removed)
    }

    /// Move the item at `from` so that it ends up at position `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        let len = self.items.len();
        if from >= len || to >= len {
            return false;
        }
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
            self.notify();
        }
        true
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}
