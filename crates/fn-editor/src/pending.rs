//! Generation tickets for async operations.
//!
//! Every remote call started on behalf of an overlay takes a ticket. When the
//! call settles, the completion handler checks the ticket before touching the
//! overlay; destroying the overlay, or starting a newer call of the same kind
//! for it, makes older tickets stale so their results are dropped.

use fn_core::OverlayId;
use std::collections::HashMap;

/// Independent lanes of work on one overlay. A ticket only supersedes
/// tickets of its own kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Save, update or delete started from the overlay's buttons.
    Edit,
    /// Anchor write-back after a drag.
    Anchor,
    /// Fetching notes for display.
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    owner: OverlayId,
    kind: OpKind,
    generation: u64,
}

impl Ticket {
    pub fn owner(&self) -> OverlayId {
        self.owner
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }
}

#[derive(Debug, Default)]
pub struct OpTracker {
    live: HashMap<(OverlayId, OpKind), u64>,
    next: u64,
}

impl OpTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an operation for `owner`, superseding any of the same kind in
    /// flight.
    pub fn begin(&mut self, owner: OverlayId, kind: OpKind) -> Ticket {
        self.next += 1;
        if self.live.insert((owner, kind), self.next).is_some() {
            log::debug!("{kind:?} operation for {owner} superseded");
        }
        Ticket {
            owner,
            kind,
            generation: self.next,
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.live.get(&(ticket.owner, ticket.kind)) == Some(&ticket.generation)
    }

    /// Settle `ticket`. Returns whether its result should still be applied.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        if self.is_current(ticket) {
            self.live.remove(&(ticket.owner, ticket.kind));
            true
        } else {
            log::debug!("dropping stale {:?} completion for {}", ticket.kind, ticket.owner);
            false
        }
    }

    /// Whether `owner` has an operation of `kind` in flight.
    pub fn in_flight(&self, owner: OverlayId, kind: OpKind) -> bool {
        self.live.contains_key(&(owner, kind))
    }

    /// Forget every outstanding ticket of `owner`, whatever its kind.
    pub fn invalidate(&mut self, owner: OverlayId) {
        self.live.retain(|(id, _), _| *id != owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_supersedes() {
        let mut ops = OpTracker::new();
        let id = OverlayId::transient();
        let first = ops.begin(id, OpKind::Edit);
        let second = ops.begin(id, OpKind::Edit);
        assert!(!ops.is_current(first));
        assert!(!ops.finish(first));
        assert!(ops.in_flight(id, OpKind::Edit));
        assert!(ops.finish(second));
        assert!(!ops.in_flight(id, OpKind::Edit));
    }

    #[test]
    fn anchor_write_leaves_edit_in_flight() {
        let mut ops = OpTracker::new();
        let id = OverlayId::transient();
        let update = ops.begin(id, OpKind::Edit);
        let moved = ops.begin(id, OpKind::Anchor);
        assert!(ops.finish(moved));
        assert!(ops.finish(update));
    }

    #[test]
    fn invalidate_drops_every_kind() {
        let mut ops = OpTracker::new();
        let id = OverlayId::transient();
        let edit = ops.begin(id, OpKind::Edit);
        let anchor = ops.begin(id, OpKind::Anchor);
        ops.invalidate(id);
        assert!(!ops.finish(edit));
        assert!(!ops.finish(anchor));
    }

    #[test]
    fn tickets_are_per_owner() {
        let mut ops = OpTracker::new();
        let a = ops.begin(OverlayId::transient(), OpKind::Edit);
        let b = ops.begin(OverlayId::transient(), OpKind::Edit);
        assert!(ops.finish(a));
        assert!(ops.finish(b));
    }
}
