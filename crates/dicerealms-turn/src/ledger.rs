//! The turn ledger: who is seated, whose turn it is, and whether an
//! action is currently being resolved.
//!
//! Participants take turns in join order. A single cursor points at the
//! current holder and moves forward one seat, wrapping, each time an
//! action completes. While an action is in flight nobody, not even the
//! holder, may start another.
//!
//! The ledger is a plain synchronous value. Callers share it behind a
//! `tokio::sync::Mutex` and hold the lock for one method call at a time.
//!
//! ## Cursor repair on leave
//!
//! With `r` the removed seat and `c` the cursor before removal:
//!
//! | case        | new cursor            | effect                              |
//! |-------------|-----------------------|-------------------------------------|
//! | now empty   | `0`                   | nobody holds the turn               |
//! | `r < c`     | `c - 1`               | same holder as before               |
//! | `r == c`    | `c % len`             | next seat inherits, no advance      |
//! | `r > c`     | `c`                   | same holder as before               |

use dicerealms_protocol::ParticipantId;
use tracing::{debug, info, warn};

/// A point-in-time view of the ledger from one participant's seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnStatus {
    /// `true` if the asker holds the turn and nothing is in flight.
    pub is_current_turn: bool,
    pub current: Option<ParticipantId>,
    /// The asker's seat, or `-1` if they are not seated.
    pub position: i64,
    pub size: usize,
    pub in_flight: bool,
}

/// Round-robin roster with a single in-flight flag.
#[derive(Debug, Default)]
pub struct TurnLedger {
    order: Vec<ParticipantId>,
    cursor: usize,
    in_flight: bool,
    completed: u64,
}

impl TurnLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seats a participant at the end of the order.
    ///
    /// Returns `false` (and changes nothing) if they are already seated.
    /// The first participant to join an empty ledger holds the turn.
    pub fn join(&mut self, id: ParticipantId) -> bool {
        if self.order.contains(&id) {
            warn!(participant = %id, "already seated");
            return false;
        }
        self.order.push(id);
        info!(participant = %id, seat = self.order.len() - 1, "joined turn order");
        if self.order.len() == 1 {
            info!(participant = %id, "first at the table, holds the turn");
        }
        true
    }

    /// Removes a participant and repairs the cursor.
    ///
    /// Returns `false` if they were not seated. Does not touch the
    /// in-flight flag.
    pub fn leave(&mut self, id: ParticipantId) -> bool {
        let Some(removed) = self.order.iter().position(|p| *p == id) else {
            warn!(participant = %id, "not seated, nothing to remove");
            return false;
        };
        self.order.remove(removed);

        if self.order.is_empty() {
            self.cursor = 0;
        } else if removed < self.cursor {
            self.cursor -= 1;
        } else if removed == self.cursor {
            self.cursor %= self.order.len();
        }

        info!(
            participant = %id,
            seat = removed,
            holder = ?self.current(),
            "left turn order"
        );
        true
    }

    /// The participant whose turn it is.
    pub fn current(&self) -> Option<ParticipantId> {
        self.order.get(self.cursor).copied()
    }

    /// `true` if `id` holds the turn and may start an action right now.
    pub fn is_current_turn(&self, id: ParticipantId) -> bool {
        !self.in_flight && self.current() == Some(id)
    }

    /// Marks an action by `id` as in flight.
    ///
    /// Succeeds only if [`is_current_turn`](Self::is_current_turn) holds;
    /// the check and the set happen in one call so no second action can
    /// slip in between.
    pub fn begin_action(&mut self, id: ParticipantId) -> bool {
        if !self.is_current_turn(id) {
            return false;
        }
        self.in_flight = true;
        debug!(participant = %id, "action started");
        true
    }

    /// Clears the in-flight flag. Safe to call when nothing is in flight.
    pub fn end_action(&mut self) {
        if self.in_flight {
            self.completed += 1;
        }
        self.in_flight = false;
        debug!("action completed");
    }

    /// Hands the turn to the next seat and returns the new holder.
    ///
    /// Refuses (returns `None`) when the ledger is empty or an action is
    /// still in flight.
    pub fn advance(&mut self) -> Option<ParticipantId> {
        if self.order.is_empty() {
            warn!("cannot advance turn: nobody seated");
            return None;
        }
        if self.in_flight {
            warn!("cannot advance turn: action in flight");
            return None;
        }
        self.cursor = (self.cursor + 1) % self.order.len();
        let holder = self.current();
        info!(holder = ?holder, seat = self.cursor, "turn advanced");
        holder
    }

    /// Who would hold the turn after the next advance.
    pub fn peek_next(&self) -> Option<ParticipantId> {
        if self.order.is_empty() {
            return None;
        }
        self.order.get((self.cursor + 1) % self.order.len()).copied()
    }

    pub fn status(&self, id: ParticipantId) -> TurnStatus {
        let position = self
            .order
            .iter()
            .position(|p| *p == id)
            .map_or(-1, |seat| seat as i64);
        TurnStatus {
            is_current_turn: self.is_current_turn(id),
            current: self.current(),
            position,
            size: self.order.len(),
            in_flight: self.in_flight,
        }
    }

    /// Empties the ledger.
    pub fn reset(&mut self) {
        self.order.clear();
        self.cursor = 0;
        self.in_flight = false;
        info!("turn order reset");
    }

    /// Seated participants in turn order.
    pub fn participants(&self) -> Vec<ParticipantId> {
        self.order.clone()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// How many in-flight actions have been closed by
    /// [`end_action`](Self::end_action).
    pub fn actions_completed(&self) -> u64 {
        self.completed
    }
}

// =========================================================================
// Tests
// =========================================================================
