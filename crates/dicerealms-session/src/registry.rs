//! The session registry: participant identity, names, and delivery.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself; it is a plain map.
//! The server wraps it in one `tokio::sync::Mutex` and holds that lock for
//! a single operation at a time, never across a sleep or a socket write.
//! Every method here is synchronous, so a lock holder can't be suspended
//! halfway through a broadcast.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dicerealms_protocol::{ParticipantId, ServerMessage};
use tokio::sync::mpsc;

use crate::SessionError;

/// Process-wide counter; identifiers are never reused, even across
/// registries.
static NEXT_PARTICIPANT_ID: AtomicU64 = AtomicU64::new(1);

/// Sending half of a session's outbound channel.
pub type SessionSender = mpsc::UnboundedSender<ServerMessage>;

/// Receiving half, drained by the connection's writer task.
pub type SessionReceiver = mpsc::UnboundedReceiver<ServerMessage>;

/// Creates a fresh outbound channel for one session.
pub fn session_channel() -> (SessionSender, SessionReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Default)]
struct SessionEntry {
    channel: Option<SessionSender>,
    name: Option<String>,
}

/// Tracks every connected participant and how to reach them.
///
/// ## Lifecycle
///
/// ```text
/// register() ──→ bind() ──→ set_name() ──→ … send()/broadcast() … ──→ unregister()
///                   │                              │
///                   │                              ▼ channel found dead
///                   │                        binding pruned (name kept
///                   │                        until unregister)
/// ```
///
/// Entries are kept in a `BTreeMap`, so broadcasts reach sessions in
/// ascending identifier order, which is also connection order.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<ParticipantId, SessionEntry>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh participant identifier with no channel bound yet.
    pub fn register(&mut self) -> ParticipantId {
        let id = ParticipantId(NEXT_PARTICIPANT_ID.fetch_add(1, Ordering::Relaxed));
        self.sessions.insert(id, SessionEntry::default());
        tracing::debug!(participant = %id, "session registered");
        id
    }

    /// Associates an outbound channel with a registered participant,
    /// replacing any previous binding.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if `id` was never registered or
    /// has been unregistered.
    pub fn bind(
        &mut self,
        id: ParticipantId,
        channel: SessionSender,
    ) -> Result<(), SessionError> {
        let entry = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::NotFound(id))?;
        entry.channel = Some(channel);
        Ok(())
    }

    /// Records the participant's display name.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: unknown participant
    /// - [`SessionError::NameAlreadySet`]: the name was already chosen
    pub fn set_name(
        &mut self,
        id: ParticipantId,
        name: impl Into<String>,
    ) -> Result<(), SessionError> {
        let entry = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::NotFound(id))?;
        if let Some(existing) = &entry.name {
            return Err(SessionError::NameAlreadySet(id, existing.clone()));
        }
        let name = name.into();
        tracing::info!(participant = %id, %name, "display name set");
        entry.name = Some(name);
        Ok(())
    }

    /// Returns the participant's display name, if they have chosen one.
    pub fn name(&self, id: ParticipantId) -> Option<&str> {
        self.sessions.get(&id).and_then(|e| e.name.as_deref())
    }

    /// Returns the display name, or `"Unknown"` for unnamed or missing
    /// participants.
    pub fn display_name(&self, id: ParticipantId) -> String {
        self.name(id).unwrap_or("Unknown").to_string()
    }

    /// Finds the first participant (in identifier order) with this name.
    /// Comparison is case-insensitive.
    pub fn find_by_name(&self, name: &str) -> Option<ParticipantId> {
        self.sessions.iter().find_map(|(id, entry)| {
            entry
                .name
                .as_deref()
                .filter(|n| n.eq_ignore_ascii_case(name))
                .map(|_| *id)
        })
    }

    /// Removes the participant's channel and name.
    ///
    /// Returns the display name they had chosen, if any, so the caller can
    /// announce the departure. This does NOT touch the turn ledger;
    /// disconnect handling calls `leave` there separately.
    pub fn unregister(&mut self, id: ParticipantId) -> Option<String> {
        let entry = self.sessions.remove(&id)?;
        tracing::debug!(participant = %id, "session unregistered");
        entry.name
    }

    /// Returns `true` if the participant is registered.
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Returns `true` if the participant currently has a live binding.
    pub fn is_bound(&self, id: ParticipantId) -> bool {
        self.sessions
            .get(&id)
            .is_some_and(|e| e.channel.is_some())
    }

    /// Sends one record to one participant.
    ///
    /// Best-effort: a missing or dead channel is logged and reported as
    /// `false`, never as an error, so one unreachable client can't abort
    /// the caller's work.
    pub fn send(&self, id: ParticipantId, msg: ServerMessage) -> bool {
        let Some(channel) = self.sessions.get(&id).and_then(|e| e.channel.as_ref())
        else {
            tracing::debug!(participant = %id, "send to unbound session dropped");
            return false;
        };
        if channel.send(msg).is_err() {
            tracing::warn!(participant = %id, "send failed: channel closed");
            return false;
        }
        true
    }

    /// Sends one record to every bound session.
    ///
    /// Channels that turn out to be closed are unbound once the fan-out is
    /// complete and their identifiers returned. Their names stay until
    /// [`unregister`](Self::unregister), so the departure can still be
    /// announced by name.
    pub fn broadcast(&mut self, msg: ServerMessage) -> Vec<ParticipantId> {
        let mut failed = Vec::new();
        for (id, entry) in &self.sessions {
            if let Some(channel) = &entry.channel {
                if channel.send(msg.clone()).is_err() {
                    failed.push(*id);
                }
            }
        }

        for id in &failed {
            if let Some(entry) = self.sessions.get_mut(id) {
                entry.channel = None;
            }
            tracing::warn!(participant = %id, "pruned dead channel during broadcast");
        }
        failed
    }

    /// Identifiers of all registered participants, in ascending order.
    pub fn ids(&self) -> Vec<ParticipantId> {
        self.sessions.keys().copied().collect()
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
