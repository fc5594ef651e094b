//! The action pipeline: one accepted action, start to finish.
//!
//! ```text
//! validate ─► announce ─► pause ─► execute ─► report & advance
//!    │
//!    └─ TurnError back to the caller, nothing broadcast
//! ```
//!
//! Every phase runs in order and none is skipped. Once validation has
//! marked the action as in flight, the in-flight flag is cleared exactly
//! once, whether the executor succeeded, failed, or panicked.
//!
//! Ledger, registry and world each sit behind their own mutex. Each lock
//! is taken for a single step and released before the next; none is held
//! across the pause.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use dicerealms_protocol::{
    ActionDetails, ActionStatus, ErrorKind, ParticipantId, ServerMessage,
};
use dicerealms_session::SessionRegistry;
use dicerealms_world::{DiceRoller, World};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{DramaticPause, PipelineConfig, TurnError, TurnLedger, executor};

/// One participant's request to act.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub participant: ParticipantId,
    /// Raw action tag as the client sent it.
    pub action: String,
    pub args: Vec<String>,
}

impl ActionRequest {
    pub fn new(
        participant: ParticipantId,
        action: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            participant,
            action: action.into(),
            args,
        }
    }
}

/// What an accepted action came to. Already broadcast by the time the
/// caller sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    pub details: ActionDetails,
    /// Set when `success` is false.
    pub error: Option<ErrorKind>,
}

/// Clears the in-flight flag if the pipeline future is dropped between
/// validation and the report step.
struct InFlightGuard {
    ledger: Arc<Mutex<TurnLedger>>,
    armed: bool,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let ledger = Arc::clone(&self.ledger);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                ledger.lock().await.end_action();
                warn!("action abandoned mid-flight, turn released");
            });
        }
    }
}

/// Runs actions against shared game state.
///
/// Cheap to share: wrap it in an `Arc` and hand a clone to each task that
/// processes an action.
pub struct ActionPipeline {
    ledger: Arc<Mutex<TurnLedger>>,
    sessions: Arc<Mutex<SessionRegistry>>,
    world: Arc<Mutex<World>>,
    dice: Mutex<Box<dyn DiceRoller>>,
    pause: DramaticPause,
}

impl ActionPipeline {
    pub fn new(
        ledger: Arc<Mutex<TurnLedger>>,
        sessions: Arc<Mutex<SessionRegistry>>,
        world: Arc<Mutex<World>>,
        dice: Box<dyn DiceRoller>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            ledger,
            sessions,
            world,
            dice: Mutex::new(dice),
            pause: config.pause(),
        }
    }

    pub fn ledger(&self) -> &Arc<Mutex<TurnLedger>> {
        &self.ledger
    }

    pub fn sessions(&self) -> &Arc<Mutex<SessionRegistry>> {
        &self.sessions
    }

    pub fn world(&self) -> &Arc<Mutex<World>> {
        &self.world
    }

    pub fn pause(&self) -> DramaticPause {
        self.pause
    }

    /// Processes one action through every phase.
    ///
    /// # Errors
    /// Returns a [`TurnError`] if validation fails. In that case nothing
    /// was broadcast and no state changed. Failures after validation are
    /// not errors: they come back as an unsuccessful [`ActionResult`] and
    /// the turn still passes on. If the actor leaves during the action,
    /// their departure has already passed the turn and no extra advance
    /// happens.
    pub async fn process_action(
        &self,
        request: ActionRequest,
    ) -> Result<ActionResult, TurnError> {
        let id = request.participant;

        // -- 1. Validate ---------------------------------------------------
        if !self.world.lock().await.contains_participant(id) {
            debug!(participant = %id, "action from participant not in the world");
            return Err(TurnError::UnknownParticipant(id));
        }
        {
            let mut ledger = self.ledger.lock().await;
            if !ledger.begin_action(id) {
                let err = if ledger.in_flight() {
                    TurnError::ActionInProgress
                } else {
                    TurnError::NotYourTurn {
                        current: ledger.current(),
                    }
                };
                debug!(participant = %id, error = %err, "action refused");
                return Err(err);
            }
        }
        let mut guard = InFlightGuard {
            ledger: Arc::clone(&self.ledger),
            armed: true,
        };

        let name = self.sessions.lock().await.display_name(id);
        info!(
            participant = %id,
            action = %request.action,
            args = ?request.args,
            "action accepted"
        );

        // -- 2. Announce ---------------------------------------------------
        self.broadcast(ServerMessage::ActionAnnouncement {
            player: name.clone(),
            action: request.action.clone(),
            args: request.args.clone(),
            status: ActionStatus::Starting,
        })
        .await;

        // -- 3. Pause ------------------------------------------------------
        self.pause.wait().await;

        // -- 4. Execute ----------------------------------------------------
        let result = self.execute(&request, &name).await;

        // -- 5. Report & advance -------------------------------------------
        self.broadcast(ServerMessage::ActionResult {
            player: name,
            action: request.action.clone(),
            success: result.success,
            result: result.message.clone(),
            details: result.details.clone(),
        })
        .await;

        let holder = {
            let mut ledger = self.ledger.lock().await;
            ledger.end_action();
            guard.armed = false;
            // An actor who left mid-action already handed the seat on.
            if ledger.current() == Some(id) {
                ledger.advance();
            } else {
                debug!(participant = %id, "actor left during the action, not advancing");
            }
            ledger.current()
        };
        self.announce_holder(holder).await;

        Ok(result)
    }

    /// Tells every session who holds the turn now, or that the table is
    /// empty.
    pub async fn announce_holder(&self, holder: Option<ParticipantId>) {
        let msg = match holder {
            Some(next) => {
                let name = self.sessions.lock().await.display_name(next);
                ServerMessage::NextTurn {
                    message: format!("It's your turn, {name}!"),
                    player: name,
                }
            }
            None => ServerMessage::NoPlayers {
                message: "No players left in the game.".into(),
            },
        };
        self.broadcast(msg).await;
    }

    async fn execute(&self, request: &ActionRequest, name: &str) -> ActionResult {
        let mut world = self.world.lock().await;
        let mut dice = self.dice.lock().await;

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            executor::execute(
                &request.action,
                request.participant,
                name,
                &request.args,
                &mut world,
                &mut **dice,
            )
        }));

        match outcome {
            Ok(Ok(outcome)) => ActionResult {
                success: true,
                message: outcome.message,
                details: outcome.details,
                error: None,
            },
            Ok(Err(err)) => {
                info!(
                    participant = %request.participant,
                    action = %request.action,
                    error = %err,
                    "action failed"
                );
                ActionResult {
                    success: false,
                    message: err.to_string(),
                    details: ActionDetails::default(),
                    error: Some(err.kind()),
                }
            }
            Err(_) => {
                error!(
                    participant = %request.participant,
                    action = %request.action,
                    "executor panicked"
                );
                ActionResult {
                    success: false,
                    message: format!("{name}'s {} fizzled.", request.action),
                    details: ActionDetails::default(),
                    error: Some(ErrorKind::UnknownAction),
                }
            }
        }
    }

    async fn broadcast(&self, msg: ServerMessage) {
        let pruned = self.sessions.lock().await.broadcast(msg);
        if !pruned.is_empty() {
            debug!(pruned = ?pruned, "broadcast pruned closed sessions");
        }
    }
}
