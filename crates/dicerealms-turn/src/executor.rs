//! The actions a participant can take on their turn.
//!
//! The set is closed: [`ActionKind`] enumerates it, and anything else is
//! [`ActionError::UnknownAction`]. Executors are synchronous and run with
//! the world and the dice already locked by the pipeline.

use std::fmt;
use std::str::FromStr;

use dicerealms_protocol::{ActionDetails, ParticipantId};
use dicerealms_world::{DiceRoller, World, evaluate};

use crate::ActionError;

/// A turn-consuming action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// `roll <expression>`: evaluate dice such as `2d6+1`.
    Roll,
    /// `move <direction>`: walk through an exit.
    Move,
    /// `look`: describe the current room.
    Look,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roll => "roll",
            Self::Move => "move",
            Self::Look => "look",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "roll" => Ok(Self::Roll),
            "move" => Ok(Self::Move),
            "look" => Ok(Self::Look),
            _ => Err(ActionError::UnknownAction(tag.to_string())),
        }
    }
}

/// What an action produced: the line everyone reads and the structured
/// payload clients can render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub message: String,
    pub details: ActionDetails,
}

/// Runs the action named by `tag` for `actor`.
///
/// `actor_name` is only used in the human-readable message.
pub fn execute(
    tag: &str,
    actor: ParticipantId,
    actor_name: &str,
    args: &[String],
    world: &mut World,
    dice: &mut dyn DiceRoller,
) -> Result<ActionOutcome, ActionError> {
    match tag.parse::<ActionKind>()? {
        ActionKind::Roll => roll(actor_name, args, dice),
        ActionKind::Move => walk(actor, actor_name, args, world),
        ActionKind::Look => look(actor, world),
    }
}

// ---------------------------------------------------------------------------
// Executors
// ---------------------------------------------------------------------------

fn roll(
    actor_name: &str,
    args: &[String],
    dice: &mut dyn DiceRoller,
) -> Result<ActionOutcome, ActionError> {
    let [expression] = args else {
        return Err(ActionError::InvalidExpression(
            "roll takes exactly one dice expression, e.g. 2d6+1".into(),
        ));
    };
    let roll = evaluate(expression, dice)?;
    let faces: Vec<String> = roll.parts.iter().map(u32::to_string).collect();

    Ok(ActionOutcome {
        message: format!(
            "{actor_name} rolled {}: {} [{}]",
            roll.expression,
            roll.total,
            faces.join(", ")
        ),
        details: ActionDetails::Roll {
            expression: roll.expression,
            total: roll.total,
            parts: roll.parts,
            modifier: roll.modifier,
        },
    })
}

fn walk(
    actor: ParticipantId,
    actor_name: &str,
    args: &[String],
    world: &mut World,
) -> Result<ActionOutcome, ActionError> {
    let [direction] = args else {
        return Err(ActionError::NoExit(
            "move takes exactly one direction, e.g. north".into(),
        ));
    };
    let mv = world.move_participant(actor, direction)?;

    Ok(ActionOutcome {
        message: format!("{actor_name} moves {} to {}.", mv.direction, mv.to_name),
        details: ActionDetails::Move {
            direction: mv.direction,
            from: mv.from_name,
            to: mv.to_name,
        },
    })
}

fn look(actor: ParticipantId, world: &World) -> Result<ActionOutcome, ActionError> {
    let room = world
        .position(actor)
        .ok_or_else(|| ActionError::Departed(actor.to_string()))?;
    let message = world.look(&room.id)?;

    Ok(ActionOutcome {
        message,
        details: ActionDetails::Look {
            room: room.name.clone(),
            description: room.description.clone(),
            exits: room.open_exits().into_keys().collect(),
        },
    })
}
