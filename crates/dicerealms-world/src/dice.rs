//! Dice expressions: `2d6`, `1d20+5`, `4d8-2`.
//!
//! Parsing and rolling are separate so the randomness can be swapped out.
//! Production uses [`RandomRoller`]; tests and replays use
//! [`ScriptedRoller`], which returns a fixed sequence of faces.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::DiceError;

/// Upper bound on the number of dice in one expression.
pub const MAX_DICE_COUNT: u32 = 1000;

// ---------------------------------------------------------------------------
// DiceRoller
// ---------------------------------------------------------------------------

/// A source of die faces.
pub trait DiceRoller: Send + 'static {
    /// Returns a uniformly distributed integer in `1..=sides`.
    ///
    /// Callers guarantee `sides >= 2`.
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// Uniform rolls from a `StdRng` seeded by the operating system.
#[derive(Debug)]
pub struct RandomRoller {
    rng: StdRng,
}

impl RandomRoller {
    /// Creates a roller seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Creates a reproducible roller.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomRoller {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceRoller for RandomRoller {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.rng.random_range(1..=sides)
    }
}

/// Replays a fixed list of faces, wrapping around when exhausted.
///
/// Faces are clamped into `1..=sides`, so a script written for a d20 still
/// yields legal d6 results.
#[derive(Debug, Clone)]
pub struct ScriptedRoller {
    faces: VecDeque<u32>,
}

impl ScriptedRoller {
    /// Creates a roller that yields `faces` in order, then starts over.
    /// An empty script always rolls 1.
    pub fn new(faces: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
        }
    }
}

impl DiceRoller for ScriptedRoller {
    fn roll_die(&mut self, sides: u32) -> u32 {
        let Some(face) = self.faces.pop_front() else {
            return 1;
        };
        self.faces.push_back(face);
        face.clamp(1, sides)
    }
}

// ---------------------------------------------------------------------------
// DiceExpression
// ---------------------------------------------------------------------------

/// A parsed `<count>d<sides>[+|-<modifier>]` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpression {
    pub count: u32,
    pub sides: u32,
    pub modifier: i64,
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

/// Parses a run of ASCII digits. Signs, spaces and empty input are rejected.
fn digits<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| DiceError::InvalidExpression {
            expression: input.to_string(),
            reason,
        };
        let s = input.trim();

        let (count, rest) = s
            .split_once(['d', 'D'])
            .ok_or_else(|| invalid("expected <count>d<sides>"))?;
        let count: u32 =
            digits(count).ok_or_else(|| invalid("count must be a number"))?;

        let (sides, modifier) = match rest.find(['+', '-']) {
            Some(i) => {
                let magnitude: i64 = digits(&rest[i + 1..])
                    .ok_or_else(|| invalid("modifier must be a number"))?;
                let sign = if rest.as_bytes()[i] == b'-' { -1 } else { 1 };
                (&rest[..i], sign * magnitude)
            }
            None => (rest, 0),
        };
        let sides: u32 =
            digits(sides).ok_or_else(|| invalid("sides must be a number"))?;

        if count == 0 {
            return Err(invalid("need at least one die"));
        }
        if sides < 2 {
            return Err(invalid("dice need at least two sides"));
        }
        if count > MAX_DICE_COUNT {
            return Err(invalid("too many dice"));
        }

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// The outcome of one evaluated expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    /// The expression as the caller wrote it, trimmed.
    pub expression: String,
    /// Sum of `parts` plus `modifier`. May be negative.
    pub total: i64,
    /// Individual die faces in roll order.
    pub parts: Vec<u32>,
    pub modifier: i64,
}

/// Parses and rolls `expression`.
///
/// # Errors
/// Returns [`DiceError::InvalidExpression`] for malformed input, zero dice,
/// fewer than two sides, more than [`MAX_DICE_COUNT`] dice, or a modifier
/// that pushes the total outside `i64`.
pub fn evaluate<R: DiceRoller + ?Sized>(
    expression: &str,
    roller: &mut R,
) -> Result<DiceRoll, DiceError> {
    let parsed: DiceExpression = expression.parse()?;
    let parts: Vec<u32> = (0..parsed.count)
        .map(|_| roller.roll_die(parsed.sides))
        .collect();
    // At most MAX_DICE_COUNT faces of u32, so only the modifier can overflow.
    let total = parts
        .iter()
        .map(|&p| i64::from(p))
        .sum::<i64>()
        .checked_add(parsed.modifier)
        .ok_or_else(|| DiceError::InvalidExpression {
            expression: expression.to_string(),
            reason: "total out of range",
        })?;

    Ok(DiceRoll {
        expression: expression.trim().to_string(),
        total,
        parts,
        modifier: parsed.modifier,
    })
}
