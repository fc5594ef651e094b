//! Turn-based action processing for DiceRealms.
//!
//! Everything that decides *who may act* and *what happens when they do*
//! lives here:
//!
//! - [`TurnLedger`]: the round-robin roster, its cursor, and the
//!   single "action in flight" flag.
//! - [`ActionPipeline`]: runs one action through
//!   validate → announce → pause → execute → report & advance.
//! - [`ActionKind`] and [`execute`]: the closed set of actions (`roll`,
//!   `move`, `look`) and their effects on the world.
//!
//! Chat never enters this crate: it bypasses turns and is handled by the
//! connection layer.

mod config;
mod error;
mod executor;
mod ledger;
mod pause;
mod pipeline;

pub use config::PipelineConfig;
pub use error::{ActionError, TurnError};
pub use executor::{ActionKind, ActionOutcome, execute};
pub use ledger::{TurnLedger, TurnStatus};
pub use pause::DramaticPause;
pub use pipeline::{ActionPipeline, ActionRequest, ActionResult};
