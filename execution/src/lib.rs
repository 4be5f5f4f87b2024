//! Deterministic game logic for dicepit.
//!
//! Everything in this crate is pure: the combat simulator, the per-instance
//! roster, the game-state machine, the cooldown bias calculator, and the
//! payout math. No I/O happens here; the coordinator crate drives these
//! pieces and talks to the outside world.

pub mod cooldown;
pub mod machine;
pub mod payout;
pub mod rng;
pub mod roster;
pub mod simulator;

pub use cooldown::{CooldownBias, CooldownRoll};
pub use machine::{Machine, Transition, TransitionError};
pub use payout::PayoutError;
pub use rng::DiceRng;
pub use roster::{Roster, RosterError};
pub use simulator::{simulate, SimulationError};
