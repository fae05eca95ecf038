//! Simulation runtime: the block-program IR, the script execution engine,
//! event dispatch, the kinematic integrator, and challenge evaluation.
//!
//! Everything shares one logical timeline. The [`session::Session`] tick is
//! the only clock: it steps the engine (which writes motor intents), then
//! the integrator (sole writer of pose), then event dispatch, history and
//! the challenge check. There are no threads and no locks in the core.

pub mod challenge;
pub mod engine;
pub mod events;
pub mod history;
pub mod integrator;
pub mod monitor;
pub mod program;
pub mod session;

pub use challenge::{Challenge, CheckKind};
pub use engine::Engine;
pub use history::SimulationHistory;
pub use monitor::{LogSink, VariableSink};
pub use program::{Cond, Expr, HatScript, Program, Stmt, Trigger};
pub use session::Session;
