//! Agent selection and collaboration planning.
//!
//! Everything here is a pure function over static profiles, except the
//! routing history: one append-only record per route call, shared by all
//! sessions behind a single lock.

pub mod bus;
pub mod engine;
pub mod profiles;

pub use bus::{AgentBus, Orchestration, RouteOutcome, RoutingRecord, ShareOutcome};
pub use engine::{RoutingEngine, ScoreWeights};
pub use profiles::{default_registry, AgentProfile, TaskCategory};
