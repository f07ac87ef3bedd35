//! Payment Simulator Core - Rust Engine
//!
//! High-performance payment settlement simulator with deterministic execution.
//!
//! # Architecture
//!
//! - **core**: Time management and initialization
//! - **models**: Domain types (Agent, Transaction, State)
//! - **orchestrator**: Main simulation loop
//! - **settlement**: Settlement engines (RTGS, LSM, deferred credit)
//! - **policy**: Cash manager policies (FIFO, deadline, liquidity-aware, decision trees)
//! - **arrivals**: Transaction arrival generation
//! - **events**: Event log types and handlers
//! - **costs**: Cost accrual rates and accumulators
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (cents)
//! 2. All randomness is deterministic (seeded RNG)
//! 3. Exactly one engine thread drives the tick loop

// Module declarations
pub mod arrivals;
pub mod core;
pub mod costs;
pub mod events;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod rng;
pub mod settlement;

// Re-exports for convenience
pub use core::time::TimeManager;
pub use costs::{get_priority_band, CostAccumulator, CostBreakdown, CostRates, PriorityBand, PriorityDelayMultipliers};
pub use models::{
    agent::{Agent, AgentError},
    state::SimulationState,
    transaction::{RtgsPriorityBand, Transaction, TransactionError, TransactionStatus},
};
pub use orchestrator::{AgentConfig, Orchestrator, OrchestratorConfig, SimulationError, TickResult};
pub use rng::{RngError, RngManager};
pub use settlement::{try_settle, SettlementError};
