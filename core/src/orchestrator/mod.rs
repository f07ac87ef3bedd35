//! Orchestrator - main simulation loop (Phase 4b)
//!
//! Implements the complete tick loop integrating all simulation components.
//!
//! See `engine.rs` for full implementation.

pub mod checkpoint;
pub mod engine;


// Re-export main types for convenience
pub use engine::{
    AgentConfig, AgentLimitsConfig, ArrivalBand, Orchestrator, OrchestratorConfig, PolicyConfig,
    PriorityEscalationConfig, Queue1Ordering, SimulationError, TickResult,
};

// Cost types live in crate::costs; re-exported here for callers that
// previously imported them through the orchestrator module.
pub use crate::costs::{get_priority_band, CostAccumulator, CostBreakdown, CostRates, PriorityBand, PriorityDelayMultipliers};

// Re-export checkpoint types
pub use checkpoint::{AgentSnapshot, StateSnapshot, TransactionSnapshot};
