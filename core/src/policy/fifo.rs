//! FIFO (First-In-First-Out) Policy
//!
//! Simplest baseline policy: submit oldest transaction first.
//!
//! # Behavior
//!
//! - Submits all transactions immediately in queue order
//! - No consideration of liquidity, deadlines, or urgency
//! - Equivalent to Phase 3 behavior (direct submission to RTGS)
//!
//! # Use Case
//!
//! - Baseline for comparison with smarter policies
//! - Replicates "no policy" behavior (immediate submission)
//! - Testing and validation

use super::{CashManagerPolicy, ReleaseDecision};
use crate::costs::CostRates;
use crate::{Agent, SimulationState};

/// FIFO policy: submit all transactions immediately
///
/// # Example
///
/// ```
/// use payment_simulator_core_rs::policy::{FifoPolicy, CashManagerPolicy};
/// use payment_simulator_core_rs::{Agent, SimulationState, Transaction, CostRates};
///
/// let mut policy = FifoPolicy;
/// let mut agent = Agent::new("BANK_A".to_string(), 1_000_000, 0);
/// agent.queue_outgoing("tx_001".to_string());
/// agent.queue_outgoing("tx_002".to_string());
///
/// let state = SimulationState::new(vec![agent.clone()]);
/// let cost_rates = CostRates::default();
/// let decisions = policy.evaluate_queue(&agent, &state, 5, &cost_rates, 100, 0.9);
///
/// assert_eq!(decisions.len(), 2); // Submit both transactions
/// ```
pub struct FifoPolicy;

impl FifoPolicy {
    /// Create new FIFO policy
    pub fn new() -> Self {
        Self
    }
}

impl Default for FifoPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl CashManagerPolicy for FifoPolicy {
    fn evaluate_queue(
        &mut self,
        agent: &Agent,
        _state: &SimulationState,
        _tick: usize,
        _cost_rates: &CostRates,
        _ticks_per_day: usize,
        _eod_rush_threshold: f64,
    ) -> Vec<ReleaseDecision> {
        // Submit all transactions in queue order (FIFO)
        agent
            .outgoing_queue()
            .iter()
            .map(|tx_id| ReleaseDecision::SubmitFull {
                tx_id: tx_id.clone(),
                priority_override: None,
                target_tick: None,
            })
            .collect()
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
