//! Deadline-Aware Policy
//!
//! Prioritizes transactions approaching their deadline.
//!
//! # Behavior
//!
//! - Submits transactions within `urgency_threshold` ticks of deadline
//! - Holds transactions with time remaining (non-urgent)
//! - Drops transactions past deadline (already expired)
//!
//! # Parameters
//!
//! - `urgency_threshold`: Ticks before deadline to consider urgent (default: 5)
//!
//! # Use Case
//!
//! - Minimize SLA violations (deadline penalties)
//! - Balance urgency vs. liquidity preservation
//! - Realistic cash manager behavior (urgent items first)

use super::{CashManagerPolicy, HoldReason, ReleaseDecision};
use crate::costs::CostRates;
use crate::{Agent, SimulationState};

/// Deadline-aware policy: prioritize expiring transactions
///
/// # Example
///
/// ```
/// use payment_simulator_core_rs::policy::{DeadlinePolicy, CashManagerPolicy};
/// use payment_simulator_core_rs::{Agent, SimulationState, Transaction};
///
/// let mut policy = DeadlinePolicy::new(5); // Urgent if deadline within 5 ticks
/// let agent = Agent::new("BANK_A".to_string(), 1_000_000, 0);
/// let mut state = SimulationState::new(vec![agent.clone()]);
///
/// // tx_urgent: deadline at tick 10 (urgent at tick 8: 10 - 8 = 2 < 5)
/// let tx_urgent = Transaction::new("BANK_A".to_string(), "BANK_B".to_string(), 100_000, 0, 10);
/// let id_urgent = tx_urgent.id().to_string();
/// state.add_transaction(tx_urgent);
///
/// // tx_later: deadline at tick 50 (not urgent at tick 8: 50 - 8 = 42 > 5)
/// let tx_later = Transaction::new("BANK_A".to_string(), "BANK_B".to_string(), 200_000, 0, 50);
/// let id_later = tx_later.id().to_string();
/// state.add_transaction(tx_later);
///
/// // Queue transactions
/// state.get_agent_mut("BANK_A").unwrap().queue_outgoing(id_urgent);
/// state.get_agent_mut("BANK_A").unwrap().queue_outgoing(id_later);
///
/// let agent = state.get_agent("BANK_A").unwrap();
/// let cost_rates = payment_simulator_core_rs::CostRates::default();
/// let decisions = policy.evaluate_queue(agent, &state, 8, &cost_rates, 100, 0.9);
///
/// // Should submit urgent, hold non-urgent
/// assert_eq!(decisions.len(), 2);
/// ```
pub struct DeadlinePolicy {
    /// Ticks before deadline to consider transaction urgent
    urgency_threshold: usize,
}

impl DeadlinePolicy {
    /// Create new deadline policy
    ///
    /// # Arguments
    ///
    /// * `urgency_threshold` - Ticks before deadline to consider urgent
    ///
    /// # Example
    ///
    /// ```
    /// use payment_simulator_core_rs::policy::DeadlinePolicy;
    ///
    /// let policy = DeadlinePolicy::new(10); // Urgent if deadline within 10 ticks
    /// ```
    pub fn new(urgency_threshold: usize) -> Self {
        Self { urgency_threshold }
    }
}

impl Default for DeadlinePolicy {
    fn default() -> Self {
        Self::new(5) // Default: urgent if deadline within 5 ticks
    }
}

impl CashManagerPolicy for DeadlinePolicy {
    fn evaluate_queue(
        &mut self,
        agent: &Agent,
        state: &SimulationState,
        tick: usize,
        _cost_rates: &CostRates,
        _ticks_per_day: usize,
        _eod_rush_threshold: f64,
    ) -> Vec<ReleaseDecision> {
        let mut decisions = Vec::new();

        for tx_id in agent.outgoing_queue() {
            if let Some(tx) = state.get_transaction(tx_id) {
                let deadline = tx.deadline_tick();

                if deadline <= tick {
                    // Already past deadline: drop
                    decisions.push(ReleaseDecision::Drop {
                        tx_id: tx_id.clone(),
                    });
                } else {
                    let ticks_remaining = deadline - tick;

                    if ticks_remaining <= self.urgency_threshold {
                        // Urgent: submit immediately
                        decisions.push(ReleaseDecision::SubmitFull {
                            tx_id: tx_id.clone(),
                            priority_override: None,
                            target_tick: None,
                        });
                    } else {
                        // Not urgent: hold for later
                        decisions.push(ReleaseDecision::Hold {
                            tx_id: tx_id.clone(),
                            reason: HoldReason::NearDeadline { ticks_remaining },
                        });
                    }
                }
            }
        }

        decisions
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
