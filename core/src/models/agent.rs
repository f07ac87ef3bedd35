//! Agent (Bank) model
//!
//! Represents a bank participating in the payment system. Each agent owns:
//! - A settlement balance at the central bank (i64 cents)
//! - An unsecured intraday credit limit plus collateral-backed secured capacity
//! - Queue 1 (its own outgoing payment queue, under policy control)
//! - A small bank of state registers policies can use to carry memory across ticks
//!
//! CRITICAL: All money values are i64 (cents). Never floats.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of general-purpose state registers a policy may use per agent.
pub const MAX_STATE_REGISTERS: usize = 10;

/// Errors that can occur during agent operations
#[derive(Debug, Error, PartialEq)]
pub enum AgentError {
    #[error("Insufficient liquidity: required {required}, available {available}")]
    InsufficientLiquidity { required: i64, available: i64 },

    #[error("Collateral withdrawal blocked by timer: posted at tick {posted_tick}, unlocks at tick {unlock_tick}")]
    CollateralLocked {
        posted_tick: usize,
        unlock_tick: usize,
    },

    #[error("Cannot withdraw {requested} cents of collateral, only {posted} posted")]
    InsufficientCollateral { requested: i64, posted: i64 },

    #[error("State register index {index} out of range (max {MAX_STATE_REGISTERS})")]
    InvalidRegisterIndex { index: usize },
}

/// A pending collateral withdrawal, gated by a minimum holding period.
///
/// Collateral posted at `posted_tick` cannot be withdrawn until `unlock_tick`,
/// preventing a policy from posting and immediately withdrawing collateral to
/// game the end-of-tick collateral tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollateralWithdrawalTimer {
    pub amount: i64,
    pub posted_tick: usize,
    pub unlock_tick: usize,
}

/// Represents a bank (agent) in the payment system
///
/// # Example
/// ```
/// use payment_simulator_core_rs::Agent;
///
/// let mut agent = Agent::new("BANK_A".to_string(), 1000000, 500000);
/// assert_eq!(agent.balance(), 1000000); // $10,000.00 in cents
///
/// agent.debit(300000).unwrap(); // Pay $3,000
/// assert_eq!(agent.balance(), 700000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier (e.g., "BANK_A")
    id: String,

    /// Current balance in settlement account (i64 cents)
    /// Positive = funds available
    /// Negative = using intraday credit
    balance: i64,

    /// Unsecured intraday credit limit (i64 cents). Total overdraft headroom
    /// is this plus whatever collateral-backed capacity is currently posted.
    credit_limit: i64,

    /// Target minimum balance a liquidity-aware policy tries to preserve.
    liquidity_buffer: i64,

    /// Collateral currently posted with the central bank (i64 cents).
    posted_collateral: i64,

    /// Haircut applied to posted collateral when computing secured credit
    /// capacity, expressed as a fraction in [0.0, 1.0].
    collateral_haircut: f64,

    /// Upper bound on how much collateral this agent could ever post.
    max_collateral_capacity: i64,

    /// Queue 1: this agent's own outgoing payments, held under policy control
    /// before being submitted to the central RTGS queue.
    outgoing_queue: Vec<String>,

    /// Transaction ids this agent expects to receive as incoming payments.
    incoming_expected: Vec<String>,

    /// Optional cap, set by a policy, on how much value this agent may
    /// release from Queue 1 in a single tick. `None` means unconstrained.
    release_budget_remaining: Option<i64>,

    /// General-purpose scratch registers a decision tree can read/write
    /// across ticks (bounded at `MAX_STATE_REGISTERS`).
    state_registers: Vec<f64>,

    /// Per-counterparty bilateral exposure limits used by the LSM bilateral
    /// offset algorithm, keyed by counterparty agent id.
    bilateral_limits: HashMap<String, i64>,

    /// Overall multilateral net exposure limit across all counterparties.
    multilateral_limit: Option<i64>,

    /// Pending collateral withdrawals, gated by holding-period timers.
    collateral_withdrawal_timers: Vec<CollateralWithdrawalTimer>,

    /// Tick on which this agent's policy last made a release decision.
    last_decision_tick: Option<usize>,

    /// Tick at which the currently-posted collateral was (most recently)
    /// increased, used as the default anchor for new withdrawal timers.
    collateral_posted_at_tick: Option<usize>,
}

impl Agent {
    /// Create a new agent with no collateral, no liquidity buffer.
    ///
    /// # Example
    /// ```
    /// use payment_simulator_core_rs::Agent;
    ///
    /// let agent = Agent::new("BANK_A".to_string(), 1000000, 500000);
    /// assert_eq!(agent.balance(), 1000000);
    /// ```
    pub fn new(id: String, balance: i64, credit_limit: i64) -> Self {
        assert!(credit_limit >= 0, "credit_limit must be non-negative");
        Self {
            id,
            balance,
            credit_limit,
            liquidity_buffer: 0,
            posted_collateral: 0,
            collateral_haircut: 0.0,
            max_collateral_capacity: 0,
            outgoing_queue: Vec::new(),
            incoming_expected: Vec::new(),
            release_budget_remaining: None,
            state_registers: vec![0.0; MAX_STATE_REGISTERS],
            bilateral_limits: HashMap::new(),
            multilateral_limit: None,
            collateral_withdrawal_timers: Vec::new(),
            last_decision_tick: None,
            collateral_posted_at_tick: None,
        }
    }

    /// Create a new agent with an explicit liquidity buffer target.
    ///
    /// # Example
    /// ```
    /// use payment_simulator_core_rs::Agent;
    ///
    /// let agent = Agent::with_buffer("BANK_A".to_string(), 1000000, 500000, 200000);
    /// assert_eq!(agent.liquidity_buffer(), 200000);
    /// ```
    pub fn with_buffer(id: String, balance: i64, credit_limit: i64, liquidity_buffer: i64) -> Self {
        let mut agent = Self::new(id, balance, credit_limit);
        agent.liquidity_buffer = liquidity_buffer;
        agent
    }

    /// Reconstruct an agent from a checkpoint snapshot's fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_snapshot(
        id: String,
        balance: i64,
        credit_limit: i64,
        outgoing_queue: Vec<String>,
        incoming_expected: Vec<String>,
        last_decision_tick: Option<usize>,
        liquidity_buffer: i64,
        posted_collateral: i64,
        collateral_haircut: f64,
        collateral_posted_at_tick: Option<usize>,
        max_collateral_capacity: i64,
        release_budget_remaining: Option<i64>,
        state_registers: Vec<f64>,
        bilateral_limits: HashMap<String, i64>,
        multilateral_limit: Option<i64>,
        collateral_withdrawal_timers: Vec<CollateralWithdrawalTimer>,
    ) -> Self {
        let mut agent = Self::new(id, balance, credit_limit);
        agent.outgoing_queue = outgoing_queue;
        agent.incoming_expected = incoming_expected;
        agent.last_decision_tick = last_decision_tick;
        agent.liquidity_buffer = liquidity_buffer;
        agent.posted_collateral = posted_collateral;
        agent.collateral_haircut = collateral_haircut;
        agent.collateral_posted_at_tick = collateral_posted_at_tick;
        agent.max_collateral_capacity = max_collateral_capacity;
        agent.release_budget_remaining = release_budget_remaining;
        agent.state_registers = state_registers;
        agent.bilateral_limits = bilateral_limits;
        agent.multilateral_limit = multilateral_limit;
        agent.collateral_withdrawal_timers = collateral_withdrawal_timers;
        agent
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn credit_limit(&self) -> i64 {
        self.credit_limit
    }

    pub fn liquidity_buffer(&self) -> i64 {
        self.liquidity_buffer
    }

    /// Collateral-backed secured credit capacity: posted collateral after
    /// the haircut, truncated toward zero.
    pub fn collateral_secured_capacity(&self) -> i64 {
        (self.posted_collateral as f64 * (1.0 - self.collateral_haircut)) as i64
    }

    /// Total overdraft headroom: unsecured credit limit plus collateral-backed
    /// secured capacity.
    pub fn allowed_overdraft_limit(&self) -> i64 {
        self.credit_limit + self.collateral_secured_capacity()
    }

    /// Calculate available liquidity (balance + unused overdraft headroom)
    ///
    /// # Example
    /// ```
    /// use payment_simulator_core_rs::Agent;
    ///
    /// let agent = Agent::new("BANK_A".to_string(), 1000000, 500000);
    /// assert_eq!(agent.available_liquidity(), 1500000);
    /// ```
    pub fn available_liquidity(&self) -> i64 {
        if self.balance >= 0 {
            self.balance + self.allowed_overdraft_limit()
        } else {
            self.allowed_overdraft_limit() - self.balance.abs()
        }
    }

    /// Check if agent can pay a given amount
    pub fn can_pay(&self, amount: i64) -> bool {
        amount <= self.available_liquidity()
    }

    /// Debit (decrease) balance
    pub fn debit(&mut self, amount: i64) -> Result<(), AgentError> {
        assert!(amount >= 0, "amount must be positive");

        if !self.can_pay(amount) {
            return Err(AgentError::InsufficientLiquidity {
                required: amount,
                available: self.available_liquidity(),
            });
        }

        self.balance -= amount;
        Ok(())
    }

    /// Credit (increase) balance
    pub fn credit(&mut self, amount: i64) {
        assert!(amount >= 0, "amount must be positive");
        self.balance += amount;
    }

    /// Check if agent is currently using intraday credit
    pub fn is_using_credit(&self) -> bool {
        self.balance < 0
    }

    /// Directly adjust the balance by a signed delta, bypassing liquidity checks.
    ///
    /// Used by scenario events (direct transfers, collateral adjustments) that model
    /// external interventions rather than ordinary settlement.
    pub fn adjust_balance(&mut self, delta: i64) {
        self.balance += delta;
    }

    /// Get amount of credit currently being used
    pub fn credit_used(&self) -> i64 {
        if self.balance < 0 {
            self.balance.abs()
        } else {
            0
        }
    }

    /// Fraction of total overdraft headroom currently consumed, in [0.0, 1.0].
    /// Zero headroom (no credit limit, no collateral) reports 0.0 rather than
    /// dividing by zero.
    pub fn liquidity_pressure(&self) -> f64 {
        let limit = self.allowed_overdraft_limit();
        if limit <= 0 {
            0.0
        } else {
            self.credit_used() as f64 / limit as f64
        }
    }

    /// Value of this agent's own Queue 1 (outgoing, policy-held payments)
    /// still outstanding against its available liquidity, clamped at zero.
    pub fn queue1_liquidity_gap(&self, state: &crate::models::state::SimulationState) -> i64 {
        let required: i64 = self
            .outgoing_queue
            .iter()
            .filter_map(|tx_id| state.get_transaction(tx_id))
            .map(|tx| tx.remaining_amount())
            .sum();
        (required - self.available_liquidity()).max(0)
    }

    // -- Queue 1 (outgoing) --------------------------------------------

    pub fn queue_outgoing(&mut self, tx_id: String) {
        self.outgoing_queue.push(tx_id);
    }

    pub fn outgoing_queue(&self) -> &[String] {
        &self.outgoing_queue
    }

    pub fn outgoing_queue_size(&self) -> usize {
        self.outgoing_queue.len()
    }

    /// Remove a transaction from Queue 1. Returns true if it was present.
    pub fn remove_from_queue(&mut self, tx_id: &str) -> bool {
        if let Some(pos) = self.outgoing_queue.iter().position(|id| id == tx_id) {
            self.outgoing_queue.remove(pos);
            true
        } else {
            false
        }
    }

    // -- Expected incoming -----------------------------------------------

    pub fn add_expected_inflow(&mut self, tx_id: String) {
        self.incoming_expected.push(tx_id);
    }

    pub fn incoming_expected(&self) -> &[String] {
        &self.incoming_expected
    }

    /// Drop a transaction from the expected-inflow list once it settles or
    /// is otherwise resolved.
    pub fn resolve_expected_inflow(&mut self, tx_id: &str) -> bool {
        if let Some(pos) = self.incoming_expected.iter().position(|id| id == tx_id) {
            self.incoming_expected.remove(pos);
            true
        } else {
            false
        }
    }

    // -- Collateral --------------------------------------------------------

    pub fn posted_collateral(&self) -> i64 {
        self.posted_collateral
    }

    pub fn collateral_haircut(&self) -> f64 {
        self.collateral_haircut
    }

    pub fn max_collateral_capacity(&self) -> i64 {
        self.max_collateral_capacity
    }

    pub fn remaining_collateral_capacity(&self) -> i64 {
        self.max_collateral_capacity - self.posted_collateral
    }

    pub fn set_max_collateral_capacity(&mut self, capacity: i64) {
        self.max_collateral_capacity = capacity;
    }

    pub fn set_collateral_haircut(&mut self, haircut: f64) {
        assert!((0.0..=1.0).contains(&haircut), "haircut must be in [0.0, 1.0]");
        self.collateral_haircut = haircut;
    }

    /// Directly set the posted collateral amount (used by the collateral
    /// policy trees to post/withdraw). Records the current tick as the
    /// collateral's posted-at tick when the amount increases.
    pub fn set_posted_collateral(&mut self, amount: i64, tick: usize) {
        if amount > self.posted_collateral {
            self.collateral_posted_at_tick = Some(tick);
        }
        self.posted_collateral = amount;
    }

    pub fn set_unsecured_cap(&mut self, new_limit: i64) {
        assert!(new_limit >= 0, "credit_limit must be non-negative");
        self.credit_limit = new_limit;
    }

    pub fn collateral_posted_at_tick(&self) -> Option<usize> {
        self.collateral_posted_at_tick
    }

    /// Register a future withdrawal of `amount` posted at `posted_tick`,
    /// unlockable starting `unlock_tick`.
    pub fn schedule_collateral_withdrawal_with_posted_tick(
        &mut self,
        amount: i64,
        posted_tick: usize,
        unlock_tick: usize,
    ) {
        self.collateral_withdrawal_timers.push(CollateralWithdrawalTimer {
            amount,
            posted_tick,
            unlock_tick,
        });
    }

    /// Timers that are unlockable at or before `current_tick`.
    pub fn get_pending_collateral_withdrawals_with_posted_tick(
        &self,
        current_tick: usize,
    ) -> Vec<CollateralWithdrawalTimer> {
        self.collateral_withdrawal_timers
            .iter()
            .filter(|timer| timer.unlock_tick <= current_tick)
            .copied()
            .collect()
    }

    pub fn remove_collateral_withdrawal_timer(&mut self, posted_tick: usize) -> bool {
        if let Some(pos) = self
            .collateral_withdrawal_timers
            .iter()
            .position(|timer| timer.posted_tick == posted_tick)
        {
            self.collateral_withdrawal_timers.remove(pos);
            true
        } else {
            false
        }
    }

    /// Withdraw collateral, honoring the earliest-unlocking timer that covers
    /// `amount` as of `current_tick`. Fails if insufficient collateral is
    /// posted, or if no unlocked timer covers the requested amount.
    pub fn try_withdraw_collateral_guarded(
        &mut self,
        amount: i64,
        current_tick: usize,
    ) -> Result<(), AgentError> {
        if amount > self.posted_collateral {
            return Err(AgentError::InsufficientCollateral {
                requested: amount,
                posted: self.posted_collateral,
            });
        }

        if let Some(timer) = self
            .collateral_withdrawal_timers
            .iter()
            .min_by_key(|timer| timer.unlock_tick)
        {
            if timer.unlock_tick > current_tick {
                return Err(AgentError::CollateralLocked {
                    posted_tick: timer.posted_tick,
                    unlock_tick: timer.unlock_tick,
                });
            }
        }

        self.posted_collateral -= amount;
        Ok(())
    }

    // -- Release budget ----------------------------------------------------

    pub fn set_release_budget(&mut self, amount: i64) {
        self.release_budget_remaining = Some(amount);
    }

    pub fn reset_release_budget(&mut self) {
        self.release_budget_remaining = None;
    }

    pub fn release_budget_remaining(&self) -> Option<i64> {
        self.release_budget_remaining
    }

    /// Deduct `amount` from the release budget, if one is set. No-op (always
    /// succeeds) when no budget is configured.
    pub fn consume_release_budget(&mut self, amount: i64) {
        if let Some(remaining) = self.release_budget_remaining {
            self.release_budget_remaining = Some((remaining - amount).max(0));
        }
    }

    // -- State registers -----------------------------------------------------

    /// Set state register `index` to `value`, returning the (old, new) pair.
    pub fn set_state_register(&mut self, index: usize, value: f64) -> Result<(f64, f64), String> {
        if index >= MAX_STATE_REGISTERS {
            return Err(format!(
                "state register index {} out of range (max {})",
                index, MAX_STATE_REGISTERS
            ));
        }
        let old = self.state_registers[index];
        self.state_registers[index] = value;
        Ok((old, value))
    }

    pub fn get_state_register(&self, index: usize) -> Option<f64> {
        self.state_registers.get(index).copied()
    }

    pub fn state_registers(&self) -> &[f64] {
        &self.state_registers
    }

    // -- Exposure limits -----------------------------------------------------

    pub fn set_bilateral_limit(&mut self, counterparty: String, limit: i64) {
        self.bilateral_limits.insert(counterparty, limit);
    }

    pub fn bilateral_limit(&self, counterparty: &str) -> Option<i64> {
        self.bilateral_limits.get(counterparty).copied()
    }

    pub fn bilateral_limits(&self) -> &HashMap<String, i64> {
        &self.bilateral_limits
    }

    pub fn set_multilateral_limit(&mut self, limit: Option<i64>) {
        self.multilateral_limit = limit;
    }

    pub fn multilateral_limit(&self) -> Option<i64> {
        self.multilateral_limit
    }

    pub fn collateral_withdrawal_timers(&self) -> &[CollateralWithdrawalTimer] {
        &self.collateral_withdrawal_timers
    }

    // -- Decision bookkeeping --------------------------------------------

    pub fn last_decision_tick(&self) -> Option<usize> {
        self.last_decision_tick
    }

    pub fn set_last_decision_tick(&mut self, tick: usize) {
        self.last_decision_tick = Some(tick);
    }
}
