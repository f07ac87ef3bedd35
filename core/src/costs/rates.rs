//! Cost Rates and Related Types
//!
//! Defines rates for various costs accrued during simulation.
//! All monetary values in cents/minor units.

use serde::{Deserialize, Serialize};

/// Priority band for categorizing transaction urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityBand {
    /// Priority 8-10: Time-critical payments
    Urgent,
    /// Priority 4-7: Standard payments
    Normal,
    /// Priority 0-3: Low priority/batch payments
    Low,
}

/// Get the priority band for a given priority level
///
/// # Arguments
/// * `priority` - Priority level (0-10)
///
/// # Returns
/// The corresponding priority band
pub fn get_priority_band(priority: u8) -> PriorityBand {
    match priority {
        8..=10 => PriorityBand::Urgent,
        4..=7 => PriorityBand::Normal,
        _ => PriorityBand::Low, // 0-3 and any out-of-range values
    }
}

/// Priority-based delay cost multipliers (BIS model support)
///
/// Allows different delay costs for different priority bands.
/// This enables modeling BIS scenarios where urgent payments
/// have higher delay costs than normal payments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriorityDelayMultipliers {
    /// Multiplier for urgent priority (8-10). Default: 1.0
    pub urgent_multiplier: f64,
    /// Multiplier for normal priority (4-7). Default: 1.0
    pub normal_multiplier: f64,
    /// Multiplier for low priority (0-3). Default: 1.0
    pub low_multiplier: f64,
}

impl Default for PriorityDelayMultipliers {
    fn default() -> Self {
        Self {
            urgent_multiplier: 1.0,
            normal_multiplier: 1.0,
            low_multiplier: 1.0,
        }
    }
}

impl PriorityDelayMultipliers {
    /// Get the delay cost multiplier for a given priority level
    ///
    /// # Arguments
    /// * `priority` - Priority level (0-10)
    ///
    /// # Returns
    /// The multiplier for the corresponding priority band
    pub fn get_multiplier_for_priority(&self, priority: u8) -> f64 {
        match get_priority_band(priority) {
            PriorityBand::Urgent => self.urgent_multiplier,
            PriorityBand::Normal => self.normal_multiplier,
            PriorityBand::Low => self.low_multiplier,
        }
    }
}

/// Cost Rates Configuration
///
/// Defines rates for various costs accrued during simulation.
/// All monetary values in cents/minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRates {
    /// Overdraft cost in basis points per tick
    /// (e.g., 0.001 = 1 bp per tick ≈ 10 bp per day for 100 ticks/day)
    pub overdraft_bps_per_tick: f64,

    /// Delay cost per tick per cent of queued value
    /// (e.g., 0.0001 = 1 bp delay cost per tick)
    pub delay_cost_per_tick_per_cent: f64,

    /// Collateral opportunity cost in basis points per tick (Phase 8)
    /// (e.g., 0.0002 = 2 bps annualized / 100 ticks = 0.02 bps per tick)
    pub collateral_cost_per_tick_bps: f64,

    /// End-of-day penalty for each unsettled transaction (cents)
    pub eod_penalty_per_transaction: i64,

    /// Penalty for missing deadline (cents per transaction)
    pub deadline_penalty: i64,

    /// Split friction cost per split (cents)
    ///
    /// When a transaction is split into N parts, the cost is:
    /// split_friction_cost × (N-1)
    ///
    /// This represents the operational overhead of creating and processing
    /// multiple payment instructions instead of a single instruction.
    pub split_friction_cost: i64,

    /// Multiplier for delay cost when transaction is overdue (default: 5.0)
    ///
    /// Overdue transactions incur escalating costs to represent urgency.
    /// If a transaction is overdue, its delay cost per tick is multiplied by this factor.
    ///
    /// Example: If delay_cost_per_tick_per_cent = 0.0001 and overdue_delay_multiplier = 5.0,
    /// then an overdue $1M transaction costs $5/tick instead of $1/tick.
    pub overdue_delay_multiplier: f64,

    /// Priority-based delay cost multipliers (BIS model support)
    ///
    /// When configured, applies different multipliers to delay costs based on
    /// transaction priority bands:
    /// - Urgent (8-10): urgent_multiplier
    /// - Normal (4-7): normal_multiplier
    /// - Low (0-3): low_multiplier
    ///
    /// If None, all priorities use the same base delay cost rate.
    #[serde(default)]
    pub priority_delay_multipliers: Option<PriorityDelayMultipliers>,

    /// Liquidity opportunity cost in basis points per tick (Enhancement 11.2)
    ///
    /// Applied to allocated liquidity (from liquidity_pool × allocation_fraction)
    /// to represent the opportunity cost of holding funds in the settlement system
    /// rather than earning interest elsewhere.
    ///
    /// Example: 15 bps per tick for a 1M allocation = 1,000,000 × (15/10,000) = 1,500 cents/tick
    ///
    /// Note: This only applies to allocated liquidity, not to opening_balance
    /// (which is assumed to already be at the central bank).
    #[serde(default)]
    pub liquidity_cost_per_tick_bps: f64,
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            overdraft_bps_per_tick: 0.001,        // 1 bp/tick
            delay_cost_per_tick_per_cent: 0.0001, // 0.1 bp/tick
            collateral_cost_per_tick_bps: 0.0002, // 2 bps annualized / 100 ticks
            eod_penalty_per_transaction: 10_000,  // $100 per unsettled tx
            deadline_penalty: 50_000,             // $500 per missed deadline
            split_friction_cost: 1000,            // $10 per split
            overdue_delay_multiplier: 5.0,        // 5x multiplier for overdue
            priority_delay_multipliers: None,     // No priority differentiation by default
            liquidity_cost_per_tick_bps: 0.0,     // No liquidity opportunity cost by default
        }
    }
}

/// Per-tick, per-agent cost breakdown produced by the Cost Engine (§4.7).
///
/// One of these is attached to each `CostAccrual` event; downstream consumers
/// reconstruct a total by summing the fields, never by re-deriving from rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Overdraft/liquidity cost on a negative balance this tick.
    pub liquidity_cost: i64,
    /// Collateral opportunity cost on posted collateral this tick.
    pub collateral_cost: i64,
    /// Opportunity cost on liquidity-pool allocated balance this tick.
    pub liquidity_pool_cost: i64,
    /// Queue-1 delay cost (held by policy choice, not awaiting liquidity).
    pub delay_cost: i64,
    /// One-time penalties charged at the tick a transaction goes Overdue.
    pub deadline_penalty_cost: i64,
    /// Split friction charged at the tick a transaction is split.
    pub split_friction_cost: i64,
    /// End-of-day penalty for transactions still unsettled at EOD.
    pub eod_penalty_cost: i64,
}

impl CostBreakdown {
    /// Sum of every cost component for this tick/agent.
    pub fn total(&self) -> i64 {
        self.liquidity_cost
            + self.collateral_cost
            + self.liquidity_pool_cost
            + self.delay_cost
            + self.deadline_penalty_cost
            + self.split_friction_cost
            + self.eod_penalty_cost
    }

    pub fn add(&mut self, other: &CostBreakdown) {
        self.liquidity_cost += other.liquidity_cost;
        self.collateral_cost += other.collateral_cost;
        self.liquidity_pool_cost += other.liquidity_pool_cost;
        self.delay_cost += other.delay_cost;
        self.deadline_penalty_cost += other.deadline_penalty_cost;
        self.split_friction_cost += other.split_friction_cost;
        self.eod_penalty_cost += other.eod_penalty_cost;
    }
}

/// Running per-agent cost totals across the whole simulation (or since the
/// last reset), plus the peak net-debit watermark used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostAccumulator {
    pub total_liquidity_cost: i64,
    pub total_collateral_cost: i64,
    pub total_liquidity_pool_cost: i64,
    pub total_delay_cost: i64,
    pub total_deadline_penalty_cost: i64,
    pub total_split_friction_cost: i64,
    pub total_eod_penalty_cost: i64,
    pub peak_net_debit: i64,
}

impl CostAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, costs: &CostBreakdown) {
        self.total_liquidity_cost += costs.liquidity_cost;
        self.total_collateral_cost += costs.collateral_cost;
        self.total_liquidity_pool_cost += costs.liquidity_pool_cost;
        self.total_delay_cost += costs.delay_cost;
        self.total_deadline_penalty_cost += costs.deadline_penalty_cost;
        self.total_split_friction_cost += costs.split_friction_cost;
        self.total_eod_penalty_cost += costs.eod_penalty_cost;
    }

    pub fn update_peak_debit(&mut self, balance: i64) {
        let debit = (-balance).max(0);
        if debit > self.peak_net_debit {
            self.peak_net_debit = debit;
        }
    }

    pub fn total(&self) -> i64 {
        self.total_liquidity_cost
            + self.total_collateral_cost
            + self.total_liquidity_pool_cost
            + self.total_delay_cost
            + self.total_deadline_penalty_cost
            + self.total_split_friction_cost
            + self.total_eod_penalty_cost
    }
}
