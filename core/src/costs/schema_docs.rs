//! Cost Schema Documentation
//!
//! Self-documenting schema system for cost type elements.
//! Generates documentation from code metadata for CLI tool consumption.

use serde::{Deserialize, Serialize};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Category for grouping cost types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CostCategory {
    /// Costs that accrue every tick
    PerTick,
    /// One-time penalties triggered by events
    OneTime,
    /// Costs charged once per day
    Daily,
    /// Multipliers that modify other costs
    Modifier,
}

/// Example calculation for a cost type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostExample {
    /// Scenario description
    pub scenario: String,
    /// Input values as (name, value) pairs
    pub inputs: Vec<(String, String)>,
    /// Calculation steps
    pub calculation: String,
    /// Final result
    pub result: String,
}

/// Documentation for a single cost type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostElement {
    /// Cost type name (e.g., "overdraft_bps_per_tick")
    pub name: String,

    /// Human-readable display name (e.g., "Overdraft Cost")
    pub display_name: String,

    /// Category for filtering
    pub category: CostCategory,

    /// What this cost represents
    pub description: String,

    /// When/how the cost is incurred
    pub incurred_at: String,

    /// Mathematical formula (plain text)
    pub formula: String,

    /// Default value
    pub default_value: String,

    /// Unit of measurement
    pub unit: String,

    /// Data type (f64, i64, etc.)
    pub data_type: String,

    /// Rust source file location
    pub source_location: String,

    /// Related cost types
    pub see_also: Vec<String>,

    /// Example calculation
    pub example: Option<CostExample>,

    /// Version when added
    pub added_in: Option<String>,
}

/// Complete cost schema documentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSchemaDoc {
    pub version: String,
    pub generated_at: String,
    pub cost_types: Vec<CostElement>,
}

/// Trait for types that can provide cost schema documentation
pub trait CostSchemaDocumented {
    fn schema_docs() -> Vec<CostElement>;
}

// ============================================================================
// IMPLEMENTATIONS
// ============================================================================

use super::rates::CostRates;

impl CostSchemaDocumented for CostRates {
    fn schema_docs() -> Vec<CostElement> {
        vec![
            // Per-tick costs
            CostElement {
                name: "overdraft_bps_per_tick".to_string(),
                display_name: "Overdraft Cost".to_string(),
                category: CostCategory::PerTick,
                description: "Cost for using intraday credit when balance goes negative. \
                    Represents the fee charged by the central bank for daylight overdrafts.".to_string(),
                incurred_at: "Every tick, when agent balance < 0".to_string(),
                formula: "max(0, -balance) * overdraft_bps_per_tick / 10,000".to_string(),
                default_value: "0.001".to_string(),
                unit: "basis points per tick".to_string(),
                data_type: "f64".to_string(),
                source_location: "simulator/src/costs/rates.rs".to_string(),
                see_also: vec!["collateral_cost_per_tick_bps".to_string()],
                example: Some(CostExample {
                    scenario: "Bank A has negative balance".to_string(),
                    inputs: vec![
                        ("balance".to_string(), "-$500,000 (-50,000,000 cents)".to_string()),
                        ("overdraft_bps_per_tick".to_string(), "0.001".to_string()),
                    ],
                    calculation: "50,000,000 * 0.001 / 10,000 = 5 cents".to_string(),
                    result: "$0.05 per tick".to_string(),
                }),
                added_in: Some("1.0".to_string()),
            },
            CostElement {
                name: "delay_cost_per_tick_per_cent".to_string(),
                display_name: "Delay Cost".to_string(),
                category: CostCategory::PerTick,
                description: "Cost per tick for each cent of queued (pending) transaction value. \
                    Incentivizes timely settlement by penalizing delays.".to_string(),
                incurred_at: "Every tick, for each transaction in Queue 1 or Queue 2".to_string(),
                formula: "queued_amount * delay_cost_per_tick_per_cent".to_string(),
                default_value: "0.0001".to_string(),
                unit: "cost per cent per tick".to_string(),
                data_type: "f64".to_string(),
                source_location: "simulator/src/costs/rates.rs".to_string(),
                see_also: vec!["overdue_delay_multiplier".to_string(), "priority_delay_multipliers".to_string()],
                example: Some(CostExample {
                    scenario: "$1M transaction waiting in queue".to_string(),
                    inputs: vec![
                        ("queued_amount".to_string(), "$1,000,000 (100,000,000 cents)".to_string()),
                        ("delay_cost_per_tick_per_cent".to_string(), "0.0001".to_string()),
                    ],
                    calculation: "100,000,000 * 0.0001 = 10,000 cents".to_string(),
                    result: "$100 per tick".to_string(),
                }),
                added_in: Some("1.0".to_string()),
            },
            CostElement {
                name: "collateral_cost_per_tick_bps".to_string(),
                display_name: "Collateral Opportunity Cost".to_string(),
                category: CostCategory::PerTick,
                description: "Opportunity cost for posting collateral to the central bank. \
                    Represents foregone interest earnings on pledged assets.".to_string(),
                incurred_at: "Every tick, based on posted collateral amount".to_string(),
                formula: "posted_collateral * collateral_cost_per_tick_bps / 10,000".to_string(),
                default_value: "0.0002".to_string(),
                unit: "basis points per tick".to_string(),
                data_type: "f64".to_string(),
                source_location: "simulator/src/costs/rates.rs".to_string(),
                see_also: vec!["overdraft_bps_per_tick".to_string(), "liquidity_cost_per_tick_bps".to_string()],
                example: Some(CostExample {
                    scenario: "$10M collateral posted".to_string(),
                    inputs: vec![
                        ("posted_collateral".to_string(), "$10,000,000 (1,000,000,000 cents)".to_string()),
                        ("collateral_cost_per_tick_bps".to_string(), "0.0002".to_string()),
                    ],
                    calculation: "1,000,000,000 * 0.0002 / 10,000 = 20 cents".to_string(),
                    result: "$0.20 per tick".to_string(),
                }),
                added_in: Some("1.0".to_string()),
            },
            CostElement {
                name: "liquidity_cost_per_tick_bps".to_string(),
                display_name: "Liquidity Opportunity Cost".to_string(),
                category: CostCategory::PerTick,
                description: "Opportunity cost for holding allocated liquidity in the settlement system. \
                    Applied to liquidity_pool * allocation_fraction.".to_string(),
                incurred_at: "Every tick, based on allocated liquidity (not opening_balance)".to_string(),
                formula: "allocated_liquidity * liquidity_cost_per_tick_bps / 10,000".to_string(),
                default_value: "0.0".to_string(),
                unit: "basis points per tick".to_string(),
                data_type: "f64".to_string(),
                source_location: "simulator/src/costs/rates.rs".to_string(),
                see_also: vec!["collateral_cost_per_tick_bps".to_string()],
                example: Some(CostExample {
                    scenario: "$5M allocated from liquidity pool".to_string(),
                    inputs: vec![
                        ("allocated_liquidity".to_string(), "$5,000,000 (500,000,000 cents)".to_string()),
                        ("liquidity_cost_per_tick_bps".to_string(), "0.0015".to_string()),
                    ],
                    calculation: "500,000,000 * 0.0015 / 10,000 = 75 cents".to_string(),
                    result: "$0.75 per tick".to_string(),
                }),
                added_in: Some("1.1".to_string()),
            },
            // One-time penalties
            CostElement {
                name: "deadline_penalty".to_string(),
                display_name: "Deadline Penalty".to_string(),
                category: CostCategory::OneTime,
                description: "One-time penalty charged when a transaction misses its deadline \
                    and becomes overdue. Represents reputational and operational costs.".to_string(),
                incurred_at: "Once, when transaction transitions from pending to overdue".to_string(),
                formula: "deadline_penalty (fixed amount)".to_string(),
                default_value: "50,000".to_string(),
                unit: "cents".to_string(),
                data_type: "i64".to_string(),
                source_location: "simulator/src/costs/rates.rs".to_string(),
                see_also: vec!["overdue_delay_multiplier".to_string(), "eod_penalty_per_transaction".to_string()],
                example: Some(CostExample {
                    scenario: "Transaction misses deadline at tick 50".to_string(),
                    inputs: vec![
                        ("deadline_penalty".to_string(), "50,000 cents".to_string()),
                    ],
                    calculation: "Fixed penalty applied once".to_string(),
                    result: "$500 one-time charge".to_string(),
                }),
                added_in: Some("1.0".to_string()),
            },
            CostElement {
                name: "split_friction_cost".to_string(),
                display_name: "Split Friction Cost".to_string(),
                category: CostCategory::OneTime,
                description: "Cost incurred when splitting a transaction into multiple parts. \
                    Represents operational overhead of processing multiple instructions.".to_string(),
                incurred_at: "Once per split, when Split/StaggerSplit/PaceAndRelease action executes".to_string(),
                formula: "split_friction_cost * (num_splits - 1)".to_string(),
                default_value: "1,000".to_string(),
                unit: "cents per split".to_string(),
                data_type: "i64".to_string(),
                source_location: "simulator/src/costs/rates.rs".to_string(),
                see_also: vec![],
                example: Some(CostExample {
                    scenario: "Transaction split into 4 parts".to_string(),
                    inputs: vec![
                        ("split_friction_cost".to_string(), "1,000 cents".to_string()),
                        ("num_splits".to_string(), "4".to_string()),
                    ],
                    calculation: "1,000 * (4 - 1) = 3,000 cents".to_string(),
                    result: "$30 total split cost".to_string(),
                }),
                added_in: Some("1.0".to_string()),
            },
            // Daily penalties
            CostElement {
                name: "eod_penalty_per_transaction".to_string(),
                display_name: "End-of-Day Penalty".to_string(),
                category: CostCategory::Daily,
                description: "Large penalty for transactions that remain unsettled at end of day. \
                    Represents systemic risk and regulatory non-compliance costs.".to_string(),
                incurred_at: "End of each day, for each unsettled transaction".to_string(),
                formula: "count(unsettled_transactions) * eod_penalty_per_transaction".to_string(),
                default_value: "10,000".to_string(),
                unit: "cents per transaction".to_string(),
                data_type: "i64".to_string(),
                source_location: "simulator/src/costs/rates.rs".to_string(),
                see_also: vec!["deadline_penalty".to_string()],
                example: Some(CostExample {
                    scenario: "3 transactions unsettled at EOD".to_string(),
                    inputs: vec![
                        ("unsettled_count".to_string(), "3".to_string()),
                        ("eod_penalty_per_transaction".to_string(), "10,000 cents".to_string()),
                    ],
                    calculation: "3 * 10,000 = 30,000 cents".to_string(),
                    result: "$300 EOD penalty".to_string(),
                }),
                added_in: Some("1.0".to_string()),
            },
            // Modifiers
            CostElement {
                name: "overdue_delay_multiplier".to_string(),
                display_name: "Overdue Delay Multiplier".to_string(),
                category: CostCategory::Modifier,
                description: "Multiplier applied to delay costs when a transaction is past its deadline. \
                    Creates escalating urgency for overdue payments.".to_string(),
                incurred_at: "Applied to delay_cost calculation when is_overdue = true".to_string(),
                formula: "delay_cost * overdue_delay_multiplier (when overdue)".to_string(),
                default_value: "5.0".to_string(),
                unit: "multiplier".to_string(),
                data_type: "f64".to_string(),
                source_location: "simulator/src/costs/rates.rs".to_string(),
                see_also: vec!["delay_cost_per_tick_per_cent".to_string(), "deadline_penalty".to_string()],
                example: Some(CostExample {
                    scenario: "Overdue $1M transaction".to_string(),
                    inputs: vec![
                        ("base_delay_cost".to_string(), "$100/tick".to_string()),
                        ("overdue_delay_multiplier".to_string(), "5.0".to_string()),
                    ],
                    calculation: "$100 * 5.0 = $500".to_string(),
                    result: "$500 delay cost per tick (vs $100 if on-time)".to_string(),
                }),
                added_in: Some("1.0".to_string()),
            },
            CostElement {
                name: "priority_delay_multipliers".to_string(),
                display_name: "Priority Delay Multipliers".to_string(),
                category: CostCategory::Modifier,
                description: "Optional priority-based multipliers for delay costs (BIS model). \
                    Applies different rates based on transaction priority bands.".to_string(),
                incurred_at: "Applied to delay_cost based on transaction priority (0-10)".to_string(),
                formula: "delay_cost * multiplier_for_priority_band".to_string(),
                default_value: "None (all priorities use same rate)".to_string(),
                unit: "multiplier struct".to_string(),
                data_type: "Option<PriorityDelayMultipliers>".to_string(),
                source_location: "simulator/src/costs/rates.rs".to_string(),
                see_also: vec!["delay_cost_per_tick_per_cent".to_string(), "overdue_delay_multiplier".to_string()],
                example: Some(CostExample {
                    scenario: "Priority-based delay costs".to_string(),
                    inputs: vec![
                        ("urgent_multiplier".to_string(), "2.0 (priority 8-10)".to_string()),
                        ("normal_multiplier".to_string(), "1.0 (priority 4-7)".to_string()),
                        ("low_multiplier".to_string(), "0.5 (priority 0-3)".to_string()),
                    ],
                    calculation: "Priority 9 tx: delay_cost * 2.0".to_string(),
                    result: "Urgent txs cost 2x, low-priority txs cost 0.5x".to_string(),
                }),
                added_in: Some("1.0".to_string()),
            },
        ]
    }
}

/// Generate complete cost schema documentation as JSON string
pub fn get_cost_schema() -> String {
    let schema = CostSchemaDoc {
        version: "1.0".to_string(),
        generated_at: "2025-01-01T00:00:00Z".to_string(), // Static for determinism
        cost_types: CostRates::schema_docs(),
    };

    serde_json::to_string_pretty(&schema).expect("Schema serialization should not fail")
}

// ============================================================================
// TESTS - Written FIRST (TDD)
// ============================================================================
