//! Checkpoint - Save/Load Simulation State
//!
//! Enables serialization and deserialization of complete orchestrator state
//! for pause/resume functionality.
//!
//! # Critical Invariants
//!
//! - **Determinism**: Same seed + config produces identical results
//! - **Balance Conservation**: Total agent balance preserved
//! - **Queue Integrity**: No orphaned or duplicate transactions
//! - **Config Matching**: State can only be loaded with matching config

use crate::costs::CostAccumulator;
use crate::models::agent::Agent;
use crate::models::transaction::{RtgsPriorityBand, Transaction, TransactionStatus};
use crate::orchestrator::SimulationError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete orchestrator state snapshot
///
/// This structure captures all state necessary to resume a simulation
/// from an arbitrary point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Current tick position
    pub current_tick: usize,

    /// Current day position
    pub current_day: usize,

    /// RNG state at time of snapshot (CRITICAL for determinism). Despite the
    /// field name, this is the xorshift generator's *live* state at save
    /// time, not the original config's seed: feeding it back into
    /// `RngManager::new` resumes the exact same output sequence.
    pub rng_seed: u64,

    /// All agent states
    pub agents: Vec<AgentSnapshot>,

    /// All transaction states
    pub transactions: Vec<TransactionSnapshot>,

    /// Queue 2 (RTGS queue) transaction IDs
    pub rtgs_queue: Vec<String>,

    /// Per-agent accumulated cost totals (tick-local accumulator state)
    pub accumulated_costs: HashMap<String, CostAccumulator>,

    /// SHA256 hash of original config (for validation)
    pub config_hash: String,
}

/// Agent state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub balance: i64,
    pub unsecured_cap: i64,
    pub max_collateral_capacity: i64,
    pub outgoing_queue: Vec<String>, // Queue 1 (internal)
    pub incoming_expected: Vec<String>,
    pub last_decision_tick: Option<usize>,
    pub liquidity_buffer: i64,
    pub posted_collateral: i64,
    pub collateral_haircut: f64,
    pub collateral_posted_at_tick: Option<usize>,
    pub release_budget_remaining: Option<i64>,
    pub state_registers: Vec<f64>,
    pub bilateral_limits: HashMap<String, i64>,
    pub multilateral_limit: Option<i64>,
    pub collateral_withdrawal_timers: Vec<crate::models::agent::CollateralWithdrawalTimer>,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        AgentSnapshot {
            id: agent.id().to_string(),
            balance: agent.balance(),
            unsecured_cap: agent.credit_limit(),
            max_collateral_capacity: agent.max_collateral_capacity(),
            outgoing_queue: agent.outgoing_queue().to_vec(),
            incoming_expected: agent.incoming_expected().to_vec(),
            last_decision_tick: agent.last_decision_tick(),
            liquidity_buffer: agent.liquidity_buffer(),
            posted_collateral: agent.posted_collateral(),
            collateral_haircut: agent.collateral_haircut(),
            collateral_posted_at_tick: agent.collateral_posted_at_tick(),
            release_budget_remaining: agent.release_budget_remaining(),
            state_registers: agent.state_registers().to_vec(),
            bilateral_limits: agent.bilateral_limits().clone(),
            multilateral_limit: agent.multilateral_limit(),
            collateral_withdrawal_timers: agent.collateral_withdrawal_timers().to_vec(),
        }
    }
}

impl From<AgentSnapshot> for Agent {
    fn from(snapshot: AgentSnapshot) -> Self {
        Agent::from_snapshot(
            snapshot.id,
            snapshot.balance,
            snapshot.unsecured_cap,
            snapshot.outgoing_queue,
            snapshot.incoming_expected,
            snapshot.last_decision_tick,
            snapshot.liquidity_buffer,
            snapshot.posted_collateral,
            snapshot.collateral_haircut,
            snapshot.collateral_posted_at_tick,
            snapshot.max_collateral_capacity,
            snapshot.release_budget_remaining,
            snapshot.state_registers,
            snapshot.bilateral_limits,
            snapshot.multilateral_limit,
            snapshot.collateral_withdrawal_timers,
        )
    }
}

/// Transaction state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: i64,
    pub remaining_amount: i64,
    pub arrival_tick: usize,
    pub deadline_tick: usize,
    pub priority: u8,
    pub original_priority: u8,
    pub is_divisible: bool,
    pub status: TransactionStatus,
    pub parent_id: Option<String>,
    pub rtgs_priority: Option<RtgsPriorityBand>,
    pub rtgs_submission_tick: Option<usize>,
    pub overdue_since_tick: Option<usize>,
}

impl From<&Transaction> for TransactionSnapshot {
    fn from(tx: &Transaction) -> Self {
        TransactionSnapshot {
            id: tx.id().to_string(),
            sender_id: tx.sender_id().to_string(),
            receiver_id: tx.receiver_id().to_string(),
            amount: tx.amount(),
            remaining_amount: tx.remaining_amount(),
            arrival_tick: tx.arrival_tick(),
            deadline_tick: tx.deadline_tick(),
            priority: tx.priority(),
            original_priority: tx.original_priority(),
            is_divisible: tx.is_divisible(),
            status: tx.status().clone(),
            parent_id: tx.parent_id().map(|s| s.to_string()),
            rtgs_priority: tx.rtgs_priority(),
            rtgs_submission_tick: tx.rtgs_submission_tick(),
            overdue_since_tick: tx.overdue_since_tick(),
        }
    }
}

impl From<TransactionSnapshot> for Transaction {
    fn from(snapshot: TransactionSnapshot) -> Self {
        Transaction::from_snapshot(
            snapshot.id,
            snapshot.sender_id,
            snapshot.receiver_id,
            snapshot.amount,
            snapshot.remaining_amount,
            snapshot.arrival_tick,
            snapshot.deadline_tick,
            snapshot.priority,
            snapshot.status,
            snapshot.parent_id,
            snapshot.original_priority,
            snapshot.is_divisible,
            snapshot.rtgs_priority,
            snapshot.rtgs_submission_tick,
            snapshot.overdue_since_tick,
        )
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// This hash is used to verify that a checkpoint's config matches
/// the config used to restore it.
///
/// Uses canonical JSON serialization with sorted keys to ensure
/// deterministic hashing regardless of HashMap iteration order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    // First serialize to serde_json::Value
    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    // Recursively sort all object keys for canonical representation
    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                // Convert HashMap to BTreeMap (sorted keys)
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let canonical_value = canonicalize(value);

    // Serialize to JSON string (now with sorted keys)
    let json = serde_json::to_string(&canonical_value).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    // Compute SHA256 hash
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let result = hasher.finalize();

    Ok(format!("{:x}", result))
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validate state snapshot integrity
///
/// Checks critical invariants:
/// - Balance conservation
/// - Transaction referential integrity
/// - Queue uniqueness (no duplicates)
pub fn validate_snapshot(
    snapshot: &StateSnapshot,
    expected_total_balance: i64,
) -> Result<(), SimulationError> {
    // 1. Balance conservation
    let total_balance: i64 = snapshot.agents.iter().map(|a| a.balance).sum();
    if total_balance != expected_total_balance {
        return Err(SimulationError::StateValidationError(format!(
            "Balance conservation violated: expected {}, got {}",
            expected_total_balance, total_balance
        )));
    }

    // 2. Transaction referential integrity
    let tx_ids: HashMap<_, _> = snapshot
        .transactions
        .iter()
        .map(|t| (t.id.clone(), ()))
        .collect();

    // Check Queue 1 (agent queues)
    for agent in &snapshot.agents {
        for tx_id in &agent.outgoing_queue {
            if !tx_ids.contains_key(tx_id) {
                return Err(SimulationError::StateValidationError(format!(
                    "Orphaned transaction in agent {} queue: {}",
                    agent.id, tx_id
                )));
            }
        }
    }

    // Check Queue 2 (RTGS queue)
    for tx_id in &snapshot.rtgs_queue {
        if !tx_ids.contains_key(tx_id) {
            return Err(SimulationError::StateValidationError(format!(
                "Orphaned transaction in RTGS queue: {}",
                tx_id
            )));
        }
    }

    // 3. Queue uniqueness (no transaction in multiple queues)
    let mut seen = HashMap::new();
    for agent in &snapshot.agents {
        for tx_id in &agent.outgoing_queue {
            if let Some(prev_location) = seen.insert(tx_id.clone(), format!("agent {}", agent.id)) {
                return Err(SimulationError::StateValidationError(format!(
                    "Duplicate transaction {} in multiple queues: {} and agent {}",
                    tx_id, prev_location, agent.id
                )));
            }
        }
    }

    for tx_id in &snapshot.rtgs_queue {
        if let Some(prev_location) = seen.insert(tx_id.clone(), "RTGS queue".to_string()) {
            return Err(SimulationError::StateValidationError(format!(
                "Duplicate transaction {} in multiple queues: {} and RTGS queue",
                tx_id, prev_location
            )));
        }
    }

    Ok(())
}
