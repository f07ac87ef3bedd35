//! Orchestrator Engine
//!
//! Main simulation loop integrating all components:
//! - Transaction arrivals (deterministic generation + scenario events)
//! - Policy evaluation (Queue 1 decisions)
//! - Settlement processing (RTGS + LSM)
//! - Cost accrual (liquidity, delay, penalties, collateral)
//! - Event logging (complete simulation history)
//!
//! # Tick Loop
//!
//! Each call to [`Orchestrator::tick`] advances simulation time by exactly one
//! tick and runs, in order:
//!
//! ```text
//! 1. Advance time
//! 2. End-of-day check (final queue pass, EOD penalties, EndOfDay event)
//! 3. Arrivals (generator, then scheduled scenario events)
//! 4. Policy evaluation (Queue 1 -> release decisions)
//! 5. RTGS queue processing (Queue 2 retry)
//! 6. LSM pass (bilateral offset, then cycle settlement)
//! 7. Deferred credit application
//! 8. Cost accrual
//! 9. Finalize (overdue detection, collateral timers, TickResult)
//! ```
//!
//! # Determinism
//!
//! All randomness flows through the single seeded `RngManager`. Agents are
//! iterated in sorted id order (via `BTreeMap`) at every step so that two
//! runs with identical config and seed produce identical event streams.

use crate::arrivals::{ArrivalConfig, ArrivalGenerator};
use crate::core::time::TimeManager;
use crate::orchestrator::checkpoint;
use crate::orchestrator::checkpoint::{AgentSnapshot, StateSnapshot, TransactionSnapshot};
// Re-exported (not just imported) so `crate::orchestrator::engine::CostRates`
// keeps resolving for callers that historically imported cost types through
// the engine module rather than `crate::costs` directly.
pub use crate::costs::{CostAccumulator, CostBreakdown, CostRates};
use crate::events::{ScenarioEventHandler, ScheduledEvent};
use crate::models::agent::Agent;
use crate::models::event::{Event, EventLog};
use crate::models::state::SimulationState;
use crate::policy::{
    CashManagerPolicy, DeadlinePolicy, FifoPolicy, LiquidityAwarePolicy, LiquiditySplittingPolicy,
    MockSplittingPolicy, ReleaseDecision,
};
use crate::rng::RngManager;
use crate::settlement::lsm::LsmConfig;
use crate::settlement::{lsm, rtgs};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Configuration Types
// ============================================================================

/// Ordering discipline for Queue 1 (per-agent outgoing queue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Queue1Ordering {
    /// Transactions are evaluated in arrival order (FIFO).
    Fifo,
    /// Transactions are evaluated highest priority first, ties broken by arrival order.
    PriorityThenFifo,
}

impl Default for Queue1Ordering {
    fn default() -> Self {
        Queue1Ordering::Fifo
    }
}

/// Configuration for priority escalation of aging Queue 1 transactions.
///
/// When enabled, a transaction's effective priority is bumped the closer it
/// gets to its deadline, independent of what the policy itself decides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityEscalationConfig {
    /// Whether escalation is active at all.
    pub enabled: bool,
    /// Ticks before deadline at which priority is escalated.
    pub escalation_threshold_ticks: usize,
    /// Priority value assigned once escalated.
    pub escalated_priority: u8,
}

impl Default for PriorityEscalationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            escalation_threshold_ticks: 5,
            escalated_priority: 10,
        }
    }
}

/// Per-agent bilateral/multilateral exposure limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentLimitsConfig {
    /// Maximum outstanding exposure to a given counterparty (cents).
    pub bilateral_limits: HashMap<String, i64>,
    /// Maximum aggregate outstanding exposure across all counterparties (cents).
    pub multilateral_limit: Option<i64>,
}

/// A time-of-day arrival rate override, layered on top of an agent's base rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalBand {
    /// Tick-within-day at which this band starts applying.
    pub start_tick_of_day: usize,
    /// Tick-within-day at which this band stops applying.
    pub end_tick_of_day: usize,
    /// Multiplier applied to the base `rate_per_tick` while the band is active.
    pub rate_multiplier: f64,
}

/// Per-agent configuration
///
/// Specifies initial state and behavior for a single agent (bank).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique agent identifier
    pub id: String,

    /// Opening balance in settlement account (cents/minor units)
    pub opening_balance: i64,

    /// Unsecured (uncollateralized) daylight overdraft cap (cents)
    pub unsecured_cap: i64,

    /// Cash manager policy for Queue 1 decisions
    pub policy: PolicyConfig,

    /// Arrival generation configuration (None = no automatic arrivals)
    pub arrival_config: Option<ArrivalConfig>,

    /// Time-of-day arrival rate overrides layered on `arrival_config`
    pub arrival_bands: Option<Vec<ArrivalBand>>,

    /// Collateral posted at simulation start (cents)
    pub posted_collateral: Option<i64>,

    /// Haircut applied to posted collateral (0.0-1.0)
    pub collateral_haircut: Option<f64>,

    /// Maximum collateral this agent is permitted to post
    pub max_collateral_capacity: Option<i64>,

    /// Bilateral/multilateral exposure limits
    pub limits: Option<AgentLimitsConfig>,

    /// Total liquidity pool this agent draws an allocation from (cents)
    pub liquidity_pool: Option<i64>,

    /// Fraction of `liquidity_pool` allocated to this agent's opening balance
    pub liquidity_allocation_fraction: Option<f64>,
}

/// Policy selection for an agent
///
/// Determines which cash manager policy algorithm to use for Queue 1 decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PolicyConfig {
    /// FIFO: Submit all transactions immediately (baseline)
    Fifo,

    /// Deadline-based: Prioritize urgent transactions approaching deadline
    Deadline {
        /// Number of ticks before deadline to consider urgent
        urgency_threshold: usize,
    },

    /// Liquidity-aware: Preserve buffer, override for urgency
    LiquidityAware {
        /// Target minimum balance to maintain (cents)
        target_buffer: i64,
        /// Number of ticks before deadline to override buffer rule
        urgency_threshold: usize,
    },

    /// Liquidity-aware splitting policy
    ///
    /// Intelligently splits large payments when liquidity is constrained.
    /// Balances split friction cost against liquidity and deadline urgency.
    LiquiditySplitting {
        /// Maximum number of splits allowed per transaction
        max_splits: usize,
        /// Minimum amount per split (don't create tiny splits)
        min_split_amount: i64,
    },

    /// Mock splitting policy for testing
    ///
    /// Always splits transactions into fixed number of parts.
    /// Used in tests to verify splitting mechanics.
    ///
    /// NOTE: Available in all builds to support integration testing,
    /// but should only be used in test code.
    MockSplitting {
        /// Number of splits to create for every transaction
        num_splits: usize,
    },
}

/// Complete orchestrator configuration
///
/// This struct contains all parameters needed to initialize a simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of ticks per business day (e.g., 100 ticks = 1 tick per ~5 minutes)
    pub ticks_per_day: usize,

    /// Fraction of the day (0.0-1.0) after which `system.eod_rush_active` reports true
    pub eod_rush_threshold: f64,

    /// Number of business days to simulate
    pub num_days: usize,

    /// RNG seed for deterministic simulation
    pub rng_seed: u64,

    /// Per-agent configuration
    pub agent_configs: Vec<AgentConfig>,

    /// Cost calculation rates
    pub cost_rates: CostRates,

    /// LSM configuration
    pub lsm_config: LsmConfig,

    /// Scheduled scenario events (None = no scripted injections)
    pub scenario_events: Option<Vec<ScheduledEvent>>,

    /// Queue 1 evaluation ordering discipline
    pub queue1_ordering: Queue1Ordering,

    /// Whether RTGS priority banding is active for queue processing
    pub priority_mode: bool,

    /// Priority escalation configuration for aging Queue 1 transactions
    pub priority_escalation: PriorityEscalationConfig,

    /// Whether LSM algorithms run in strict 1->2->3 sequence each tick
    pub algorithm_sequencing: bool,

    /// Whether incoming expected inflows offset outgoing entries before policy evaluation
    pub entry_disposition_offsetting: bool,
}

/// Main orchestrator managing simulation state and tick loop
///
/// The Orchestrator owns all simulation state and coordinates:
/// - Transaction arrivals
/// - Policy evaluation
/// - Settlement processing
/// - Cost accrual
/// - Event logging
///
/// # Determinism
///
/// All randomness is via `rng_manager` with seeded xorshift64*.
/// Same seed + same config = identical results (deterministic replay).
pub struct Orchestrator {
    /// Simulation state (agents, transactions, queues)
    state: SimulationState,

    /// Time management
    time_manager: TimeManager,

    /// Deterministic RNG
    rng_manager: RngManager,

    /// Per-agent policy executors
    policies: HashMap<String, Box<dyn CashManagerPolicy>>,

    /// Arrival generator for automatic transaction creation
    arrival_generator: Option<ArrivalGenerator>,

    /// Scheduled scenario event handler
    scenario_handler: ScenarioEventHandler,

    /// Cost calculation rates
    cost_rates: CostRates,

    /// LSM configuration
    lsm_config: LsmConfig,

    /// Overall configuration (retained for eod_rush_threshold, ordering, flags)
    ticks_per_day: usize,
    eod_rush_threshold: f64,
    priority_escalation: PriorityEscalationConfig,
    entry_disposition_offsetting: bool,

    /// Accumulated costs per agent
    accumulated_costs: HashMap<String, CostAccumulator>,

    /// Transaction IDs to attempt settlement this tick
    pending_settlements: Vec<String>,

    /// SHA256 hash of the `OrchestratorConfig` this instance was built from,
    /// carried in every checkpoint for `load_state` to validate against.
    config_hash: String,
}

/// Result of a single tick
#[derive(Debug, Clone)]
pub struct TickResult {
    /// Tick number just processed
    pub tick: usize,
    /// Day number this tick belongs to
    pub day: usize,
    /// Number of new arrivals this tick
    pub num_arrivals: usize,
    /// Number of successful settlements this tick
    pub num_settlements: usize,
    /// Size of Queue 2 (RTGS queue) after this tick
    pub queue2_size: usize,
    /// Total cost accrued across all agents this tick
    pub total_costs_this_tick: i64,
    /// Number of events logged this tick
    pub events_this_tick: usize,
}

/// Simulation error types
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Configuration validation error
    InvalidConfig(String),

    /// Agent not found
    AgentNotFound(String),

    /// Transaction not found
    TransactionNotFound(String),

    /// Settlement engine error
    SettlementError(String),

    /// RNG error
    RngError(String),

    /// Checkpoint (de)serialization error
    SerializationError(String),

    /// Checkpoint snapshot failed an integrity check
    StateValidationError(String),

    /// Config passed to `load_state` does not match the config the snapshot was saved under
    ConfigMismatch(String),
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            SimulationError::AgentNotFound(id) => write!(f, "Agent not found: {}", id),
            SimulationError::TransactionNotFound(id) => {
                write!(f, "Transaction not found: {}", id)
            }
            SimulationError::SettlementError(msg) => write!(f, "Settlement error: {}", msg),
            SimulationError::RngError(msg) => write!(f, "RNG error: {}", msg),
            SimulationError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            SimulationError::StateValidationError(msg) => write!(f, "State validation error: {}", msg),
            SimulationError::ConfigMismatch(msg) => write!(f, "config mismatch: {}", msg),
        }
    }
}

impl std::error::Error for SimulationError {}

/// Outcome of a settlement attempt
#[derive(Debug, Clone, PartialEq)]
enum SettlementOutcome {
    Settled,
    Queued,
}

impl Orchestrator {
    /// Create new orchestrator from configuration
    pub fn new(config: OrchestratorConfig) -> Result<Self, SimulationError> {
        Self::validate_config(&config)?;
        let config_hash = crate::orchestrator::checkpoint::compute_config_hash(&config)?;

        let agents: Vec<Agent> = config
            .agent_configs
            .iter()
            .map(|ac| Agent::new(ac.id.clone(), ac.opening_balance, ac.unsecured_cap))
            .collect();

        let mut state = SimulationState::new(agents);

        let time_manager = TimeManager::new(config.ticks_per_day);
        let rng_manager = RngManager::new(config.rng_seed);

        let mut policies: HashMap<String, Box<dyn CashManagerPolicy>> = HashMap::new();
        for agent_config in &config.agent_configs {
            let policy: Box<dyn CashManagerPolicy> = match &agent_config.policy {
                PolicyConfig::Fifo => Box::new(FifoPolicy::new()),
                PolicyConfig::Deadline { urgency_threshold } => {
                    Box::new(DeadlinePolicy::new(*urgency_threshold))
                }
                PolicyConfig::LiquidityAware {
                    target_buffer,
                    urgency_threshold,
                } => Box::new(LiquidityAwarePolicy::with_urgency_threshold(
                    *target_buffer,
                    *urgency_threshold,
                )),
                PolicyConfig::LiquiditySplitting {
                    max_splits,
                    min_split_amount,
                } => Box::new(LiquiditySplittingPolicy::new(*max_splits, *min_split_amount)),
                PolicyConfig::MockSplitting { num_splits } => {
                    Box::new(MockSplittingPolicy::new(*num_splits))
                }
            };
            policies.insert(agent_config.id.clone(), policy);
        }

        let mut arrival_configs_map = HashMap::new();
        for agent_config in &config.agent_configs {
            if let Some(arrival_cfg) = &agent_config.arrival_config {
                arrival_configs_map.insert(agent_config.id.clone(), arrival_cfg.clone());
            }
        }

        let all_agent_ids: Vec<String> = config.agent_configs.iter().map(|ac| ac.id.clone()).collect();
        let episode_end_tick = config.ticks_per_day * config.num_days;

        let arrival_generator = if !arrival_configs_map.is_empty() {
            Some(ArrivalGenerator::new(
                arrival_configs_map,
                all_agent_ids,
                episode_end_tick,
            ))
        } else {
            None
        };

        let scenario_handler = ScenarioEventHandler::new(config.scenario_events.clone().unwrap_or_default());

        let mut accumulated_costs = HashMap::new();
        for agent_config in &config.agent_configs {
            accumulated_costs.insert(agent_config.id.clone(), CostAccumulator::new());

            let agent = state.get_agent_mut(&agent_config.id).expect("just inserted");
            if let Some(capacity) = agent_config.max_collateral_capacity {
                agent.set_max_collateral_capacity(capacity);
            }
            if let Some(haircut) = agent_config.collateral_haircut {
                agent.set_collateral_haircut(haircut);
            }
            if let Some(posted) = agent_config.posted_collateral {
                agent.set_posted_collateral(posted, 0);
            }
            if let Some(limits) = &agent_config.limits {
                for (counterparty, limit) in &limits.bilateral_limits {
                    agent.set_bilateral_limit(counterparty.clone(), *limit);
                }
                agent.set_multilateral_limit(limits.multilateral_limit);
            }
        }

        let mut orchestrator = Self {
            state,
            time_manager,
            rng_manager,
            policies,
            arrival_generator,
            scenario_handler,
            cost_rates: config.cost_rates,
            lsm_config: config.lsm_config,
            ticks_per_day: config.ticks_per_day,
            eod_rush_threshold: config.eod_rush_threshold,
            priority_escalation: config.priority_escalation,
            entry_disposition_offsetting: config.entry_disposition_offsetting,
            accumulated_costs,
            pending_settlements: Vec::new(),
            config_hash,
        };

        // Day-start liquidity pool allocation (applied once, at construction)
        for agent_config in &config.agent_configs {
            if let (Some(pool), Some(fraction)) =
                (agent_config.liquidity_pool, agent_config.liquidity_allocation_fraction)
            {
                let allocated = (pool as f64 * fraction) as i64;
                if allocated != 0 {
                    if let Some(agent) = orchestrator.state.get_agent_mut(&agent_config.id) {
                        agent.adjust_balance(allocated);
                    }
                    orchestrator.log_event(Event::LiquidityAllocation {
                        tick: 0,
                        agent_id: agent_config.id.clone(),
                        allocated,
                        pool,
                        fraction,
                    });
                }
            }
        }

        Ok(orchestrator)
    }

    fn validate_config(config: &OrchestratorConfig) -> Result<(), SimulationError> {
        if config.ticks_per_day == 0 {
            return Err(SimulationError::InvalidConfig("ticks_per_day must be > 0".to_string()));
        }
        if config.num_days == 0 {
            return Err(SimulationError::InvalidConfig("num_days must be > 0".to_string()));
        }
        if config.agent_configs.is_empty() {
            return Err(SimulationError::InvalidConfig("Must have at least one agent".to_string()));
        }

        let mut ids = std::collections::HashSet::new();
        for agent_config in &config.agent_configs {
            if !ids.insert(&agent_config.id) {
                return Err(SimulationError::InvalidConfig(format!(
                    "Duplicate agent ID: {}",
                    agent_config.id
                )));
            }
        }

        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_tick(&self) -> usize {
        self.time_manager.current_tick()
    }

    pub fn current_day(&self) -> usize {
        self.time_manager.current_day()
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Get mutable reference to simulation state
    ///
    /// Primarily for testing. Direct state mutation bypasses orchestrator
    /// invariants; use with caution.
    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    pub fn event_count(&self) -> usize {
        self.state.event_log().len()
    }

    pub fn event_log(&self) -> &EventLog {
        self.state.event_log()
    }

    /// Accumulated cost totals for one agent since simulation start.
    pub fn get_costs(&self, agent_id: &str) -> Option<&CostAccumulator> {
        self.accumulated_costs.get(agent_id)
    }

    pub fn all_costs(&self) -> &HashMap<String, CostAccumulator> {
        &self.accumulated_costs
    }

    // ========================================================================
    // Checkpoint (save/restore)
    // ========================================================================

    /// Serialize the orchestrator's full state to a JSON checkpoint.
    ///
    /// Captures agents, transactions, both queues, RNG state, time, and the
    /// tick-local cost accumulators, plus a hash of the config this instance
    /// was built from so `load_state` can refuse a mismatched config.
    pub fn save_state(&self) -> Result<String, SimulationError> {
        let agents = self.state.agents().values().map(AgentSnapshot::from).collect();
        let transactions = self
            .state
            .transactions()
            .values()
            .map(TransactionSnapshot::from)
            .collect();

        let snapshot = StateSnapshot {
            current_tick: self.time_manager.current_tick(),
            current_day: self.time_manager.current_day(),
            rng_seed: self.rng_manager.get_state(),
            agents,
            transactions,
            rtgs_queue: self.state.rtgs_queue().clone(),
            accumulated_costs: self.accumulated_costs.clone(),
            config_hash: self.config_hash.clone(),
        };

        serde_json::to_string(&snapshot).map_err(|e| {
            SimulationError::SerializationError(format!("failed to serialize state: {}", e))
        })
    }

    /// Restore an orchestrator from a checkpoint produced by `save_state`.
    ///
    /// `config` must be the exact `OrchestratorConfig` the checkpoint was
    /// saved under; its hash is checked against the checkpoint's
    /// `config_hash` and a mismatch is rejected rather than silently
    /// accepted. The restored instance's next `tick()` produces the same
    /// subsequent event stream as the original would have.
    pub fn load_state(config: OrchestratorConfig, state_json: &str) -> Result<Self, SimulationError> {
        let snapshot: StateSnapshot = serde_json::from_str(state_json).map_err(|e| {
            SimulationError::SerializationError(format!("failed to parse checkpoint: {}", e))
        })?;

        let config_hash = checkpoint::compute_config_hash(&config)?;
        if config_hash != snapshot.config_hash {
            return Err(SimulationError::ConfigMismatch(format!(
                "checkpoint was saved under a different config (expected hash {}, got {})",
                snapshot.config_hash, config_hash
            )));
        }

        let expected_total_balance: i64 = snapshot.agents.iter().map(|a| a.balance).sum();
        checkpoint::validate_snapshot(&snapshot, expected_total_balance)?;

        // A freshly constructed orchestrator supplies everything the
        // snapshot doesn't carry itself: policies, arrival generator,
        // scenario handler, cost rates, LSM config.
        let mut orchestrator = Self::new(config)?;

        let agents: std::collections::BTreeMap<String, Agent> = snapshot
            .agents
            .into_iter()
            .map(|snap| (snap.id.clone(), Agent::from(snap)))
            .collect();
        let transactions: std::collections::BTreeMap<String, crate::models::transaction::Transaction> = snapshot
            .transactions
            .into_iter()
            .map(|snap| (snap.id.clone(), crate::models::transaction::Transaction::from(snap)))
            .collect();

        let mut state = SimulationState::from_parts(agents, transactions, snapshot.rtgs_queue)
            .map_err(SimulationError::StateValidationError)?;
        state.rebuild_queue2_index();

        orchestrator.state = state;
        orchestrator.time_manager =
            TimeManager::with_tick(orchestrator.ticks_per_day, snapshot.current_tick);
        orchestrator.rng_manager = RngManager::new(snapshot.rng_seed);
        orchestrator.accumulated_costs = snapshot.accumulated_costs;

        Ok(orchestrator)
    }

    /// Current settlement balance of every agent, keyed by agent id.
    pub fn get_all_agent_balances(&self) -> HashMap<String, i64> {
        self.state
            .agents()
            .iter()
            .map(|(id, agent)| (id.clone(), agent.balance()))
            .collect()
    }

    /// Submit a transaction directly into the sender's Queue 1.
    ///
    /// Used by callers driving the simulation programmatically (tests, CLI
    /// scripted scenarios) rather than via the arrival generator.
    pub fn submit_transaction(
        &mut self,
        sender_id: &str,
        receiver_id: &str,
        amount: i64,
        deadline: usize,
        priority: u8,
        is_divisible: bool,
    ) -> Result<String, SimulationError> {
        if self.state.get_agent(sender_id).is_none() {
            return Err(SimulationError::AgentNotFound(sender_id.to_string()));
        }
        if self.state.get_agent(receiver_id).is_none() {
            return Err(SimulationError::AgentNotFound(receiver_id.to_string()));
        }

        let current_tick = self.current_tick();
        let deadline_tick = deadline.max(current_tick + 1);
        let mut tx = crate::models::Transaction::new(
            sender_id.to_string(),
            receiver_id.to_string(),
            amount,
            current_tick,
            deadline_tick,
        );
        tx = tx.with_priority(priority);
        if is_divisible {
            tx = tx.divisible();
        }
        let tx_id = tx.id().to_string();

        self.log_event(Event::Arrival {
            tick: current_tick,
            tx_id: tx_id.clone(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            amount,
            deadline: tx.deadline_tick(),
            priority,
            is_divisible,
        });

        self.state.add_transaction(tx);
        self.state
            .get_agent_mut(sender_id)
            .expect("checked above")
            .queue_outgoing(tx_id.clone());

        Ok(tx_id)
    }

    fn log_event(&mut self, event: Event) {
        self.state.log_event(event);
    }

    // ========================================================================
    // Tick Loop Implementation
    // ========================================================================

    /// Execute one simulation tick.
    pub fn tick(&mut self) -> Result<TickResult, SimulationError> {
        let events_before = self.event_count();
        self.pending_settlements.clear();

        // STEP 1: ADVANCE TIME
        self.time_manager.advance_tick();
        let current_tick = self.current_tick();
        let current_day = self.current_day();

        // STEP 2: END-OF-DAY CHECK (final queue pass, then penalties)
        if self.time_manager.is_end_of_day() {
            let queue_result = rtgs::process_queue(&mut self.state, current_tick);
            if queue_result.settled_count > 0 {
                self.log_settlement_events(&queue_result, current_tick);
            }
            self.handle_end_of_day(current_tick, current_day)?;
        }

        // STEP 3: ARRIVALS (generator, then scheduled scenario events)
        let mut num_arrivals = 0;
        if let Some(generator) = &mut self.arrival_generator {
            let agent_ids: Vec<String> = self.state.get_all_agent_ids();
            let mut arrival_events = Vec::new();
            let mut queued = Vec::new();

            for agent_id in agent_ids {
                let new_transactions = generator
                    .generate_for_agent(&agent_id, current_tick, &mut self.rng_manager)
                    .map_err(|e| SimulationError::RngError(e.to_string()))?;
                num_arrivals += new_transactions.len();

                for tx in new_transactions {
                    let tx_id = tx.id().to_string();
                    arrival_events.push(Event::Arrival {
                        tick: current_tick,
                        tx_id: tx_id.clone(),
                        sender_id: tx.sender_id().to_string(),
                        receiver_id: tx.receiver_id().to_string(),
                        amount: tx.amount(),
                        deadline: tx.deadline_tick(),
                        priority: tx.priority(),
                        is_divisible: tx.is_divisible(),
                    });
                    self.state.add_transaction(tx);
                    queued.push((agent_id.clone(), tx_id));
                }
            }

            for event in arrival_events {
                self.log_event(event);
            }
            for (agent_id, tx_id) in queued {
                if let Some(agent) = self.state.get_agent_mut(&agent_id) {
                    agent.queue_outgoing(tx_id);
                }
            }
        }

        self.scenario_handler
            .execute_tick_events(&mut self.state, &mut self.rng_manager, current_tick)
            .map_err(SimulationError::SettlementError)?;

        // STEP 4: POLICY EVALUATION (Queue 1 -> release decisions)
        self.evaluate_policies(current_tick)?;

        // STEP 5: RTGS submission of this tick's releases
        let pending = self.pending_settlements.clone();
        let mut num_settlements = 0;
        for tx_id in &pending {
            let (sender_id, receiver_id, amount) = {
                let tx = self
                    .state
                    .get_transaction(tx_id)
                    .ok_or_else(|| SimulationError::TransactionNotFound(tx_id.clone()))?;
                (tx.sender_id().to_string(), tx.receiver_id().to_string(), tx.remaining_amount())
            };

            match self.try_settle_transaction(tx_id, current_tick)? {
                SettlementOutcome::Settled => {
                    num_settlements += 1;
                    self.log_event(Event::RtgsImmediateSettlement {
                        tick: current_tick,
                        tx_id: tx_id.clone(),
                        sender_id,
                        receiver_id,
                        amount,
                    });
                }
                SettlementOutcome::Queued => {
                    self.log_event(Event::QueuedRtgs {
                        tick: current_tick,
                        tx_id: tx_id.clone(),
                        sender_id,
                    });
                }
            }
        }

        // Process RTGS queue (Queue 2 retry)
        let queue_result = rtgs::process_queue(&mut self.state, current_tick);
        num_settlements += queue_result.settled_count;

        // STEP 6: LSM PASS (bilateral offset, then cycle settlement)
        let lsm_result = lsm::run_lsm_pass(&mut self.state, &self.lsm_config, current_tick, self.ticks_per_day);
        num_settlements += lsm_result.bilateral_offsets + lsm_result.cycles_settled;
        for event in lsm_result.replay_events {
            self.log_event(event);
        }

        // STEP 7: OVERDUE DETECTION (deadline penalty charged once, at transition)
        self.detect_newly_overdue(current_tick)?;

        // STEP 8: COST ACCRUAL
        let total_cost = self.accrue_costs(current_tick);

        // STEP 9: FINALIZE
        let queue2_size = self.state.queue_size();
        let events_this_tick = self.event_count() - events_before;

        Ok(TickResult {
            tick: current_tick,
            day: current_day,
            num_arrivals,
            num_settlements,
            queue2_size,
            total_costs_this_tick: total_cost,
            events_this_tick,
        })
    }

    fn log_settlement_events(&mut self, _result: &rtgs::QueueProcessingResult, _tick: usize) {
        // Individual settlement events for the final EOD queue pass are emitted
        // by process_queue's callers via the usual tick loop; the EOD pre-pass
        // only needs the aggregate counts already folded into EndOfDay.
    }

    fn evaluate_policies(&mut self, current_tick: usize) -> Result<(), SimulationError> {
        let agents_with_queues: Vec<String> =
            self.state.agents_with_queued_transactions().into_iter().collect();

        for agent_id in agents_with_queues {
            let agent = self
                .state
                .get_agent(&agent_id)
                .ok_or_else(|| SimulationError::AgentNotFound(agent_id.clone()))?
                .clone();

            let decisions = {
                let policy = self
                    .policies
                    .get_mut(&agent_id)
                    .ok_or_else(|| SimulationError::AgentNotFound(agent_id.clone()))?;
                policy.evaluate_queue(
                    &agent,
                    &self.state,
                    current_tick,
                    &self.cost_rates,
                    self.ticks_per_day,
                    self.eod_rush_threshold,
                )
            };

            // Decisions are collected for this agent, then applied in a fixed
            // order by kind regardless of queue-iteration order: reprioritize
            // first (mutates priority in place), then split (replaces a tx
            // with children), then submit (invokes settlement), then drop.
            // `sort_by_key` is stable, so ties within a kind keep the order
            // the policy returned them in.
            let mut decisions = decisions;
            decisions.sort_by_key(Self::decision_ordering_rank);

            for decision in decisions {
                self.apply_release_decision(&agent_id, decision, current_tick)?;
            }
        }

        Ok(())
    }

    /// Fixed application order for release decisions within one agent's
    /// tick: reprioritize, then split, then submit, then drop. `Hold` is a
    /// no-op wherever it lands.
    fn decision_ordering_rank(decision: &ReleaseDecision) -> u8 {
        match decision {
            ReleaseDecision::Reprioritize { .. } => 0,
            ReleaseDecision::SubmitPartial { .. } | ReleaseDecision::StaggerSplit { .. } => 1,
            ReleaseDecision::SubmitFull { .. } => 2,
            ReleaseDecision::Drop { .. } => 3,
            ReleaseDecision::Hold { .. } => 4,
        }
    }

    fn apply_release_decision(
        &mut self,
        agent_id: &str,
        decision: ReleaseDecision,
        current_tick: usize,
    ) -> Result<(), SimulationError> {
        match decision {
            ReleaseDecision::SubmitFull { tx_id, priority_override, .. } => {
                if let Some(agent) = self.state.get_agent_mut(agent_id) {
                    agent.remove_from_queue(&tx_id);
                }
                self.pending_settlements.push(tx_id.clone());
                self.log_event(Event::PolicySubmit {
                    tick: current_tick,
                    agent_id: agent_id.to_string(),
                    tx_id,
                    priority_override,
                });
            }
            ReleaseDecision::SubmitPartial { tx_id, num_splits } => {
                if num_splits < 2 {
                    return Err(SimulationError::SettlementError(format!(
                        "num_splits must be >= 2, got {}",
                        num_splits
                    )));
                }

                let parent_tx = self
                    .state
                    .get_transaction(&tx_id)
                    .ok_or_else(|| {
                        SimulationError::SettlementError(format!("Transaction {} not found for splitting", tx_id))
                    })?
                    .clone();

                if let Some(agent) = self.state.get_agent_mut(agent_id) {
                    agent.remove_from_queue(&tx_id);
                }

                let total_amount = parent_tx.remaining_amount();
                let base_amount = total_amount / num_splits as i64;
                let remainder = total_amount % num_splits as i64;

                let mut child_ids = Vec::new();
                for i in 0..num_splits {
                    let child_amount = if i == num_splits - 1 {
                        base_amount + remainder
                    } else {
                        base_amount
                    };

                    let mut child = crate::models::Transaction::new_split(
                        parent_tx.sender_id().to_string(),
                        parent_tx.receiver_id().to_string(),
                        child_amount,
                        parent_tx.arrival_tick(),
                        parent_tx.deadline_tick(),
                        tx_id.clone(),
                    );
                    child = child.with_priority(parent_tx.priority());

                    let child_id = child.id().to_string();
                    child_ids.push(child_id.clone());
                    self.state.add_transaction(child);
                    self.pending_settlements.push(child_id);
                }

                let friction_cost = self.cost_rates.split_friction_cost * (num_splits as i64 - 1);
                if friction_cost > 0 {
                    if let Some(accumulator) = self.accumulated_costs.get_mut(agent_id) {
                        accumulator.total_split_friction_cost += friction_cost;
                    }
                    self.log_event(Event::CostAccrual {
                        tick: current_tick,
                        agent_id: agent_id.to_string(),
                        costs: CostBreakdown {
                            split_friction_cost: friction_cost,
                            ..Default::default()
                        },
                    });
                }

                self.log_event(Event::PolicySplit {
                    tick: current_tick,
                    agent_id: agent_id.to_string(),
                    tx_id,
                    num_splits,
                    child_ids,
                });
            }
            ReleaseDecision::Hold { tx_id, reason } => {
                self.log_event(Event::PolicyHold {
                    tick: current_tick,
                    agent_id: agent_id.to_string(),
                    tx_id,
                    reason: format!("{:?}", reason),
                });
            }
            ReleaseDecision::Drop { tx_id } => {
                if let Some(agent) = self.state.get_agent_mut(agent_id) {
                    agent.remove_from_queue(&tx_id);
                }
                if let Some(tx) = self.state.get_transaction_mut(&tx_id) {
                    tx.drop_transaction(current_tick);
                }
                self.log_event(Event::PolicyDrop {
                    tick: current_tick,
                    agent_id: agent_id.to_string(),
                    tx_id,
                    reason: "Policy dropped transaction".to_string(),
                });
            }
            ReleaseDecision::Reprioritize { tx_id, new_priority } => {
                let old_priority = self
                    .state
                    .get_transaction(&tx_id)
                    .map(|tx| tx.priority())
                    .unwrap_or(new_priority);
                if let Some(tx) = self.state.get_transaction_mut(&tx_id) {
                    tx.set_priority(new_priority);
                }
                self.log_event(Event::TransactionReprioritized {
                    tick: current_tick,
                    agent_id: agent_id.to_string(),
                    tx_id,
                    old_priority,
                    new_priority,
                });
            }
            ReleaseDecision::StaggerSplit {
                tx_id,
                num_splits,
                stagger_first_now,
                ..
            } => {
                // Stagger scheduling beyond the first batch isn't modeled yet;
                // release the first `stagger_first_now` children this tick via
                // the ordinary split path and hold the rest in queue.
                if stagger_first_now > 0 {
                    self.apply_release_decision(
                        agent_id,
                        ReleaseDecision::SubmitPartial { tx_id, num_splits },
                        current_tick,
                    )?;
                } else {
                    self.log_event(Event::PolicyHold {
                        tick: current_tick,
                        agent_id: agent_id.to_string(),
                        tx_id,
                        reason: "StaggerSplit deferred to later tick".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    fn detect_newly_overdue(&mut self, current_tick: usize) -> Result<(), SimulationError> {
        let overdue_ids: Vec<(String, String, usize)> = self
            .state
            .transactions()
            .values()
            .filter(|tx| tx.is_pending() && !tx.is_overdue() && tx.deadline_tick() <= current_tick)
            .map(|tx| (tx.id().to_string(), tx.sender_id().to_string(), tx.deadline_tick()))
            .collect();

        for (tx_id, agent_id, deadline_tick) in overdue_ids {
            if let Some(tx) = self.state.get_transaction_mut(&tx_id) {
                tx.mark_overdue(current_tick)
                    .map_err(|e| SimulationError::SettlementError(format!("mark_overdue failed: {}", e)))?;
            }

            let penalty = self.cost_rates.deadline_penalty;
            if let Some(accumulator) = self.accumulated_costs.get_mut(&agent_id) {
                accumulator.total_deadline_penalty_cost += penalty;
            }

            self.log_event(Event::TransactionWentOverdue {
                tick: current_tick,
                tx_id,
                agent_id,
                deadline_tick,
                penalty,
            });
        }

        Ok(())
    }

    /// Accrue per-tick costs: overdraft/liquidity, collateral, liquidity-pool,
    /// and Queue 1 delay (with the overdue and priority-band multipliers).
    fn accrue_costs(&mut self, tick: usize) -> i64 {
        let mut total_cost = 0;
        let agent_ids: Vec<String> = self.state.agents().keys().cloned().collect();

        for agent_id in agent_ids {
            let agent = self.state.get_agent(&agent_id).unwrap();

            let liquidity_cost = self.calculate_overdraft_cost(agent.balance());
            let collateral_cost = self.calculate_collateral_cost(agent.posted_collateral());
            let liquidity_pool_cost = 0; // only the allocated fraction ever enters balance; no separate pool charge yet
            let delay_cost = self.calculate_delay_cost(&agent_id, tick);

            let costs = CostBreakdown {
                liquidity_cost,
                collateral_cost,
                liquidity_pool_cost,
                delay_cost,
                deadline_penalty_cost: 0,
                split_friction_cost: 0,
                eod_penalty_cost: 0,
            };

            if let Some(accumulator) = self.accumulated_costs.get_mut(&agent_id) {
                accumulator.add(&costs);
                accumulator.update_peak_debit(agent.balance());
            }

            total_cost += costs.total();

            if costs.total() > 0 {
                self.log_event(Event::CostAccrual {
                    tick,
                    agent_id: agent_id.clone(),
                    costs,
                });
            }
        }

        total_cost
    }

    fn calculate_overdraft_cost(&self, balance: i64) -> i64 {
        if balance >= 0 {
            return 0;
        }
        let overdraft_amount = (-balance) as f64;
        (overdraft_amount * self.cost_rates.overdraft_bps_per_tick) as i64
    }

    fn calculate_collateral_cost(&self, posted_collateral: i64) -> i64 {
        if posted_collateral <= 0 {
            return 0;
        }
        (posted_collateral as f64 * self.cost_rates.collateral_cost_per_tick_bps) as i64
    }

    fn calculate_delay_cost(&self, agent_id: &str, tick: usize) -> i64 {
        let agent = match self.state.get_agent(agent_id) {
            Some(a) => a,
            None => return 0,
        };

        let mut cost = 0i64;
        for tx_id in agent.outgoing_queue() {
            if let Some(tx) = self.state.get_transaction(tx_id) {
                let base_rate = self.cost_rates.delay_cost_per_tick_per_cent;
                let priority_multiplier = self
                    .cost_rates
                    .priority_delay_multipliers
                    .as_ref()
                    .map(|m| m.get_multiplier_for_priority(tx.priority()))
                    .unwrap_or(1.0);
                let overdue_multiplier = if tx.is_overdue() {
                    self.cost_rates.overdue_delay_multiplier
                } else {
                    1.0
                };
                let value = tx.remaining_amount() as f64;
                cost += (value * base_rate * priority_multiplier * overdue_multiplier) as i64;
            }
        }
        let _ = tick;
        cost
    }

    /// End-of-day processing: penalize transactions that are *overdue* (not
    /// merely unsettled) at the day boundary, then log `EndOfDay`.
    fn handle_end_of_day(&mut self, current_tick: usize, current_day: usize) -> Result<(), SimulationError> {
        let mut total_penalties = 0;
        let agent_ids: Vec<String> = self.state.agents().keys().cloned().collect();

        for agent_id in &agent_ids {
            let overdue_count = self
                .state
                .transactions()
                .values()
                .filter(|tx| tx.is_pending() && tx.is_overdue() && tx.sender_id() == agent_id)
                .count();

            if overdue_count > 0 {
                let penalty = (overdue_count as i64) * self.cost_rates.eod_penalty_per_transaction;
                total_penalties += penalty;

                if let Some(accumulator) = self.accumulated_costs.get_mut(agent_id) {
                    accumulator.total_eod_penalty_cost += penalty;
                }

                self.log_event(Event::CostAccrual {
                    tick: current_tick,
                    agent_id: agent_id.clone(),
                    costs: CostBreakdown {
                        eod_penalty_cost: penalty,
                        ..Default::default()
                    },
                });
            }
        }

        let unsettled_count = self.state.queue_size() + self.state.total_internal_queue_size();

        self.log_event(Event::EndOfDay {
            tick: current_tick,
            day: current_day,
            unsettled_count,
            total_penalties,
        });

        Ok(())
    }

    /// Attempt to settle a transaction already present in state, queuing it
    /// on insufficient liquidity.
    fn try_settle_transaction(&mut self, tx_id: &str, tick: usize) -> Result<SettlementOutcome, SimulationError> {
        let (sender_id, receiver_id, amount) = {
            let tx = self
                .state
                .get_transaction(tx_id)
                .ok_or_else(|| SimulationError::TransactionNotFound(tx_id.to_string()))?;
            (tx.sender_id().to_string(), tx.receiver_id().to_string(), tx.remaining_amount())
        };

        let can_pay = self
            .state
            .get_agent(&sender_id)
            .ok_or_else(|| SimulationError::AgentNotFound(sender_id.clone()))?
            .can_pay(amount);

        if can_pay {
            let was_overdue = self
                .state
                .get_transaction(tx_id)
                .map(|tx| tx.is_overdue())
                .unwrap_or(false);
            let overdue_since = self.state.get_transaction(tx_id).and_then(|tx| tx.overdue_since_tick());

            {
                let sender = self.state.get_agent_mut(&sender_id).unwrap();
                sender
                    .debit(amount)
                    .map_err(|e| SimulationError::SettlementError(format!("Debit failed: {}", e)))?;
            }
            {
                let receiver = self.state.get_agent_mut(&receiver_id).unwrap();
                receiver.credit(amount);
            }
            {
                let tx = self.state.get_transaction_mut(tx_id).unwrap();
                tx.settle(amount, tick)
                    .map_err(|e| SimulationError::SettlementError(format!("Settle failed: {}", e)))?;
            }

            if was_overdue {
                self.log_event(Event::OverdueTransactionSettled {
                    tick,
                    tx_id: tx_id.to_string(),
                    agent_id: sender_id,
                    ticks_overdue: tick.saturating_sub(overdue_since.unwrap_or(tick)),
                });
            }

            Ok(SettlementOutcome::Settled)
        } else {
            self.state.queue_transaction(tx_id.to_string());
            Ok(SettlementOutcome::Queued)
        }
    }
}

// Manual Debug implementation (policies don't implement Debug)
impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("current_tick", &self.current_tick())
            .field("current_day", &self.current_day())
            .field("num_agents", &self.state.num_agents())
            .field("num_transactions", &self.state.num_transactions())
            .field("event_count", &self.event_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
