//! Event logging for simulation replay and auditing.
//!
//! This module defines the Event enum which captures all significant state changes
//! during simulation. Events enable:
//! - Deterministic replay (re-run simulation from event log)
//! - Debugging (understand what happened and when)
//! - Auditing (verify correctness of settlements)
//! - Analysis (extract metrics and patterns)
//!
//! Every event kind mirrors a state transition described by one of the
//! component designs (arrivals, policy, RTGS, LSM, costs, scenario events,
//! orchestrator). The event log is the sole replay medium: two runs driven
//! by identical configs and seeds must produce identical event sequences.
//!
//! # Example
//!
//! ```rust
//! use payment_simulator_core_rs::models::Event;
//!
//! let event = Event::Arrival {
//!     tick: 10,
//!     tx_id: "tx_00000042".to_string(),
//!     sender_id: "BANK_A".to_string(),
//!     receiver_id: "BANK_B".to_string(),
//!     amount: 100_000,
//!     deadline: 20,
//!     priority: 5,
//!     is_divisible: false,
//! };
//!
//! println!("Event at tick {}: {:?}", event.tick(), event);
//! ```

use crate::costs::CostBreakdown;

/// Simulation event capturing a state change.
///
/// All events include a tick number for temporal ordering.
/// Events are logged in the order they occur within a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// New transaction arrived (generated or injected by a scenario event)
    Arrival {
        tick: usize,
        tx_id: String,
        sender_id: String,
        receiver_id: String,
        amount: i64,
        deadline: usize,
        priority: u8,
        is_divisible: bool,
    },

    /// Policy decided to submit transaction from Queue 1 to settlement
    PolicySubmit {
        tick: usize,
        agent_id: String,
        tx_id: String,
        priority_override: Option<u8>,
    },

    /// Policy decided to hold transaction in Queue 1
    PolicyHold {
        tick: usize,
        agent_id: String,
        tx_id: String,
        reason: String,
    },

    /// Policy decided to drop transaction
    PolicyDrop {
        tick: usize,
        agent_id: String,
        tx_id: String,
        reason: String,
    },

    /// Policy decided to split transaction into multiple child transactions
    PolicySplit {
        tick: usize,
        agent_id: String,
        tx_id: String,
        num_splits: usize,
        child_ids: Vec<String>,
    },

    /// Policy reprioritized a transaction while it remained in Queue 1
    TransactionReprioritized {
        tick: usize,
        agent_id: String,
        tx_id: String,
        old_priority: u8,
        new_priority: u8,
    },

    /// Transaction settled immediately on RTGS submission (never queued)
    RtgsImmediateSettlement {
        tick: usize,
        tx_id: String,
        sender_id: String,
        receiver_id: String,
        amount: i64,
    },

    /// Transaction admitted to Queue 2 (insufficient liquidity for immediate settlement)
    QueuedRtgs {
        tick: usize,
        tx_id: String,
        sender_id: String,
    },

    /// Queued transaction settled on a `process_queue` retry pass
    Queue2LiquidityRelease {
        tick: usize,
        tx_id: String,
        sender_id: String,
        receiver_id: String,
        amount: i64,
    },

    /// A submit was netted at entry against an opposing queued transaction
    EntryDispositionOffset {
        tick: usize,
        tx_id_incoming: String,
        tx_id_opposing: String,
        agent_a: String,
        agent_b: String,
        net_amount: i64,
    },

    /// LSM Algorithm 2: bilateral pair settled via netting
    LsmBilateralOffset {
        tick: usize,
        agent_a: String,
        agent_b: String,
        tx_ids_a: Vec<String>,
        tx_ids_b: Vec<String>,
        amount_a: i64,
        amount_b: i64,
        net_liquidity_consumed: i64,
    },

    /// LSM Algorithm 3: multilateral cycle settled
    LsmCycleSettlement {
        tick: usize,
        agents: Vec<String>,
        tx_ids: Vec<String>,
        max_outflow_agent: String,
        cycle_value: i64,
    },

    /// One LSM algorithm pass completed (summary, regardless of whether it settled anything)
    AlgorithmExecution {
        tick: usize,
        algorithm: String,
        settled_count: usize,
        total_value: i64,
    },

    /// Agent posted collateral to increase available liquidity
    CollateralPost {
        tick: usize,
        agent_id: String,
        amount: i64,
        reason: String,
        new_total: i64,
    },

    /// Agent withdrew collateral to reduce opportunity cost
    CollateralWithdraw {
        tick: usize,
        agent_id: String,
        amount: i64,
        reason: String,
        new_total: i64,
    },

    /// A timer-deferred collateral withdrawal matured and succeeded
    CollateralTimerWithdrawn {
        tick: usize,
        agent_id: String,
        amount: i64,
        original_reason: String,
        posted_at_tick: usize,
        new_total: i64,
    },

    /// A timer-deferred collateral withdrawal matured but could not be honored
    CollateralTimerBlocked {
        tick: usize,
        agent_id: String,
        requested_amount: i64,
        reason: String,
        original_reason: String,
        posted_at_tick: usize,
    },

    /// Costs accrued for an agent this tick
    CostAccrual {
        tick: usize,
        agent_id: String,
        costs: CostBreakdown,
    },

    /// Transaction crossed its deadline tick while still unsettled
    TransactionWentOverdue {
        tick: usize,
        tx_id: String,
        agent_id: String,
        deadline_tick: usize,
        penalty: i64,
    },

    /// A previously-overdue transaction finally settled
    OverdueTransactionSettled {
        tick: usize,
        tx_id: String,
        agent_id: String,
        ticks_overdue: usize,
    },

    /// A deferred credit was flushed to the receiver's balance (step 8)
    DeferredCreditApplied {
        tick: usize,
        agent_id: String,
        amount: i64,
    },

    /// End-of-day processing occurred
    EndOfDay {
        tick: usize,
        day: usize,
        unsettled_count: usize,
        total_penalties: i64,
    },

    /// A bilateral LSM/RTGS settlement was blocked solely by a bilateral limit
    BilateralLimitExceeded {
        tick: usize,
        agent_a: String,
        agent_b: String,
        attempted_amount: i64,
        limit: i64,
    },

    /// A cycle settlement was blocked solely by a multilateral limit
    MultilateralLimitExceeded {
        tick: usize,
        agent_id: String,
        attempted_amount: i64,
        limit: i64,
    },

    /// A scenario event's schedule was evaluated this tick
    ScenarioEventEvaluated {
        tick: usize,
        event_id: String,
        probability: f64,
        random_value: f64,
        triggered: bool,
    },

    /// The bank_tree set or modified an agent's release budget
    BankBudgetSet {
        tick: usize,
        agent_id: String,
        max_value_to_release: i64,
        focus_counterparties: Vec<String>,
        max_per_counterparty: Option<i64>,
    },

    /// A policy tree set or modified one of an agent's state registers
    StateRegisterSet {
        tick: usize,
        agent_id: String,
        register_key: String,
        old_value: f64,
        new_value: f64,
        reason: String,
    },

    /// Day-start liquidity-pool allocation applied to an agent's balance
    LiquidityAllocation {
        tick: usize,
        agent_id: String,
        allocated: i64,
        pool: i64,
        fraction: f64,
    },
}

impl Event {
    /// Get the tick number when this event occurred
    pub fn tick(&self) -> usize {
        match self {
            Event::Arrival { tick, .. } => *tick,
            Event::PolicySubmit { tick, .. } => *tick,
            Event::PolicyHold { tick, .. } => *tick,
            Event::PolicyDrop { tick, .. } => *tick,
            Event::PolicySplit { tick, .. } => *tick,
            Event::TransactionReprioritized { tick, .. } => *tick,
            Event::RtgsImmediateSettlement { tick, .. } => *tick,
            Event::QueuedRtgs { tick, .. } => *tick,
            Event::Queue2LiquidityRelease { tick, .. } => *tick,
            Event::EntryDispositionOffset { tick, .. } => *tick,
            Event::LsmBilateralOffset { tick, .. } => *tick,
            Event::LsmCycleSettlement { tick, .. } => *tick,
            Event::AlgorithmExecution { tick, .. } => *tick,
            Event::CollateralPost { tick, .. } => *tick,
            Event::CollateralWithdraw { tick, .. } => *tick,
            Event::CollateralTimerWithdrawn { tick, .. } => *tick,
            Event::CollateralTimerBlocked { tick, .. } => *tick,
            Event::CostAccrual { tick, .. } => *tick,
            Event::TransactionWentOverdue { tick, .. } => *tick,
            Event::OverdueTransactionSettled { tick, .. } => *tick,
            Event::DeferredCreditApplied { tick, .. } => *tick,
            Event::EndOfDay { tick, .. } => *tick,
            Event::BilateralLimitExceeded { tick, .. } => *tick,
            Event::MultilateralLimitExceeded { tick, .. } => *tick,
            Event::ScenarioEventEvaluated { tick, .. } => *tick,
            Event::BankBudgetSet { tick, .. } => *tick,
            Event::StateRegisterSet { tick, .. } => *tick,
            Event::LiquidityAllocation { tick, .. } => *tick,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Arrival { .. } => "Arrival",
            Event::PolicySubmit { .. } => "PolicySubmit",
            Event::PolicyHold { .. } => "PolicyHold",
            Event::PolicyDrop { .. } => "PolicyDrop",
            Event::PolicySplit { .. } => "PolicySplit",
            Event::TransactionReprioritized { .. } => "TransactionReprioritized",
            Event::RtgsImmediateSettlement { .. } => "RtgsImmediateSettlement",
            Event::QueuedRtgs { .. } => "QueuedRtgs",
            Event::Queue2LiquidityRelease { .. } => "Queue2LiquidityRelease",
            Event::EntryDispositionOffset { .. } => "EntryDispositionOffset",
            Event::LsmBilateralOffset { .. } => "LsmBilateralOffset",
            Event::LsmCycleSettlement { .. } => "LsmCycleSettlement",
            Event::AlgorithmExecution { .. } => "AlgorithmExecution",
            Event::CollateralPost { .. } => "CollateralPost",
            Event::CollateralWithdraw { .. } => "CollateralWithdraw",
            Event::CollateralTimerWithdrawn { .. } => "CollateralTimerWithdrawn",
            Event::CollateralTimerBlocked { .. } => "CollateralTimerBlocked",
            Event::CostAccrual { .. } => "CostAccrual",
            Event::TransactionWentOverdue { .. } => "TransactionWentOverdue",
            Event::OverdueTransactionSettled { .. } => "OverdueTransactionSettled",
            Event::DeferredCreditApplied { .. } => "DeferredCreditApplied",
            Event::EndOfDay { .. } => "EndOfDay",
            Event::BilateralLimitExceeded { .. } => "BilateralLimitExceeded",
            Event::MultilateralLimitExceeded { .. } => "MultilateralLimitExceeded",
            Event::ScenarioEventEvaluated { .. } => "ScenarioEventEvaluated",
            Event::BankBudgetSet { .. } => "BankBudgetSet",
            Event::StateRegisterSet { .. } => "StateRegisterSet",
            Event::LiquidityAllocation { .. } => "LiquidityAllocation",
        }
    }

    /// Get transaction ID if event relates to a specific transaction
    pub fn tx_id(&self) -> Option<&str> {
        match self {
            Event::Arrival { tx_id, .. } => Some(tx_id),
            Event::PolicySubmit { tx_id, .. } => Some(tx_id),
            Event::PolicyHold { tx_id, .. } => Some(tx_id),
            Event::PolicyDrop { tx_id, .. } => Some(tx_id),
            Event::PolicySplit { tx_id, .. } => Some(tx_id),
            Event::TransactionReprioritized { tx_id, .. } => Some(tx_id),
            Event::RtgsImmediateSettlement { tx_id, .. } => Some(tx_id),
            Event::QueuedRtgs { tx_id, .. } => Some(tx_id),
            Event::Queue2LiquidityRelease { tx_id, .. } => Some(tx_id),
            Event::TransactionWentOverdue { tx_id, .. } => Some(tx_id),
            Event::OverdueTransactionSettled { tx_id, .. } => Some(tx_id),
            _ => None,
        }
    }

    /// Get agent ID if event relates to a single specific agent
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            Event::Arrival { sender_id, .. } => Some(sender_id),
            Event::PolicySubmit { agent_id, .. } => Some(agent_id),
            Event::PolicyHold { agent_id, .. } => Some(agent_id),
            Event::PolicyDrop { agent_id, .. } => Some(agent_id),
            Event::PolicySplit { agent_id, .. } => Some(agent_id),
            Event::TransactionReprioritized { agent_id, .. } => Some(agent_id),
            Event::RtgsImmediateSettlement { sender_id, .. } => Some(sender_id),
            Event::QueuedRtgs { sender_id, .. } => Some(sender_id),
            Event::Queue2LiquidityRelease { sender_id, .. } => Some(sender_id),
            Event::CollateralPost { agent_id, .. } => Some(agent_id),
            Event::CollateralWithdraw { agent_id, .. } => Some(agent_id),
            Event::CollateralTimerWithdrawn { agent_id, .. } => Some(agent_id),
            Event::CollateralTimerBlocked { agent_id, .. } => Some(agent_id),
            Event::CostAccrual { agent_id, .. } => Some(agent_id),
            Event::TransactionWentOverdue { agent_id, .. } => Some(agent_id),
            Event::OverdueTransactionSettled { agent_id, .. } => Some(agent_id),
            Event::DeferredCreditApplied { agent_id, .. } => Some(agent_id),
            Event::MultilateralLimitExceeded { agent_id, .. } => Some(agent_id),
            Event::BankBudgetSet { agent_id, .. } => Some(agent_id),
            Event::StateRegisterSet { agent_id, .. } => Some(agent_id),
            Event::LiquidityAllocation { agent_id, .. } => Some(agent_id),
            _ => None,
        }
    }
}

/// Event log for storing and querying simulation events.
///
/// This is a simple wrapper around Vec<Event> with convenience methods.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Get the number of events logged
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get all events
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events for a specific tick
    pub fn events_at_tick(&self, tick: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.tick() == tick).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific transaction
    pub fn events_for_tx(&self, tx_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.tx_id() == Some(tx_id))
            .collect()
    }

    /// Get events for a specific agent
    pub fn events_for_agent(&self, agent_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.agent_id() == Some(agent_id))
            .collect()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
