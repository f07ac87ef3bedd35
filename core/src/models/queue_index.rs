//! Agent Queue Index - Performance Optimization
//!
//! Provides O(1) lookup of Queue 2 (RTGS) transactions by agent ID.
//!
//! # Problem
//!
//! Without an index, finding all Queue 2 transactions for a specific agent
//! requires scanning the entire queue: O(Queue2_Size).
//!
//! When this happens N times per tick (once per agent for cost calculations,
//! once per Queue 1 transaction for policy evaluation), we get O(N × M) complexity.
//!
//! # Solution
//!
//! Maintain a `HashMap<AgentID, Vec<TxID>>` that maps each agent to their
//! Queue 2 transactions. Rebuild once per tick after queue modifications.
//!
//! Rebuild cost: O(Queue2_Size) - single scan
//! Lookup cost: O(1) - hash table lookup
//!
//! Net win: O(Queue2_Size) instead of O(N × Queue2_Size)
//!
//! # Usage
//!
//! ```rust
//! use payment_simulator_core_rs::models::queue_index::AgentQueueIndex;
//! use payment_simulator_core_rs::SimulationState;
//!
//! let state = SimulationState::new(vec![/* agents */]);
//! let mut index = AgentQueueIndex::new();
//!
//! // Rebuild after queue modifications
//! index.rebuild(state.rtgs_queue(), state.transactions());
//!
//! // Fast O(1) lookup
//! let agent_txs = index.get_agent_transactions("BANK_A");
//! ```

use std::collections::HashMap;

/// Cached metrics for an agent's Queue 2 transactions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentQueue2Metrics {
    /// Number of this agent's transactions in Queue 2
    pub count: usize,

    /// Nearest deadline among this agent's Queue 2 transactions
    pub nearest_deadline: usize,

    /// Total value of this agent's Queue 2 transactions
    pub total_value: i64,
}

/// Agent-indexed view of RTGS queue for fast lookups
///
/// Maps agent IDs to their transactions in Queue 2, enabling O(1) lookup
/// instead of O(Queue2_Size) linear scans.
#[derive(Debug, Clone)]
pub struct AgentQueueIndex {
    /// Map: AgentID → Vec<TxID> (transactions in Queue 2 for this agent)
    by_agent: HashMap<String, Vec<String>>,

    /// Cached metrics per agent (computed once per tick)
    cached_metrics: HashMap<String, AgentQueue2Metrics>,
}

impl AgentQueueIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            by_agent: HashMap::new(),
            cached_metrics: HashMap::new(),
        }
    }

    /// Rebuild index from current RTGS queue
    ///
    /// Scans Queue 2 once to build the index: O(Queue2_Size)
    ///
    /// # Arguments
    ///
    /// * `rtgs_queue` - Vector of transaction IDs in Queue 2
    /// * `transactions` - BTreeMap of all transactions by ID
    ///
    /// # Example
    ///
    /// ```rust
    /// # use payment_simulator_core_rs::models::queue_index::AgentQueueIndex;
    /// # use payment_simulator_core_rs::SimulationState;
    /// # let state = SimulationState::new(vec![]);
    /// let mut index = AgentQueueIndex::new();
    /// index.rebuild(state.rtgs_queue(), state.transactions());
    /// ```
    pub fn rebuild(
        &mut self,
        rtgs_queue: &[String],
        transactions: &std::collections::BTreeMap<String, crate::models::transaction::Transaction>,
    ) {
        self.by_agent.clear();
        self.cached_metrics.clear();

        // Single pass through Queue 2: O(Queue2_Size)
        for tx_id in rtgs_queue {
            if let Some(tx) = transactions.get(tx_id) {
                let agent_id = tx.sender_id().to_string();

                // Update agent's transaction list
                self.by_agent
                    .entry(agent_id.clone())
                    .or_insert_with(Vec::new)
                    .push(tx_id.clone());

                // Update cached metrics
                let metrics = self.cached_metrics
                    .entry(agent_id)
                    .or_insert_with(AgentQueue2Metrics::default);

                metrics.count += 1;
                metrics.total_value += tx.remaining_amount();

                // Update nearest deadline (initialize to max first)
                if metrics.nearest_deadline == 0 {
                    metrics.nearest_deadline = usize::MAX;
                }
                metrics.nearest_deadline = metrics.nearest_deadline.min(tx.deadline_tick());
            }
        }
    }

    /// Get transactions for an agent: O(1) lookup
    ///
    /// Returns a slice of transaction IDs for the specified agent.
    /// If agent has no transactions in Queue 2, returns empty slice.
    ///
    /// # Arguments
    ///
    /// * `agent_id` - Agent identifier
    ///
    /// # Returns
    ///
    /// Slice of transaction IDs, or empty slice if none found
    pub fn get_agent_transactions(&self, agent_id: &str) -> &[String] {
        self.by_agent
            .get(agent_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get cached metrics for an agent: O(1) lookup
    ///
    /// # Arguments
    ///
    /// * `agent_id` - Agent identifier
    ///
    /// # Returns
    ///
    /// Cached metrics, or default (zero) if agent has no Queue 2 transactions
    pub fn get_metrics(&self, agent_id: &str) -> AgentQueue2Metrics {
        self.cached_metrics
            .get(agent_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.by_agent.is_empty()
    }

    /// Get number of agents with Queue 2 transactions
    pub fn num_agents(&self) -> usize {
        self.by_agent.len()
    }
}

impl Default for AgentQueueIndex {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS - Phase 1: AgentQueueIndex (TDD)
// ============================================================================
