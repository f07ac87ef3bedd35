//! Scenario event execution and scheduling
//!
//! This module handles:
//! - Scheduling events by tick (deterministic or RNG-gated)
//! - Executing events to modify state
//! - Logging `ScenarioEventEvaluated` for every probabilistic draw

use crate::events::types::{EventSchedule, ScenarioEvent, ScheduledEvent};
use crate::models::{state::SimulationState, Event, Transaction};
use crate::rng::RngManager;

/// Handles scenario event scheduling and execution
pub struct ScenarioEventHandler {
    events: Vec<ScheduledEvent>,
}

impl ScenarioEventHandler {
    /// Create a new event handler with the given events
    pub fn new(events: Vec<ScheduledEvent>) -> Self {
        Self { events }
    }

    /// Run every configured event against `tick`, in configuration order.
    ///
    /// Deterministic schedules are evaluated first, then probabilistic ones, so that
    /// the RNG draw order stays stable regardless of how many deterministic events fire.
    /// Returns the number of events actually executed (drew `true`, or were unconditional).
    pub fn execute_tick_events(
        &self,
        state: &mut SimulationState,
        rng: &mut RngManager,
        tick: usize,
    ) -> Result<usize, String> {
        let mut executed = 0;

        for scheduled in self.events.iter().filter(|s| !s.schedule.is_probabilistic()) {
            if scheduled.schedule.should_execute(tick) {
                scheduled.event.execute(state, tick)?;
                executed += 1;
            }
        }

        for scheduled in self.events.iter().filter(|s| s.schedule.is_probabilistic()) {
            if let Some(probability) = scheduled.schedule.probability_if_due(tick) {
                let random_value = rng
                    .next_f64()
                    .map_err(|e| format!("RNG failure evaluating scenario event: {}", e))?;
                let triggered = random_value < probability;

                state.log_event(Event::ScenarioEventEvaluated {
                    tick,
                    event_id: scheduled.id.clone(),
                    probability,
                    random_value,
                    triggered,
                });

                if triggered {
                    scheduled.event.execute(state, tick)?;
                    executed += 1;
                }
            }
        }

        Ok(executed)
    }
}

impl ScenarioEvent {
    /// Execute this event, modifying the given state
    ///
    /// # Arguments
    /// * `state` - Simulation state to modify
    /// * `tick` - Current tick number
    pub fn execute(&self, state: &mut SimulationState, tick: usize) -> Result<(), String> {
        match self {
            ScenarioEvent::DirectTransfer {
                from_agent,
                to_agent,
                amount,
            } => execute_direct_transfer(state, from_agent, to_agent, *amount),

            ScenarioEvent::CollateralAdjustment { agent, delta } => {
                execute_collateral_adjustment(state, agent, *delta)
            }

            ScenarioEvent::CustomTransactionArrival {
                sender_id,
                receiver_id,
                amount,
                deadline,
                priority,
                cap_deadline,
            } => execute_custom_arrival(
                state,
                tick,
                sender_id,
                receiver_id,
                *amount,
                *deadline,
                *priority,
                *cap_deadline,
            ),

            // Rate/weight/window scenario events mutate arrival-generator configuration,
            // which lives outside SimulationState; the orchestrator applies these directly.
            ScenarioEvent::GlobalArrivalRateChange { .. }
            | ScenarioEvent::AgentArrivalRateChange { .. }
            | ScenarioEvent::CounterpartyWeightChange { .. }
            | ScenarioEvent::DeadlineWindowChange { .. } => Ok(()),
        }
    }
}

// ============================================================================
// Event Execution Functions
// ============================================================================

fn execute_direct_transfer(
    state: &mut SimulationState,
    from_agent: &str,
    to_agent: &str,
    amount: i64,
) -> Result<(), String> {
    if state.get_agent(from_agent).is_none() {
        return Err(format!("Agent not found: {}", from_agent));
    }
    if state.get_agent(to_agent).is_none() {
        return Err(format!("Agent not found: {}", to_agent));
    }

    // Bypasses liquidity checks: this models an external injection/withdrawal, not settlement.
    state
        .get_agent_mut(from_agent)
        .expect("checked above")
        .adjust_balance(-amount);
    state
        .get_agent_mut(to_agent)
        .expect("checked above")
        .adjust_balance(amount);

    Ok(())
}

fn execute_collateral_adjustment(
    state: &mut SimulationState,
    agent: &str,
    delta: i64,
) -> Result<(), String> {
    let old_limit = state
        .get_agent(agent)
        .ok_or_else(|| format!("Agent not found: {}", agent))?
        .credit_limit();

    let new_limit = old_limit + delta;
    if new_limit < 0 {
        return Err(format!(
            "Credit limit cannot go negative (current: {}, delta: {})",
            old_limit, delta
        ));
    }

    state.set_credit_limit(agent, new_limit);
    Ok(())
}

fn execute_custom_arrival(
    state: &mut SimulationState,
    tick: usize,
    sender_id: &str,
    receiver_id: &str,
    amount: i64,
    deadline_offset: usize,
    priority: u8,
    cap_deadline: Option<usize>,
) -> Result<(), String> {
    if state.get_agent(sender_id).is_none() {
        return Err(format!("Agent not found: {}", sender_id));
    }
    if state.get_agent(receiver_id).is_none() {
        return Err(format!("Agent not found: {}", receiver_id));
    }

    let mut deadline_tick = tick + deadline_offset;
    if let Some(cap) = cap_deadline {
        deadline_tick = deadline_tick.min(cap);
    }

    let mut tx = Transaction::new(
        sender_id.to_string(),
        receiver_id.to_string(),
        amount,
        tick,
        deadline_tick,
    );
    tx.set_priority(priority);
    let id = tx.id().to_string();

    state.log_event(Event::Arrival {
        tick,
        tx_id: id.clone(),
        sender_id: sender_id.to_string(),
        receiver_id: receiver_id.to_string(),
        amount,
        deadline: deadline_tick,
        priority,
        is_divisible: tx.is_divisible(),
    });

    state.add_transaction(tx);
    state
        .get_agent_mut(sender_id)
        .expect("checked above")
        .queue_outgoing(id);

    Ok(())
}
