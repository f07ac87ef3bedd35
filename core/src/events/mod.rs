//! Scenario events: scheduled external injections into a running simulation
//!
//! Distinct from the append-only [`crate::models::event::Event`] log this module feeds:
//! `ScenarioEvent` describes *what to inject and when*, while `Event` records *what happened*.

pub mod handler;
pub mod types;

pub use handler::ScenarioEventHandler;
pub use types::{EventSchedule, ScenarioEvent, ScheduledEvent};
