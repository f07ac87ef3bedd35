//! Command-line driver for the payment settlement simulator core.
//!
//! This binary is deliberately thin: it only touches the core through the
//! three seams the core exposes (construction, tick, query). Configuration
//! ingest, logging, and human-readable rendering live here, not in the core.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use payment_simulator_core_rs::{Orchestrator, OrchestratorConfig};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "payment-simulator", about = "Runs an RTGS/LSM settlement simulation from a JSON config")]
struct Cli {
    /// Path to a JSON file describing an OrchestratorConfig
    config: PathBuf,

    /// Print a TickResult summary for every tick, not just day boundaries
    #[arg(long)]
    verbose_ticks: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let raw = fs::read_to_string(&cli.config)
        .with_context(|| format!("reading config file {}", cli.config.display()))?;
    let config: OrchestratorConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {} as OrchestratorConfig", cli.config.display()))?;

    let ticks_per_day = config.ticks_per_day;
    let num_days = config.num_days;
    let total_ticks = ticks_per_day * num_days;

    let mut orchestrator = Orchestrator::new(config).context("constructing orchestrator")?;

    info!(total_ticks, num_days, ticks_per_day, "starting simulation run");

    for _ in 0..total_ticks {
        let result = orchestrator.tick().context("running tick")?;

        if cli.verbose_ticks {
            debug!(
                tick = result.tick,
                day = result.day,
                arrivals = result.num_arrivals,
                settlements = result.num_settlements,
                queue2_size = result.queue2_size,
                costs = result.total_costs_this_tick,
                "tick complete"
            );
        } else if orchestrator.current_tick() % ticks_per_day == 0 {
            info!(day = result.day, "day complete");
        }
    }

    print_summary(&orchestrator);
    Ok(())
}

fn print_summary(orchestrator: &Orchestrator) {
    println!(
        "Simulation finished at tick {} (day {})",
        orchestrator.current_tick(),
        orchestrator.current_day()
    );
    println!("{:<12} {:>14} {:>12} {:>12} {:>12}", "agent", "balance", "liquidity", "collateral", "delay+penalty");

    for (id, agent) in orchestrator.state().agents() {
        let costs = orchestrator.get_costs(id);
        let (liquidity_cost, collateral_cost, delay_penalty) = costs
            .map(|c| (c.total_liquidity_cost, c.total_collateral_cost, c.total_delay_cost + c.total_deadline_penalty_cost))
            .unwrap_or((0, 0, 0));

        println!(
            "{:<12} {:>14} {:>12} {:>12} {:>12}",
            id,
            agent.balance(),
            liquidity_cost,
            collateral_cost,
            delay_penalty,
        );
    }
}
