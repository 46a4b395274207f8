//! Keeper daemon running against a simulated pool
//!
//! Each tick a scripted trader mints USDU through the adapter and dumps it
//! into the pool, then the keeper decides whether to run a rebalance cycle.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use curve_sim::fixture::{self, FixtureParams, SimHost, KEEPER};
use usdu::constants::DEFAULT_BALANCE_TOLERANCE_BPS;
use usdu::{Address, DepositMode, UsduEvent};
use usdu_config::{Config, SimulationConfig};
use usdu_keeper::Keeper;

const TRADER: Address = Address::repeat_byte(0x7d);

fn fixture_params(sim: &SimulationConfig) -> FixtureParams {
  FixtureParams {
    reference_reserve: sim.reference_reserve,
    stable_reserve: sim.stable_reserve,
    amp: sim.amp,
    pool_fee_bps: sim.pool_fee_bps,
    lender_liquidity: sim.lender_liquidity,
    flash_fee_bps: sim.flash_fee_bps,
    deposit_mode: DepositMode::SingleSided,
    max_slippage_bps: sim.max_slippage_bps,
    unwind_bps: sim.unwind_bps,
    balance_tolerance_bps: DEFAULT_BALANCE_TOLERANCE_BPS,
    rebalancer_owns_seed: true,
  }
}

/// Mint through the adapter and sell the proceeds into the pool
fn apply_sell_pressure(host: &mut SimHost, amount: u64) -> usdu::Result<u64> {
  fixture::fund_depositor(host, TRADER, amount)?;
  let minted = host.deposit(TRADER, amount, 0)?.stable_minted;
  fixture::sell_stable(host, TRADER, minted)
}

#[tokio::main]
async fn main() -> Result<()> {
  usdu_telemetry::init()?;

  let config = Config::from_env().context("failed to load configuration")?;
  info!(?config, "Starting keeper");

  let mut host = fixture::build(&fixture_params(&config.simulation))
    .context("failed to build simulated world")?;
  let mut keeper = Keeper::new(KEEPER, config.keeper.clone());

  let mut interval = tokio::time::interval(config.keeper.poll_interval());
  let shutdown = tokio::signal::ctrl_c();
  tokio::pin!(shutdown);

  loop {
    tokio::select! {
      _ = &mut shutdown => {
        info!("Shutdown requested");
        break;
      }
      _ = interval.tick() => {}
    }

    if config.simulation.sell_pressure > 0 {
      match apply_sell_pressure(&mut host, config.simulation.sell_pressure) {
        Ok(reference_out) => info!(reference_out, "Trader sold USDU"),
        Err(err) => warn!(%err, "Sell pressure reverted"),
      }
    }

    match keeper.tick(&mut host) {
      Ok(Some(receipt)) => {
        let json = UsduEvent::from(receipt).to_json().context("failed to encode receipt")?;
        info!(receipt = %json, "Cycle receipt");
      }
      Ok(None) => {}
      Err(err) => warn!(%err, "Tick failed"),
    }

    // the receipt is already logged; keep the journal from growing across ticks
    let drained = host.drain_events();
    debug!(events = drained.len(), "Journal drained");

    let max_ticks = config.keeper.max_ticks;
    if max_ticks > 0 && keeper.stats().ticks >= max_ticks {
      info!(max_ticks, "Tick limit reached");
      break;
    }
  }

  let stats = keeper.stats();
  let (committed, reverted) = host.stats();
  info!(
    ticks = stats.ticks,
    cycles = stats.cycles,
    failed_cycles = stats.failed_cycles,
    fees_paid = stats.fees_paid,
    committed,
    reverted,
    total_minted = host.world().adapter.total_minted,
    "Keeper stopped"
  );

  Ok(())
}
