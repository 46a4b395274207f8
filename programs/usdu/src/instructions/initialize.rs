//! Initialize instruction - sets up the engine
//! Binds the adapter to the stablecoin ledger as its controller and records
//! the pool layout for both the adapter and the rebalancer

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::address::Address;
use crate::constants::{BPS_PRECISION, MAX_SLIPPAGE_BPS};
use crate::error::{Result, UsduError};
use crate::events::{emit, AdapterInitialized, RebalancerInitialized};
use crate::flash_loan::FlashLender;
use crate::host::World;
use crate::ledger::Bank;
use crate::pool::StableSwapPool;
use crate::require;
use crate::state::{AdapterState, DepositMode, RebalancerState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
  pub address: Address,
  pub authority: Address,
  pub stable_token: Address,
  pub reference_token: Address,
  pub deposit_mode: DepositMode,
  pub max_slippage_bps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalancerConfig {
  pub address: Address,
  pub authority: Address,
  pub unwind_bps: u64,
  pub balance_tolerance_bps: u64,
}

/// Pool indices of the reference and stable coins
fn resolve_layout<P: StableSwapPool>(
  pool: &P,
  bank: &Bank,
  reference_token: &Address,
  stable_token: &Address,
) -> Result<(usize, usize)> {
  let reference_index = pool.coin_index(reference_token).ok_or(UsduError::InvalidParameter)?;
  let stable_index = pool.coin_index(stable_token).ok_or(UsduError::InvalidParameter)?;
  require!(reference_index != stable_index, UsduError::InvalidParameter);

  // Imbalance and rate math compare raw units across the two coins
  let reference_decimals = bank.token(reference_token)?.decimals;
  let stable_decimals = bank.token(stable_token)?.decimals;
  require!(reference_decimals == stable_decimals, UsduError::InvalidParameter);

  Ok((reference_index, stable_index))
}

pub fn initialize_adapter<P: StableSwapPool>(
  pool: &P,
  bank: &Bank,
  config: &AdapterConfig,
) -> Result<AdapterState> {
  require!(!config.address.is_zero(), UsduError::InvalidParameter);
  require!(config.max_slippage_bps <= MAX_SLIPPAGE_BPS, UsduError::InvalidParameter);

  let (reference_index, stable_index) =
    resolve_layout(pool, bank, &config.reference_token, &config.stable_token)?;

  // The adapter must be the stablecoin's controller-of-record
  let stable = bank.token(&config.stable_token)?;
  require!(stable.controller() == config.address, UsduError::Unauthorized);

  Ok(AdapterState {
    address: config.address,
    authority: config.authority,
    stable_token: config.stable_token,
    reference_token: config.reference_token,
    pool: pool.address(),
    reference_index,
    stable_index,
    deposit_mode: config.deposit_mode,
    max_slippage_bps: config.max_slippage_bps,
    total_minted: 0,
    locked: false,
    operation_counter: 0,
  })
}

pub fn initialize_rebalancer<P: StableSwapPool>(
  pool: &P,
  bank: &Bank,
  adapter: &AdapterState,
  config: &RebalancerConfig,
) -> Result<RebalancerState> {
  require!(!config.address.is_zero(), UsduError::InvalidParameter);
  require!(config.address != adapter.address, UsduError::InvalidParameter);
  require!(config.unwind_bps <= BPS_PRECISION, UsduError::InvalidParameter);
  require!(config.balance_tolerance_bps < BPS_PRECISION, UsduError::InvalidParameter);

  let (reference_index, stable_index) =
    resolve_layout(pool, bank, &adapter.reference_token, &adapter.stable_token)?;

  Ok(RebalancerState {
    address: config.address,
    authority: config.authority,
    reference_token: adapter.reference_token,
    stable_token: adapter.stable_token,
    pool: pool.address(),
    reference_index,
    stable_index,
    unwind_bps: config.unwind_bps,
    balance_tolerance_bps: config.balance_tolerance_bps,
    locked: false,
    operation_counter: 0,
  })
}

/// Build the world the host operates on
pub fn handler<P: StableSwapPool, L: FlashLender>(
  bank: Bank,
  pool: P,
  lender: L,
  adapter_config: &AdapterConfig,
  rebalancer_config: &RebalancerConfig,
) -> Result<World<P, L>> {
  let adapter = initialize_adapter(&pool, &bank, adapter_config)?;
  let rebalancer = initialize_rebalancer(&pool, &bank, &adapter, rebalancer_config)?;

  let mut events = Vec::new();
  emit(
    &mut events,
    AdapterInitialized {
      adapter: adapter.address,
      authority: adapter.authority,
      stable_token: adapter.stable_token,
      reference_token: adapter.reference_token,
      pool: adapter.pool,
      deposit_mode: adapter.deposit_mode,
    },
  );
  emit(
    &mut events,
    RebalancerInitialized {
      rebalancer: rebalancer.address,
      authority: rebalancer.authority,
      pool: rebalancer.pool,
      unwind_bps: rebalancer.unwind_bps,
    },
  );

  info!("Engine initialized!");
  info!("Adapter: {}", adapter.address);
  info!("Rebalancer: {}", rebalancer.address);
  info!("Pool: {} (reference index {}, stable index {})", adapter.pool, adapter.reference_index, adapter.stable_index);

  Ok(World {
    bank,
    pool,
    lender,
    adapter,
    rebalancer,
    events,
  })
}
