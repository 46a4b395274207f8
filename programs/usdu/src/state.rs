//! State for the USDU engine
//! These structs hold the adapter's minted-supply ledger and the rebalancer's configuration

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::reentrancy::Lockable;

/// How a deposit enters the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositMode {
  /// Reference asset only: `[amount, 0]`
  #[default]
  SingleSided,
  /// Reference asset plus a freshly minted stablecoin leg matching the reserve ratio
  Balanced,
}

/// Stable adapter - the single source of truth for stablecoin minted against pool collateral
/// This state is a singleton (only one exists per deployment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterState {
  /// Identity the adapter acts under; controller of the stablecoin ledger
  pub address: Address,

  /// Admin allowed to update parameters
  pub authority: Address,

  pub stable_token: Address,

  pub reference_token: Address,

  pub pool: Address,

  pub reference_index: usize,

  pub stable_index: usize,

  pub deposit_mode: DepositMode,

  pub max_slippage_bps: u64,

  /// Stablecoin minted and outstanding against the adapter's pool position
  pub total_minted: u64,

  pub locked: bool,

  pub operation_counter: u64,
}

/// Liquidity rebalancer configuration; no state survives between cycles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalancerState {
  /// Identity that receives the loan and holds the protocol-owned LP position
  pub address: Address,

  /// The only principal allowed to trigger a cycle
  pub authority: Address,

  pub reference_token: Address,

  pub stable_token: Address,

  pub pool: Address,

  pub reference_index: usize,

  pub stable_index: usize,

  /// Share of half the reserve gap unwound from the existing position per cycle
  pub unwind_bps: u64,

  /// Imbalance at or below which the pool counts as balanced
  pub balance_tolerance_bps: u64,

  pub locked: bool,

  pub operation_counter: u64,
}

impl Lockable for AdapterState {
  fn lock_flag(&mut self) -> &mut bool {
    &mut self.locked
  }
}

impl Lockable for RebalancerState {
  fn lock_flag(&mut self) -> &mut bool {
    &mut self.locked
  }
}
