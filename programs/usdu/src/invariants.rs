//! Invariant assertions for the USDU engine
//! These are the non-negotiable rules that protect solvency
//! Every state-changing instruction calls these before returning

use tracing::debug;

use crate::constants::{BPS_PRECISION, RATE_PROBE};
use crate::error::{Result, UsduError};
use crate::ledger::{Bank, Token};
use crate::math::{convert_at_rate, mul_div_up, proportional_share_down};
use crate::pool::StableSwapPool;
use crate::require;
use crate::state::AdapterState;

/// Stablecoin-equivalent value redeemable from `lp_amount` at current reserves
///
/// Values a balanced withdrawal: the stablecoin leg at face value plus the
/// reference leg converted at the pool's current rate.
///
/// # Returns
/// Value in stablecoin base units, rounded down
pub fn redeemable_stable_value<P: StableSwapPool + ?Sized>(
  pool: &P,
  bank: &Bank,
  lp_amount: u64,
  reference_index: usize,
  stable_index: usize,
) -> Result<u64> {
  if lp_amount == 0 {
    return Ok(0);
  }

  let lp_supply = pool.lp_total_supply(bank)?;
  require!(lp_supply > 0, UsduError::PoolInteractionFailed("pool has no LP supply".into()));

  let reserves = pool.get_balances();
  let reference_leg = proportional_share_down(reserves[reference_index], lp_amount, lp_supply)
    .ok_or(UsduError::Overflow)?;
  let stable_leg = proportional_share_down(reserves[stable_index], lp_amount, lp_supply)
    .ok_or(UsduError::Overflow)?;

  let probe_out = pool.get_dy(reference_index, stable_index, RATE_PROBE)?;
  let reference_value = convert_at_rate(reference_leg, probe_out).ok_or(UsduError::Overflow)?;

  stable_leg.checked_add(reference_value).ok_or(UsduError::Overflow)
}

/// Stablecoin-equivalent value of the adapter's whole LP position
pub fn adapter_position_value<P: StableSwapPool + ?Sized>(pool: &P, bank: &Bank, adapter: &AdapterState) -> Result<u64> {
  let adapter_lp = pool.balance_of(bank, &adapter.address)?;
  redeemable_stable_value(pool, bank, adapter_lp, adapter.reference_index, adapter.stable_index)
}

/// Minted supply the position does not cover; zero when fully backed
pub fn collateral_deficit(minted: u64, redeemable: u64) -> u64 {
  minted.saturating_sub(redeemable)
}

/// Slack allowed between minted supply and redeemable value for pool-defined slippage
///
/// # Arguments
/// * `minted` - Stablecoin amount being checked
/// * `tolerance_bps` - Allowed shortfall in basis points
pub fn solvency_bound(minted: u64, tolerance_bps: u64) -> Result<u64> {
  mul_div_up(minted, tolerance_bps, BPS_PRECISION).ok_or(UsduError::Overflow)
}

/// Assert minted supply is covered by redeemable value
///
/// # Arguments
/// * `minted` - Stablecoin minted against the position
/// * `redeemable` - Stablecoin-equivalent value of the position
/// * `bound` - Shortfall tolerated for curve fees and rounding
pub fn assert_solvent(minted: u64, redeemable: u64, bound: u64) -> Result<()> {
  let covered = (redeemable as u128) + (bound as u128);
  debug!(minted, redeemable, bound, "Solvency check");
  require!((minted as u128) <= covered, UsduError::SolvencyViolation);
  Ok(())
}

/// Assert an operation left the collateral deficit no wider than before, plus `bound`
///
/// Pool trades outside the engine can leave the position under water. Exits
/// and rebalances stay open in that state but must not push the shortfall
/// onto the remaining holders.
pub fn assert_deficit_not_widened(deficit_before: u64, deficit_after: u64, bound: u64) -> Result<()> {
  let allowed = (deficit_before as u128) + (bound as u128);
  debug!(deficit_before, deficit_after, bound, "Deficit check");
  require!((deficit_after as u128) <= allowed, UsduError::SolvencyViolation);
  Ok(())
}

/// Assert that a token ledger's balances sum to its total supply
pub fn assert_supply_conserved(token: &Token) -> Result<()> {
  require!(
    token.balances_sum() == token.total_supply() as u128,
    UsduError::SupplyMismatch
  );
  Ok(())
}

/// Assert that a burn does not exceed what the adapter has minted
pub fn assert_minted_covers(total_minted: u64, burn_amount: u64) -> Result<()> {
  require!(burn_amount <= total_minted, UsduError::InsufficientMintedBalance);
  Ok(())
}

/// Assert a rebalance cycle left the pool strictly closer to parity
pub fn assert_imbalance_reduced(before_bps: u64, after_bps: u64) -> Result<()> {
  require!(after_bps < before_bps, UsduError::ImbalanceNotReduced);
  Ok(())
}
