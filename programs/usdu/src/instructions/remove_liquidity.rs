//! Remove liquidity instruction - withdraws pool liquidity through the adapter
//! The caller surrenders LP and burns the stablecoin share that LP backed

use tracing::debug;

use crate::address::Address;
use crate::error::{Result, UsduError};
use crate::events::{emit, LiquidityRemoved};
use crate::host::World;
use crate::instructions::pool_call;
use crate::invariants::{
  adapter_position_value, assert_deficit_not_widened, assert_minted_covers, assert_supply_conserved,
  collateral_deficit, solvency_bound,
};
use crate::math::proportional_share_up;
use crate::pool::{StableSwapPool, N_COINS};
use crate::reentrancy::ReentrancyGuard;
use crate::require;

pub fn handler<P: StableSwapPool, L>(
  world: &mut World<P, L>,
  caller: Address,
  lp_amount: u64,
  min_out: u64,
) -> Result<LiquidityRemoved> {
  let World {
    bank,
    pool,
    adapter,
    events,
    ..
  } = world;
  let mut adapter = ReentrancyGuard::new(adapter)?;

  require!(lp_amount > 0, UsduError::ZeroAmount);

  let me = adapter.address;
  let lp_token = pool.address();
  let reference_token = adapter.reference_token;
  let stable_token = adapter.stable_token;
  let reference_index = adapter.reference_index;
  let stable_index = adapter.stable_index;

  // Burn share comes from the state before the pool call
  let lp_supply = pool.lp_total_supply(bank)?;
  require!(lp_amount <= lp_supply, UsduError::InvalidAmount);

  let old_total_minted = adapter.total_minted;
  let stable_burned = proportional_share_up(old_total_minted, lp_amount, lp_supply)
    .ok_or(UsduError::Overflow)?;
  assert_minted_covers(old_total_minted, stable_burned)?;

  // Strict: the caller must already hold the full share, it is never truncated
  let caller_stable = bank.balance_of(&stable_token, &caller)?;
  require!(caller_stable >= stable_burned, UsduError::InsufficientMintedBalance);

  let deficit_before = collateral_deficit(old_total_minted, adapter_position_value(&*pool, bank, &adapter)?);

  debug!(lp_amount, lp_supply, stable_burned, deficit_before, "Withdrawal share computed");

  // External calls

  bank.transfer_from(&lp_token, me, caller, me, lp_amount)?;

  let mut min_amounts = [0u64; N_COINS];
  min_amounts[reference_index] = min_out;
  let amounts = pool_call(pool.remove_liquidity(bank, me, lp_amount, min_amounts))?;

  let amount_out = amounts[reference_index];
  let stable_out = amounts[stable_index];
  require!(amount_out >= min_out, UsduError::SlippageExceeded);

  if stable_burned > 0 {
    bank.burn(&stable_token, me, caller, stable_burned)?;
  }
  let new_total_minted = old_total_minted - stable_burned;
  adapter.total_minted = new_total_minted;
  adapter.operation_counter = adapter.operation_counter.saturating_add(1);

  bank.transfer(&reference_token, me, caller, amount_out)?;
  bank.transfer(&stable_token, me, caller, stable_out)?;

  // INVARIANTS
  let deficit_after = collateral_deficit(new_total_minted, adapter_position_value(&*pool, bank, &adapter)?);
  let bound = solvency_bound(new_total_minted, adapter.max_slippage_bps)?;
  assert_deficit_not_widened(deficit_before, deficit_after, bound)?;
  assert_supply_conserved(bank.token(&stable_token)?)?;
  assert_supply_conserved(bank.token(&lp_token)?)?;

  let event = LiquidityRemoved {
    user: caller,
    lp_burned: lp_amount,
    stable_burned,
    amount_out,
    stable_out,
    old_total_minted,
    new_total_minted,
  };
  emit(events, event.clone());

  Ok(event)
}
