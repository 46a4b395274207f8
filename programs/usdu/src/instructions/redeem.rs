//! Redeem instruction - burns USDU for reference asset
//! Unwinds the matching slice of the adapter's own LP position single-sided

use tracing::debug;

use crate::address::Address;
use crate::error::{Result, UsduError};
use crate::events::{emit, Redeemed};
use crate::host::World;
use crate::instructions::pool_call;
use crate::invariants::{
  adapter_position_value, assert_deficit_not_widened, assert_minted_covers, assert_supply_conserved,
  collateral_deficit, solvency_bound,
};
use crate::math::proportional_share_down;
use crate::pool::StableSwapPool;
use crate::reentrancy::ReentrancyGuard;
use crate::require;

pub fn handler<P: StableSwapPool, L>(
  world: &mut World<P, L>,
  caller: Address,
  stable_amount: u64,
  min_out: u64,
) -> Result<Redeemed> {
  let World {
    bank,
    pool,
    adapter,
    events,
    ..
  } = world;
  let mut adapter = ReentrancyGuard::new(adapter)?;

  require!(stable_amount > 0, UsduError::ZeroAmount);

  let me = adapter.address;
  let reference_token = adapter.reference_token;
  let stable_token = adapter.stable_token;
  let reference_index = adapter.reference_index;

  let old_total_minted = adapter.total_minted;
  assert_minted_covers(old_total_minted, stable_amount)?;

  let caller_stable = bank.balance_of(&stable_token, &caller)?;
  require!(caller_stable >= stable_amount, UsduError::InsufficientBalance);

  // Payout rounds down so the remaining holders keep full backing
  let adapter_lp = pool.balance_of(bank, &me)?;
  let lp_withdrawn = proportional_share_down(adapter_lp, stable_amount, old_total_minted)
    .ok_or(UsduError::Overflow)?;
  require!(lp_withdrawn > 0, UsduError::InvalidAmount);

  let deficit_before = collateral_deficit(old_total_minted, adapter_position_value(&*pool, bank, &adapter)?);

  debug!(stable_amount, adapter_lp, lp_withdrawn, deficit_before, "Redemption share computed");

  bank.burn(&stable_token, me, caller, stable_amount)?;
  let new_total_minted = old_total_minted - stable_amount;
  adapter.total_minted = new_total_minted;

  // External calls

  let amount_out = pool_call(pool.remove_liquidity_one_coin(
    bank,
    me,
    lp_withdrawn,
    reference_index,
    min_out,
  ))?;
  require!(amount_out >= min_out, UsduError::SlippageExceeded);

  bank.transfer(&reference_token, me, caller, amount_out)?;
  adapter.operation_counter = adapter.operation_counter.saturating_add(1);

  // INVARIANTS
  let deficit_after = collateral_deficit(new_total_minted, adapter_position_value(&*pool, bank, &adapter)?);
  let bound = solvency_bound(new_total_minted, adapter.max_slippage_bps)?;
  assert_deficit_not_widened(deficit_before, deficit_after, bound)?;
  assert_supply_conserved(bank.token(&stable_token)?)?;

  let event = Redeemed {
    user: caller,
    stable_burned: stable_amount,
    lp_withdrawn,
    amount_out,
    old_total_minted,
    new_total_minted,
  };
  emit(events, event.clone());

  Ok(event)
}
