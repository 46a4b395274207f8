//! Deposit instruction - mints USDU against reference asset added to the pool
//! The mint is priced at the pool's own rate, read before the pool is touched,
//! so an off-peg pool cannot be used to mint at a discount

use tracing::debug;

use crate::address::Address;
use crate::constants::RATE_PROBE;
use crate::error::{Result, UsduError};
use crate::events::{emit, Deposited};
use crate::host::World;
use crate::instructions::pool_call;
use crate::invariants::{
  adapter_position_value, assert_solvent, assert_supply_conserved, redeemable_stable_value, solvency_bound,
};
use crate::math::{convert_at_rate, mul_div_down};
use crate::pool::{StableSwapPool, N_COINS};
use crate::reentrancy::ReentrancyGuard;
use crate::require;
use crate::state::DepositMode;

pub fn handler<P: StableSwapPool, L>(
  world: &mut World<P, L>,
  caller: Address,
  amount: u64,
  min_stable_out: u64,
) -> Result<Deposited> {
  let World {
    bank,
    pool,
    adapter,
    events,
    ..
  } = world;
  let mut adapter = ReentrancyGuard::new(adapter)?;

  require!(amount > 0, UsduError::ZeroAmount);

  let me = adapter.address;
  let reference_token = adapter.reference_token;
  let stable_token = adapter.stable_token;
  let reference_index = adapter.reference_index;
  let stable_index = adapter.stable_index;

  // All pricing reads happen before any external call

  let rate_used = pool_call(pool.get_dy(reference_index, stable_index, RATE_PROBE))?;
  let stable_minted = convert_at_rate(amount, rate_used).ok_or(UsduError::Overflow)?;

  debug!(amount, rate_used, stable_minted, "Deposit priced");

  require!(stable_minted > 0, UsduError::InvalidAmount);
  require!(stable_minted >= min_stable_out, UsduError::SlippageExceeded);

  let stable_pooled = match adapter.deposit_mode {
    DepositMode::SingleSided => 0,
    DepositMode::Balanced => {
      let reserves = pool.get_balances();
      if reserves[reference_index] == 0 {
        0
      } else {
        mul_div_down(amount, reserves[stable_index], reserves[reference_index])
          .ok_or(UsduError::Overflow)?
      }
    }
  };

  let old_total_minted = adapter.total_minted;
  let minted_now = stable_minted
    .checked_add(stable_pooled)
    .ok_or(UsduError::Overflow)?;
  let new_total_minted = old_total_minted
    .checked_add(minted_now)
    .ok_or(UsduError::Overflow)?;

  // External calls

  bank.transfer_from(&reference_token, me, caller, me, amount)?;
  bank.approve(&reference_token, me, pool.address(), amount)?;

  if stable_pooled > 0 {
    bank.mint(&stable_token, me, me, stable_pooled)?;
    bank.approve(&stable_token, me, pool.address(), stable_pooled)?;
  }

  let mut amounts = [0u64; N_COINS];
  amounts[reference_index] = amount;
  amounts[stable_index] = stable_pooled;

  let lp_received = pool_call(pool.add_liquidity(bank, me, amounts, 0))?;
  debug!(lp_received, stable_pooled, "Liquidity added");

  bank.mint(&stable_token, me, caller, stable_minted)?;

  adapter.total_minted = new_total_minted;
  adapter.operation_counter = adapter.operation_counter.saturating_add(1);

  // INVARIANTS: the LP just received must back what was just minted, and
  // minting never lands in a position that is under water as a whole
  let added_value = redeemable_stable_value(&*pool, bank, lp_received, reference_index, stable_index)?;
  let marginal_bound = solvency_bound(minted_now, adapter.max_slippage_bps)?;
  assert_solvent(minted_now, added_value, marginal_bound)?;

  let position_value = adapter_position_value(&*pool, bank, &adapter)?;
  let position_bound = solvency_bound(new_total_minted, adapter.max_slippage_bps)?;
  assert_solvent(new_total_minted, position_value, position_bound)?;
  assert_supply_conserved(bank.token(&stable_token)?)?;

  let event = Deposited {
    user: caller,
    amount_in: amount,
    stable_minted,
    stable_pooled,
    lp_received,
    rate_used,
    old_total_minted,
    new_total_minted,
  };
  emit(events, event.clone());

  Ok(event)
}
