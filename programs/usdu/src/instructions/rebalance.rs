//! Rebalance instruction - one borrow → rebalance → repay cycle
//!
//! The rebalancer borrows reference asset, uses it as working capital to move
//! liquidity out of the pool's heavy side, and repays the lender inside the
//! same callback. Alongside the liquidity the loan itself adds, the cycle
//! withdraws a slice of the rebalancer's existing LP position (capped at
//! `unwind_bps` of half the reserve gap), which is what nets the pool toward
//! parity once the loan leg is undone.
//!
//! The whole cycle is one transaction: any failure (short repayment, a pool
//! error, or an imbalance that did not shrink) unwinds every step.

use tracing::{debug, info};

use crate::address::Address;
use crate::constants::{BPS_PRECISION, RATE_PROBE, SWAP_ROUNDING_BUFFER};
use crate::error::{Result, UsduError};
use crate::events::{emit, Balanced};
use crate::flash_loan::{FlashBorrower, FlashLender, FlashLoanScope};
use crate::host::World;
use crate::instructions::pool_call;
use crate::invariants::{
  adapter_position_value, assert_deficit_not_widened, assert_imbalance_reduced, collateral_deficit, solvency_bound,
};
use crate::ledger::Bank;
use crate::math::{compute_imbalance, convert_at_rate, mul_div_down, Direction};
use crate::pool::{StableSwapPool, N_COINS};
use crate::reentrancy::ReentrancyGuard;
use crate::require;

/// What one cycle moved through the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CycleReport {
  lp_added: u64,
  /// Heavy-side coin withdrawn, in that coin's units
  withdrawn: u64,
  reference_swapped: u64,
  stable_swapped: u64,
  position_unwound: u64,
}

/// Borrower continuation run inside the lender's `flash_loan`
struct RebalanceCycle<'a, P> {
  pool: &'a mut P,
  rebalancer: Address,
  reference_token: Address,
  stable_token: Address,
  reference_index: usize,
  stable_index: usize,
  direction: Direction,
  half_gap: u64,
  unwind_bps: u64,
  report: Option<CycleReport>,
}

impl<P: StableSwapPool> RebalanceCycle<'_, P> {
  /// LP to take from the existing position on top of what the loan added
  fn unwind_lp(&self, bank: &Bank, heavy_index: usize) -> Result<u64> {
    let target = mul_div_down(self.half_gap, self.unwind_bps, BPS_PRECISION).ok_or(UsduError::Overflow)?;
    if target == 0 {
      return Ok(0);
    }

    let position = self.pool.balance_of(bank, &self.rebalancer)?;
    if position == 0 {
      return Ok(0);
    }

    let mut amounts = [0u64; N_COINS];
    amounts[heavy_index] = target;
    let lp_for_target = pool_call(self.pool.calc_token_amount(bank, amounts, false))?;

    Ok(lp_for_target.min(position))
  }

  /// Stablecoin-heavy pool: add reference, withdraw stablecoin, buy the loan back
  fn drain_stable(&mut self, bank: &mut Bank, scope: &FlashLoanScope) -> Result<CycleReport> {
    let me = self.rebalancer;
    let pool_address = self.pool.address();
    let principal = scope.principal();

    // Measured before the loan leg mints any LP
    let position_unwound = self.unwind_lp(bank, self.stable_index)?;

    bank.approve(&self.reference_token, me, pool_address, principal)?;
    let mut amounts = [0u64; N_COINS];
    amounts[self.reference_index] = principal;
    let lp_added = pool_call(self.pool.add_liquidity(bank, me, amounts, 0))?;

    let lp_out = lp_added
      .checked_add(position_unwound)
      .ok_or(UsduError::Overflow)?;
    let stable_removed = pool_call(self.pool.remove_liquidity_one_coin(bank, me, lp_out, self.stable_index, 0))?;

    let due = scope.amount_due()?;
    let wanted = due.checked_add(SWAP_ROUNDING_BUFFER).ok_or(UsduError::Overflow)?;
    let stable_in = pool_call(self.pool.get_dx(self.stable_index, self.reference_index, wanted))?;

    let stable_held = bank.balance_of(&self.stable_token, &me)?;
    require!(stable_in <= stable_held, UsduError::RepaymentFailed);

    bank.approve(&self.stable_token, me, pool_address, stable_in)?;
    let reference_swapped = pool_call(self.pool.exchange(
      bank,
      me,
      self.stable_index,
      self.reference_index,
      stable_in,
      due,
    ))?;

    debug!(lp_added, position_unwound, stable_removed, stable_in, reference_swapped, "Stable side drained");

    Ok(CycleReport {
      lp_added,
      withdrawn: stable_removed,
      reference_swapped,
      stable_swapped: stable_in,
      position_unwound,
    })
  }

  /// Reference-heavy pool: swap into stablecoin, add it, withdraw reference
  fn drain_reference(&mut self, bank: &mut Bank, scope: &FlashLoanScope) -> Result<CycleReport> {
    let me = self.rebalancer;
    let pool_address = self.pool.address();
    let principal = scope.principal();

    let position_unwound = self.unwind_lp(bank, self.reference_index)?;

    bank.approve(&self.reference_token, me, pool_address, principal)?;
    let stable_bought = pool_call(self.pool.exchange(
      bank,
      me,
      self.reference_index,
      self.stable_index,
      principal,
      0,
    ))?;

    bank.approve(&self.stable_token, me, pool_address, stable_bought)?;
    let mut amounts = [0u64; N_COINS];
    amounts[self.stable_index] = stable_bought;
    let lp_added = pool_call(self.pool.add_liquidity(bank, me, amounts, 0))?;

    let lp_out = lp_added
      .checked_add(position_unwound)
      .ok_or(UsduError::Overflow)?;
    let reference_removed =
      pool_call(self.pool.remove_liquidity_one_coin(bank, me, lp_out, self.reference_index, 0))?;

    debug!(stable_bought, lp_added, position_unwound, reference_removed, "Reference side drained");

    Ok(CycleReport {
      lp_added,
      withdrawn: reference_removed,
      reference_swapped: principal,
      stable_swapped: stable_bought,
      position_unwound,
    })
  }
}

impl<P: StableSwapPool> FlashBorrower for RebalanceCycle<'_, P> {
  fn on_flash_loan(
    &mut self,
    bank: &mut Bank,
    lender: Address,
    token: Address,
    amount: u64,
    fee: u64,
  ) -> Result<()> {
    require!(token == self.reference_token, UsduError::InvalidParameter);

    let scope = FlashLoanScope::open(lender, self.rebalancer, token, amount, fee);

    let report = match self.direction {
      Direction::StableHeavy => self.drain_stable(bank, &scope)?,
      Direction::ReferenceHeavy => self.drain_reference(bank, &scope)?,
      Direction::Balanced => return Err(UsduError::PoolAlreadyBalanced),
    };

    scope.repay(bank)?;
    self.report = Some(report);
    Ok(())
  }
}

pub fn handler<P: StableSwapPool, L: FlashLender>(
  world: &mut World<P, L>,
  caller: Address,
  flashloan_amount: u64,
) -> Result<Balanced> {
  let World {
    bank,
    pool,
    lender,
    adapter,
    rebalancer,
    events,
  } = world;
  let mut state = ReentrancyGuard::new(rebalancer)?;

  require!(caller == state.authority, UsduError::Unauthorized);
  require!(flashloan_amount > 0, UsduError::ZeroAmount);

  let reference_index = state.reference_index;
  let stable_index = state.stable_index;

  let reserves = pool.get_balances();
  let before = compute_imbalance(reserves[reference_index], reserves[stable_index]);
  require!(
    before.direction != Direction::Balanced && before.bps > state.balance_tolerance_bps,
    UsduError::PoolAlreadyBalanced
  );

  // Moving the pool price revalues the adapter position; measured on both sides of the cycle
  let deficit_before = collateral_deficit(adapter.total_minted, adapter_position_value(&*pool, bank, adapter)?);

  let available = lender.max_flash_loan(bank, &state.reference_token);
  require!(flashloan_amount <= available, UsduError::InsufficientLiquidity);
  let fee = lender.flash_fee(&state.reference_token, flashloan_amount)?;

  info!(
    direction = ?before.direction,
    imbalance_bps = before.bps,
    flashloan_amount,
    fee,
    "Rebalance cycle starting"
  );

  let mut cycle = RebalanceCycle {
    pool: &mut *pool,
    rebalancer: state.address,
    reference_token: state.reference_token,
    stable_token: state.stable_token,
    reference_index,
    stable_index,
    direction: before.direction,
    half_gap: before.half_gap,
    unwind_bps: state.unwind_bps,
    report: None,
  };
  lender.flash_loan(bank, state.address, &mut cycle, state.reference_token, flashloan_amount)?;

  // A lender that returns without running the callback never lent anything
  let report = cycle.report.ok_or(UsduError::RepaymentFailed)?;

  let reserves = pool.get_balances();
  let after = compute_imbalance(reserves[reference_index], reserves[stable_index]);
  assert_imbalance_reduced(before.bps, after.bps)?;

  let deficit_after = collateral_deficit(adapter.total_minted, adapter_position_value(&*pool, bank, adapter)?);
  let bound = solvency_bound(adapter.total_minted, adapter.max_slippage_bps)?;
  assert_deficit_not_widened(deficit_before, deficit_after, bound)?;

  // Receipts report liquidity removed on the stablecoin side
  let lp_removed = match before.direction {
    Direction::ReferenceHeavy => {
      let rate = pool_call(pool.get_dy(reference_index, stable_index, RATE_PROBE))?;
      convert_at_rate(report.withdrawn, rate).ok_or(UsduError::Overflow)?
    }
    _ => report.withdrawn,
  };

  state.operation_counter = state.operation_counter.saturating_add(1);

  let receipt = Balanced {
    flashloan_amount,
    lp_added: report.lp_added,
    lp_removed,
    heavy_withdrawn: report.withdrawn,
    reference_swapped: report.reference_swapped,
    stable_swapped: report.stable_swapped,
    fee,
    direction: before.direction,
    position_unwound: report.position_unwound,
    imbalance_before_bps: before.bps,
    imbalance_after_bps: after.bps,
  };
  info!(imbalance_after_bps = after.bps, "Rebalance cycle complete");
  emit(events, receipt.clone());

  Ok(receipt)
}
