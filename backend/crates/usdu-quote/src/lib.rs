//! Read-only previews of engine operations
//!
//! Quotes use the same pool calls and rounding as the engine handlers, so a
//! quote taken against a world matches what the operation would do against
//! that same world. Nothing here mutates state.

use serde::{Deserialize, Serialize};

use usdu::constants::{BPS_PRECISION, RATE_PROBE};
use usdu::math::{compute_imbalance, convert_at_rate, mul_div_down, proportional_share_down, proportional_share_up};
use usdu::{AdapterState, Bank, DepositMode, Direction, Imbalance, Result, StableSwapPool, UsduError, N_COINS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositQuote {
  pub rate: u64,
  pub stable_minted: u64,
  pub stable_pooled: u64,
  pub lp_estimate: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalQuote {
  pub stable_burned: u64,
  pub amount_out: u64,
  pub stable_out: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemQuote {
  pub lp_withdrawn: u64,
  pub amount_out: u64,
}

/// Stablecoin a deposit of `amount` reference asset would mint
pub fn quote_deposit<P: StableSwapPool>(
  pool: &P,
  bank: &Bank,
  adapter: &AdapterState,
  amount: u64,
) -> Result<DepositQuote> {
  if amount == 0 {
    return Err(UsduError::ZeroAmount);
  }

  let rate = pool.get_dy(adapter.reference_index, adapter.stable_index, RATE_PROBE)?;
  let stable_minted = convert_at_rate(amount, rate).ok_or(UsduError::Overflow)?;

  let reserves = pool.get_balances();
  let stable_pooled = match adapter.deposit_mode {
    DepositMode::SingleSided => 0,
    DepositMode::Balanced if reserves[adapter.reference_index] == 0 => 0,
    DepositMode::Balanced => mul_div_down(
      amount,
      reserves[adapter.stable_index],
      reserves[adapter.reference_index],
    )
    .ok_or(UsduError::Overflow)?,
  };

  let mut amounts = [0u64; N_COINS];
  amounts[adapter.reference_index] = amount;
  amounts[adapter.stable_index] = stable_pooled;
  let lp_estimate = pool.calc_token_amount(bank, amounts, true)?;

  Ok(DepositQuote {
    rate,
    stable_minted,
    stable_pooled,
    lp_estimate,
  })
}

/// Burn share and payout for withdrawing `lp_amount` through the adapter
pub fn quote_remove_liquidity<P: StableSwapPool>(
  pool: &P,
  bank: &Bank,
  adapter: &AdapterState,
  lp_amount: u64,
) -> Result<WithdrawalQuote> {
  if lp_amount == 0 {
    return Err(UsduError::ZeroAmount);
  }
  let supply = pool.lp_total_supply(bank)?;
  if lp_amount > supply {
    return Err(UsduError::InvalidAmount);
  }

  let reserves = pool.get_balances();
  let share = |total: u64| proportional_share_down(total, lp_amount, supply).ok_or(UsduError::Overflow);

  Ok(WithdrawalQuote {
    stable_burned: proportional_share_up(adapter.total_minted, lp_amount, supply).ok_or(UsduError::Overflow)?,
    amount_out: share(reserves[adapter.reference_index])?,
    stable_out: share(reserves[adapter.stable_index])?,
  })
}

/// Reference asset returned for redeeming `stable_amount`
pub fn quote_redeem<P: StableSwapPool>(
  pool: &P,
  bank: &Bank,
  adapter: &AdapterState,
  stable_amount: u64,
) -> Result<RedeemQuote> {
  if stable_amount == 0 {
    return Err(UsduError::ZeroAmount);
  }
  if stable_amount > adapter.total_minted {
    return Err(UsduError::InsufficientMintedBalance);
  }

  let adapter_lp = pool.balance_of(bank, &adapter.address)?;
  let lp_withdrawn =
    proportional_share_down(adapter_lp, stable_amount, adapter.total_minted).ok_or(UsduError::Overflow)?;
  if lp_withdrawn == 0 {
    return Err(UsduError::InvalidAmount);
  }

  Ok(RedeemQuote {
    lp_withdrawn,
    amount_out: pool.calc_withdraw_one_coin(bank, lp_withdrawn, adapter.reference_index)?,
  })
}

pub fn pool_imbalance<P: StableSwapPool>(pool: &P, reference_index: usize, stable_index: usize) -> Imbalance {
  let reserves = pool.get_balances();
  compute_imbalance(reserves[reference_index], reserves[stable_index])
}

/// Loan size for one cycle: half the reserve gap, capped by `max_amount` and lender liquidity
///
/// The loan is working capital, so sizing it to the gap keeps the loan leg
/// comparable to the correction without paying fees on idle principal.
pub fn suggest_flashloan_amount(imbalance: &Imbalance, tolerance_bps: u64, max_amount: u64, available: u64) -> u64 {
  if imbalance.direction == Direction::Balanced || imbalance.bps <= tolerance_bps.min(BPS_PRECISION) {
    return 0;
  }
  imbalance.half_gap.min(max_amount).min(available)
}
