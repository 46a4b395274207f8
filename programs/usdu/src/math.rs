//! Pure mathematical functions for the USDU engine
//! All functions are deterministic and use fixed-point arithmetic
//! No external dependencies, fully testable in isolation

use serde::{Deserialize, Serialize};

use crate::constants::{BPS_PRECISION, RATE_PROBE};

/// Multiply two u64 values and divide by a third, rounding up
/// Used for conservative calculations that favor protocol solvency
/// Returns None on overflow
pub fn mul_div_up(a: u64, b: u64, c: u64) -> Option<u64> {
  if c == 0 {
    return None;
  }

  let result = (a as u128)
    .checked_mul(b as u128)?
    .checked_add((c - 1) as u128)? // we add (c - 1) before division to round up
    .checked_div(c as u128)?;

  u64::try_from(result).ok()
}

/// Multiply two u64 values and divide by a third, rounding DOWN
/// Used for conservative calculations that favor protocol solvency
/// Returns None on overflow
pub fn mul_div_down(a: u64, b: u64, c: u64) -> Option<u64> {
  if c == 0 {
    return None;
  }

  let result = (a as u128)
    .checked_mul(b as u128)?
    .checked_div(c as u128)?;

  u64::try_from(result).ok()
}

/// Convert an amount at a probed pool rate
///
/// # Arguments
/// * `amount` - Amount of the input coin
/// * `probe_out` - Output the pool quoted for `RATE_PROBE` units of input
///
/// # Returns
/// Amount of the output coin, rounded down
pub fn convert_at_rate(amount: u64, probe_out: u64) -> Option<u64> {
  mul_div_down(amount, probe_out, RATE_PROBE)
}

/// Share of `total` owned by `part / whole`, rounded up
/// Used for burn amounts so a withdrawal never under-burns
pub fn proportional_share_up(total: u64, part: u64, whole: u64) -> Option<u64> {
  mul_div_up(total, part, whole)
}

/// Share of `total` owned by `part / whole`, rounded down
/// Used for payouts so the protocol never over-pays
pub fn proportional_share_down(total: u64, part: u64, whole: u64) -> Option<u64> {
  mul_div_down(total, part, whole)
}

/// Apply a fee to an amount and return net amount + fee
///
/// # Arguments
/// * `amount` - Gross amount before fee
/// * `fee_bps` - Fee in basis points (e.g., 50 = 0.5%)
///
/// # Returns
/// (net_amount, fee_amount)
pub fn apply_fee(amount: u64, fee_bps: u64) -> Option<(u64, u64)> {
  let fee_amount = mul_div_down(amount, fee_bps, BPS_PRECISION)?;
  let net_amount = amount.checked_sub(fee_amount)?;
  Some((net_amount, fee_amount))
}

/// Fee charged on a flash loan, rounded up in the lender's favor
pub fn flash_fee(amount: u64, fee_bps: u64) -> Option<u64> {
  mul_div_up(amount, fee_bps, BPS_PRECISION)
}

/// Which coin holds the larger reserve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
  /// Stablecoin reserve exceeds the reference reserve (stablecoin trades below peg)
  StableHeavy,
  /// Reference reserve exceeds the stablecoin reserve (stablecoin trades above peg)
  ReferenceHeavy,
  Balanced,
}

/// Snapshot of how far a two-coin pool sits from an even split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Imbalance {
  pub direction: Direction,
  /// |reference - stable| / (reference + stable) in basis points
  pub bps: u64,
  /// Half of the reserve gap; the amount that would have to move to reach parity
  pub half_gap: u64,
}

/// Compute pool imbalance from reserves (both coins share decimals)
pub fn compute_imbalance(reference_reserve: u64, stable_reserve: u64) -> Imbalance {
  let total = (reference_reserve as u128) + (stable_reserve as u128);
  let gap = reference_reserve.abs_diff(stable_reserve);

  let direction = if stable_reserve > reference_reserve {
    Direction::StableHeavy
  } else if reference_reserve > stable_reserve {
    Direction::ReferenceHeavy
  } else {
    Direction::Balanced
  };

  // gap <= total, so the quotient always fits back into u64
  let bps = if total == 0 {
    0
  } else {
    ((gap as u128) * (BPS_PRECISION as u128) / total) as u64
  };

  Imbalance {
    direction,
    bps,
    half_gap: gap / 2,
  }
}
