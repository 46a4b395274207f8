//! StableSwap invariant math for a two-coin pool
//! Both coins share decimals, so raw balances are the normalized balances
//! All intermediate arithmetic runs in u128 with checked operations

use thiserror::Error;

use usdu::UsduError;

pub const N_COINS: u128 = 2;
pub const FEE_DENOMINATOR: u128 = 10_000;
const MAX_ITERATIONS: usize = 255;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MathError {
  #[error("invariant iteration did not converge")]
  NotConverged,

  #[error("math overflow")]
  Overflow,

  #[error("pool reserves are empty")]
  EmptyPool,

  #[error("invalid coin index")]
  InvalidIndex,
}

impl From<MathError> for UsduError {
  fn from(err: MathError) -> Self {
    UsduError::PoolInteractionFailed(err.to_string())
  }
}

pub type MathResult<T> = Result<T, MathError>;

fn mul(a: u128, b: u128) -> MathResult<u128> {
  a.checked_mul(b).ok_or(MathError::Overflow)
}

fn div(a: u128, b: u128) -> MathResult<u128> {
  a.checked_div(b).ok_or(MathError::Overflow)
}

fn add(a: u128, b: u128) -> MathResult<u128> {
  a.checked_add(b).ok_or(MathError::Overflow)
}

fn sub(a: u128, b: u128) -> MathResult<u128> {
  a.checked_sub(b).ok_or(MathError::Overflow)
}

pub fn check_indices(i: usize, j: usize) -> MathResult<()> {
  if i == j || i >= N_COINS as usize || j >= N_COINS as usize {
    return Err(MathError::InvalidIndex);
  }
  Ok(())
}

/// Invariant D for balances `xp`, by Newton iteration
pub fn get_d(xp: [u128; 2], amp: u128) -> MathResult<u128> {
  let s = add(xp[0], xp[1])?;
  if s == 0 {
    return Ok(0);
  }
  if xp[0] == 0 || xp[1] == 0 {
    return Err(MathError::EmptyPool);
  }

  let ann = mul(amp, N_COINS)?;
  let mut d = s;

  for _ in 0..MAX_ITERATIONS {
    let mut d_p = d;
    for x in xp {
      d_p = div(mul(d_p, d)?, mul(x, N_COINS)?)?;
    }

    let d_prev = d;
    let numerator = mul(add(mul(ann, s)?, mul(d_p, N_COINS)?)?, d)?;
    let denominator = add(mul(sub(ann, 1)?, d)?, mul(N_COINS + 1, d_p)?)?;
    d = div(numerator, denominator)?;

    if d.abs_diff(d_prev) <= 1 {
      return Ok(d);
    }
  }

  Err(MathError::NotConverged)
}

/// Balance of coin `j` that keeps invariant `d` when the other coin holds `x`
fn solve_y(x: u128, d: u128, amp: u128) -> MathResult<u128> {
  if x == 0 {
    return Err(MathError::EmptyPool);
  }

  let ann = mul(amp, N_COINS)?;

  let mut c = div(mul(d, d)?, mul(x, N_COINS)?)?;
  c = div(mul(c, d)?, mul(ann, N_COINS)?)?;
  let b = add(x, div(d, ann)?)?;

  let mut y = d;
  for _ in 0..MAX_ITERATIONS {
    let y_prev = y;
    let numerator = add(mul(y, y)?, c)?;
    let denominator = sub(add(mul(2, y)?, b)?, d)?;
    y = div(numerator, denominator)?;

    if y.abs_diff(y_prev) <= 1 {
      return Ok(y);
    }
  }

  Err(MathError::NotConverged)
}

/// New balance of coin `j` after coin `i` moves to `x`, holding D fixed
pub fn get_y(i: usize, j: usize, x: u128, xp: [u128; 2], amp: u128) -> MathResult<u128> {
  check_indices(i, j)?;
  let d = get_d(xp, amp)?;
  solve_y(x, d, amp)
}

/// Balance of coin `i` that satisfies invariant `d` with the other coin unchanged
pub fn get_y_d(i: usize, xp: [u128; 2], d: u128, amp: u128) -> MathResult<u128> {
  if i >= N_COINS as usize {
    return Err(MathError::InvalidIndex);
  }
  solve_y(xp[1 - i], d, amp)
}

/// Fee charged on the imbalanced part of a deposit or withdrawal
pub fn imbalance_fee_bps(fee_bps: u128) -> u128 {
  fee_bps * N_COINS / (4 * (N_COINS - 1))
}

/// Swap output and fee for `dx` of coin `i` into coin `j`
pub fn swap_out(i: usize, j: usize, dx: u128, xp: [u128; 2], amp: u128, fee_bps: u128) -> MathResult<(u128, u128)> {
  check_indices(i, j)?;
  if xp[i] == 0 || xp[j] == 0 {
    return Err(MathError::EmptyPool);
  }
  let x = add(xp[i], dx)?;
  let y = get_y(i, j, x, xp, amp)?;

  // -1 guards against rounding in the pool's favor
  let dy = sub(sub(xp[j], y)?, 1)?;
  let fee = div(mul(dy, fee_bps)?, FEE_DENOMINATOR)?;
  Ok((dy - fee, fee))
}

/// Input of coin `i` needed for `dy` of coin `j` out, rounded up
pub fn swap_in(i: usize, j: usize, dy: u128, xp: [u128; 2], amp: u128, fee_bps: u128) -> MathResult<u128> {
  check_indices(i, j)?;
  if xp[i] == 0 || xp[j] == 0 {
    return Err(MathError::EmptyPool);
  }
  let dy_with_fee = add(div(mul(dy, FEE_DENOMINATOR)?, sub(FEE_DENOMINATOR, fee_bps)?)?, 1)?;
  let y = sub(xp[j], dy_with_fee)?;
  let x = get_y(j, i, y, xp, amp)?;
  add(sub(x, xp[i])?, 1)
}

/// Single-coin withdrawal of `lp_amount`: (amount out, fee kept by the pool)
pub fn withdraw_one_coin(
  lp_amount: u128,
  i: usize,
  xp: [u128; 2],
  lp_supply: u128,
  amp: u128,
  fee_bps: u128,
) -> MathResult<(u128, u128)> {
  if lp_amount >= lp_supply {
    return Err(MathError::EmptyPool);
  }

  let d0 = get_d(xp, amp)?;
  let d1 = sub(d0, div(mul(lp_amount, d0)?, lp_supply)?)?;
  let new_y = get_y_d(i, xp, d1, amp)?;
  let fee_rate = imbalance_fee_bps(fee_bps);

  let mut xp_reduced = xp;
  for (k, reduced) in xp_reduced.iter_mut().enumerate() {
    let scaled = div(mul(xp[k], d1)?, d0)?;
    let dx_expected = if k == i {
      sub(scaled, new_y)?
    } else {
      sub(xp[k], scaled)?
    };
    *reduced = sub(*reduced, div(mul(fee_rate, dx_expected)?, FEE_DENOMINATOR)?)?;
  }

  let dy = sub(sub(xp_reduced[i], get_y_d(i, xp_reduced, d1, amp)?)?, 1)?;
  let dy_without_fee = sub(xp[i], new_y)?;
  Ok((dy, dy_without_fee.saturating_sub(dy)))
}
