//! Core protocol instructions
//! Each instruction enforces invariants and updates the minted-supply ledger

pub mod admin;
pub mod deposit;
pub mod initialize;
pub mod rebalance;
pub mod redeem;
pub mod remove_liquidity;

use crate::error::{Result, UsduError};

/// Normalize a pool call's failure
///
/// Slippage floors keep their own error so callers can tell them apart;
/// every other failure inside the pool surfaces as `PoolInteractionFailed`.
pub(crate) fn pool_call<T>(result: Result<T>) -> Result<T> {
  result.map_err(|err| match err {
    UsduError::SlippageExceeded => UsduError::SlippageExceeded,
    UsduError::PoolInteractionFailed(reason) => UsduError::PoolInteractionFailed(reason),
    other => UsduError::PoolInteractionFailed(other.to_string()),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pool_call_keeps_slippage() {
    let result: Result<()> = pool_call(Err(UsduError::SlippageExceeded));
    assert_eq!(result, Err(UsduError::SlippageExceeded));
  }

  #[test]
  fn test_pool_call_wraps_other_failures() {
    let result: Result<()> = pool_call(Err(UsduError::InsufficientAllowance));
    assert!(matches!(result, Err(UsduError::PoolInteractionFailed(reason)) if reason.contains("allowance")));
  }
}
