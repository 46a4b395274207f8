use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsduError {
  #[error("Caller lacks the role required for this operation")]
  Unauthorized,

  #[error("Amount must be greater than zero")]
  ZeroAmount,

  #[error("Amount is outside the range accepted by this operation")]
  InvalidAmount,

  #[error("Insufficient token balance to complete this operation")]
  InsufficientBalance,

  #[error("Insufficient allowance - approve the spender first")]
  InsufficientAllowance,

  #[error("Stablecoin balance is below the amount that must be burned for this withdrawal")]
  InsufficientMintedBalance,

  #[error("Slippage tolerance exceeded - actual output is below your minimum")]
  SlippageExceeded,

  #[error("Pool interaction failed: {0}")]
  PoolInteractionFailed(String),

  #[error("Flash loan could not be repaid with its fee")]
  RepaymentFailed,

  #[error("Math overflow occurred - values exceeded u64 bounds")]
  Overflow,

  #[error("Reentrancy detected - operation blocked")]
  Reentrancy,

  #[error("Minted supply would exceed the value redeemable from the adapter position")]
  SolvencyViolation,

  #[error("Token is not registered: {0}")]
  UnknownToken(String),

  #[error("Invalid parameter value provided")]
  InvalidParameter,

  #[error("Lending source does not hold enough liquidity for this loan")]
  InsufficientLiquidity,

  #[error("Pool is already within the balance tolerance")]
  PoolAlreadyBalanced,

  #[error("Rebalance cycle did not reduce the pool imbalance")]
  ImbalanceNotReduced,

  #[error("Ledger balances do not sum to total supply")]
  SupplyMismatch,
}

pub type Result<T> = std::result::Result<T, UsduError>;

/// Early-return with the given error when the condition does not hold.
#[macro_export]
macro_rules! require {
  ($cond:expr, $err:expr $(,)?) => {
    if !($cond) {
      return Err($err);
    }
  };
}
