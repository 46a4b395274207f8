//! USDU stablecoin engine
//!
//! Two components share one atomic host:
//! - the stable adapter mints USDU against reference asset it deposits into a
//!   two-coin StableSwap pool and burns it again on withdrawal
//! - the liquidity rebalancer runs borrow → rebalance → repay cycles that pull
//!   the pool back toward parity
//!
//! The pool and the flash lender are external collaborators behind the
//! `StableSwapPool` and `FlashLender` traits.

pub mod address;
pub mod constants;
pub mod error;
pub mod events;
pub mod flash_loan;
pub mod host;
pub mod instructions;
pub mod invariants;
pub mod ledger;
pub mod math;
pub mod pool;
pub mod reentrancy;
pub mod state;

pub use address::Address;
pub use error::{Result, UsduError};
pub use events::{Balanced, UsduEvent};
pub use flash_loan::{FlashBorrower, FlashLender, FlashLoanScope};
pub use host::{Host, World};
pub use instructions::admin::ParameterUpdate;
pub use instructions::initialize::{AdapterConfig, RebalancerConfig};
pub use ledger::{Bank, Token};
pub use math::{Direction, Imbalance};
pub use pool::{StableSwapPool, N_COINS};
pub use state::{AdapterState, DepositMode, RebalancerState};
