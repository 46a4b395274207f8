//! Flash-loan collaborator interface and the scoped repayment guard
//!
//! A lender advances funds, hands control to the borrower's callback and
//! requires `amount + fee` back before `flash_loan` returns. Borrowers open a
//! `FlashLoanScope` at the top of the callback; the scope is the only way to
//! settle, and a scope dropped without settling marks the cycle as failed.

use tracing::{debug, warn};

use crate::address::Address;
use crate::error::{Result, UsduError};
use crate::ledger::Bank;

pub trait FlashBorrower {
  /// Continuation invoked by the lender after `amount` has been sent to the borrower
  fn on_flash_loan(
    &mut self,
    bank: &mut Bank,
    lender: Address,
    token: Address,
    amount: u64,
    fee: u64,
  ) -> Result<()>;
}

pub trait FlashLender {
  fn address(&self) -> Address;

  /// Largest loan currently available in `token`
  fn max_flash_loan(&self, bank: &Bank, token: &Address) -> u64;

  fn flash_fee(&self, token: &Address, amount: u64) -> Result<u64>;

  /// Advance `amount` of `token` to `receiver`, run the borrower, then demand repayment.
  /// Fails with `RepaymentFailed` if `amount + fee` did not come back.
  fn flash_loan(
    &mut self,
    bank: &mut Bank,
    receiver: Address,
    borrower: &mut dyn FlashBorrower,
    token: Address,
    amount: u64,
  ) -> Result<()>;
}

/// Outstanding loan held by a borrower for the duration of its callback
#[must_use = "a flash loan scope must be repaid"]
#[derive(Debug)]
pub struct FlashLoanScope {
  lender: Address,
  borrower: Address,
  token: Address,
  principal: u64,
  fee: u64,
  settled: bool,
}

impl FlashLoanScope {
  pub fn open(lender: Address, borrower: Address, token: Address, principal: u64, fee: u64) -> Self {
    debug!(%lender, %borrower, principal, fee, "Flash loan scope opened");
    Self {
      lender,
      borrower,
      token,
      principal,
      fee,
      settled: false,
    }
  }

  pub fn principal(&self) -> u64 {
    self.principal
  }

  pub fn fee(&self) -> u64 {
    self.fee
  }

  /// Principal plus fee owed back to the lender
  pub fn amount_due(&self) -> Result<u64> {
    self.principal.checked_add(self.fee).ok_or(UsduError::Overflow)
  }

  /// Return principal + fee to the lender, closing the scope
  pub fn repay(mut self, bank: &mut Bank) -> Result<u64> {
    let due = self.amount_due()?;
    bank
      .transfer(&self.token, self.borrower, self.lender, due)
      .map_err(|_| UsduError::RepaymentFailed)?;

    self.settled = true;
    debug!(lender = %self.lender, due, "Flash loan repaid");
    Ok(due)
  }
}

impl Drop for FlashLoanScope {
  fn drop(&mut self) {
    if !self.settled {
      warn!(
        lender = %self.lender,
        principal = self.principal,
        fee = self.fee,
        "Flash loan scope dropped without repayment - cycle will abort"
      );
    }
  }
}
