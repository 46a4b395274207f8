//! Vault-style flash lender
//!
//! Lends from its own bank balance, charges a basis-point fee and checks its
//! balance after the borrower's callback: anything short of
//! `before + fee` fails the loan.

use serde::{Deserialize, Serialize};
use tracing::debug;

use usdu::math::flash_fee;
use usdu::{require, Address, Bank, FlashBorrower, FlashLender, Result, UsduError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultLender {
  address: Address,
  assets: Vec<Address>,
  fee_bps: u64,
  loans_served: u64,
  fees_earned: u64,
}

impl VaultLender {
  pub fn new(address: Address, assets: Vec<Address>, fee_bps: u64) -> Result<Self> {
    require!(!address.is_zero(), UsduError::InvalidParameter);
    require!(fee_bps < usdu::constants::BPS_PRECISION, UsduError::InvalidParameter);

    Ok(Self {
      address,
      assets,
      fee_bps,
      loans_served: 0,
      fees_earned: 0,
    })
  }

  pub fn fee_bps(&self) -> u64 {
    self.fee_bps
  }

  pub fn loans_served(&self) -> u64 {
    self.loans_served
  }

  pub fn fees_earned(&self) -> u64 {
    self.fees_earned
  }

  fn supports(&self, token: &Address) -> bool {
    self.assets.contains(token)
  }
}

impl FlashLender for VaultLender {
  fn address(&self) -> Address {
    self.address
  }

  fn max_flash_loan(&self, bank: &Bank, token: &Address) -> u64 {
    if !self.supports(token) {
      return 0;
    }
    bank.balance_of(token, &self.address).unwrap_or(0)
  }

  fn flash_fee(&self, token: &Address, amount: u64) -> Result<u64> {
    require!(self.supports(token), UsduError::UnknownToken(token.to_string()));
    flash_fee(amount, self.fee_bps).ok_or(UsduError::Overflow)
  }

  fn flash_loan(
    &mut self,
    bank: &mut Bank,
    receiver: Address,
    borrower: &mut dyn FlashBorrower,
    token: Address,
    amount: u64,
  ) -> Result<()> {
    require!(amount > 0, UsduError::ZeroAmount);
    require!(amount <= self.max_flash_loan(bank, &token), UsduError::InsufficientLiquidity);

    let fee = self.flash_fee(&token, amount)?;
    let balance_before = bank.balance_of(&token, &self.address)?;
    let expected = balance_before.checked_add(fee).ok_or(UsduError::Overflow)?;

    bank.transfer(&token, self.address, receiver, amount)?;
    debug!(%receiver, amount, fee, "Flash loan advanced");

    borrower.on_flash_loan(bank, self.address, token, amount, fee)?;

    let balance_after = bank.balance_of(&token, &self.address)?;
    require!(balance_after >= expected, UsduError::RepaymentFailed);

    self.loans_served += 1;
    self.fees_earned = self.fees_earned.saturating_add(fee);
    debug!(%receiver, balance_after, "Flash loan settled");
    Ok(())
  }
}
