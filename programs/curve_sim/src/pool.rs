//! In-memory two-coin StableSwap pool settling against a `Bank`
//!
//! The pool holds its coins in the bank under its own address and is the
//! controller of its LP token, registered under the same address. Admin fees
//! are zero: every swap and imbalance fee stays in the reserves.

use serde::{Deserialize, Serialize};
use tracing::debug;

use usdu::{Address, Bank, Result, StableSwapPool, Token, UsduError, N_COINS};

use crate::math::{self, MathError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveStableSwap {
  address: Address,
  coins: [Address; N_COINS],
  balances: [u64; N_COINS],
  amp: u64,
  fee_bps: u64,
}

fn widen(balances: [u64; N_COINS]) -> [u128; 2] {
  [balances[0] as u128, balances[1] as u128]
}

fn narrow(value: u128) -> Result<u64> {
  u64::try_from(value).map_err(|_| MathError::Overflow.into())
}

impl CurveStableSwap {
  /// Create the pool and register its LP token in `bank`
  pub fn deploy(
    bank: &mut Bank,
    address: Address,
    coins: [Address; N_COINS],
    amp: u64,
    fee_bps: u64,
  ) -> Result<Self> {
    if coins[0] == coins[1] || amp == 0 || fee_bps >= math::FEE_DENOMINATOR as u64 {
      return Err(UsduError::InvalidParameter);
    }

    let decimals = bank.token(&coins[0])?.decimals;
    let symbol = format!("{}{}-LP", bank.token(&coins[0])?.symbol, bank.token(&coins[1])?.symbol);
    bank.register(Token::new(address, symbol, decimals, address))?;

    debug!(%address, amp, fee_bps, "StableSwap pool deployed");

    Ok(Self {
      address,
      coins,
      balances: [0; N_COINS],
      amp,
      fee_bps,
    })
  }

  pub fn amp(&self) -> u64 {
    self.amp
  }

  pub fn fee_bps(&self) -> u64 {
    self.fee_bps
  }

  fn xp(&self) -> [u128; 2] {
    widen(self.balances)
  }

  fn d(&self, balances: [u64; N_COINS]) -> Result<u128> {
    Ok(math::get_d(widen(balances), self.amp as u128)?)
  }
}

impl StableSwapPool for CurveStableSwap {
  fn address(&self) -> Address {
    self.address
  }

  fn coins(&self) -> [Address; N_COINS] {
    self.coins
  }

  fn get_balances(&self) -> [u64; N_COINS] {
    self.balances
  }

  fn get_dy(&self, i: usize, j: usize, dx: u64) -> Result<u64> {
    let (dy, _) = math::swap_out(i, j, dx as u128, self.xp(), self.amp as u128, self.fee_bps as u128)?;
    narrow(dy)
  }

  fn get_dx(&self, i: usize, j: usize, dy: u64) -> Result<u64> {
    let dx = math::swap_in(i, j, dy as u128, self.xp(), self.amp as u128, self.fee_bps as u128)?;
    narrow(dx)
  }

  fn calc_token_amount(&self, bank: &Bank, amounts: [u64; N_COINS], is_deposit: bool) -> Result<u64> {
    let supply = self.lp_total_supply(bank)? as u128;
    let d0 = self.d(self.balances)?;

    let mut next = self.balances;
    for (balance, amount) in next.iter_mut().zip(amounts) {
      *balance = if is_deposit {
        balance.checked_add(amount).ok_or(UsduError::Overflow)?
      } else {
        balance.checked_sub(amount).ok_or(UsduError::InvalidAmount)?
      };
    }
    let d1 = self.d(next)?;

    if supply == 0 {
      return narrow(d1);
    }

    let diff = d1.abs_diff(d0);
    narrow(diff * supply / d0)
  }

  fn calc_withdraw_one_coin(&self, bank: &Bank, lp_amount: u64, i: usize) -> Result<u64> {
    let supply = self.lp_total_supply(bank)? as u128;
    let (dy, _) = math::withdraw_one_coin(
      lp_amount as u128,
      i,
      self.xp(),
      supply,
      self.amp as u128,
      self.fee_bps as u128,
    )?;
    narrow(dy)
  }

  fn add_liquidity(
    &mut self,
    bank: &mut Bank,
    caller: Address,
    amounts: [u64; N_COINS],
    min_mint_amount: u64,
  ) -> Result<u64> {
    let supply = self.lp_total_supply(bank)? as u128;
    let old = self.balances;

    let mut new = old;
    for (balance, amount) in new.iter_mut().zip(amounts) {
      *balance = balance.checked_add(amount).ok_or(UsduError::Overflow)?;
    }

    let minted = if supply == 0 {
      // First deposit sets the price and needs both coins
      if amounts.iter().any(|amount| *amount == 0) {
        return Err(UsduError::PoolInteractionFailed("initial deposit requires all coins".into()));
      }
      self.d(new)?
    } else {
      let d0 = self.d(old)?;
      let d1 = self.d(new)?;
      if d1 <= d0 {
        return Err(UsduError::InvalidAmount);
      }

      // Imbalance fee, charged against the part of the deposit that skews the pool
      let fee_rate = math::imbalance_fee_bps(self.fee_bps as u128);
      let mut after_fees = [0u128; 2];
      for k in 0..N_COINS {
        let ideal = d1 * old[k] as u128 / d0;
        let difference = ideal.abs_diff(new[k] as u128);
        let fee = fee_rate * difference / math::FEE_DENOMINATOR;
        after_fees[k] = (new[k] as u128).saturating_sub(fee);
      }
      let d2 = math::get_d(after_fees, self.amp as u128)?;

      supply * d2.saturating_sub(d0) / d0
    };

    let minted = narrow(minted)?;
    if minted < min_mint_amount {
      return Err(UsduError::SlippageExceeded);
    }
    if minted == 0 {
      return Err(UsduError::InvalidAmount);
    }

    for (coin, amount) in self.coins.iter().zip(amounts) {
      if amount > 0 {
        bank.transfer_from(coin, self.address, caller, self.address, amount)?;
      }
    }
    bank.mint(&self.address, self.address, caller, minted)?;
    self.balances = new;

    debug!(%caller, ?amounts, minted, "Liquidity added");
    Ok(minted)
  }

  fn remove_liquidity(
    &mut self,
    bank: &mut Bank,
    caller: Address,
    lp_amount: u64,
    min_amounts: [u64; N_COINS],
  ) -> Result<[u64; N_COINS]> {
    if lp_amount == 0 {
      return Err(UsduError::ZeroAmount);
    }
    let supply = self.lp_total_supply(bank)?;
    if supply == 0 {
      return Err(MathError::EmptyPool.into());
    }
    if lp_amount > supply {
      return Err(UsduError::InvalidAmount);
    }

    let mut amounts = [0u64; N_COINS];
    for k in 0..N_COINS {
      // floor: the pool never pays out more than the share
      let value = (self.balances[k] as u128) * (lp_amount as u128) / (supply as u128);
      amounts[k] = narrow(value)?;
      if amounts[k] < min_amounts[k] {
        return Err(UsduError::SlippageExceeded);
      }
    }

    bank.burn(&self.address, self.address, caller, lp_amount)?;
    for k in 0..N_COINS {
      self.balances[k] -= amounts[k];
      bank.transfer(&self.coins[k], self.address, caller, amounts[k])?;
    }

    debug!(%caller, lp_amount, ?amounts, "Liquidity removed");
    Ok(amounts)
  }

  fn remove_liquidity_one_coin(
    &mut self,
    bank: &mut Bank,
    caller: Address,
    lp_amount: u64,
    i: usize,
    min_amount: u64,
  ) -> Result<u64> {
    let supply = self.lp_total_supply(bank)? as u128;
    let (dy, fee) = math::withdraw_one_coin(
      lp_amount as u128,
      i,
      self.xp(),
      supply,
      self.amp as u128,
      self.fee_bps as u128,
    )?;
    let dy = narrow(dy)?;
    if dy < min_amount {
      return Err(UsduError::SlippageExceeded);
    }

    bank.burn(&self.address, self.address, caller, lp_amount)?;
    self.balances[i] -= dy;
    bank.transfer(&self.coins[i], self.address, caller, dy)?;

    debug!(%caller, lp_amount, coin = i, dy, fee, "Liquidity removed single-sided");
    Ok(dy)
  }

  fn exchange(
    &mut self,
    bank: &mut Bank,
    caller: Address,
    i: usize,
    j: usize,
    dx: u64,
    min_dy: u64,
  ) -> Result<u64> {
    if dx == 0 {
      return Err(UsduError::ZeroAmount);
    }

    let (dy, fee) = math::swap_out(i, j, dx as u128, self.xp(), self.amp as u128, self.fee_bps as u128)?;
    let dy = narrow(dy)?;
    if dy < min_dy {
      return Err(UsduError::SlippageExceeded);
    }

    bank.transfer_from(&self.coins[i], self.address, caller, self.address, dx)?;
    self.balances[i] = self.balances[i].checked_add(dx).ok_or(UsduError::Overflow)?;
    self.balances[j] -= dy;
    bank.transfer(&self.coins[j], self.address, caller, dy)?;

    debug!(%caller, i, j, dx, dy, fee, "Exchange");
    Ok(dy)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const UNIT: u64 = 1_000_000;
  const USDC: Address = Address::repeat_byte(0x0c);
  const USDU: Address = Address::repeat_byte(0x0d);
  const POOL: Address = Address::repeat_byte(0x90);
  const MINTER: Address = Address::repeat_byte(0x01);
  const ALICE: Address = Address::repeat_byte(0xa1);

  fn seeded(reference: u64, stable: u64) -> (Bank, CurveStableSwap) {
    let mut bank = Bank::new();
    bank.register(Token::new(USDC, "USDC", 6, MINTER)).unwrap();
    bank.register(Token::new(USDU, "USDU", 6, MINTER)).unwrap();
    let mut pool = CurveStableSwap::deploy(&mut bank, POOL, [USDC, USDU], 100, 4).unwrap();

    bank.mint(&USDC, MINTER, ALICE, 10_000_000 * UNIT).unwrap();
    bank.mint(&USDU, MINTER, ALICE, 10_000_000 * UNIT).unwrap();
    bank.approve(&USDC, ALICE, POOL, u64::MAX).unwrap();
    bank.approve(&USDU, ALICE, POOL, u64::MAX).unwrap();
    pool.add_liquidity(&mut bank, ALICE, [reference, stable], 0).unwrap();
    (bank, pool)
  }

  #[test]
  fn test_deploy_registers_lp_token() {
    let (bank, pool) = seeded(1_000 * UNIT, 1_000 * UNIT);
    let lp = bank.token(&POOL).unwrap();
    assert_eq!(lp.controller(), POOL);
    assert_eq!(lp.symbol, "USDCUSDU-LP");
    assert_eq!(pool.balance_of(&bank, &ALICE).unwrap(), lp.total_supply());
  }

  #[test]
  fn test_initial_deposit_needs_both_coins() {
    let mut bank = Bank::new();
    bank.register(Token::new(USDC, "USDC", 6, MINTER)).unwrap();
    bank.register(Token::new(USDU, "USDU", 6, MINTER)).unwrap();
    let mut pool = CurveStableSwap::deploy(&mut bank, POOL, [USDC, USDU], 100, 4).unwrap();
    bank.mint(&USDC, MINTER, ALICE, UNIT).unwrap();
    bank.approve(&USDC, ALICE, POOL, UNIT).unwrap();

    let result = pool.add_liquidity(&mut bank, ALICE, [UNIT, 0], 0);
    assert!(matches!(result, Err(UsduError::PoolInteractionFailed(_))));
  }

  #[test]
  fn test_reserves_track_bank_balances() {
    let (mut bank, mut pool) = seeded(3_000_000 * UNIT, 5_000_000 * UNIT);
    pool.exchange(&mut bank, ALICE, 0, 1, 10_000 * UNIT, 0).unwrap();
    pool.add_liquidity(&mut bank, ALICE, [0, 7_000 * UNIT], 0).unwrap();
    let lp = pool.balance_of(&bank, &ALICE).unwrap();
    pool.remove_liquidity_one_coin(&mut bank, ALICE, lp / 10, 0, 0).unwrap();
    pool.remove_liquidity(&mut bank, ALICE, lp / 10, [0, 0]).unwrap();

    let balances = pool.get_balances();
    assert_eq!(bank.balance_of(&USDC, &POOL).unwrap(), balances[0]);
    assert_eq!(bank.balance_of(&USDU, &POOL).unwrap(), balances[1]);
  }

  #[test]
  fn test_exchange_moves_reserves_by_exact_amounts() {
    let (mut bank, mut pool) = seeded(3_000_000 * UNIT, 5_000_000 * UNIT);
    let before = pool.get_balances();
    let quoted = pool.get_dy(1, 0, 50_000 * UNIT).unwrap();
    let dy = pool.exchange(&mut bank, ALICE, 1, 0, 50_000 * UNIT, quoted).unwrap();
    let after = pool.get_balances();

    assert_eq!(dy, quoted);
    assert_eq!(after[1], before[1] + 50_000 * UNIT);
    assert_eq!(after[0], before[0] - dy);
  }

  #[test]
  fn test_exchange_slippage_floor() {
    let (mut bank, mut pool) = seeded(1_000_000 * UNIT, 1_000_000 * UNIT);
    let quoted = pool.get_dy(0, 1, 1_000 * UNIT).unwrap();
    assert_eq!(
      pool.exchange(&mut bank, ALICE, 0, 1, 1_000 * UNIT, quoted + 1),
      Err(UsduError::SlippageExceeded)
    );
  }

  #[test]
  fn test_proportional_withdrawal() {
    let (mut bank, mut pool) = seeded(3_000_000 * UNIT, 5_000_000 * UNIT);
    let supply = pool.lp_total_supply(&bank).unwrap();
    let amounts = pool.remove_liquidity(&mut bank, ALICE, supply / 4, [0, 0]).unwrap();

    assert!(amounts[0].abs_diff(750_000 * UNIT) <= 1);
    assert!(amounts[1].abs_diff(1_250_000 * UNIT) <= 1);
  }

  #[test]
  fn test_withdrawal_from_drained_pool_rejected() {
    let (mut bank, mut pool) = seeded(1_000 * UNIT, 1_000 * UNIT);
    let supply = pool.lp_total_supply(&bank).unwrap();
    pool.remove_liquidity(&mut bank, ALICE, supply, [0, 0]).unwrap();
    assert_eq!(pool.get_balances(), [0, 0]);
    assert_eq!(pool.lp_total_supply(&bank).unwrap(), 0);

    assert_eq!(
      pool.remove_liquidity(&mut bank, ALICE, 0, [0, 0]),
      Err(UsduError::ZeroAmount)
    );
    assert!(matches!(
      pool.remove_liquidity(&mut bank, ALICE, 1, [0, 0]),
      Err(UsduError::PoolInteractionFailed(_))
    ));
    assert!(matches!(pool.get_dy(0, 1, UNIT), Err(UsduError::PoolInteractionFailed(_))));
  }

  #[test]
  fn test_calc_token_amount_matches_balanced_deposit() {
    let (mut bank, mut pool) = seeded(1_000_000 * UNIT, 1_000_000 * UNIT);
    let quoted = pool.calc_token_amount(&bank, [1_000 * UNIT, 1_000 * UNIT], true).unwrap();
    let minted = pool.add_liquidity(&mut bank, ALICE, [1_000 * UNIT, 1_000 * UNIT], 0).unwrap();
    // a balanced deposit pays no imbalance fee
    assert!(quoted.abs_diff(minted) <= 2);
  }

  #[test]
  fn test_one_coin_quote_matches_withdrawal() {
    let (mut bank, mut pool) = seeded(3_000_000 * UNIT, 5_000_000 * UNIT);
    let lp = 100_000 * UNIT;
    let quoted = pool.calc_withdraw_one_coin(&bank, lp, 1).unwrap();
    let before = pool.get_balances();
    let dy = pool.remove_liquidity_one_coin(&mut bank, ALICE, lp, 1, quoted).unwrap();

    assert_eq!(dy, quoted);
    assert_eq!(pool.get_balances()[1], before[1] - dy);
  }

  #[test]
  fn test_missing_approval_fails() {
    let (mut bank, mut pool) = seeded(1_000_000 * UNIT, 1_000_000 * UNIT);
    let bob = Address::repeat_byte(0xb0);
    bank.mint(&USDC, MINTER, bob, 1_000 * UNIT).unwrap();
    assert_eq!(
      pool.exchange(&mut bank, bob, 0, 1, 1_000 * UNIT, 0),
      Err(UsduError::InsufficientAllowance)
    );
  }
}
