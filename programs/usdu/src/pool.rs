//! Interface to the external two-coin StableSwap pool
//!
//! The engine consumes the pool, it never implements one. Every method that
//! moves tokens takes the `Bank` so the pool settles against the same ledgers
//! the adapter and rebalancer use. The pool's LP token lives in the bank under
//! the pool's own address, with the pool as its controller.
//!
//! Callers approve the pool for the coins they send in, exactly as they would
//! for an on-chain pool pulling with `transfer_from`.

use crate::address::Address;
use crate::error::Result;
use crate::ledger::Bank;

pub const N_COINS: usize = 2;

pub trait StableSwapPool {
  /// Pool identity; also the address of its LP token in the bank
  fn address(&self) -> Address;

  /// Token addresses of the two coins, by pool index
  fn coins(&self) -> [Address; N_COINS];

  /// Current reserves, by pool index
  fn get_balances(&self) -> [u64; N_COINS];

  /// Output for swapping `dx` of coin `i` into coin `j`, after fees
  fn get_dy(&self, i: usize, j: usize, dx: u64) -> Result<u64>;

  /// Input of coin `i` needed to receive `dy` of coin `j`, after fees
  fn get_dx(&self, i: usize, j: usize, dy: u64) -> Result<u64>;

  /// LP minted (deposit) or burned (withdrawal) for the given coin amounts, ignoring fees
  fn calc_token_amount(&self, bank: &Bank, amounts: [u64; N_COINS], is_deposit: bool) -> Result<u64>;

  /// Amount of coin `i` received for burning `lp_amount` single-sided
  fn calc_withdraw_one_coin(&self, bank: &Bank, lp_amount: u64, i: usize) -> Result<u64>;

  /// Pull `amounts` from `caller`, mint LP to `caller`; returns LP minted
  fn add_liquidity(
    &mut self,
    bank: &mut Bank,
    caller: Address,
    amounts: [u64; N_COINS],
    min_mint_amount: u64,
  ) -> Result<u64>;

  /// Burn `lp_amount` from `caller` and pay out both coins proportionally
  fn remove_liquidity(
    &mut self,
    bank: &mut Bank,
    caller: Address,
    lp_amount: u64,
    min_amounts: [u64; N_COINS],
  ) -> Result<[u64; N_COINS]>;

  /// Burn `lp_amount` from `caller` and pay out coin `i` only
  fn remove_liquidity_one_coin(
    &mut self,
    bank: &mut Bank,
    caller: Address,
    lp_amount: u64,
    i: usize,
    min_amount: u64,
  ) -> Result<u64>;

  /// Swap `dx` of coin `i` from `caller` into coin `j`
  fn exchange(
    &mut self,
    bank: &mut Bank,
    caller: Address,
    i: usize,
    j: usize,
    dx: u64,
    min_dy: u64,
  ) -> Result<u64>;

  /// LP units held by `account`
  fn balance_of(&self, bank: &Bank, account: &Address) -> Result<u64> {
    bank.balance_of(&self.address(), account)
  }

  fn lp_total_supply(&self, bank: &Bank) -> Result<u64> {
    bank.total_supply(&self.address())
  }

  /// Pool index of `token`, if it is one of the two coins
  fn coin_index(&self, token: &Address) -> Option<usize> {
    self.coins().iter().position(|coin| coin == token)
  }
}
