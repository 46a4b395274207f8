//! Seeded engine worlds for tests and the keeper simulation
//!
//! A fixture deploys USDC and USDU ledgers, a StableSwap pool seeded from
//! a liquidity provider, a funded vault lender, and then initializes the
//! adapter and rebalancer on top. By default the rebalancer itself seeds the
//! pool, so it starts with the protocol-owned LP position it unwinds from.

use serde::{Deserialize, Serialize};

use usdu::constants::{DEFAULT_BALANCE_TOLERANCE_BPS, DEFAULT_MAX_SLIPPAGE_BPS, DEFAULT_UNWIND_BPS, UNIT};
use usdu::instructions::initialize;
use usdu::{AdapterConfig, Address, Bank, DepositMode, Host, RebalancerConfig, Result, StableSwapPool, Token};

use crate::lender::VaultLender;
use crate::pool::CurveStableSwap;

pub const USDC: Address = Address::repeat_byte(0x0c);
pub const USDU: Address = Address::repeat_byte(0x0d);
pub const POOL: Address = Address::repeat_byte(0x90);
pub const LENDER: Address = Address::repeat_byte(0x1e);
pub const ADAPTER: Address = Address::repeat_byte(0xad);
pub const REBALANCER: Address = Address::repeat_byte(0xbe);
pub const ADMIN: Address = Address::repeat_byte(0xa0);
pub const KEEPER: Address = Address::repeat_byte(0x4e);
/// Controller of the USDC ledger
pub const FAUCET: Address = Address::repeat_byte(0xfa);
/// Mints the pool's initial USDU, then hands the ledger to the adapter
pub const GENESIS: Address = Address::repeat_byte(0x6e);
/// Third-party liquidity provider used when the rebalancer holds no position
pub const SEEDER: Address = Address::repeat_byte(0x5e);

pub type SimHost = Host<CurveStableSwap, VaultLender>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureParams {
  pub reference_reserve: u64,
  pub stable_reserve: u64,
  pub amp: u64,
  pub pool_fee_bps: u64,
  pub lender_liquidity: u64,
  pub flash_fee_bps: u64,
  pub deposit_mode: DepositMode,
  pub max_slippage_bps: u64,
  pub unwind_bps: u64,
  pub balance_tolerance_bps: u64,
  /// Seed the pool from the rebalancer so it holds an LP position
  pub rebalancer_owns_seed: bool,
}

impl Default for FixtureParams {
  fn default() -> Self {
    Self {
      reference_reserve: 3_000_000 * UNIT,
      stable_reserve: 5_000_000 * UNIT,
      amp: 100,
      pool_fee_bps: 4,
      lender_liquidity: 10_000_000 * UNIT,
      flash_fee_bps: 5,
      deposit_mode: DepositMode::SingleSided,
      max_slippage_bps: DEFAULT_MAX_SLIPPAGE_BPS,
      unwind_bps: DEFAULT_UNWIND_BPS,
      balance_tolerance_bps: DEFAULT_BALANCE_TOLERANCE_BPS,
      rebalancer_owns_seed: true,
    }
  }
}

impl FixtureParams {
  /// 3M USDC / 5M USDU: the stablecoin trades below peg
  pub fn stable_heavy() -> Self {
    Self::default()
  }

  /// 5M USDC / 3M USDU: the stablecoin trades above peg
  pub fn reference_heavy() -> Self {
    Self {
      reference_reserve: 5_000_000 * UNIT,
      stable_reserve: 3_000_000 * UNIT,
      ..Self::default()
    }
  }

  pub fn balanced() -> Self {
    Self {
      reference_reserve: 4_000_000 * UNIT,
      stable_reserve: 4_000_000 * UNIT,
      ..Self::default()
    }
  }
}

/// Build a fresh host from `params`
pub fn build(params: &FixtureParams) -> Result<SimHost> {
  let mut bank = Bank::new();
  bank.register(Token::new(USDC, "USDC", 6, FAUCET))?;
  bank.register(Token::new(USDU, "USDU", 6, GENESIS))?;

  let mut pool = CurveStableSwap::deploy(&mut bank, POOL, [USDC, USDU], params.amp, params.pool_fee_bps)?;

  let provider = if params.rebalancer_owns_seed { REBALANCER } else { SEEDER };
  bank.mint(&USDC, FAUCET, provider, params.reference_reserve)?;
  bank.mint(&USDU, GENESIS, provider, params.stable_reserve)?;
  bank.approve(&USDC, provider, POOL, params.reference_reserve)?;
  bank.approve(&USDU, provider, POOL, params.stable_reserve)?;
  pool.add_liquidity(
    &mut bank,
    provider,
    [params.reference_reserve, params.stable_reserve],
    0,
  )?;

  bank.token_mut(&USDU)?.transfer_controller(GENESIS, ADAPTER)?;

  let lender = VaultLender::new(LENDER, vec![USDC], params.flash_fee_bps)?;
  bank.mint(&USDC, FAUCET, LENDER, params.lender_liquidity)?;

  let adapter = AdapterConfig {
    address: ADAPTER,
    authority: ADMIN,
    stable_token: USDU,
    reference_token: USDC,
    deposit_mode: params.deposit_mode,
    max_slippage_bps: params.max_slippage_bps,
  };
  let rebalancer = RebalancerConfig {
    address: REBALANCER,
    authority: KEEPER,
    unwind_bps: params.unwind_bps,
    balance_tolerance_bps: params.balance_tolerance_bps,
  };

  let world = initialize::handler(bank, pool, lender, &adapter, &rebalancer)?;
  Ok(Host::new(world))
}

/// Mint USDC to `to` out of band
pub fn faucet(host: &mut SimHost, to: Address, amount: u64) -> Result<()> {
  host.transact("faucet", |world| world.bank.mint(&USDC, FAUCET, to, amount))
}

/// Fund `user` with USDC and approve the adapter to pull it
pub fn fund_depositor(host: &mut SimHost, user: Address, amount: u64) -> Result<()> {
  faucet(host, user, amount)?;
  host.approve(USDC, user, ADAPTER, amount)
}

/// Add liquidity straight to the pool from `user`, bypassing the adapter
pub fn add_direct_liquidity(host: &mut SimHost, user: Address, amounts: [u64; 2]) -> Result<u64> {
  host.transact("direct_liquidity", |world| {
    world.bank.approve(&USDC, user, POOL, amounts[0])?;
    world.bank.approve(&USDU, user, POOL, amounts[1])?;
    world.pool.add_liquidity(&mut world.bank, user, amounts, 0)
  })
}

/// Sell `amount` USDU into the pool from `user`
pub fn sell_stable(host: &mut SimHost, user: Address, amount: u64) -> Result<u64> {
  host.transact("sell_stable", |world| {
    world.bank.approve(&USDU, user, POOL, amount)?;
    world.pool.exchange(&mut world.bank, user, 1, 0, amount, 0)
  })
}

/// Buy USDU from the pool with `amount` USDC from `user`
pub fn buy_stable(host: &mut SimHost, user: Address, amount: u64) -> Result<u64> {
  host.transact("buy_stable", |world| {
    world.bank.approve(&USDC, user, POOL, amount)?;
    world.pool.exchange(&mut world.bank, user, 0, 1, amount, 0)
  })
}
