//! Atomic execution host
//!
//! Every public operation runs against one `World` (token ledgers, pool,
//! lender, adapter and rebalancer state). `Host::transact` snapshots the world
//! before the operation and restores it when the operation fails, so a failed
//! deposit, withdrawal or rebalance cycle is absent from history. Operations
//! are serialized through `&mut self`.
//!
//! The event journal is append-only and kept out of the snapshot: a failed
//! operation truncates it back to its length at entry instead.

use std::mem;

use tracing::{info, warn};

use crate::address::Address;
use crate::error::Result;
use crate::events::{Balanced, Deposited, LiquidityRemoved, Redeemed, UsduEvent};
use crate::flash_loan::FlashLender;
use crate::instructions;
use crate::instructions::admin::ParameterUpdate;
use crate::ledger::Bank;
use crate::pool::StableSwapPool;
use crate::state::{AdapterState, RebalancerState};

#[derive(Debug, Clone)]
pub struct World<P, L> {
  pub bank: Bank,
  pub pool: P,
  pub lender: L,
  pub adapter: AdapterState,
  pub rebalancer: RebalancerState,
  pub events: Vec<UsduEvent>,
}

#[derive(Debug)]
pub struct Host<P, L> {
  world: World<P, L>,
  committed: u64,
  reverted: u64,
}

impl<P, L> Host<P, L>
where
  P: StableSwapPool + Clone,
  L: FlashLender + Clone,
{
  pub fn new(world: World<P, L>) -> Self {
    Self {
      world,
      committed: 0,
      reverted: 0,
    }
  }

  pub fn world(&self) -> &World<P, L> {
    &self.world
  }

  pub fn into_world(self) -> World<P, L> {
    self.world
  }

  /// Number of operations committed and reverted so far
  pub fn stats(&self) -> (u64, u64) {
    (self.committed, self.reverted)
  }

  /// Take every event emitted so far, leaving the journal empty
  pub fn drain_events(&mut self) -> Vec<UsduEvent> {
    mem::take(&mut self.world.events)
  }

  /// Run `op` as one all-or-nothing unit
  pub fn transact<T>(
    &mut self,
    label: &str,
    op: impl FnOnce(&mut World<P, L>) -> Result<T>,
  ) -> Result<T> {
    let events = mem::take(&mut self.world.events);
    let snapshot = self.world.clone();
    self.world.events = events;
    let mark = self.world.events.len();

    match op(&mut self.world) {
      Ok(value) => {
        self.committed += 1;
        info!(operation = label, "Transaction committed");
        Ok(value)
      }
      Err(err) => {
        let mut events = mem::take(&mut self.world.events);
        events.truncate(mark);
        self.world = snapshot;
        self.world.events = events;
        self.reverted += 1;
        warn!(operation = label, error = %err, "Transaction reverted");
        Err(err)
      }
    }
  }

  pub fn deposit(&mut self, caller: Address, amount: u64, min_stable_out: u64) -> Result<Deposited> {
    self.transact("deposit", |world| {
      instructions::deposit::handler(world, caller, amount, min_stable_out)
    })
  }

  pub fn remove_liquidity(&mut self, caller: Address, lp_amount: u64, min_out: u64) -> Result<LiquidityRemoved> {
    self.transact("remove_liquidity", |world| {
      instructions::remove_liquidity::handler(world, caller, lp_amount, min_out)
    })
  }

  pub fn redeem(&mut self, caller: Address, stable_amount: u64, min_out: u64) -> Result<Redeemed> {
    self.transact("redeem", |world| {
      instructions::redeem::handler(world, caller, stable_amount, min_out)
    })
  }

  pub fn rebalance(&mut self, caller: Address, flashloan_amount: u64) -> Result<Balanced> {
    self.transact("rebalance", |world| {
      instructions::rebalance::handler(world, caller, flashloan_amount)
    })
  }

  pub fn transfer_adapter_authority(&mut self, caller: Address, new_authority: Address) -> Result<()> {
    self.transact("transfer_adapter_authority", |world| {
      instructions::admin::transfer_adapter_authority(world, caller, new_authority)
    })
  }

  pub fn transfer_rebalancer_authority(&mut self, caller: Address, new_authority: Address) -> Result<()> {
    self.transact("transfer_rebalancer_authority", |world| {
      instructions::admin::transfer_rebalancer_authority(world, caller, new_authority)
    })
  }

  pub fn update_parameters(&mut self, caller: Address, update: ParameterUpdate) -> Result<()> {
    self.transact("update_parameters", |world| {
      instructions::admin::update_parameters(world, caller, update)
    })
  }

  /// Approve `spender` for `amount` of `token` on behalf of `owner`
  pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: u64) -> Result<()> {
    self.transact("approve", |world| world.bank.approve(&token, owner, spender, amount))
  }

  pub fn transfer(&mut self, token: Address, from: Address, to: Address, amount: u64) -> Result<()> {
    self.transact("transfer", |world| world.bank.transfer(&token, from, to, amount))
  }

  /// Call the pool directly, outside the adapter
  pub fn with_pool<T>(
    &mut self,
    label: &str,
    op: impl FnOnce(&mut P, &mut Bank) -> Result<T>,
  ) -> Result<T> {
    self.transact(label, |world| op(&mut world.pool, &mut world.bank))
  }
}
