//! Admin instructions - authority handover and parameter updates

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::address::Address;
use crate::constants::{BPS_PRECISION, MAX_SLIPPAGE_BPS};
use crate::error::{Result, UsduError};
use crate::events::{emit, AuthorityTransferred, ParametersUpdated};
use crate::host::World;
use crate::reentrancy::ReentrancyGuard;
use crate::require;
use crate::state::DepositMode;

/// Fields left as `None` keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterUpdate {
  pub deposit_mode: Option<DepositMode>,
  pub max_slippage_bps: Option<u64>,
  pub unwind_bps: Option<u64>,
  pub balance_tolerance_bps: Option<u64>,
}

impl ParameterUpdate {
  fn touches_adapter(&self) -> bool {
    self.deposit_mode.is_some() || self.max_slippage_bps.is_some()
  }

  fn touches_rebalancer(&self) -> bool {
    self.unwind_bps.is_some() || self.balance_tolerance_bps.is_some()
  }
}

pub fn transfer_adapter_authority<P, L>(
  world: &mut World<P, L>,
  caller: Address,
  new_authority: Address,
) -> Result<()> {
  let World { adapter, events, .. } = world;
  let mut adapter = ReentrancyGuard::new(adapter)?;

  require!(caller == adapter.authority, UsduError::Unauthorized);
  require!(!new_authority.is_zero(), UsduError::InvalidParameter);

  let old_authority = adapter.authority;
  adapter.authority = new_authority;

  info!("Adapter authority: {} -> {}", old_authority, new_authority);
  emit(
    events,
    AuthorityTransferred {
      component: "adapter".into(),
      old_authority,
      new_authority,
    },
  );
  Ok(())
}

pub fn transfer_rebalancer_authority<P, L>(
  world: &mut World<P, L>,
  caller: Address,
  new_authority: Address,
) -> Result<()> {
  let World {
    rebalancer, events, ..
  } = world;
  let mut rebalancer = ReentrancyGuard::new(rebalancer)?;

  require!(caller == rebalancer.authority, UsduError::Unauthorized);
  require!(!new_authority.is_zero(), UsduError::InvalidParameter);

  let old_authority = rebalancer.authority;
  rebalancer.authority = new_authority;

  info!("Rebalancer authority: {} -> {}", old_authority, new_authority);
  emit(
    events,
    AuthorityTransferred {
      component: "rebalancer".into(),
      old_authority,
      new_authority,
    },
  );
  Ok(())
}

/// Apply a parameter update; each component's fields require that component's authority
pub fn update_parameters<P, L>(world: &mut World<P, L>, caller: Address, update: ParameterUpdate) -> Result<()> {
  require!(
    update.touches_adapter() || update.touches_rebalancer(),
    UsduError::InvalidParameter
  );

  let World {
    adapter,
    rebalancer,
    events,
    ..
  } = world;

  if update.touches_adapter() {
    let mut adapter = ReentrancyGuard::new(adapter)?;
    require!(caller == adapter.authority, UsduError::Unauthorized);

    if let Some(max_slippage_bps) = update.max_slippage_bps {
      require!(max_slippage_bps <= MAX_SLIPPAGE_BPS, UsduError::InvalidParameter);
      adapter.max_slippage_bps = max_slippage_bps;
    }
    if let Some(deposit_mode) = update.deposit_mode {
      adapter.deposit_mode = deposit_mode;
    }

    info!(
      deposit_mode = ?adapter.deposit_mode,
      max_slippage_bps = adapter.max_slippage_bps,
      "Adapter parameters updated"
    );
    emit(
      events,
      ParametersUpdated {
        component: "adapter".into(),
        authority: caller,
        deposit_mode: update.deposit_mode,
        max_slippage_bps: update.max_slippage_bps,
        unwind_bps: None,
        balance_tolerance_bps: None,
      },
    );
  }

  if update.touches_rebalancer() {
    let mut rebalancer = ReentrancyGuard::new(rebalancer)?;
    require!(caller == rebalancer.authority, UsduError::Unauthorized);

    if let Some(unwind_bps) = update.unwind_bps {
      require!(unwind_bps <= BPS_PRECISION, UsduError::InvalidParameter);
      rebalancer.unwind_bps = unwind_bps;
    }
    if let Some(balance_tolerance_bps) = update.balance_tolerance_bps {
      require!(balance_tolerance_bps < BPS_PRECISION, UsduError::InvalidParameter);
      rebalancer.balance_tolerance_bps = balance_tolerance_bps;
    }

    info!(
      unwind_bps = rebalancer.unwind_bps,
      balance_tolerance_bps = rebalancer.balance_tolerance_bps,
      "Rebalancer parameters updated"
    );
    emit(
      events,
      ParametersUpdated {
        component: "rebalancer".into(),
        authority: caller,
        deposit_mode: None,
        max_slippage_bps: None,
        unwind_bps: update.unwind_bps,
        balance_tolerance_bps: update.balance_tolerance_bps,
      },
    );
  }

  Ok(())
}
