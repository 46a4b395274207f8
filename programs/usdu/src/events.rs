use serde::{Deserialize, Serialize};
use tracing::info;

use crate::address::Address;
use crate::math::Direction;
use crate::state::DepositMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInitialized {
  pub adapter: Address,
  pub authority: Address,
  pub stable_token: Address,
  pub reference_token: Address,
  pub pool: Address,
  pub deposit_mode: DepositMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalancerInitialized {
  pub rebalancer: Address,
  pub authority: Address,
  pub pool: Address,
  pub unwind_bps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposited {
  pub user: Address,
  pub amount_in: u64,
  pub stable_minted: u64,
  /// Extra stablecoin minted straight into the pool in balanced mode
  pub stable_pooled: u64,
  pub lp_received: u64,
  /// Pool quote for one whole reference unit, read before the deposit
  pub rate_used: u64,
  pub old_total_minted: u64,
  pub new_total_minted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityRemoved {
  pub user: Address,
  pub lp_burned: u64,
  pub stable_burned: u64,
  /// Reference asset paid out
  pub amount_out: u64,
  /// Stablecoin-side reserve paid out
  pub stable_out: u64,
  pub old_total_minted: u64,
  pub new_total_minted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redeemed {
  pub user: Address,
  pub stable_burned: u64,
  pub lp_withdrawn: u64,
  pub amount_out: u64,
  pub old_total_minted: u64,
  pub new_total_minted: u64,
}

/// Balancing receipt for one borrow → rebalance → repay cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balanced {
  pub flashloan_amount: u64,
  /// LP minted by the liquidity the cycle added
  pub lp_added: u64,
  /// Liquidity withdrawn single-sided, valued on the stablecoin side
  /// (reference withdrawals are converted at the post-cycle pool rate)
  pub lp_removed: u64,
  /// Raw amount of the heavy coin withdrawn
  pub heavy_withdrawn: u64,
  /// Reference asset moved through the swap leg
  pub reference_swapped: u64,
  /// Stablecoin moved through the swap leg
  pub stable_swapped: u64,
  pub fee: u64,
  pub direction: Direction,
  /// LP taken from the rebalancer's existing position on top of `lp_added`
  pub position_unwound: u64,
  pub imbalance_before_bps: u64,
  pub imbalance_after_bps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityTransferred {
  pub component: String,
  pub old_authority: Address,
  pub new_authority: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParametersUpdated {
  pub component: String,
  pub authority: Address,
  pub deposit_mode: Option<DepositMode>,
  pub max_slippage_bps: Option<u64>,
  pub unwind_bps: Option<u64>,
  pub balance_tolerance_bps: Option<u64>,
}

/// Everything the engine emits, in the order it was committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum UsduEvent {
  AdapterInitialized(AdapterInitialized),
  RebalancerInitialized(RebalancerInitialized),
  Deposited(Deposited),
  LiquidityRemoved(LiquidityRemoved),
  Redeemed(Redeemed),
  Balanced(Balanced),
  AuthorityTransferred(AuthorityTransferred),
  ParametersUpdated(ParametersUpdated),
}

impl UsduEvent {
  /// Single-line JSON form, tagged with the event name
  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string(self)
  }
}

macro_rules! impl_from_event {
  ($($name:ident),* $(,)?) => {
    $(
      impl From<$name> for UsduEvent {
        fn from(event: $name) -> Self {
          UsduEvent::$name(event)
        }
      }
    )*
  };
}

impl_from_event!(
  AdapterInitialized,
  RebalancerInitialized,
  Deposited,
  LiquidityRemoved,
  Redeemed,
  Balanced,
  AuthorityTransferred,
  ParametersUpdated,
);

/// Append an event to the log
pub fn emit(log: &mut Vec<UsduEvent>, event: impl Into<UsduEvent>) {
  let event = event.into();
  info!(?event, "Event emitted");
  log.push(event);
}
