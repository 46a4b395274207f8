//! Rebalance keeper
//!
//! Watches the pool and triggers a flash-loan cycle whenever the imbalance
//! exceeds the configured threshold. The keeper holds the rebalancer
//! authority; sizing follows `usdu_quote::suggest_flashloan_amount`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use usdu::{Address, Balanced, FlashLender, Host, StableSwapPool, UsduError, World};
use usdu_config::KeeperConfig;
use usdu_quote::{pool_imbalance, suggest_flashloan_amount};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeeperError {
  #[error("engine rejected the cycle: {0}")]
  Engine(#[from] UsduError),

  #[error("lender has no liquidity for the reference asset")]
  NoLiquidity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
  Hold { imbalance_bps: u64 },
  Rebalance { amount: u64, imbalance_bps: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperStats {
  pub ticks: u64,
  pub cycles: u64,
  pub failed_cycles: u64,
  pub fees_paid: u64,
}

#[derive(Debug, Clone)]
pub struct Keeper {
  authority: Address,
  config: KeeperConfig,
  stats: KeeperStats,
}

impl Keeper {
  pub fn new(authority: Address, config: KeeperConfig) -> Self {
    Self {
      authority,
      config,
      stats: KeeperStats::default(),
    }
  }

  pub fn authority(&self) -> Address {
    self.authority
  }

  pub fn stats(&self) -> KeeperStats {
    self.stats
  }

  /// Decide what to do against the current world without touching it
  pub fn evaluate<P, L>(&self, world: &World<P, L>) -> Result<Decision, KeeperError>
  where
    P: StableSwapPool,
    L: FlashLender,
  {
    let rebalancer = &world.rebalancer;
    let imbalance = pool_imbalance(&world.pool, rebalancer.reference_index, rebalancer.stable_index);

    // the engine rejects anything at or under its own tolerance
    let threshold = self.config.imbalance_threshold_bps.max(rebalancer.balance_tolerance_bps);
    if imbalance.bps <= threshold {
      return Ok(Decision::Hold {
        imbalance_bps: imbalance.bps,
      });
    }

    let available = world.lender.max_flash_loan(&world.bank, &rebalancer.reference_token);
    if available == 0 {
      return Err(KeeperError::NoLiquidity);
    }

    let amount = suggest_flashloan_amount(&imbalance, threshold, self.config.max_flashloan_amount, available);
    if amount == 0 {
      return Ok(Decision::Hold {
        imbalance_bps: imbalance.bps,
      });
    }

    Ok(Decision::Rebalance {
      amount,
      imbalance_bps: imbalance.bps,
    })
  }

  /// Evaluate and, if needed, run one rebalance cycle
  ///
  /// Returns the cycle receipt, or `None` when the pool is within threshold.
  /// A failed cycle leaves the world untouched and is reported as an error.
  pub fn tick<P, L>(&mut self, host: &mut Host<P, L>) -> Result<Option<Balanced>, KeeperError>
  where
    P: StableSwapPool + Clone,
    L: FlashLender + Clone,
  {
    self.stats.ticks += 1;

    let (amount, imbalance_bps) = match self.evaluate(host.world())? {
      Decision::Hold { imbalance_bps } => {
        debug!(imbalance_bps, "Pool within threshold");
        return Ok(None);
      }
      Decision::Rebalance { amount, imbalance_bps } => (amount, imbalance_bps),
    };

    info!(amount, imbalance_bps, "Triggering rebalance");

    match host.rebalance(self.authority, amount) {
      Ok(receipt) => {
        self.stats.cycles += 1;
        self.stats.fees_paid = self.stats.fees_paid.saturating_add(receipt.fee);
        info!(
          before = receipt.imbalance_before_bps,
          after = receipt.imbalance_after_bps,
          fee = receipt.fee,
          "Rebalance committed"
        );
        Ok(Some(receipt))
      }
      Err(err) => {
        self.stats.failed_cycles += 1;
        warn!(%err, amount, "Rebalance reverted");
        Err(err.into())
      }
    }
  }
}
