//! Environment-driven configuration for the keeper and its simulated world
//!
//! Values come from the process environment after `.env` has been loaded.
//! Token amounts are given in whole tokens and stored in 6-decimal base units.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const TOKEN_UNIT: u64 = 1_000_000;
const BPS_PRECISION: u64 = 10_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("invalid value for {key}: {value:?}")]
  Invalid { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperConfig {
  pub poll_interval_ms: u64,
  /// Imbalance above which the keeper triggers a cycle
  pub imbalance_threshold_bps: u64,
  pub max_flashloan_amount: u64,
  /// Stop after this many ticks; 0 runs until interrupted
  pub max_ticks: u64,
}

impl KeeperConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
  pub reference_reserve: u64,
  pub stable_reserve: u64,
  pub amp: u64,
  pub pool_fee_bps: u64,
  pub lender_liquidity: u64,
  pub flash_fee_bps: u64,
  pub unwind_bps: u64,
  pub max_slippage_bps: u64,
  /// Stablecoin minted and dumped into the pool every tick
  pub sell_pressure: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  pub keeper: KeeperConfig,
  pub simulation: SimulationConfig,
}

impl Config {
  /// Load `.env` if present, then read the process environment
  pub fn from_env() -> Result<Self, ConfigError> {
    // a missing .env is fine; variables may come from the shell
    let _ = dotenvy::dotenv();
    Self::from_lookup(|key| env::var(key).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    let keeper = KeeperConfig {
      poll_interval_ms: read(&lookup, "USDU_POLL_INTERVAL_MS", 2_000)?,
      imbalance_threshold_bps: read_bps(&lookup, "USDU_IMBALANCE_THRESHOLD_BPS", 200)?,
      max_flashloan_amount: read_tokens(&lookup, "USDU_MAX_FLASHLOAN", 2_000_000)?,
      max_ticks: read(&lookup, "USDU_MAX_TICKS", 0)?,
    };

    let simulation = SimulationConfig {
      reference_reserve: read_tokens(&lookup, "USDU_SIM_REFERENCE_RESERVE", 3_000_000)?,
      stable_reserve: read_tokens(&lookup, "USDU_SIM_STABLE_RESERVE", 5_000_000)?,
      amp: read(&lookup, "USDU_SIM_AMP", 100)?,
      pool_fee_bps: read_bps(&lookup, "USDU_SIM_POOL_FEE_BPS", 4)?,
      lender_liquidity: read_tokens(&lookup, "USDU_SIM_LENDER_LIQUIDITY", 10_000_000)?,
      flash_fee_bps: read_bps(&lookup, "USDU_FLASH_FEE_BPS", 5)?,
      unwind_bps: read_bps(&lookup, "USDU_UNWIND_BPS", 5_000)?,
      max_slippage_bps: read_bps(&lookup, "USDU_MAX_SLIPPAGE_BPS", 50)?,
      sell_pressure: read_tokens(&lookup, "USDU_SIM_SELL_PRESSURE", 150_000)?,
    };

    if keeper.poll_interval_ms == 0 {
      return Err(invalid("USDU_POLL_INTERVAL_MS", "0"));
    }
    if simulation.amp == 0 {
      return Err(invalid("USDU_SIM_AMP", "0"));
    }

    Ok(Self { keeper, simulation })
  }
}

fn invalid(key: &str, value: &str) -> ConfigError {
  ConfigError::Invalid {
    key: key.to_string(),
    value: value.to_string(),
  }
}

fn read<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError> {
  match lookup(key) {
    None => Ok(default),
    Some(raw) => raw.trim().parse().map_err(|_| invalid(key, &raw)),
  }
}

fn read_bps(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64, ConfigError> {
  let value = read(lookup, key, default)?;
  if value > BPS_PRECISION {
    return Err(invalid(key, &value.to_string()));
  }
  Ok(value)
}

fn read_tokens(lookup: &impl Fn(&str) -> Option<String>, key: &str, default_tokens: u64) -> Result<u64, ConfigError> {
  let tokens: u64 = read(lookup, key, default_tokens)?;
  tokens
    .checked_mul(TOKEN_UNIT)
    .ok_or_else(|| invalid(key, &tokens.to_string()))
}
