//! Protocol-wide constants
//! Centralized location for all configuration values

// PRECISION CONSTANTS
pub const TOKEN_DECIMALS: u8 = 6;
pub const UNIT: u64 = 1_000_000;                  // one whole token (1e6)
pub const BPS_PRECISION: u64 = 10_000;            // 100% = 10000 bps

// RATE PROBE
// Exchange rates are read from the pool by quoting one whole unit
pub const RATE_PROBE: u64 = UNIT;

// SLIPPAGE LIMITS
pub const DEFAULT_MAX_SLIPPAGE_BPS: u64 = 50;     // 0.5%
pub const MAX_SLIPPAGE_BPS: u64 = 500;            // 5% max slippage

// REBALANCING
pub const DEFAULT_UNWIND_BPS: u64 = 5_000;        // close half of the reserve gap per cycle
pub const DEFAULT_BALANCE_TOLERANCE_BPS: u64 = 10; // 0.1% imbalance counts as balanced

// Extra reference units requested from the repayment swap so curve rounding
// never leaves the loan one unit short
pub const SWAP_ROUNDING_BUFFER: u64 = 10;
