//! Reference collaborators for the USDU engine
//!
//! `CurveStableSwap` is a two-coin StableSwap pool and `VaultLender` a
//! fee-charging flash lender, both settling against the engine's `Bank`.
//! `fixture` assembles them into seeded worlds.

pub mod fixture;
pub mod lender;
pub mod math;
pub mod pool;

pub use lender::VaultLender;
pub use math::MathError;
pub use pool::CurveStableSwap;
