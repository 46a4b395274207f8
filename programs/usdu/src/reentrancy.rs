//! Reentrancy guard using RAII (Resource Acquisition Is Initialization) pattern
//!
//! The lock is released when the guard goes out of scope, even if:
//! - An early return occurs
//! - An error is returned through `?`
//! All state access goes through the guard while it is held (proxy pattern).

use std::ops::{Deref, DerefMut};

use tracing::trace;

use crate::error::{Result, UsduError};
use crate::require;

/// State that carries an "operation in progress" flag
pub trait Lockable {
  fn lock_flag(&mut self) -> &mut bool;
}

/// RAII-based reentrancy guard with proxy access to state
pub struct ReentrancyGuard<'a, S: Lockable> {
  state: &'a mut S,
}

impl<'a, S: Lockable> ReentrancyGuard<'a, S> {
  /// Acquire the lock
  ///
  /// # Returns
  /// * `Ok(ReentrancyGuard)` - Lock acquired
  /// * `Err(UsduError::Reentrancy)` - Lock already held
  pub fn new(state: &'a mut S) -> Result<Self> {
    require!(!*state.lock_flag(), UsduError::Reentrancy);

    *state.lock_flag() = true;
    trace!("Reentrancy lock acquired");

    Ok(Self { state })
  }
}

impl<S: Lockable> Deref for ReentrancyGuard<'_, S> {
  type Target = S;

  fn deref(&self) -> &S {
    self.state
  }
}

impl<S: Lockable> DerefMut for ReentrancyGuard<'_, S> {
  fn deref_mut(&mut self) -> &mut S {
    self.state
  }
}

impl<S: Lockable> Drop for ReentrancyGuard<'_, S> {
  fn drop(&mut self) {
    *self.state.lock_flag() = false;
    trace!("Reentrancy lock released");
  }
}
