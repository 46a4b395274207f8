//! 20-byte account identity shared by users, tokens, the pool and the lender

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UsduError;

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
  pub const ZERO: Address = Address([0u8; 20]);

  /// Address with every byte set to `byte`; handy for fixtures and simulations
  pub const fn repeat_byte(byte: u8) -> Self {
    Address([byte; 20])
  }

  pub fn is_zero(&self) -> bool {
    *self == Self::ZERO
  }
}

impl fmt::Display for Address {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "0x{}", hex::encode(self.0))
  }
}

impl fmt::Debug for Address {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

impl FromStr for Address {
  type Err = UsduError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let mut bytes = [0u8; 20];
    hex::decode_to_slice(digits, &mut bytes).map_err(|_| UsduError::InvalidParameter)?;
    Ok(Address(bytes))
  }
}

impl TryFrom<String> for Address {
  type Error = UsduError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Address> for String {
  fn from(value: Address) -> Self {
    value.to_string()
  }
}
