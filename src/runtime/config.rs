use crate::runtime::error::{ConfigError, Resource};
use crate::runtime::node::{MAX_AUX, U40_MASK, U48_MASK};

pub const NODES_PER_KB: usize = 0x80;
pub const NODES_PER_MB: usize = 0x20000;
pub const NODES_PER_GB: usize = 0x8000000;

pub const DEFAULT_SIZE: usize = 32 * NODES_PER_MB;
pub const DEFAULT_PRDX_LEN: usize = 1 << 16;

// VM capacities. Every shared buffer is split into one region per thread;
// region sizes are rounded down to a power of two.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
  pub tids: usize, // worker thread count
  pub aux_len: usize, // aux buffer length, in nodes
  pub vars_len: usize, // variable table length
  pub opers_len: usize, // operation table length
  pub redx_len: usize, // normal redex buffer length, in pairs
  pub prdx_len: usize, // per-thread priority bag length, in pairs
  pub spread: bool, // deal seed redexes across threads before running
}

pub fn available_parallelism() -> usize {
  std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

pub fn default_tids() -> usize {
  prev_power_of_two(available_parallelism()).max(1)
}

pub fn prev_power_of_two(n: usize) -> usize {
  if n == 0 {
    0
  } else {
    1 << (usize::BITS - 1 - n.leading_zeros())
  }
}

impl Default for Config {
  fn default() -> Self {
    Config::scaled(DEFAULT_SIZE).with_tids(default_tids())
  }
}

impl Config {
  // Derives every capacity from a single node count.
  pub fn scaled(size: usize) -> Self {
    Config {
      tids: 1,
      aux_len: size,
      vars_len: size,
      opers_len: (size / 16).max(1),
      redx_len: (size / 4).max(1),
      prdx_len: DEFAULT_PRDX_LEN,
      spread: true,
    }
  }

  pub fn with_tids(mut self, tids: usize) -> Self {
    self.tids = tids;
    self
  }

  pub fn with_aux_len(mut self, len: usize) -> Self {
    self.aux_len = len;
    self
  }

  pub fn with_vars_len(mut self, len: usize) -> Self {
    self.vars_len = len;
    self
  }

  pub fn with_opers_len(mut self, len: usize) -> Self {
    self.opers_len = len;
    self
  }

  pub fn with_redx_len(mut self, len: usize) -> Self {
    self.redx_len = len;
    self
  }

  pub fn with_prdx_len(mut self, len: usize) -> Self {
    self.prdx_len = len;
    self
  }

  pub fn with_spread(mut self, spread: bool) -> Self {
    self.spread = spread;
    self
  }

  // Per-thread region length of a buffer.
  pub fn region(&self, len: usize) -> usize {
    prev_power_of_two(len / self.tids.max(1))
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.tids == 0 || !self.tids.is_power_of_two() {
      return Err(ConfigError::Threads(self.tids));
    }
    let buffers = [
      (Resource::Aux, self.aux_len, MAX_AUX as usize, U40_MASK as usize),
      (Resource::Vars, self.vars_len, 1, U48_MASK as usize),
      (Resource::Opers, self.opers_len, 1, U40_MASK as usize),
      (Resource::Redexes, self.redx_len, 1, usize::MAX),
    ];
    for (resource, len, min, max) in buffers {
      if len > max {
        return Err(ConfigError::TooLarge { resource, len, max });
      }
      if self.region(len) < min {
        return Err(ConfigError::TooSmall { resource, len, min: min * self.tids });
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn regions_round_down_to_powers_of_two() {
    let config = Config::scaled(1000).with_tids(4);
    assert_eq!(config.region(1000), 128);
    assert_eq!(config.region(1024), 256);
    assert_eq!(prev_power_of_two(1), 1);
    assert_eq!(prev_power_of_two(0), 0);
  }

  #[test]
  fn rejects_bad_thread_counts() {
    assert_eq!(Config::scaled(1 << 16).with_tids(3).validate(), Err(ConfigError::Threads(3)));
    assert_eq!(Config::scaled(1 << 16).with_tids(0).validate(), Err(ConfigError::Threads(0)));
    assert!(Config::scaled(1 << 16).with_tids(8).validate().is_ok());
  }

  #[test]
  fn rejects_regions_smaller_than_a_block() {
    let config = Config::scaled(1 << 16).with_tids(2).with_aux_len(300);
    assert!(matches!(config.validate(), Err(ConfigError::TooSmall { resource: Resource::Aux, .. })));
  }

  #[test]
  fn default_is_valid() {
    let config = Config::default();
    assert!(config.tids.is_power_of_two());
    assert!(config.validate().is_ok());
  }
}
