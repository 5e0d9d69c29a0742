use std::fmt;

use thiserror::Error;

use crate::runtime::Node;

// Shared buffers a thread can run out of.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Resource {
  Aux,
  Vars,
  Opers,
  Redexes,
}

impl Resource {
  pub fn as_str(&self) -> &'static str {
    match self {
      Resource::Aux => "aux",
      Resource::Vars => "var",
      Resource::Opers => "operation",
      Resource::Redexes => "redex",
    }
  }
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Failure of a reduction run.
///
/// `ResourceExhausted` is the only variant a caller can act on (by retrying
/// with a larger [`Config`](crate::runtime::Config)); the others mean the net
/// itself is broken.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum RunError {
  #[error("thread {tid}: {resource} space exhausted")]
  ResourceExhausted { tid: usize, resource: Resource },

  #[error("thread {tid}: malformed net, {reason} ({a} ~ {b})")]
  MalformedNet { tid: usize, reason: &'static str, a: Node, b: Node },

  #[error("thread {tid}: no interaction rule for {a} ~ {b}")]
  UnimplementedRule { tid: usize, a: Node, b: Node },

  #[error("thread {tid}: call to unknown definition {id}")]
  UnknownDef { tid: usize, id: u64 },
}

impl RunError {
  pub fn tid(&self) -> usize {
    match self {
      RunError::ResourceExhausted { tid, .. }
      | RunError::MalformedNet { tid, .. }
      | RunError::UnimplementedRule { tid, .. }
      | RunError::UnknownDef { tid, .. } => *tid,
    }
  }
}

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum BookError {
  #[error("aux blocks hold 1 to 256 ports, got {0}")]
  AuxSize(usize),

  #[error("operations take 1 to 256 inputs, got {0}")]
  OperArity(usize),

  #[error("unknown built-in operator {0:#x}")]
  UnknownOper(u64),

  #[error("unknown native function {0}")]
  UnknownNative(u64),

  #[error("unknown definition {0}")]
  UnknownDef(u64),

  #[error("block at {0} is not in the aux pool yet")]
  DanglingBlock(u64),
}

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum ConfigError {
  #[error("thread count must be a non-zero power of two, got {0}")]
  Threads(usize),

  #[error("{resource} capacity {len} leaves less than {min} entries per thread")]
  TooSmall { resource: Resource, len: usize, min: usize },

  #[error("{resource} capacity {len} exceeds the addressable maximum {max}")]
  TooLarge { resource: Resource, len: usize, max: usize },
}
