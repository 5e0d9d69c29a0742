pub mod book;
pub mod config;
pub mod data;
pub mod error;
pub mod net;
pub mod node;
pub mod operation;
pub mod readback;
pub mod rule;
pub mod vm;

pub use book::{Book, Def, DefBuilder, DefId};
pub use config::{Config, NODES_PER_GB, NODES_PER_KB, NODES_PER_MB};
pub use error::{BookError, ConfigError, Resource, RunError};
pub use net::{Net, Rewrites, TMem};
pub use node::{Aux, Node, Pair, Tag, Term};
pub use operation::{NativeFn, Oper};
pub use readback::Tree;
pub use rule::Rule;
pub use vm::{Live, Vm};

use std::sync::atomic::AtomicU64;

pub fn new_atomic_u64_array(size: usize) -> Box<[AtomicU64]> {
  (0 .. size).map(|_| AtomicU64::new(0)).collect()
}
