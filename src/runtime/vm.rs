// VM
// --
// Owns the shared net and one `TMem` per worker. Seeding happens on thread 0;
// `run` optionally deals the seeds across threads and reduces to quiescence.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::utils::CachePadded;
use tracing::{debug, error, trace};

use crate::runtime::book::{Book, DefId};
use crate::runtime::config::Config;
use crate::runtime::error::{ConfigError, RunError};
use crate::runtime::net::{Net, Rewrites, TMem};
use crate::runtime::node::{Node, Pair};
use crate::runtime::readback::Tree;

// Live handles summed over all threads.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Live {
  pub aux: i64,
  pub vars: i64,
  pub opers: i64,
}

pub struct Vm {
  pub config: Config,
  pub net: Net,
  pub tmem: Vec<CachePadded<TMem>>,
}

impl Vm {
  pub fn new(config: Config) -> Result<Self, ConfigError> {
    config.validate()?;
    let net = Net::new(&config);
    let tmem = (0 .. config.tids).map(|tid| CachePadded::new(TMem::new(tid, &config))).collect();
    debug!(
      tids = config.tids,
      aux = net.aux.len(),
      vars = net.vars.len(),
      opers = net.opers.len(),
      redexes = net.redx.len(),
      "created vm"
    );
    Ok(Vm { config, net, tmem })
  }

  pub fn alloc_var(&mut self) -> Result<Node, RunError> {
    Ok(Node::var(self.tmem[0].alloc_var(&self.net)?))
  }

  pub fn push_redex(&mut self, a: Node, b: Node) -> Result<(), RunError> {
    self.tmem[0].push(&self.net, a, b)
  }

  // Instances `main` and links its output to a fresh root variable.
  pub fn boot(&mut self, book: &Book, main: DefId) -> Result<Node, RunError> {
    let root = self.alloc_var()?;
    let out = self.tmem[0].instance_def(&self.net, book, main.0)?;
    self.push_redex(root, out)?;
    debug!(def = %main, root = %root, seeds = self.tmem[0].rbag.len(), "booted");
    Ok(root)
  }

  // Deals the seed redexes queued on thread 0 round-robin across threads.
  fn spread(&mut self) -> Result<(), RunError> {
    let tids = self.tmem.len();
    if tids < 2 {
      return Ok(());
    }
    let mut seeds: Vec<Pair> = Vec::new();
    loop {
      let pair = self.tmem[0].rbag.pop(&self.net.redx);
      if pair.is_nil() {
        break;
      }
      seeds.push(pair);
    }
    trace!(seeds = seeds.len(), tids, "spreading seeds");
    for (i, pair) in seeds.into_iter().rev().enumerate() {
      self.tmem[i % tids].push(&self.net, pair.n0, pair.n1)?;
    }
    Ok(())
  }

  // Reduces the net to quiescence. Returns the first worker error.
  pub fn run(&mut self, book: &Book) -> Result<(), RunError> {
    if self.config.spread {
      self.spread()?;
    }

    let stop = AtomicBool::new(false);
    let net = &self.net;
    let stop = &stop;

    let results: Vec<Result<(), RunError>> = std::thread::scope(|s| {
      let handles: Vec<_> = self
        .tmem
        .iter_mut()
        .map(|tm| {
          s.spawn(move || {
            debug!(tid = tm.tid, seeds = tm.rbag.len(), "worker started");
            let result = tm.evaluator(net, book, stop);
            match &result {
              Ok(()) => debug!(tid = tm.tid, interactions = tm.stats.total(), "worker finished"),
              Err(err) => {
                error!(tid = tm.tid, "{}", err);
                stop.store(true, Ordering::Relaxed);
              }
            }
            result
          })
        })
        .collect();
      handles.into_iter().map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e))).collect()
    });

    results.into_iter().collect()
  }

  pub fn rewrites(&self) -> Rewrites {
    self.tmem.iter().fold(Rewrites::default(), |acc, tm| acc + tm.stats)
  }

  pub fn interactions(&self) -> u64 {
    self.rewrites().total()
  }

  pub fn load_var(&self, var: Node) -> Node {
    self.net.vars.load(var.var_idx())
  }

  pub fn readback(&self, node: Node) -> Tree {
    self.net.readback(node)
  }

  pub fn live(&self) -> Live {
    self.tmem.iter().fold(Live::default(), |acc, tm| Live {
      aux: acc.aux + tm.aux.live(),
      vars: acc.vars + tm.vars.live(),
      opers: acc.opers + tm.opers.live(),
    })
  }
}
