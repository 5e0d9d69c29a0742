// Redex Bag
// ---------
// Per-thread pair of LIFO queues. Cheap redexes (links, erasures, same-kind
// annihilations) go to a small local priority stack that is always drained
// first, which keeps the net from growing while they wait. Everything else,
// and whatever overflows the priority stack, goes to this thread's region of
// the shared redex buffer.

use crate::runtime::node::{APair, Pair};
use crate::runtime::rule;

pub struct RedexBag {
  prio: Vec<Pair>,
  prio_len: usize,
  next: usize,
  init: usize,
  end: usize,
}

impl RedexBag {
  pub fn new(tid: usize, region: usize, prio_len: usize) -> Self {
    let init = tid * region;
    RedexBag { prio: Vec::with_capacity(prio_len), prio_len, next: init, init, end: init + region }
  }

  // Returns false when both queues are full.
  #[inline(always)]
  pub fn push(&mut self, redx: &[APair], pair: Pair) -> bool {
    if rule::is_priority(pair) && self.prio.len() < self.prio_len {
      self.prio.push(pair);
      return true;
    }
    if self.next >= self.end {
      return false;
    }
    redx[self.next].store(pair);
    self.next += 1;
    true
  }

  // Returns the NIL pair when empty.
  #[inline(always)]
  pub fn pop(&mut self, redx: &[APair]) -> Pair {
    if let Some(pair) = self.prio.pop() {
      return pair;
    }
    if self.next > self.init {
      self.next -= 1;
      return redx[self.next].load();
    }
    Pair::NIL
  }

  pub fn len(&self) -> usize {
    self.prio.len() + (self.next - self.init)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
