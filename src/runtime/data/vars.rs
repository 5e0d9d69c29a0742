// Variable Slots
// --------------
// A slot is allocated unbound (holding its own VAR node), bound at most once
// by whichever wire occupant arrives first, and taken by the second one. The
// taker frees it.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::runtime::data::SlotArena;
use crate::runtime::node::Node;

pub struct Vars {
  data: Box<[AtomicU64]>,
}

impl Vars {
  pub fn new(len: usize) -> Self {
    Vars { data: crate::runtime::new_atomic_u64_array(len) }
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  #[inline(always)]
  pub fn init(&self, idx: u64) {
    self.data[idx as usize].store(Node::var(idx).0, Ordering::Relaxed);
  }

  // Publishes `node` through an unbound slot. Fails if the slot was already
  // bound by the other occupant.
  #[inline(always)]
  pub fn try_bind(&self, idx: u64, node: Node) -> bool {
    self.data[idx as usize]
      .compare_exchange(Node::var(idx).0, node.0, Ordering::Release, Ordering::Relaxed)
      .is_ok()
  }

  // Takes the bound value and returns the slot to `arena`.
  #[inline(always)]
  pub fn take_and_free(&self, idx: u64, arena: &mut SlotArena) -> Node {
    let node = Node(self.data[idx as usize].swap(Node::NIL.0, Ordering::Acquire));
    arena.free(idx);
    node
  }

  #[inline(always)]
  pub fn release(&self, idx: u64, arena: &mut SlotArena) {
    self.data[idx as usize].store(Node::NIL.0, Ordering::Relaxed);
    arena.free(idx);
  }

  pub fn load(&self, idx: u64) -> Node {
    Node(self.data[idx as usize].load(Ordering::Acquire))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn second_occupant_takes_the_binding() {
    let vars = Vars::new(4);
    let mut arena = SlotArena::new(0, 4);
    let idx = arena.alloc().unwrap();
    vars.init(idx);
    assert!(vars.try_bind(idx, Node::ERA));
    assert!(!vars.try_bind(idx, Node::f64(1.0)));
    assert_eq!(vars.take_and_free(idx, &mut arena), Node::ERA);
    assert_eq!(vars.load(idx), Node::NIL);
    assert_eq!(arena.live(), 0);
  }

  #[test]
  fn race_binds_exactly_once() {
    let vars = Vars::new(1);
    vars.init(0);
    let wins: usize = std::thread::scope(|s| {
      let handles: Vec<_> = (0 .. 2)
        .map(|i| {
          let vars = &vars;
          s.spawn(move || vars.try_bind(0, Node::f64(i as f64)) as usize)
        })
        .collect();
      handles.into_iter().map(|h| h.join().unwrap()).sum()
    });
    assert_eq!(wins, 1);
  }
}
