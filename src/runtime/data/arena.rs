// Arenas
// ------
// Per-thread bump allocators. Each thread owns one region of a shared buffer
// and hands out handles from it; freed handles go to explicit free lists and
// are reused before the cursor moves. A handle may be freed by a thread other
// than the one that allocated it, in which case it joins the freeing thread's
// lists. Live counts are therefore only meaningful summed over all threads.

use crate::runtime::node::{Aux, MAX_AUX};

pub struct AuxArena {
  free: Vec<Vec<u64>>, // free[k - 1] holds the begins of size-k blocks
  next: u64,
  end: u64,
  live: i64,
}

impl AuxArena {
  pub fn new(tid: usize, region: usize) -> Self {
    let init = (tid * region) as u64;
    let free = (0 .. MAX_AUX).map(|_| Vec::new()).collect();
    AuxArena { free, next: init, end: init + region as u64, live: 0 }
  }

  #[inline(always)]
  pub fn alloc(&mut self, size: u64) -> Option<Aux> {
    debug_assert!((1 ..= MAX_AUX).contains(&size));
    let begin = match self.free[(size - 1) as usize].pop() {
      Some(begin) => begin,
      None => {
        if self.next + size > self.end {
          return None;
        }
        let begin = self.next;
        self.next += size;
        begin
      }
    };
    self.live += 1;
    Some(Aux::new(size, begin))
  }

  #[inline(always)]
  pub fn free(&mut self, aux: Aux) {
    self.free[(aux.size() - 1) as usize].push(aux.begin());
    self.live -= 1;
  }

  pub fn live(&self) -> i64 {
    self.live
  }
}

// Single-word slots: variables and operation records.
pub struct SlotArena {
  free: Vec<u64>,
  next: u64,
  end: u64,
  live: i64,
}

impl SlotArena {
  pub fn new(tid: usize, region: usize) -> Self {
    let init = (tid * region) as u64;
    SlotArena { free: Vec::new(), next: init, end: init + region as u64, live: 0 }
  }

  #[inline(always)]
  pub fn alloc(&mut self) -> Option<u64> {
    let idx = match self.free.pop() {
      Some(idx) => idx,
      None => {
        if self.next >= self.end {
          return None;
        }
        self.next += 1;
        self.next - 1
      }
    };
    self.live += 1;
    Some(idx)
  }

  #[inline(always)]
  pub fn free(&mut self, idx: u64) {
    self.free.push(idx);
    self.live -= 1;
  }

  pub fn live(&self) -> i64 {
    self.live
  }
}
