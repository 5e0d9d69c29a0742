// Operations
// ----------
// An operation is a deferred computation with `arity` input ports and one
// output port. Its inputs live in an aux block; every port that gets wired
// decrements `unlinked`, and whoever brings it to zero fires the body.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::runtime::data::num;
use crate::runtime::node::{Aux, Node};

pub type Oper = u64;

pub const ADD: Oper = 0x0;
pub const SUB: Oper = 0x1;
pub const MUL: Oper = 0x2;
pub const DIV: Oper = 0x3;
pub const REM: Oper = 0x4;
pub const MIN: Oper = 0x5;
pub const MAX: Oper = 0x6;
pub const LTN: Oper = 0x7;
pub const EQL: Oper = 0x8;
pub const GTN: Oper = 0x9;

// Codes with this bit set index the book's native functions.
pub const NATIVE: Oper = 1 << 63;

pub type NativeFn = fn(&[Node]) -> Node;

pub fn is_builtin(code: Oper) -> bool {
  code <= GTN
}

pub fn is_native(code: Oper) -> bool {
  code & NATIVE != 0
}

pub fn native_index(code: Oper) -> usize {
  (code & !NATIVE) as usize
}

pub fn oper_name(code: Oper) -> &'static str {
  match code {
    ADD => "+",
    SUB => "-",
    MUL => "*",
    DIV => "/",
    REM => "%",
    MIN => "min",
    MAX => "max",
    LTN => "<",
    EQL => "==",
    GTN => ">",
    _ => "native",
  }
}

// Applies a built-in operator.
pub fn eval_builtin(code: Oper, args: &[f64]) -> f64 {
  match code {
    ADD => num::add(args),
    SUB => num::sub(args),
    MUL => num::mul(args),
    DIV => num::div(args),
    REM => num::rem(args),
    MIN => num::min(args),
    MAX => num::max(args),
    LTN => num::ltn(args),
    EQL => num::eql(args),
    GTN => num::gtn(args),
    _ => f64::NAN,
  }
}

pub struct Operation {
  pub code: AtomicU64,
  pub ins: AtomicU64,
  pub out: AtomicU64,
  pub unlinked: AtomicU64,
  pub killed: AtomicBool,
}

impl Operation {
  pub fn new() -> Self {
    Operation {
      code: AtomicU64::new(0),
      ins: AtomicU64::new(0),
      out: AtomicU64::new(u64::MAX),
      unlinked: AtomicU64::new(0),
      killed: AtomicBool::new(false),
    }
  }

  // Resets a freshly allocated record.
  pub fn init(&self, code: Oper, ins: Aux) {
    self.code.store(code, Ordering::Relaxed);
    self.ins.store(ins.0, Ordering::Relaxed);
    self.out.store(Node::NIL.0, Ordering::Relaxed);
    self.killed.store(false, Ordering::Relaxed);
    self.unlinked.store(ins.size() + 1, Ordering::Relaxed);
  }

  pub fn code(&self) -> Oper {
    self.code.load(Ordering::Relaxed)
  }

  pub fn ins(&self) -> Aux {
    Aux(self.ins.load(Ordering::Relaxed))
  }

  pub fn out(&self) -> Node {
    Node(self.out.load(Ordering::Relaxed))
  }

  pub fn set_out(&self, node: Node) {
    self.out.store(node.0, Ordering::Relaxed);
  }

  pub fn kill(&self) {
    self.killed.store(true, Ordering::Relaxed);
  }

  pub fn is_killed(&self) -> bool {
    self.killed.load(Ordering::Relaxed)
  }

  // Marks one port as wired. True for the caller that wired the last one.
  #[inline(always)]
  pub fn arrive(&self) -> bool {
    self.unlinked.fetch_sub(1, Ordering::AcqRel) == 1
  }
}

impl Default for Operation {
  fn default() -> Self {
    Operation::new()
  }
}
