// Rules
// -----
// Dispatch is a lookup on the table indices of both endpoints (see node.rs).
// Rows are the first endpoint, columns the second.

use crate::runtime::node::Pair;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Rule {
  Link, // one side is a variable
  Void, // nilary against nilary
  Call, // a definition reference is consumed
  Anni, // same-kind cells
  Comm, // different-kind cells
  Eras, // nilary against a cell
  Inpl, // wires an operator input
  Outl, // wires an operator output
  Kili, // erases an operator input
  Kilo, // erases an operator output
  Swit, // reserved switch node
  Fail, // operator port against operator port of the same side
  Halt, // end of work, or a stray NIL
}

use Rule::*;

pub const RULES: [[Rule; 10]; 10] = [
  //       VAR   CAL   CON   DUP   ERA   OPI   OPO   SWI   SYM   NIL
  /*VAR*/ [Link, Link, Link, Link, Link, Link, Outl, Link, Link, Halt],
  /*CAL*/ [Link, Void, Call, Call, Void, Call, Call, Swit, Void, Halt],
  /*CON*/ [Link, Call, Anni, Comm, Eras, Inpl, Outl, Swit, Eras, Halt],
  /*DUP*/ [Link, Call, Comm, Anni, Eras, Inpl, Outl, Swit, Eras, Halt],
  /*ERA*/ [Link, Void, Eras, Eras, Void, Kili, Kilo, Swit, Void, Halt],
  /*OPI*/ [Link, Call, Inpl, Inpl, Kili, Fail, Outl, Inpl, Inpl, Halt],
  /*OPO*/ [Outl, Call, Outl, Outl, Kilo, Outl, Fail, Outl, Outl, Halt],
  /*SWI*/ [Link, Swit, Swit, Swit, Swit, Inpl, Outl, Swit, Swit, Halt],
  /*SYM*/ [Link, Void, Eras, Eras, Void, Inpl, Outl, Swit, Void, Halt],
  /*NIL*/ [Halt, Halt, Halt, Halt, Halt, Halt, Halt, Halt, Halt, Halt],
];

const T: bool = true;
const F: bool = false;

pub const PRIORITY: [[bool; 10]; 10] = [
  //       VAR CAL CON DUP ERA OPI OPO SWI SYM NIL
  /*VAR*/ [T,  T,  T,  T,  T,  T,  T,  T,  T,  T],
  /*CAL*/ [T,  F,  F,  F,  F,  F,  F,  F,  F,  T],
  /*CON*/ [T,  F,  T,  F,  T,  F,  F,  F,  F,  T],
  /*DUP*/ [T,  F,  F,  T,  T,  F,  F,  F,  F,  T],
  /*ERA*/ [T,  F,  T,  T,  T,  F,  F,  F,  F,  T],
  /*OPI*/ [T,  F,  F,  F,  F,  F,  F,  F,  F,  T],
  /*OPO*/ [T,  F,  F,  F,  F,  F,  F,  F,  F,  T],
  /*SWI*/ [T,  F,  F,  F,  F,  F,  F,  F,  F,  T],
  /*SYM*/ [T,  F,  F,  F,  F,  F,  F,  F,  F,  T],
  /*NIL*/ [T,  T,  T,  T,  T,  T,  T,  T,  T,  T],
];

#[inline(always)]
pub fn rule(pair: Pair) -> Rule {
  RULES[pair.n0.table_index()][pair.n1.table_index()]
}

#[inline(always)]
pub fn is_priority(pair: Pair) -> bool {
  PRIORITY[pair.n0.table_index()][pair.n1.table_index()]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::node::{Aux, Node, Tag};

  #[test]
  fn symmetric_rules_agree() {
    for a in Tag::ALL {
      for b in Tag::ALL {
        let (ab, ba) = (RULES[a.index()][b.index()], RULES[b.index()][a.index()]);
        match (ab, ba) {
          (Link, _) | (_, Link) | (Outl, _) | (_, Outl) | (Inpl, _) | (_, Inpl) => {}
          (Kili, _) | (_, Kili) | (Kilo, _) | (_, Kilo) => {}
          _ => assert_eq!(ab, ba, "{} ~ {}", a, b),
        }
      }
    }
  }

  #[test]
  fn nil_halts_everywhere() {
    for tag in Tag::ALL {
      assert_eq!(RULES[Tag::NIL.index()][tag.index()], Halt);
      assert_eq!(RULES[tag.index()][Tag::NIL.index()], Halt);
    }
  }

  #[test]
  fn lookups() {
    let con = Node::con(Aux::new(2, 0));
    let dup = Node::dup(Aux::new(2, 2));
    assert_eq!(rule(Pair::new(con, dup)), Comm);
    assert_eq!(rule(Pair::new(dup, dup)), Anni);
    assert_eq!(rule(Pair::new(Node::f64(1.0), con)), Eras);
    assert_eq!(rule(Pair::new(Node::opo(0), Node::var(0))), Outl);
    assert_eq!(rule(Pair::new(Node::cal(0), Node::opi(0, 0))), Call);
    assert!(is_priority(Pair::new(Node::ERA, dup)));
    assert!(!is_priority(Pair::new(con, dup)));
  }
}
