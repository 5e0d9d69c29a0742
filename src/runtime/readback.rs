// Readback
// --------
// Turns the part of a quiescent net reachable from a node into a tree,
// following bound variables to their values.

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;

use crate::runtime::net::Net;
use crate::runtime::node::{Node, Term};

#[derive(Clone, Debug, PartialEq)]
pub enum Tree {
  Era,
  Var(u64),
  Sym(u64),
  Cal(u64),
  Con(Vec<Tree>),
  Dup(Vec<Tree>),
  Opi { op: u64, port: u64 },
  Opo(u64),
  Swi(u64),
  Nil,
}

impl Tree {
  pub fn num(&self) -> Option<f64> {
    match self {
      Tree::Sym(bits) => Some(f64::from_bits(*bits)),
      _ => None,
    }
  }

  // Renames variables and operations by order of first appearance, so that
  // trees read from different runs compare equal.
  pub fn normalize(&mut self) {
    let mut vars = HashMap::new();
    let mut ops = HashMap::new();
    let mut stack = vec![self];
    while let Some(tree) = stack.pop() {
      match tree {
        Tree::Var(idx) => {
          let len = vars.len() as u64;
          *idx = *vars.entry(*idx).or_insert(len);
        }
        Tree::Opi { op, .. } | Tree::Opo(op) => {
          let len = ops.len() as u64;
          *op = *ops.entry(*op).or_insert(len);
        }
        Tree::Con(kids) | Tree::Dup(kids) => stack.extend(kids.iter_mut().rev()),
        _ => {}
      }
    }
  }
}

// Read-back trees can be as deep as the net, so they are torn down without
// recursion.
impl Drop for Tree {
  fn drop(&mut self) {
    let mut stack = Vec::new();
    if let Tree::Con(kids) | Tree::Dup(kids) = self {
      stack.append(kids);
    }
    while let Some(mut tree) = stack.pop() {
      if let Tree::Con(kids) | Tree::Dup(kids) = &mut tree {
        stack.append(kids);
      }
    }
  }
}

impl fmt::Display for Tree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Tree::Era => write!(f, "*"),
      Tree::Var(idx) => write!(f, "x{}", idx),
      Tree::Sym(bits) => write!(f, "{}", f64::from_bits(*bits)),
      Tree::Cal(id) => write!(f, "@{}", id),
      Tree::Con(kids) => write!(f, "({})", kids.iter().join(" ")),
      Tree::Dup(kids) => write!(f, "{{{}}}", kids.iter().join(" ")),
      Tree::Opi { op, port } => write!(f, "<op{}.{}>", op, port),
      Tree::Opo(op) => write!(f, "<op{}>", op),
      Tree::Swi(pair) => write!(f, "?{}", pair),
      Tree::Nil => write!(f, "NIL"),
    }
  }
}

enum Visit {
  Node(Node),
  Con(usize),
  Dup(usize),
}

impl Net {
  // Walks with an explicit stack: nodes are expanded in order and finished
  // cells collect their children from the end of `done`.
  pub fn readback(&self, node: Node) -> Tree {
    let mut todo = vec![Visit::Node(node)];
    let mut done: Vec<Tree> = Vec::new();
    while let Some(visit) = todo.pop() {
      match visit {
        Visit::Node(node) => match self.resolve(node).term() {
          Term::Var(idx) => done.push(Tree::Var(idx)),
          Term::Con(aux) => {
            todo.push(Visit::Con(aux.size() as usize));
            todo.extend(self.aux_nodes(aux).into_iter().rev().map(Visit::Node));
          }
          Term::Dup(aux) => {
            todo.push(Visit::Dup(aux.size() as usize));
            todo.extend(self.aux_nodes(aux).into_iter().rev().map(Visit::Node));
          }
          Term::Era => done.push(Tree::Era),
          Term::Sym(bits) => done.push(Tree::Sym(bits)),
          Term::Cal(id) => done.push(Tree::Cal(id)),
          Term::Opi { op, port } => done.push(Tree::Opi { op, port }),
          Term::Opo(op) => done.push(Tree::Opo(op)),
          Term::Swi(pair) => done.push(Tree::Swi(pair)),
          Term::Nil => done.push(Tree::Nil),
        },
        Visit::Con(len) => {
          let kids = done.split_off(done.len() - len);
          done.push(Tree::Con(kids));
        }
        Visit::Dup(len) => {
          let kids = done.split_off(done.len() - len);
          done.push(Tree::Dup(kids));
        }
      }
    }
    done.pop().unwrap_or(Tree::Nil)
  }

  // Follows bound variables. An unbound or freed slot ends the chain.
  fn resolve(&self, mut node: Node) -> Node {
    while node.is_var() {
      let val = self.vars.load(node.var_idx());
      if val == node || val.is_nil() {
        break;
      }
      node = val;
    }
    node
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_renames_in_order() {
    let mut tree = Tree::Con(vec![Tree::Var(42), Tree::Dup(vec![Tree::Var(7), Tree::Var(42)]), Tree::Opo(9)]);
    tree.normalize();
    assert_eq!(tree, Tree::Con(vec![Tree::Var(0), Tree::Dup(vec![Tree::Var(1), Tree::Var(0)]), Tree::Opo(0)]));
    assert_eq!(tree.to_string(), "(x0 {x1 x0} <op0>)");
  }

  #[test]
  fn shows_numbers() {
    let tree = Tree::Con(vec![Tree::Sym(2.5f64.to_bits()), Tree::Era]);
    assert_eq!(tree.to_string(), "(2.5 *)");
    assert_eq!(Tree::Sym(7.0f64.to_bits()).num(), Some(7.0));
  }
}
