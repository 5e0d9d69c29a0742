// Book
// ----
// Static templates. A definition's nodes use template-local indices: VAR(i)
// names its i-th variable, OPI/OPO name its i-th operation, and CON/DUP point
// into the book's shared aux pool. Instancing (see net.rs) rewrites all of
// them into fresh runtime handles and never mutates the template.

use std::fmt;

use itertools::Itertools;

use crate::runtime::error::BookError;
use crate::runtime::node::{Aux, Node, Pair, Term, MAX_AUX};
use crate::runtime::operation::{self, NativeFn, Oper, NATIVE};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DefId(pub u64);

impl DefId {
  // A lazy reference to this definition.
  pub fn node(self) -> Node {
    Node::cal(self.0)
  }
}

impl fmt::Display for DefId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "@{}", self.0)
  }
}

#[derive(Clone, Debug)]
pub struct Def {
  pub name: String,
  pub vars: u64,
  pub redexes: Vec<Pair>,
  pub opers: Vec<(Oper, u64)>, // (code, arity)
  pub out: Node,
}

pub struct Book {
  pub defs: Vec<Def>,
  pub aux: Vec<Node>,
  pub natives: Vec<NativeFn>,
}

impl Book {
  pub fn new() -> Self {
    Book { defs: Vec::new(), aux: Vec::new(), natives: Vec::new() }
  }

  pub fn add_aux(&mut self, nodes: &[Node]) -> Result<Aux, BookError> {
    if nodes.is_empty() || nodes.len() as u64 > MAX_AUX {
      return Err(BookError::AuxSize(nodes.len()));
    }
    // Nested cells may only point at blocks already in the pool.
    for node in nodes {
      if node.is_cell() && node.aux().loc(node.aux().size()) > self.aux.len() {
        return Err(BookError::DanglingBlock(node.aux().begin()));
      }
    }
    let aux = Aux::new(nodes.len() as u64, self.aux.len() as u64);
    self.aux.extend_from_slice(nodes);
    Ok(aux)
  }

  pub fn aux_slice(&self, aux: Aux) -> &[Node] {
    let begin = aux.begin() as usize;
    &self.aux[begin .. begin + aux.size() as usize]
  }

  pub fn add_def(&mut self, name: &str) -> DefId {
    self.defs.push(Def {
      name: name.to_string(),
      vars: 0,
      redexes: Vec::new(),
      opers: Vec::new(),
      out: Node::ERA,
    });
    DefId(self.defs.len() as u64 - 1)
  }

  pub fn def_mut(&mut self, id: DefId) -> Result<DefBuilder<'_>, BookError> {
    if id.0 as usize >= self.defs.len() {
      return Err(BookError::UnknownDef(id.0));
    }
    Ok(DefBuilder { book: self, id: id.0 as usize })
  }

  pub fn get(&self, id: DefId) -> Option<&Def> {
    self.defs.get(id.0 as usize)
  }

  pub fn find(&self, name: &str) -> Option<DefId> {
    self.defs.iter().position(|def| def.name == name).map(|i| DefId(i as u64))
  }

  // Registers a native function and returns the operator code that calls it.
  pub fn add_native(&mut self, fun: NativeFn) -> Oper {
    self.natives.push(fun);
    NATIVE | (self.natives.len() as u64 - 1)
  }

  pub fn check_oper(&self, code: Oper) -> Result<(), BookError> {
    if operation::is_native(code) {
      if operation::native_index(code) >= self.natives.len() {
        return Err(BookError::UnknownNative(code & !NATIVE));
      }
    } else if !operation::is_builtin(code) {
      return Err(BookError::UnknownOper(code));
    }
    Ok(())
  }
}

impl Default for Book {
  fn default() -> Self {
    Book::new()
  }
}

pub struct DefBuilder<'a> {
  book: &'a mut Book,
  id: usize,
}

impl<'a> DefBuilder<'a> {
  fn def(&mut self) -> &mut Def {
    &mut self.book.defs[self.id]
  }

  // Both ends of a fresh template wire.
  pub fn add_var(&mut self) -> (Node, Node) {
    let def = self.def();
    def.vars += 1;
    let var = Node::var(def.vars - 1);
    (var, var)
  }

  pub fn add_redex(&mut self, a: Node, b: Node) {
    self.def().redexes.push(Pair::new(a, b));
  }

  pub fn add_oper(&mut self, code: Oper, arity: usize) -> Result<u64, BookError> {
    if arity == 0 || arity as u64 > MAX_AUX {
      return Err(BookError::OperArity(arity));
    }
    self.book.check_oper(code)?;
    let def = self.def();
    def.opers.push((code, arity as u64));
    Ok(def.opers.len() as u64 - 1)
  }

  // Adds an operation whose inputs are wired to `inputs`. Returns its output.
  pub fn add_operation(&mut self, code: Oper, inputs: &[Node]) -> Result<Node, BookError> {
    let op = self.add_oper(code, inputs.len())?;
    for (port, input) in inputs.iter().enumerate() {
      self.add_redex(Node::opi(op, port as u64), *input);
    }
    Ok(Node::opo(op))
  }

  pub fn con(&mut self, nodes: &[Node]) -> Result<Node, BookError> {
    Ok(Node::con(self.book.add_aux(nodes)?))
  }

  pub fn dup(&mut self, nodes: &[Node]) -> Result<Node, BookError> {
    Ok(Node::dup(self.book.add_aux(nodes)?))
  }

  pub fn set_out(&mut self, node: Node) {
    self.def().out = node;
  }
}

// Display
// -------

impl Book {
  // Renders a template node, expanding aux blocks from the pool.
  pub fn show_node(&self, node: Node) -> String {
    match node.term() {
      Term::Var(i) => format!("v{}", i),
      Term::Cal(id) => match self.defs.get(id as usize) {
        Some(def) => format!("@{}", def.name),
        None => format!("@{}", id),
      },
      Term::Con(aux) => format!("({})", self.show_aux(aux)),
      Term::Dup(aux) => format!("{{{}}}", self.show_aux(aux)),
      Term::Era => "*".to_string(),
      Term::Opi { op, port } => format!("op{}.{}", op, port),
      Term::Opo(op) => format!("op{}", op),
      Term::Swi(pair) => format!("?{}", pair),
      Term::Sym(bits) => format!("{}", f64::from_bits(bits)),
      Term::Nil => "NIL".to_string(),
    }
  }

  fn show_aux(&self, aux: Aux) -> String {
    self.aux_slice(aux).iter().map(|n| self.show_node(*n)).join(" ")
  }

  pub fn show(&self) -> String {
    let mut s = String::new();
    for def in &self.defs {
      s.push_str(&format!("@{} = {}\n", def.name, self.show_node(def.out)));
      for (i, (code, arity)) in def.opers.iter().enumerate() {
        s.push_str(&format!("  op{} = {}/{}\n", i, operation::oper_name(*code), arity));
      }
      for redex in &def.redexes {
        s.push_str(&format!("  & {} ~ {}\n", self.show_node(redex.n0), self.show_node(redex.n1)));
      }
    }
    s
  }
}

// Demos
// -----

impl Book {
  // @main = * & {a a} ~ (* *)
  pub fn demo_erase() -> Result<(Book, DefId), BookError> {
    let mut book = Book::new();
    let main = book.add_def("main");
    let mut def = book.def_mut(main)?;
    let (a0, a1) = def.add_var();
    let dup = def.dup(&[a0, a1])?;
    let con = def.con(&[Node::ERA, Node::ERA])?;
    def.add_redex(dup, con);
    def.set_out(Node::ERA);
    Ok((book, main))
  }

  // @main = (+ a b)
  pub fn demo_add(a: f64, b: f64) -> Result<(Book, DefId), BookError> {
    let mut book = Book::new();
    let main = book.add_def("main");
    let mut def = book.def_mut(main)?;
    let out = def.add_operation(operation::ADD, &[Node::f64(a), Node::f64(b)])?;
    def.set_out(out);
    Ok((book, main))
  }

  // @pow2_0 = 1
  // @pow2_k = (+ @pow2_{k-1} @pow2_{k-1})
  // Unfolds 2^(depth+1) - 2 calls and performs 2^depth - 1 additions.
  pub fn demo_pow2(depth: u32) -> Result<(Book, DefId), BookError> {
    let mut book = Book::new();
    let base = book.add_def("pow2_0");
    book.def_mut(base)?.set_out(Node::f64(1.0));
    let mut prev = base;
    for k in 1 ..= depth {
      let id = book.add_def(&format!("pow2_{}", k));
      let mut def = book.def_mut(id)?;
      let out = def.add_operation(operation::ADD, &[prev.node(), prev.node()])?;
      def.set_out(out);
      prev = id;
    }
    Ok((book, prev))
  }

  // @main = (a b) & {a b} ~ <tree of the given depth with numbered leaves>
  pub fn demo_copy(depth: u32) -> Result<(Book, DefId), BookError> {
    let mut book = Book::new();
    let main = book.add_def("main");
    let mut def = book.def_mut(main)?;
    let (a0, a1) = def.add_var();
    let (b0, b1) = def.add_var();
    let mut leaf = 0;
    let tree = build_tree(&mut def, depth, &mut leaf)?;
    let dup = def.dup(&[a0, b0])?;
    def.add_redex(dup, tree);
    let out = def.con(&[a1, b1])?;
    def.set_out(out);
    Ok((book, main))
  }
}

fn build_tree(def: &mut DefBuilder, depth: u32, leaf: &mut u32) -> Result<Node, BookError> {
  if depth == 0 {
    *leaf += 1;
    return Ok(Node::f64((*leaf - 1) as f64));
  }
  let l = build_tree(def, depth - 1, leaf)?;
  let r = build_tree(def, depth - 1, leaf)?;
  def.con(&[l, r])
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::operation::{ADD, MUL};

  #[test]
  fn builder_tracks_template_indices() {
    let mut book = Book::new();
    let id = book.add_def("f");
    let mut def = book.def_mut(id).unwrap();
    let (x0, x1) = def.add_var();
    let (y0, _) = def.add_var();
    assert_eq!(x0, x1);
    assert_eq!(y0, Node::var(1));
    let out = def.add_operation(MUL, &[x0, y0, Node::f64(2.0)]).unwrap();
    assert_eq!(out, Node::opo(0));
    def.set_out(out);
    let f = book.get(id).unwrap();
    assert_eq!(f.vars, 2);
    assert_eq!(f.opers, vec![(MUL, 3)]);
    assert_eq!(f.redexes[2], Pair::new(Node::opi(0, 2), Node::f64(2.0)));
    assert_eq!(book.find("f"), Some(id));
    assert_eq!(book.find("g"), None);
  }

  #[test]
  fn rejects_bad_blocks_and_operators() {
    let mut book = Book::new();
    assert_eq!(book.add_aux(&[]), Err(BookError::AuxSize(0)));
    assert_eq!(book.add_aux(&[Node::ERA; 257]), Err(BookError::AuxSize(257)));
    assert!(book.add_aux(&[Node::ERA; 256]).is_ok());
    let id = book.add_def("f");
    let mut def = book.def_mut(id).unwrap();
    assert_eq!(def.add_oper(ADD, 0), Err(BookError::OperArity(0)));
    assert_eq!(def.add_oper(ADD, 257), Err(BookError::OperArity(257)));
    assert_eq!(def.add_oper(0x42, 2), Err(BookError::UnknownOper(0x42)));
    assert_eq!(def.add_oper(NATIVE | 1, 2), Err(BookError::UnknownNative(1)));
    assert!(book.def_mut(DefId(9)).is_err());
  }

  #[test]
  fn blocks_only_point_backwards() {
    let mut book = Book::new();
    assert_eq!(book.add_aux(&[Node::con(Aux::new(1, 0))]), Err(BookError::DanglingBlock(0)));
    let leaf = book.add_aux(&[Node::f64(1.0), Node::ERA]).unwrap();
    assert_eq!(book.add_aux(&[Node::dup(Aux::new(2, 1))]), Err(BookError::DanglingBlock(1)));
    let outer = book.add_aux(&[Node::dup(leaf), Node::con(leaf)]).unwrap();
    assert_eq!(outer.begin(), 2);
    assert_eq!(book.aux.len(), 4);
  }

  #[test]
  fn natives_get_sequential_codes() {
    fn first(args: &[Node]) -> Node {
      args[0]
    }
    let mut book = Book::new();
    assert_eq!(book.add_native(first), NATIVE);
    assert_eq!(book.add_native(first), NATIVE | 1);
    assert!(book.check_oper(NATIVE | 1).is_ok());
  }

  #[test]
  fn demos_show() {
    let (book, main) = Book::demo_erase().unwrap();
    assert_eq!(book.show(), "@main = *\n  & {v0 v0} ~ (* *)\n");
    let (book, top) = Book::demo_pow2(3).unwrap();
    assert_eq!(top, DefId(3));
    assert_eq!(book.get(top).unwrap().redexes[0], Pair::new(Node::opi(0, 0), Node::cal(2)));
    assert_eq!(main, DefId(0));
  }
}
