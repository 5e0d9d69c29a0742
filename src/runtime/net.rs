// Runtime
// =======
// The shared net and the per-thread memory that reduces it. Threads alias
// only the `Net`; everything in `TMem` is owned by its worker.

use std::ops::{Add, AddAssign};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::runtime::book::Book;
use crate::runtime::config::Config;
use crate::runtime::data::{AuxArena, RedexBag, SlotArena, Vars};
use crate::runtime::error::{Resource, RunError};
use crate::runtime::node::{APair, Aux, Node, Pair, Tag};
use crate::runtime::operation::{self, Oper, Operation};
use crate::runtime::rule::{self, Rule};

// Global Net
// ----------

pub struct Net {
  pub aux: Box<[AtomicU64]>,
  pub vars: Vars,
  pub opers: Box<[Operation]>,
  pub redx: Box<[APair]>,
}

impl Net {
  pub fn new(config: &Config) -> Self {
    let tids = config.tids;
    Net {
      aux: crate::runtime::new_atomic_u64_array(config.region(config.aux_len) * tids),
      vars: Vars::new(config.region(config.vars_len) * tids),
      opers: (0 .. config.region(config.opers_len) * tids).map(|_| Operation::new()).collect(),
      redx: (0 .. config.region(config.redx_len) * tids).map(|_| APair::new()).collect(),
    }
  }

  #[inline(always)]
  pub fn aux_load(&self, loc: usize) -> Node {
    Node(self.aux[loc].load(Ordering::Relaxed))
  }

  #[inline(always)]
  pub fn aux_store(&self, loc: usize, node: Node) {
    self.aux[loc].store(node.0, Ordering::Relaxed);
  }

  pub fn aux_nodes(&self, aux: Aux) -> Vec<Node> {
    (0 .. aux.size()).map(|i| self.aux_load(aux.loc(i))).collect()
  }
}

// Rewrites
// --------

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Rewrites {
  pub anni: u64,
  pub comm: u64,
  pub eras: u64,
  pub call: u64,
  pub oper: u64,
  pub link: u64,
  pub void: u64,
}

impl Rewrites {
  // Interactions proper. Wiring, linking and voids are bookkeeping.
  pub fn total(&self) -> u64 {
    self.anni + self.comm + self.eras + self.call + self.oper
  }
}

impl Add for Rewrites {
  type Output = Rewrites;

  fn add(self, rhs: Self) -> Self::Output {
    Rewrites {
      anni: self.anni + rhs.anni,
      comm: self.comm + rhs.comm,
      eras: self.eras + rhs.eras,
      call: self.call + rhs.call,
      oper: self.oper + rhs.oper,
      link: self.link + rhs.link,
      void: self.void + rhs.void,
    }
  }
}

impl AddAssign for Rewrites {
  fn add_assign(&mut self, rhs: Self) {
    *self = *self + rhs;
  }
}

// Thread Memory
// -------------

pub struct TMem {
  pub tid: usize,
  pub aux: AuxArena,
  pub vars: SlotArena,
  pub opers: SlotArena,
  pub rbag: RedexBag,
  pub stats: Rewrites,
  vloc: Vec<u64>,
  var_map: Vec<u64>,
  op_map: Vec<u64>,
  blks: Vec<(Aux, Aux)>,
  args: Vec<f64>,
  ins: Vec<Node>,
}

impl TMem {
  pub fn new(tid: usize, config: &Config) -> Self {
    TMem {
      tid,
      aux: AuxArena::new(tid, config.region(config.aux_len)),
      vars: SlotArena::new(tid, config.region(config.vars_len)),
      opers: SlotArena::new(tid, config.region(config.opers_len)),
      rbag: RedexBag::new(tid, config.region(config.redx_len), config.prdx_len),
      stats: Rewrites::default(),
      vloc: Vec::new(),
      var_map: Vec::new(),
      op_map: Vec::new(),
      blks: Vec::new(),
      args: Vec::new(),
      ins: Vec::new(),
    }
  }

  fn exhausted(&self, resource: Resource) -> RunError {
    RunError::ResourceExhausted { tid: self.tid, resource }
  }

  fn malformed(&self, reason: &'static str, a: Node, b: Node) -> RunError {
    RunError::MalformedNet { tid: self.tid, reason, a, b }
  }

  #[inline(always)]
  pub fn push(&mut self, net: &Net, a: Node, b: Node) -> Result<(), RunError> {
    if self.rbag.push(&net.redx, Pair::new(a, b)) {
      Ok(())
    } else {
      Err(self.exhausted(Resource::Redexes))
    }
  }

  #[inline(always)]
  pub fn alloc_aux(&mut self, size: u64) -> Result<Aux, RunError> {
    self.aux.alloc(size).ok_or_else(|| self.exhausted(Resource::Aux))
  }

  // Allocates an unbound variable.
  #[inline(always)]
  pub fn alloc_var(&mut self, net: &Net) -> Result<u64, RunError> {
    let idx = self.vars.alloc().ok_or_else(|| self.exhausted(Resource::Vars))?;
    net.vars.init(idx);
    Ok(idx)
  }

  // Allocates an operation record along with its input block.
  pub fn alloc_oper(&mut self, net: &Net, code: Oper, arity: u64) -> Result<u64, RunError> {
    let ins = self.alloc_aux(arity)?;
    let op = self.opers.alloc().ok_or_else(|| self.exhausted(Resource::Opers))?;
    net.opers[op as usize].init(code, ins);
    Ok(op)
  }

  // The Link Interaction.
  pub fn interact_link(&mut self, net: &Net, var: Node, other: Node) -> Result<(), RunError> {
    let idx = var.var_idx();

    // Both ends of the same wire met.
    if other == var {
      net.vars.release(idx, &mut self.vars);
      return Ok(());
    }

    // First to arrive: leave `other` in the slot.
    if net.vars.try_bind(idx, other) {
      return Ok(());
    }

    // Second to arrive: take what was left and meet it.
    let bound = net.vars.take_and_free(idx, &mut self.vars);
    self.push(net, other, bound)
  }

  // The Eras Interaction.
  pub fn interact_eras(&mut self, net: &Net, nilary: Node, cell: Node) -> Result<(), RunError> {
    let aux = cell.aux();

    // Links.
    for i in 0 .. aux.size() {
      let port = net.aux_load(aux.loc(i));
      self.push(net, port, nilary)?;
    }

    self.aux.free(aux);
    Ok(())
  }

  // The Anni Interaction.
  pub fn interact_anni(&mut self, net: &Net, a: Node, b: Node) -> Result<(), RunError> {
    let (a_aux, b_aux) = (a.aux(), b.aux());
    if a_aux.size() != b_aux.size() {
      return Err(self.malformed("arity mismatch", a, b));
    }

    // Links.
    for i in 0 .. a_aux.size() {
      let a_port = net.aux_load(a_aux.loc(i));
      let b_port = net.aux_load(b_aux.loc(i));
      self.push(net, a_port, b_port)?;
    }

    self.aux.free(a_aux);
    self.aux.free(b_aux);
    Ok(())
  }

  // The Comm Interaction.
  pub fn interact_comm(&mut self, net: &Net, a: Node, b: Node) -> Result<(), RunError> {
    let (a_aux, b_aux) = (a.aux(), b.aux());
    let (a_len, b_len) = (a_aux.size(), b_aux.size());

    // Allocates the a*b grid of vars, v[i][j] at i*b + j.
    self.vloc.clear();
    for _ in 0 .. a_len * b_len {
      let var = self.alloc_var(net)?;
      self.vloc.push(var);
    }

    // Copies of `b` go to the ports of `a`.
    for i in 0 .. a_len {
      let blk = self.alloc_aux(b_len)?;
      for j in 0 .. b_len {
        net.aux_store(blk.loc(j), Node::var(self.vloc[(i * b_len + j) as usize]));
      }
      let port = net.aux_load(a_aux.loc(i));
      self.push(net, b.with_aux(blk), port)?;
    }

    // Copies of `a` go to the ports of `b`.
    for j in 0 .. b_len {
      let blk = self.alloc_aux(a_len)?;
      for i in 0 .. a_len {
        net.aux_store(blk.loc(i), Node::var(self.vloc[(i * b_len + j) as usize]));
      }
      let port = net.aux_load(b_aux.loc(j));
      self.push(net, a.with_aux(blk), port)?;
    }

    self.aux.free(a_aux);
    self.aux.free(b_aux);
    Ok(())
  }

  // Wires an operator input. Erasing an input kills the whole operation.
  pub fn interact_inpl(&mut self, net: &Net, book: &Book, opi: Node, other: Node) -> Result<(), RunError> {
    let op = opi.opi_op();
    let rec = match net.opers.get(op as usize) {
      Some(rec) => rec,
      None => return Err(self.malformed("operation out of range", opi, other)),
    };
    let ins = rec.ins();
    if opi.opi_port() >= ins.size() {
      return Err(self.malformed("operator port out of range", opi, other));
    }
    net.aux_store(ins.loc(opi.opi_port()), other);
    if other.is_era() {
      rec.kill();
    }
    if rec.arrive() {
      self.perform(net, book, op)?;
    }
    Ok(())
  }

  // Wires an operator output. An erased output still fires the operation.
  pub fn interact_outl(&mut self, net: &Net, book: &Book, opo: Node, other: Node) -> Result<(), RunError> {
    let op = opo.opo_op();
    let rec = match net.opers.get(op as usize) {
      Some(rec) => rec,
      None => return Err(self.malformed("operation out of range", opo, other)),
    };
    rec.set_out(other);
    if rec.arrive() {
      self.perform(net, book, op)?;
    }
    Ok(())
  }

  // Fires an operation whose ports are all wired.
  pub fn perform(&mut self, net: &Net, book: &Book, op: u64) -> Result<(), RunError> {
    let rec = &net.opers[op as usize];
    let ins = rec.ins();
    let out = rec.out();
    self.stats.oper += 1;

    if rec.is_killed() {
      self.push(net, Node::ERA, out)?;
      for i in 0 .. ins.size() {
        let port = net.aux_load(ins.loc(i));
        self.push(net, Node::ERA, port)?;
      }
    } else {
      let code = rec.code();
      self.ins.clear();
      self.ins.extend((0 .. ins.size()).map(|i| net.aux_load(ins.loc(i))));
      let result = if operation::is_native(code) {
        match book.natives.get(operation::native_index(code)) {
          Some(fun) => fun(&self.ins),
          None => return Err(self.malformed("unknown native operator", Node::opo(op), out)),
        }
      } else {
        self.args.clear();
        self.args.extend(self.ins.iter().map(|n| if n.is_sym() { n.as_f64() } else { f64::NAN }));
        Node::f64(operation::eval_builtin(code, &self.args))
      };

      // Structural inputs are consumed by erasure.
      for i in 0 .. self.ins.len() {
        let port = self.ins[i];
        if !port.is_sym() {
          self.push(net, port, Node::ERA)?;
        }
      }

      self.push(net, result, out)?;
    }

    self.aux.free(ins);
    self.opers.free(op);
    Ok(())
  }

  // The Call Interaction.
  pub fn interact_call(&mut self, net: &Net, book: &Book, cal: Node, other: Node) -> Result<(), RunError> {
    let out = self.instance_def(net, book, cal.cal_id())?;
    self.push(net, out, other)
  }

  // Stamps out a fresh copy of a definition, pushes its redexes and returns
  // its output node. No rule fires here.
  pub fn instance_def(&mut self, net: &Net, book: &Book, id: u64) -> Result<Node, RunError> {
    let def = book.defs.get(id as usize).ok_or(RunError::UnknownDef { tid: self.tid, id })?;

    // Allocates vars.
    self.var_map.clear();
    for _ in 0 .. def.vars {
      let var = self.alloc_var(net)?;
      self.var_map.push(var);
    }

    // Allocates operations.
    self.op_map.clear();
    for &(code, arity) in &def.opers {
      let op = self.alloc_oper(net, code, arity)?;
      self.op_map.push(op);
    }

    // Pushes redexes.
    for redex in &def.redexes {
      let a = self.adjust(net, book, redex.n0)?;
      let b = self.adjust(net, book, redex.n1)?;
      self.push(net, a, b)?;
    }

    self.adjust(net, book, def.out)
  }

  // Rewrites a template node into runtime handles. Nested blocks go through
  // the `blks` work list, so template depth is bounded by memory alone.
  fn adjust(&mut self, net: &Net, book: &Book, node: Node) -> Result<Node, RunError> {
    self.blks.clear();
    let root = self.adjust_port(book, node)?;
    while let Some((tpl, blk)) = self.blks.pop() {
      for i in 0 .. tpl.size() {
        let port = self.adjust_port(book, book.aux[tpl.loc(i)])?;
        net.aux_store(blk.loc(i), port);
      }
    }
    Ok(root)
  }

  // Rewrites a single node. A block is allocated here and queued for copying.
  fn adjust_port(&mut self, book: &Book, node: Node) -> Result<Node, RunError> {
    match node.tag() {
      Tag::VAR => match self.var_map.get(node.var_idx() as usize) {
        Some(var) => Ok(Node::var(*var)),
        None => Err(self.malformed("template variable out of range", node, Node::NIL)),
      },
      Tag::OPI => match self.op_map.get(node.opi_op() as usize) {
        Some(op) => Ok(Node::opi(*op, node.opi_port())),
        None => Err(self.malformed("template operation out of range", node, Node::NIL)),
      },
      Tag::OPO => match self.op_map.get(node.opo_op() as usize) {
        Some(op) => Ok(Node::opo(*op)),
        None => Err(self.malformed("template operation out of range", node, Node::NIL)),
      },
      Tag::CON | Tag::DUP => {
        let tpl = node.aux();
        if tpl.loc(tpl.size()) > book.aux.len() {
          return Err(self.malformed("template block out of range", node, Node::NIL));
        }
        let blk = self.alloc_aux(tpl.size())?;
        self.blks.push((tpl, blk));
        Ok(node.with_aux(blk))
      }
      _ => Ok(node),
    }
  }

  // Pops a local redex and performs a single interaction. Returns false once
  // the thread is out of work.
  pub fn interact(&mut self, net: &Net, book: &Book) -> Result<bool, RunError> {
    let redex = self.rbag.pop(&net.redx);
    let (a, b) = (redex.n0, redex.n1);

    match rule::rule(redex) {
      Rule::Link => {
        self.stats.link += 1;
        if a.is_var() {
          self.interact_link(net, a, b)?;
        } else {
          self.interact_link(net, b, a)?;
        }
      }
      Rule::Void => {
        self.stats.void += 1;
      }
      Rule::Call => {
        self.stats.call += 1;
        if a.is_cal() {
          self.interact_call(net, book, a, b)?;
        } else {
          self.interact_call(net, book, b, a)?;
        }
      }
      Rule::Anni => {
        self.stats.anni += 1;
        self.interact_anni(net, a, b)?;
      }
      Rule::Comm => {
        self.stats.comm += 1;
        self.interact_comm(net, a, b)?;
      }
      Rule::Eras => {
        self.stats.eras += 1;
        if a.is_cell() {
          self.interact_eras(net, b, a)?;
        } else {
          self.interact_eras(net, a, b)?;
        }
      }
      Rule::Inpl | Rule::Kili => {
        if a.is_opi() {
          self.interact_inpl(net, book, a, b)?;
        } else {
          self.interact_inpl(net, book, b, a)?;
        }
      }
      Rule::Outl | Rule::Kilo => {
        if a.is_opo() {
          self.interact_outl(net, book, a, b)?;
        } else {
          self.interact_outl(net, book, b, a)?;
        }
      }
      Rule::Swit => {
        return Err(RunError::UnimplementedRule { tid: self.tid, a, b });
      }
      Rule::Fail => {
        return Err(self.malformed("operator ports of the same side", a, b));
      }
      Rule::Halt => {
        if redex.is_nil() {
          return Ok(false);
        }
        return Err(self.malformed("stray NIL", a, b));
      }
    }

    Ok(true)
  }

  // Reduces until this thread runs out of work or another one fails.
  pub fn evaluator(&mut self, net: &Net, book: &Book, stop: &AtomicBool) -> Result<(), RunError> {
    let mut tick: u32 = 0;
    loop {
      tick = tick.wrapping_add(1);
      if tick & 0xFFF == 0 && stop.load(Ordering::Relaxed) {
        return Ok(());
      }
      if !self.interact(net, book)? {
        return Ok(());
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::operation::{ADD, SUB};

  fn setup() -> (Net, TMem, Book) {
    let config = Config::scaled(1 << 14);
    (Net::new(&config), TMem::new(0, &config), Book::new())
  }

  fn drain(tm: &mut TMem, net: &Net) -> Vec<Pair> {
    let mut out = vec![];
    loop {
      let pair = tm.rbag.pop(&net.redx);
      if pair.is_nil() {
        return out;
      }
      out.push(pair);
    }
  }

  fn cell(tm: &mut TMem, net: &Net, kind: Tag, ports: &[Node]) -> Node {
    let blk = tm.alloc_aux(ports.len() as u64).unwrap();
    for (i, port) in ports.iter().enumerate() {
      net.aux_store(blk.loc(i as u64), *port);
    }
    match kind {
      Tag::CON => Node::con(blk),
      _ => Node::dup(blk),
    }
  }

  #[test]
  fn anni_pairs_ports_for_every_arity() {
    for k in [1u64, 2, 3, 17, 255, 256] {
      let (net, mut tm, _) = setup();
      let xs: Vec<Node> = (0 .. k).map(|i| Node::f64(i as f64)).collect();
      let ys: Vec<Node> = (0 .. k).map(|i| Node::f64(-(i as f64))).collect();
      let a = cell(&mut tm, &net, Tag::CON, &xs);
      let b = cell(&mut tm, &net, Tag::CON, &ys);
      tm.interact_anni(&net, a, b).unwrap();
      let mut pairs = drain(&mut tm, &net);
      pairs.sort_by(|p, q| p.n0.as_f64().total_cmp(&q.n0.as_f64()));
      assert_eq!(pairs.len() as u64, k);
      for (i, pair) in pairs.iter().enumerate() {
        assert_eq!(*pair, Pair::new(xs[i], ys[i]));
      }
      assert_eq!(tm.aux.live(), 0);
    }
  }

  #[test]
  fn anni_rejects_mismatched_arity() {
    let (net, mut tm, _) = setup();
    let a = cell(&mut tm, &net, Tag::DUP, &[Node::ERA, Node::ERA]);
    let b = cell(&mut tm, &net, Tag::DUP, &[Node::ERA]);
    let err = tm.interact_anni(&net, a, b).unwrap_err();
    assert_eq!(err, RunError::MalformedNet { tid: 0, reason: "arity mismatch", a, b });
  }

  #[test]
  fn comm_builds_the_grid() {
    for (a_len, b_len) in [(1u64, 1u64), (2, 2), (2, 3), (4, 1)] {
      let (net, mut tm, _) = setup();
      let xs: Vec<Node> = (0 .. a_len).map(|i| Node::f64(i as f64)).collect();
      let ys: Vec<Node> = (0 .. b_len).map(|i| Node::f64(100.0 + i as f64)).collect();
      let a = cell(&mut tm, &net, Tag::CON, &xs);
      let b = cell(&mut tm, &net, Tag::DUP, &ys);
      tm.interact_comm(&net, a, b).unwrap();
      let pairs = drain(&mut tm, &net);
      assert_eq!(pairs.len() as u64, a_len + b_len);
      assert_eq!(tm.vars.live() as u64, a_len * b_len);
      assert_eq!(tm.aux.live() as u64, a_len + b_len);

      let mut seen = std::collections::HashMap::new();
      for pair in &pairs {
        let (blk, port) = (pair.n0, pair.n1);
        let expect = if blk.tag() == Tag::DUP { (b_len, &xs) } else { (a_len, &ys) };
        assert_eq!(blk.aux().size(), expect.0);
        assert!(expect.1.contains(&port));
        for var in net.aux_nodes(blk.aux()) {
          assert!(var.is_var());
          *seen.entry(var).or_insert(0) += 1;
        }
      }
      assert_eq!(seen.len() as u64, a_len * b_len);
      assert!(seen.values().all(|n| *n == 2));
    }
  }

  #[test]
  fn eras_copies_the_nilary() {
    let (net, mut tm, _) = setup();
    let x = Node::var(tm.alloc_var(&net).unwrap());
    let c = cell(&mut tm, &net, Tag::CON, &[x, Node::ERA, Node::f64(2.0)]);
    tm.interact_eras(&net, Node::f64(9.0), c).unwrap();
    let pairs = drain(&mut tm, &net);
    assert_eq!(pairs.len(), 3);
    assert!(pairs.iter().all(|p| p.n1 == Node::f64(9.0)));
    assert_eq!(tm.aux.live(), 0);
  }

  #[test]
  fn link_binds_then_hands_off() {
    let (net, mut tm, book) = setup();
    let v = Node::var(tm.alloc_var(&net).unwrap());
    tm.interact_link(&net, v, Node::f64(1.0)).unwrap();
    assert_eq!(net.vars.load(v.var_idx()), Node::f64(1.0));
    tm.interact_link(&net, v, Node::ERA).unwrap();
    assert_eq!(drain(&mut tm, &net), vec![Pair::new(Node::ERA, Node::f64(1.0))]);
    assert_eq!(tm.vars.live(), 0);

    let w = Node::var(tm.alloc_var(&net).unwrap());
    tm.rbag.push(&net.redx, Pair::new(w, w));
    assert!(tm.interact(&net, &book).unwrap());
    assert_eq!(tm.vars.live(), 0);
  }

  #[test]
  fn operation_fires_in_any_order() {
    let orders: [[usize; 3]; 3] = [[0, 1, 2], [2, 1, 0], [1, 2, 0]];
    for order in orders {
      let (net, mut tm, book) = setup();
      let op = tm.alloc_oper(&net, SUB, 2).unwrap();
      let out = Node::var(tm.alloc_var(&net).unwrap());
      let wires = [
        Pair::new(Node::opi(op, 0), Node::f64(10.0)),
        Pair::new(Node::opi(op, 1), Node::f64(4.0)),
        Pair::new(Node::opo(op), out),
      ];
      for i in order {
        tm.rbag.push(&net.redx, wires[i]);
        assert!(tm.interact(&net, &book).unwrap());
      }
      assert_eq!(tm.stats.oper, 1);
      while tm.interact(&net, &book).unwrap() {}
      assert_eq!(net.vars.load(out.var_idx()), Node::f64(6.0));
      assert_eq!((tm.aux.live(), tm.opers.live()), (0, 0));
    }
  }

  #[test]
  fn killed_operation_erases_every_port() {
    let (net, mut tm, book) = setup();
    let op = tm.alloc_oper(&net, ADD, 2).unwrap();
    let x = cell(&mut tm, &net, Tag::CON, &[Node::f64(1.0)]);
    tm.push(&net, Node::opi(op, 0), Node::ERA).unwrap();
    tm.push(&net, x, Node::opi(op, 1)).unwrap();
    tm.push(&net, Node::opo(op), Node::f64(3.0)).unwrap();
    while tm.interact(&net, &book).unwrap() {}
    assert_eq!(tm.stats.oper, 1);
    assert_eq!(tm.stats.eras, 1);
    assert_eq!((tm.aux.live(), tm.opers.live()), (0, 0));
  }

  #[test]
  fn erased_output_still_fires() {
    let (net, mut tm, book) = setup();
    let op = tm.alloc_oper(&net, ADD, 1).unwrap();
    tm.push(&net, Node::ERA, Node::opo(op)).unwrap();
    tm.push(&net, Node::opi(op, 0), Node::f64(5.0)).unwrap();
    while tm.interact(&net, &book).unwrap() {}
    assert_eq!(tm.stats.oper, 1);
    assert_eq!(tm.stats.void, 1);
  }

  #[test]
  fn reserved_and_malformed_pairs_fail() {
    let (net, mut tm, book) = setup();
    tm.push(&net, Node::swi(0), Node::ERA).unwrap();
    assert!(matches!(tm.interact(&net, &book), Err(RunError::UnimplementedRule { .. })));
    tm.push(&net, Node::opo(0), Node::opo(1)).unwrap();
    assert!(matches!(tm.interact(&net, &book), Err(RunError::MalformedNet { .. })));
    tm.push(&net, Node::NIL, Node::ERA).unwrap();
    assert!(matches!(tm.interact(&net, &book), Err(RunError::MalformedNet { reason: "stray NIL", .. })));
    assert_eq!(tm.interact(&net, &book), Ok(false));
  }

  #[test]
  fn closed_calls_are_dropped() {
    let (net, mut tm, _) = setup();
    let (book, main) = Book::demo_erase().unwrap();
    tm.push(&net, main.node(), Node::ERA).unwrap();
    assert!(tm.interact(&net, &book).unwrap());
    assert_eq!((tm.stats.void, tm.stats.call), (1, 0));
    assert!(matches!(tm.instance_def(&net, &book, 7), Err(RunError::UnknownDef { id: 7, .. })));
  }

  #[test]
  fn call_unfolds_against_a_cell() {
    let (net, mut tm, _) = setup();
    let (book, main) = Book::demo_erase().unwrap();
    let c = cell(&mut tm, &net, Tag::CON, &[Node::f64(1.0), Node::f64(2.0)]);
    tm.push(&net, c, main.node()).unwrap();
    while tm.interact(&net, &book).unwrap() {}
    assert_eq!(tm.stats.call, 1);
    assert_eq!((tm.stats.comm, tm.stats.anni, tm.stats.eras), (1, 1, 3));
    assert_eq!(tm.aux.live(), 0);
    assert_eq!(tm.vars.live(), 0);
  }

  #[test]
  fn unknown_operation_ids_are_malformed() {
    let (net, mut tm, book) = setup();
    let far = net.opers.len() as u64 + 5;
    tm.push(&net, Node::opi(far, 0), Node::f64(1.0)).unwrap();
    let err = tm.interact(&net, &book).unwrap_err();
    assert!(matches!(err, RunError::MalformedNet { reason: "operation out of range", .. }));
    tm.push(&net, Node::ERA, Node::opo(far)).unwrap();
    let err = tm.interact(&net, &book).unwrap_err();
    assert!(matches!(err, RunError::MalformedNet { reason: "operation out of range", .. }));
  }

  #[test]
  fn instancing_rejects_dangling_blocks() {
    let (net, mut tm, _) = setup();
    let mut book = Book::new();
    let id = book.add_def("f");
    book.def_mut(id).unwrap().set_out(Node::con(Aux::new(2, 0)));
    let err = tm.instance_def(&net, &book, id.0).unwrap_err();
    assert!(matches!(err, RunError::MalformedNet { reason: "template block out of range", .. }));
  }

  #[test]
  fn instancing_copies_nested_blocks() {
    let (net, mut tm, _) = setup();
    let mut book = Book::new();
    let id = book.add_def("f");
    let mut def = book.def_mut(id).unwrap();
    let (x0, x1) = def.add_var();
    let inner = def.dup(&[x0, Node::f64(2.0)]).unwrap();
    let outer = def.con(&[inner, x1, Node::ERA]).unwrap();
    def.set_out(outer);
    let out = tm.instance_def(&net, &book, id.0).unwrap();
    assert_eq!(out.tag(), Tag::CON);
    let ports = net.aux_nodes(out.aux());
    assert_eq!(ports.len(), 3);
    assert_eq!(ports[0].tag(), Tag::DUP);
    assert!(ports[1].is_var());
    assert_eq!(net.aux_nodes(ports[0].aux()), vec![ports[1], Node::f64(2.0)]);
    assert_eq!(tm.aux.live(), 2);
  }
}
