// The node model
// --------------
//
// Every port of the net is a 64-bit NaN-boxed word:
//
//   Node ::= 0xF_QQQ_A_PPPPPPPPPPPP
//
// Where:
//
//   QNAN : 0x7FFC000000000000, marks a tagged node
//   F0   : bit 48
//   F1   : bit 49
//   F2   : bit 63
//   P    : the 48-bit payload
//
// Any word whose QNAN bits are not all set is a literal (SYM), so f64 values
// travel through the net unboxed. The all-ones word is NIL.
//
//   Tag | Idx | Flags     | Payload
//   --- | --- | --------- | ------------------------------------------
//   VAR |   0 | -         | variable slot index
//   CAL |   1 | F0        | definition id
//   CON |   2 | F1        | aux ref
//   DUP |   3 | F0 F1     | aux ref
//   ERA |   4 | F2        | -
//   OPI |   5 | F0 F2     | operation id (40 bits) + input port (8 bits)
//   OPO |   6 | F1 F2     | operation id
//   SWI |   7 | F0 F1 F2  | pair ref (reserved)
//   SYM |   8 | not QNAN  | raw bits
//   NIL |   9 | all ones  | -
//
// An aux ref packs a block of auxiliary ports living in the aux buffer:
//
//   Aux ::= 0xSSBBBBBBBBBB
//
//   S : u8  is the block size minus one (blocks hold 1 to 256 ports)
//   B : u40 is the index of the first port

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub const QNAN: u64 = 0x7FFC_0000_0000_0000;
pub const F0: u64 = 1 << 48;
pub const F1: u64 = 1 << 49;
pub const F2: u64 = 1 << 63;
pub const TAG_MASK: u64 = QNAN | F0 | F1 | F2;

pub const U40_MASK: u64 = 0x0000_00FF_FFFF_FFFF;
pub const U48_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;
pub const U62_MASK: u64 = 0x3FFF_FFFF_FFFF_FFFF;

// The quiet NaN produced by arithmetic. It does not carry the QNAN tag bits.
pub const CANONICAL_NAN: u64 = 0x7FF8_0000_0000_0000;

// Largest number of ports in one aux block.
pub const MAX_AUX: u64 = 256;

const VAR_TAG: u64 = QNAN;
const CAL_TAG: u64 = QNAN | F0;
const CON_TAG: u64 = QNAN | F1;
const DUP_TAG: u64 = QNAN | F0 | F1;
const ERA_TAG: u64 = QNAN | F2;
const OPI_TAG: u64 = QNAN | F0 | F2;
const OPO_TAG: u64 = QNAN | F1 | F2;
const SWI_TAG: u64 = QNAN | F0 | F1 | F2;

// Tags
// ----

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum Tag {
  VAR = 0,
  CAL = 1,
  CON = 2,
  DUP = 3,
  ERA = 4,
  OPI = 5,
  OPO = 6,
  SWI = 7,
  SYM = 8,
  NIL = 9,
}

impl Tag {
  pub const ALL: [Tag; 10] = [
    Tag::VAR,
    Tag::CAL,
    Tag::CON,
    Tag::DUP,
    Tag::ERA,
    Tag::OPI,
    Tag::OPO,
    Tag::SWI,
    Tag::SYM,
    Tag::NIL,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Tag::VAR => "VAR",
      Tag::CAL => "CAL",
      Tag::CON => "CON",
      Tag::DUP => "DUP",
      Tag::ERA => "ERA",
      Tag::OPI => "OPI",
      Tag::OPO => "OPO",
      Tag::SWI => "SWI",
      Tag::SYM => "SYM",
      Tag::NIL => "NIL",
    }
  }

  pub fn index(self) -> usize {
    self as usize
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// Aux refs
// --------

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Aux(pub u64);

impl Aux {
  pub fn new(size: u64, begin: u64) -> Self {
    debug_assert!((1..=MAX_AUX).contains(&size));
    debug_assert!(begin <= U40_MASK);
    Aux(((size - 1) << 40) | begin)
  }

  #[inline(always)]
  pub fn size(self) -> u64 {
    ((self.0 >> 40) & 0xFF) + 1
  }

  #[inline(always)]
  pub fn begin(self) -> u64 {
    self.0 & U40_MASK
  }

  // Buffer location of the i-th port.
  #[inline(always)]
  pub fn loc(self, i: u64) -> usize {
    (self.begin() + i) as usize
  }
}

// Nodes
// -----

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node(pub u64);

impl Node {
  pub const ERA: Node = Node(ERA_TAG);
  pub const NIL: Node = Node(u64::MAX);

  pub fn var(idx: u64) -> Self {
    Node(VAR_TAG | (idx & U48_MASK))
  }

  pub fn cal(id: u64) -> Self {
    Node(CAL_TAG | (id & U48_MASK))
  }

  pub fn con(aux: Aux) -> Self {
    Node(CON_TAG | (aux.0 & U48_MASK))
  }

  pub fn dup(aux: Aux) -> Self {
    Node(DUP_TAG | (aux.0 & U48_MASK))
  }

  pub fn opi(op: u64, port: u64) -> Self {
    Node(OPI_TAG | (op & U40_MASK) | ((port & 0xFF) << 40))
  }

  pub fn opo(op: u64) -> Self {
    Node(OPO_TAG | (op & U48_MASK))
  }

  pub fn swi(pair: u64) -> Self {
    Node(SWI_TAG | (pair & U48_MASK))
  }

  pub fn sym(sym: u64) -> Self {
    Node(sym & U62_MASK)
  }

  // Bit patterns that would read as a tagged node collapse to the canonical NaN.
  pub fn f64(num: f64) -> Self {
    let bits = num.to_bits();
    if bits & QNAN == QNAN {
      Node(CANONICAL_NAN)
    } else {
      Node(bits)
    }
  }

  // Maps a node to its row/column in the rule tables.
  #[inline(always)]
  pub fn table_index(self) -> usize {
    if self.0 == u64::MAX {
      9
    } else if self.0 & QNAN == QNAN {
      (((self.0 & F2) >> 61) | ((self.0 & (F1 | F0)) >> 48)) as usize
    } else {
      8
    }
  }

  #[inline(always)]
  pub fn tag(self) -> Tag {
    Tag::ALL[self.table_index()]
  }

  // Raw tag bits. Meaningless for SYM.
  #[inline(always)]
  pub fn tag_bits(self) -> u64 {
    self.0 & TAG_MASK
  }

  // A cell of the same kind as `self` around another block.
  #[inline(always)]
  pub fn with_aux(self, aux: Aux) -> Self {
    Node(self.tag_bits() | (aux.0 & U48_MASK))
  }

  pub fn is_var(self) -> bool {
    self.0 & TAG_MASK == VAR_TAG
  }

  pub fn is_era(self) -> bool {
    self.0 == ERA_TAG
  }

  pub fn is_nil(self) -> bool {
    self.0 == u64::MAX
  }

  pub fn is_sym(self) -> bool {
    self.0 & QNAN != QNAN
  }

  pub fn is_opi(self) -> bool {
    self.0 & TAG_MASK == OPI_TAG
  }

  pub fn is_opo(self) -> bool {
    self.0 & TAG_MASK == OPO_TAG
  }

  pub fn is_cal(self) -> bool {
    self.0 & TAG_MASK == CAL_TAG
  }

  // CON and DUP: the cells that own an aux block.
  pub fn is_cell(self) -> bool {
    matches!(self.tag(), Tag::CON | Tag::DUP)
  }

  pub fn var_idx(self) -> u64 {
    self.0 & U48_MASK
  }

  pub fn cal_id(self) -> u64 {
    self.0 & U48_MASK
  }

  pub fn aux(self) -> Aux {
    Aux(self.0 & U48_MASK)
  }

  pub fn opi_op(self) -> u64 {
    self.0 & U40_MASK
  }

  pub fn opi_port(self) -> u64 {
    (self.0 >> 40) & 0xFF
  }

  pub fn opo_op(self) -> u64 {
    self.0 & U48_MASK
  }

  pub fn swi_ref(self) -> u64 {
    self.0 & U48_MASK
  }

  pub fn as_f64(self) -> f64 {
    f64::from_bits(self.0)
  }

  pub fn term(self) -> Term {
    match self.tag() {
      Tag::VAR => Term::Var(self.var_idx()),
      Tag::CAL => Term::Cal(self.cal_id()),
      Tag::CON => Term::Con(self.aux()),
      Tag::DUP => Term::Dup(self.aux()),
      Tag::ERA => Term::Era,
      Tag::OPI => Term::Opi { op: self.opi_op(), port: self.opi_port() },
      Tag::OPO => Term::Opo(self.opo_op()),
      Tag::SWI => Term::Swi(self.swi_ref()),
      Tag::SYM => Term::Sym(self.0),
      Tag::NIL => Term::Nil,
    }
  }
}

impl From<f64> for Node {
  fn from(value: f64) -> Self {
    Node::f64(value)
  }
}

impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.term() {
      Term::Var(idx) => write!(f, "VAR:{:08X}", idx),
      Term::Cal(id) => write!(f, "CAL:{:08X}", id),
      Term::Con(aux) => write!(f, "CON:{}@{:08X}", aux.size(), aux.begin()),
      Term::Dup(aux) => write!(f, "DUP:{}@{:08X}", aux.size(), aux.begin()),
      Term::Era => write!(f, "ERA"),
      Term::Opi { op, port } => write!(f, "OPI:{:08X}.{}", op, port),
      Term::Opo(op) => write!(f, "OPO:{:08X}", op),
      Term::Swi(pair) => write!(f, "SWI:{:08X}", pair),
      Term::Sym(bits) => write!(f, "SYM:{}", f64::from_bits(bits)),
      Term::Nil => write!(f, "NIL"),
    }
  }
}

impl fmt::Debug for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

/// Decoded view of a [`Node`].
///
/// The runtime works on the packed form; `Term` exists for building nets and
/// inspecting results without touching bit layouts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Term {
  Var(u64),
  Cal(u64),
  Con(Aux),
  Dup(Aux),
  Era,
  Opi { op: u64, port: u64 },
  Opo(u64),
  Swi(u64),
  Sym(u64),
  Nil,
}

impl From<Term> for Node {
  fn from(term: Term) -> Self {
    match term {
      Term::Var(idx) => Node::var(idx),
      Term::Cal(id) => Node::cal(id),
      Term::Con(aux) => Node::con(aux),
      Term::Dup(aux) => Node::dup(aux),
      Term::Era => Node::ERA,
      Term::Opi { op, port } => Node::opi(op, port),
      Term::Opo(op) => Node::opo(op),
      Term::Swi(pair) => Node::swi(pair),
      Term::Sym(bits) => Node(bits),
      Term::Nil => Node::NIL,
    }
  }
}

// Pairs
// -----

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Pair {
  pub n0: Node,
  pub n1: Node,
}

impl Pair {
  pub const NIL: Pair = Pair { n0: Node::NIL, n1: Node::NIL };

  pub fn new(n0: Node, n1: Node) -> Self {
    Pair { n0, n1 }
  }

  pub fn is_nil(&self) -> bool {
    self.n0.is_nil() && self.n1.is_nil()
  }
}

impl fmt::Display for Pair {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ~ {}", self.n0, self.n1)
  }
}

pub struct APair {
  pub n0: AtomicU64,
  pub n1: AtomicU64,
}

impl APair {
  pub fn new() -> Self {
    APair { n0: AtomicU64::new(u64::MAX), n1: AtomicU64::new(u64::MAX) }
  }

  pub fn load(&self) -> Pair {
    let n0 = Node(self.n0.load(Ordering::Relaxed));
    let n1 = Node(self.n1.load(Ordering::Relaxed));
    Pair::new(n0, n1)
  }

  pub fn store(&self, pair: Pair) {
    self.n0.store(pair.n0.0, Ordering::Relaxed);
    self.n1.store(pair.n1.0, Ordering::Relaxed);
  }
}

impl Default for APair {
  fn default() -> Self {
    APair::new()
  }
}
