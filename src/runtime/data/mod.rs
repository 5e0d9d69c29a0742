pub mod arena;
pub mod num;
pub mod redex_bag;
pub mod vars;

pub use arena::{*};
pub use redex_bag::{*};
pub use vars::{*};
