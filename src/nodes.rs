//! The nodes of the tree and the algorithms that operate on them.

mod operations;
mod representation;

pub use operations::*;
pub use representation::*;
