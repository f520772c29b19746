#![deny(clippy::missing_safety_doc, unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

//! An adaptive radix tree map for byte-ordered keys.
//!
//! The tree maps variable-length byte-string keys to owned values with point
//! lookup, insertion, and deletion. Inner nodes adapt among four sizes (4,
//! 16, 48, and 256 children) as occupancy changes, shared key prefixes are
//! compressed onto inner nodes, and leaves store full keys so single-child
//! chains are never materialized.
//!
//! All mutation goes through `&mut self` on [`TreeMap`]; the tree frees
//! replaced nodes eagerly, which is safe under that exclusive-writer
//! discipline. Concurrent readers are fine as long as no writer is active,
//! which the borrow checker enforces for the safe API.
//!
//! # References
//!
//!  - Leis, V., Kemper, A., & Neumann, T. (2013, April). The adaptive radix
//!    tree: ARTful indexing for main-memory databases. In 2013 IEEE 29th
//!    International Conference on Data Engineering (ICDE) (pp. 38-49). IEEE.
//!    [Link to PDF][ART paper]
//!
//! [ART paper]: https://www-db.in.tum.de/~leis/papers/ART.pdf

mod bytes;
pub use bytes::*;

pub mod map;
pub use map::TreeMap;

mod nodes;
pub use nodes::*;

mod rust_nightly_apis;

#[doc(hidden)]
pub mod tests_common;
