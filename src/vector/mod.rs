//! Block-structured vectors and operators keyed by string identifiers

mod block_vector;
mod block_matrix;

pub use block_vector::*;
pub use block_matrix::*;
