//! Utility modules

pub mod levenshtein;
pub mod linear_algebra;

pub use levenshtein::{distance, find_similar, similarity};
pub use linear_algebra::{assemble_rows, sigmoid_inplace, softmax_1d_inplace, softmax_rows_inplace};

#[cfg(test)]
mod tests;
