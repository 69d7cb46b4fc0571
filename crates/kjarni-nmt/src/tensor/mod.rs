//! Host-side tensor plumbing shared by the weight loaders.

pub mod dtype;
pub mod raw_tensor;

pub use dtype::DType;
