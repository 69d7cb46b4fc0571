//! Weight loading infrastructure for parameter files.

mod mmap_cache;
mod model_weights;
mod safetensors_loader;

pub use mmap_cache::{clear_mmap_cache, evict_mmap, mmap_cache_stats};
pub use model_weights::ModelWeights;
pub use safetensors_loader::SafeTensorsLoader;

use crate::tensor::raw_tensor::TensorView;
use anyhow::Result;
use std::any::Any;

/// Trait for loading model weights from a file format.
///
/// Object-safe so [`ModelWeights`] can hold a `Box<dyn WeightLoader>`.
pub trait WeightLoader: Send + Sync {
    /// Gets a raw tensor view by name.
    ///
    /// The view borrows mmap'd memory and should be consumed immediately.
    fn get_raw(&self, name: &str) -> Result<TensorView<'_>>;

    /// Checks if a tensor with the given name exists.
    fn contains(&self, name: &str) -> bool;

    /// All tensor names known to the loader.
    fn tensor_names(&self) -> Vec<String>;

    /// Downcast to concrete type.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests;
