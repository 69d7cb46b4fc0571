//! High-level interface for reading parameter files.
//!
//! [`ModelWeights`] hides the on-disk layout (single file, directory, or
//! sharded directory) and hands out `f32` arrays. Tensors stored as F16 or
//! BF16 are upcast while copying out of the mapping.

use super::safetensors_loader::SafeTensorsLoader;
use super::WeightLoader;
use crate::tensor::raw_tensor::TensorView;
use crate::tensor::DType;
use anyhow::{anyhow, Context, Result};
use ndarray::{Array1, Array2};
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct ModelWeightsInner {
    loader: Box<dyn WeightLoader>,
    path: PathBuf,
}

/// Format-agnostic access to a parameter file.
///
/// Cheap to clone; clones share the same mapping through `Arc`.
#[derive(Clone)]
pub struct ModelWeights {
    inner: Arc<ModelWeightsInner>,
}

impl ModelWeights {
    /// Opens a parameter file.
    ///
    /// Accepts:
    /// - A `.safetensors` file path
    /// - A directory containing `model.safetensors` or
    ///   `model.safetensors.index.json` plus its shards
    pub fn new(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("No parameter file found at {:?}", path));
        }

        let loader = SafeTensorsLoader::new(path)
            .with_context(|| format!("failed to open parameters at {:?}", path))?;

        Ok(Self {
            inner: Arc::new(ModelWeightsInner {
                loader: Box::new(loader),
                path: path.to_path_buf(),
            }),
        })
    }

    /// The path this instance was opened from.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Get a reference to the underlying loader.
    pub fn loader(&self) -> &dyn WeightLoader {
        &*self.inner.loader
    }

    /// Check if a tensor exists.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.loader.contains(name)
    }

    pub fn tensor_names(&self) -> Vec<String> {
        self.inner.loader.tensor_names()
    }

    /// Process a tensor's raw bytes through a callback.
    ///
    /// The view borrows the mapping, so the callback must finish with it
    /// before returning.
    pub fn with_raw_tensor<R, F>(&self, name: &str, f: F) -> Result<R>
    where
        F: FnOnce(TensorView<'_>) -> Result<R>,
    {
        let view = self.inner.loader.get_raw(name)?;
        f(view)
    }

    /// Shape of a tensor, read from the header only.
    pub fn tensor_shape(&self, name: &str) -> Result<Vec<usize>> {
        self.with_raw_tensor(name, |view| Ok(view.shape))
    }

    pub fn tensor_dtype(&self, name: &str) -> Result<DType> {
        self.with_raw_tensor(name, |view| Ok(view.dtype))
    }

    /// Get a 1D f32 array.
    pub fn get_array1(&self, name: &str) -> Result<Array1<f32>> {
        self.with_raw_tensor(name, |view| view.to_array1_f32())
            .with_context(|| format!("Failed to load '{}'", name))
    }

    /// Get a 2D f32 array.
    pub fn get_array2(&self, name: &str) -> Result<Array2<f32>> {
        self.with_raw_tensor(name, |view| view.to_array2_f32())
            .with_context(|| format!("Failed to load '{}'", name))
    }
}

impl std::fmt::Debug for ModelWeights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelWeights")
            .field("path", &self.inner.path)
            .field("tensors", &self.inner.loader.tensor_names().len())
            .finish()
    }
}
