// Shared fixtures for unit tests; not compiled into the library.
#![allow(dead_code)]

use crate::model::{Dl4mtLayout, ModelDims};
use anyhow::Result;
use ndarray::Array2;
use safetensors::tensor::{Dtype, TensorView as StTensorView};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub type TensorSpec = (String, Vec<f32>, Vec<usize>);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Small enough to run a full decode in microseconds.
pub fn small_dims() -> ModelDims {
    ModelDims { src_vocab: 12, trg_vocab: 10, emb: 4, hidden: 5, att: 3 }
}

pub fn dims_with_vocab(trg_vocab: usize) -> ModelDims {
    ModelDims { trg_vocab, ..small_dims() }
}

/// Deterministic, non-trivial parameter values for every tensor the model reads.
pub fn model_tensors(dims: &ModelDims) -> Vec<TensorSpec> {
    Dl4mtLayout::dl4mt()
        .expected_shapes(dims)
        .into_iter()
        .enumerate()
        .map(|(k, (name, shape))| {
            let len: usize = shape.iter().product();
            let values = (0..len)
                .map(|i| (((k * 131 + i * 17) as f32) * 0.37).sin() * 0.5)
                .collect();
            (name, values, shape)
        })
        .collect()
}

pub fn write_safetensors(path: &Path, tensors: &[TensorSpec]) -> Result<()> {
    write_with_dtype(path, tensors, Dtype::F32)
}

pub fn write_safetensors_f16(path: &Path, tensors: &[TensorSpec]) -> Result<()> {
    write_with_dtype(path, tensors, Dtype::F16)
}

fn write_with_dtype(path: &Path, tensors: &[TensorSpec], dtype: Dtype) -> Result<()> {
    let stored: Vec<(String, Vec<usize>, Vec<u8>)> = tensors
        .iter()
        .map(|(name, values, shape)| {
            let bytes: Vec<u8> = match dtype {
                Dtype::F16 => values
                    .iter()
                    .flat_map(|v| half::f16::from_f32(*v).to_le_bytes())
                    .collect(),
                _ => values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            };
            (name.clone(), shape.clone(), bytes)
        })
        .collect();

    let mut tensor_map = HashMap::new();
    for (name, shape, bytes) in &stored {
        tensor_map.insert(name.clone(), StTensorView::new(dtype, shape.clone(), bytes)?);
    }
    safetensors::serialize_to_file(&tensor_map, &None, path)?;
    Ok(())
}

/// Writes a complete model as `dir/model.safetensors` and returns its path.
pub fn write_test_model(dir: &Path, dims: &ModelDims) -> Result<PathBuf> {
    let path = dir.join("model.safetensors");
    write_safetensors(&path, &model_tensors(dims))?;
    Ok(path)
}

pub fn assert_all_close(a: &Array2<f32>, b: &Array2<f32>, tol: f32) {
    assert_eq!(a.shape(), b.shape(), "shape mismatch");
    for ((idx, x), y) in a.indexed_iter().zip(b.iter()) {
        assert!((x - y).abs() <= tol, "mismatch at {:?}: {} vs {}", idx, x, y);
    }
}
