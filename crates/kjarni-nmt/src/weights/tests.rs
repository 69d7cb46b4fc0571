use super::*;
use crate::tensor::DType;
use crate::tests::common::{write_safetensors, write_safetensors_f16, TensorSpec};
use approx::assert_abs_diff_eq;
use std::path::Path;
use tempfile::TempDir;

fn spec(name: &str, values: Vec<f32>, shape: Vec<usize>) -> TensorSpec {
    (name.to_string(), values, shape)
}

fn sample_tensors() -> Vec<TensorSpec> {
    vec![
        spec("Wemb", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![3, 2]),
        spec("ff_logit_b", vec![0.5, -0.5, 0.25], vec![3]),
        spec("decoder_c_tt", vec![0.75], vec![1]),
    ]
}

#[test]
fn test_single_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.safetensors");
    write_safetensors(&path, &sample_tensors()).unwrap();

    let weights = ModelWeights::new(&path).unwrap();
    assert_eq!(weights.path(), path.as_path());
    assert!(weights.contains("Wemb"));
    assert!(!weights.contains("Wemb_dec"));
    assert_eq!(weights.tensor_names(), vec!["Wemb", "decoder_c_tt", "ff_logit_b"]);

    let wemb = weights.get_array2("Wemb").unwrap();
    assert_eq!(wemb.dim(), (3, 2));
    assert_eq!(wemb[[2, 1]], 6.0);

    let bias = weights.get_array1("ff_logit_b").unwrap();
    assert_eq!(bias.to_vec(), vec![0.5, -0.5, 0.25]);
    assert_eq!(weights.tensor_shape("decoder_c_tt").unwrap(), vec![1]);
    assert_eq!(weights.tensor_dtype("Wemb").unwrap(), DType::F32);
}

#[test]
fn test_directory_with_single_file() {
    let dir = TempDir::new().unwrap();
    write_safetensors(&dir.path().join("model.safetensors"), &sample_tensors()).unwrap();

    let weights = ModelWeights::new(dir.path()).unwrap();
    assert_eq!(weights.tensor_names().len(), 3);
    let loader = weights
        .loader()
        .as_any()
        .downcast_ref::<SafeTensorsLoader>()
        .unwrap();
    assert_eq!(loader.shard_count(), 1);
    assert_eq!(loader.tensor_count(), 3);
}

fn write_sharded(dir: &Path) {
    let tensors = sample_tensors();
    write_safetensors(&dir.join("model-00001-of-00002.safetensors"), &tensors[..1]).unwrap();
    write_safetensors(&dir.join("model-00002-of-00002.safetensors"), &tensors[1..]).unwrap();
    let index = serde_json::json!({
        "metadata": {},
        "weight_map": {
            "Wemb": "model-00001-of-00002.safetensors",
            "ff_logit_b": "model-00002-of-00002.safetensors",
            "decoder_c_tt": "model-00002-of-00002.safetensors"
        }
    });
    std::fs::write(dir.join("model.safetensors.index.json"), index.to_string()).unwrap();
}

#[test]
fn test_sharded_directory() {
    let dir = TempDir::new().unwrap();
    write_sharded(dir.path());

    let weights = ModelWeights::new(dir.path()).unwrap();
    let loader = weights
        .loader()
        .as_any()
        .downcast_ref::<SafeTensorsLoader>()
        .unwrap();
    assert_eq!(loader.shard_count(), 2);
    assert_eq!(loader.tensor_count(), 3);

    assert_eq!(weights.get_array2("Wemb").unwrap()[[0, 1]], 2.0);
    assert_eq!(weights.get_array1("decoder_c_tt").unwrap()[0], 0.75);
}

#[test]
fn test_half_precision_is_upcast() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.safetensors");
    write_safetensors_f16(&path, &sample_tensors()).unwrap();

    let weights = ModelWeights::new(&path).unwrap();
    assert_eq!(weights.tensor_dtype("ff_logit_b").unwrap(), DType::F16);
    let bias = weights.get_array1("ff_logit_b").unwrap();
    assert_abs_diff_eq!(bias[0], 0.5, epsilon = 1e-3);
    assert_abs_diff_eq!(bias[1], -0.5, epsilon = 1e-3);
    assert_abs_diff_eq!(bias[2], 0.25, epsilon = 1e-3);
}

#[test]
fn test_missing_tensor_names_the_tensor() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.safetensors");
    write_safetensors(&path, &sample_tensors()).unwrap();

    let weights = ModelWeights::new(&path).unwrap();
    let err = weights.get_array2("decoder_U_att").unwrap_err();
    assert!(format!("{:#}", err).contains("decoder_U_att"));
}

#[test]
fn test_rank_mismatch_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.safetensors");
    write_safetensors(&path, &sample_tensors()).unwrap();

    let weights = ModelWeights::new(&path).unwrap();
    assert!(weights.get_array2("ff_logit_b").is_err());
    assert!(weights.get_array1("Wemb").is_err());
}

#[test]
fn test_missing_path() {
    let dir = TempDir::new().unwrap();
    let err = ModelWeights::new(&dir.path().join("nope.safetensors")).unwrap_err();
    assert!(err.to_string().contains("No parameter file found"));
}

#[test]
fn test_empty_directory() {
    let dir = TempDir::new().unwrap();
    assert!(ModelWeights::new(dir.path()).is_err());
}

#[test]
fn test_clones_share_the_loader() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.safetensors");
    write_safetensors(&path, &sample_tensors()).unwrap();

    let a = ModelWeights::new(&path).unwrap();
    let b = a.clone();
    assert!(std::ptr::eq(
        a.loader() as *const dyn WeightLoader as *const u8,
        b.loader() as *const dyn WeightLoader as *const u8
    ));
    assert!(format!("{:?}", a).contains("ModelWeights"));
}
