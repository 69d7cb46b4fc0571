use crate::tensor::dtype::DType;
use anyhow::{anyhow, Result};
use half::{bf16, f16};
use ndarray::{Array1, Array2};
use std::borrow::Cow;

/// A raw, untyped view into a tensor's bytes, shape, and dtype.
///
/// Borrows from the loader's mmap, so it must be consumed before the
/// loader is dropped.
#[derive(Debug)]
pub struct TensorView<'a> {
    pub name: String,
    pub bytes: Cow<'a, [u8]>,
    pub shape: Vec<usize>,
    pub dtype: DType,
}

impl<'a> TensorView<'a> {
    /// Decodes the raw bytes into a flat `f32` buffer.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>> {
        let expected = self.dtype.buffer_size_for_shape(&self.shape);
        if self.bytes.len() != expected {
            return Err(anyhow!(
                "tensor '{}' has {} bytes, expected {} for shape {:?} ({:?})",
                self.name,
                self.bytes.len(),
                expected,
                self.shape,
                self.dtype
            ));
        }

        let data = match self.dtype {
            DType::F32 => match bytemuck::try_cast_slice::<u8, f32>(&self.bytes) {
                Ok(slice) => slice.to_vec(),
                // mmap offsets are not guaranteed to be 4-byte aligned
                Err(_) => self
                    .bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            },
            DType::F16 => match bytemuck::try_cast_slice::<u8, f16>(&self.bytes) {
                Ok(slice) => slice.iter().map(|x| x.to_f32()).collect(),
                Err(_) => self
                    .bytes
                    .chunks_exact(2)
                    .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
                    .collect(),
            },
            DType::BF16 => match bytemuck::try_cast_slice::<u8, bf16>(&self.bytes) {
                Ok(slice) => slice.iter().map(|x| x.to_f32()).collect(),
                Err(_) => self
                    .bytes
                    .chunks_exact(2)
                    .map(|c| bf16::from_le_bytes([c[0], c[1]]).to_f32())
                    .collect(),
            },
        };
        Ok(data)
    }

    pub fn to_array1_f32(&self) -> Result<Array1<f32>> {
        if self.shape.len() != 1 {
            return Err(anyhow!(
                "tensor '{}' has rank {} (shape {:?}), expected a vector",
                self.name,
                self.shape.len(),
                self.shape
            ));
        }
        Ok(Array1::from_vec(self.to_f32_vec()?))
    }

    pub fn to_array2_f32(&self) -> Result<Array2<f32>> {
        if self.shape.len() != 2 {
            return Err(anyhow!(
                "tensor '{}' has rank {} (shape {:?}), expected a matrix",
                self.name,
                self.shape.len(),
                self.shape
            ));
        }
        Ok(Array2::from_shape_vec(
            (self.shape[0], self.shape[1]),
            self.to_f32_vec()?,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(dtype: DType, shape: Vec<usize>, bytes: Vec<u8>) -> TensorView<'static> {
        TensorView {
            name: "t".to_string(),
            bytes: Cow::Owned(bytes),
            shape,
            dtype,
        }
    }

    #[test]
    fn test_f32_to_array2() {
        let bytes: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0]
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect();
        let arr = view(DType::F32, vec![2, 2], bytes).to_array2_f32().unwrap();
        assert_eq!(arr, ndarray::arr2(&[[1.0, 2.0], [3.0, 4.0]]));
    }

    #[test]
    fn test_f16_and_bf16_upcast() {
        let f16_bytes: Vec<u8> = [0.5f32, -2.0]
            .iter()
            .flat_map(|&f| f16::from_f32(f).to_le_bytes())
            .collect();
        let arr = view(DType::F16, vec![2], f16_bytes).to_array1_f32().unwrap();
        assert_eq!(arr.to_vec(), vec![0.5, -2.0]);

        let bf16_bytes: Vec<u8> = [1.0f32, 3.0]
            .iter()
            .flat_map(|&f| bf16::from_f32(f).to_le_bytes())
            .collect();
        let arr = view(DType::BF16, vec![2], bf16_bytes).to_array1_f32().unwrap();
        assert_eq!(arr.to_vec(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_rank_mismatch_is_rejected() {
        let bytes = vec![0u8; 16];
        let err = view(DType::F32, vec![4], bytes).to_array2_f32().unwrap_err();
        assert!(err.to_string().contains("expected a matrix"));
    }

    #[test]
    fn test_truncated_bytes_are_rejected() {
        let err = view(DType::F32, vec![2, 2], vec![0u8; 12])
            .to_f32_vec()
            .unwrap_err();
        assert!(err.to_string().contains("expected 16"));
    }
}
