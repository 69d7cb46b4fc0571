//! Parameter files in the safetensors format.
//!
//! A model is either one `.safetensors` file, a directory holding
//! `model.safetensors`, or a directory holding
//! `model.safetensors.index.json` plus the shard files it names.

use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use memmap2::Mmap;
use safetensors::SafeTensors;
use serde::Deserialize;

use crate::tensor::raw_tensor::TensorView;
use crate::tensor::DType;
use crate::weights::mmap_cache::get_or_create_mmap;
use crate::weights::WeightLoader;

const SINGLE_FILE: &str = "model.safetensors";
const INDEX_FILE: &str = "model.safetensors.index.json";

#[derive(Debug, Deserialize)]
struct ShardIndex {
    weight_map: BTreeMap<String, String>,
}

/// One mapped file and its parsed header.
#[derive(Debug)]
struct Shard {
    // Borrows from `_mmap`; declared first so it is dropped first.
    header: SafeTensors<'static>,
    _mmap: Arc<Mmap>,
}

impl Shard {
    fn open(path: &Path) -> Result<Self> {
        let mmap = get_or_create_mmap(path)?;
        // SAFETY: `_mmap` keeps the mapping alive for as long as `header`,
        // and the mapping is never written through.
        let bytes: &'static [u8] = unsafe { std::mem::transmute::<&[u8], &'static [u8]>(&mmap[..]) };
        let header = SafeTensors::deserialize(bytes)
            .with_context(|| format!("{:?} is not a valid safetensors file", path))?;
        Ok(Self { header, _mmap: mmap })
    }

    fn names(&self) -> Vec<String> {
        self.header.names().into_iter().cloned().collect()
    }
}

/// Reads tensors out of one or more memory-mapped safetensors files.
#[derive(Debug)]
pub struct SafeTensorsLoader {
    shards: Vec<Shard>,
    /// Tensor name to index into `shards`.
    locations: HashMap<String, usize>,
}

impl SafeTensorsLoader {
    pub fn new(path: &Path) -> Result<Self> {
        if path.is_file() {
            return Self::from_single(path);
        }
        if !path.is_dir() {
            bail!("{:?} is neither a parameter file nor a directory", path);
        }
        if path.join(INDEX_FILE).exists() {
            Self::from_index(path)
        } else {
            Self::from_single(&path.join(SINGLE_FILE))
        }
    }

    fn from_single(path: &Path) -> Result<Self> {
        let shard = Shard::open(path)?;
        let locations: HashMap<String, usize> =
            shard.names().into_iter().map(|name| (name, 0)).collect();
        log::debug!("{:?}: {} tensors", path.file_name().unwrap_or_default(), locations.len());
        Ok(Self {
            shards: vec![shard],
            locations,
        })
    }

    fn from_index(dir: &Path) -> Result<Self> {
        let index_path = dir.join(INDEX_FILE);
        let raw = std::fs::read_to_string(&index_path)
            .with_context(|| format!("cannot read {:?}", index_path))?;
        let index: ShardIndex = serde_json::from_str(&raw)
            .with_context(|| format!("malformed shard index {:?}", index_path))?;

        let files: Vec<&str> = index
            .weight_map
            .values()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let shards = files
            .iter()
            .map(|file| Shard::open(&dir.join(file)))
            .collect::<Result<Vec<_>>>()?;

        let mut locations = HashMap::with_capacity(index.weight_map.len());
        for (name, file) in &index.weight_map {
            let shard = files
                .iter()
                .position(|f| *f == file.as_str())
                .ok_or_else(|| anyhow!("shard {} missing from index", file))?;
            if !shards[shard].header.names().iter().any(|n| *n == name) {
                return Err(anyhow!("index maps '{}' to {}, which does not contain it", name, file));
            }
            locations.insert(name.clone(), shard);
        }

        log::debug!(
            "{:?}: {} tensors across {} shards",
            dir.file_name().unwrap_or_default(),
            locations.len(),
            shards.len()
        );
        Ok(Self { shards, locations })
    }

    pub fn tensor_count(&self) -> usize {
        self.locations.len()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

impl WeightLoader for SafeTensorsLoader {
    fn get_raw(&self, name: &str) -> Result<TensorView<'_>> {
        let shard = self
            .locations
            .get(name)
            .map(|&i| &self.shards[i])
            .ok_or_else(|| anyhow!("tensor '{}' not found in parameter file", name))?;
        let tensor = shard
            .header
            .tensor(name)
            .with_context(|| format!("cannot read tensor '{}'", name))?;
        let dtype = DType::from_safetensors(tensor.dtype())
            .with_context(|| format!("tensor '{}'", name))?;

        Ok(TensorView {
            name: name.to_string(),
            bytes: Cow::Borrowed(tensor.data()),
            shape: tensor.shape().to_vec(),
            dtype,
        })
    }

    fn contains(&self, name: &str) -> bool {
        self.locations.contains_key(name)
    }

    fn tensor_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.locations.keys().cloned().collect();
        names.sort();
        names
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
