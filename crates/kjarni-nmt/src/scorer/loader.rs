use super::{EncoderDecoder, Loader, Scorer};
use crate::config::ScorerConfig;
use crate::error::{ScorerError, ScorerResult};
use crate::model::Weights;
use crate::weights::{evict_mmap, mmap_cache_stats};
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Instant;

/// Loads an encoder-decoder onto each configured device.
pub struct EncoderDecoderLoader {
    name: String,
    config: ScorerConfig,
    devices: Vec<usize>,
    /// One entry per device, in `devices` order; empty until `load` succeeds.
    weights: Vec<Arc<Weights>>,
}

impl EncoderDecoderLoader {
    pub fn new(name: impl Into<String>, config: ScorerConfig, devices: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            config,
            devices,
            weights: Vec::new(),
        }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn devices(&self) -> &[usize] {
        &self.devices
    }

    /// Loaded weight sets, in device order.
    pub fn weights(&self) -> &[Arc<Weights>] {
        &self.weights
    }

    fn weights_for_task(&self, task_id: usize) -> ScorerResult<&Arc<Weights>> {
        if self.weights.is_empty() {
            return Err(ScorerError::NotLoaded(self.name.clone()));
        }
        Ok(&self.weights[task_id % self.weights.len()])
    }
}

impl Loader for EncoderDecoderLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self) -> ScorerResult<()> {
        if self.devices.is_empty() {
            return Err(ScorerError::InvalidConfig(format!(
                "scorer '{}' has no devices to load onto",
                self.name
            )));
        }
        self.weights.clear();

        let path = self.config.path.clone();
        let start = Instant::now();
        log::info!(
            "Loading '{}' from {:?} onto {} device(s)",
            self.name,
            path,
            self.devices.len()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.devices.len())
            .thread_name(|i| format!("weight-loader-{}", i))
            .build()
            .map_err(|e| ScorerError::Runtime(e.into()))?;

        // One slot per device; each task writes only its own.
        let mut slots: Vec<Option<anyhow::Result<Weights>>> =
            (0..self.devices.len()).map(|_| None).collect();

        pool.scope(|s| {
            for (slot, &device) in slots.iter_mut().zip(&self.devices) {
                let path = &path;
                s.spawn(move |_| {
                    log::debug!("Device {}: reading {:?}", device, path);
                    *slot = Some(Weights::load(path, device));
                });
            }
        });

        // All device loads are done with the shared mappings.
        let (files, bytes) = mmap_cache_stats();
        log::debug!("{} parameter file(s) mapped, {} bytes", files, bytes);
        evict_mmap(&path);

        let mut loaded = Vec::with_capacity(slots.len());
        for (slot, &device) in slots.into_iter().zip(&self.devices) {
            let result = slot.unwrap_or_else(|| Err(anyhow!("loading task did not run")));
            match result {
                Ok(weights) => loaded.push(Arc::new(weights)),
                Err(source) => {
                    log::error!("Device {}: failed to load {:?}: {:#}", device, path, source);
                    return Err(ScorerError::LoadFailed { path, device, source });
                }
            }
        }

        self.weights = loaded;
        log::info!(
            "Loaded '{}' onto devices {:?} in {:.2?}",
            self.name,
            self.devices,
            start.elapsed()
        );
        Ok(())
    }

    fn new_scorer(&self, task_id: usize) -> ScorerResult<Box<dyn Scorer>> {
        let weights = self.weights_for_task(task_id)?;
        Ok(Box::new(EncoderDecoder::new(
            self.name.clone(),
            self.config.tab,
            self.config.weight,
            Arc::clone(weights),
        )))
    }

    fn num_devices(&self) -> usize {
        self.devices.len()
    }

    fn is_loaded(&self) -> bool {
        !self.weights.is_empty()
    }

    fn device_for_task(&self, task_id: usize) -> ScorerResult<usize> {
        Ok(self.weights_for_task(task_id)?.device())
    }
}
