//! Pipeline configuration with JSON dump and reload.

use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::dna::{MAX_DNA_SHINGLE_LEN, NonAcgtPolicy};
use crate::error::SketchError;
use crate::family::{DEFAULT_CACHE_CAPACITY, HashWidth};
use crate::permutation::MAX_SAMPLES;

/// Everything the near-duplicate pipeline needs, as one value.
///
/// Two runs sharing a config (in particular the seed) produce
/// bit-identical sketches and band keys, so results are replayable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Shingle length; for DNA input it must stay within 1..=32.
    pub shingle_len: usize,
    /// Sketch length, typically 128 to 512.
    pub n_samples: usize,
    /// Width of the stored minima.
    pub width: HashWidth,
    /// Fixes the permutation table and the weighted parameter rows.
    pub seed: u64,
    /// Jaccard threshold in [0, 1] used for filtering and optimization.
    pub threshold: f64,
    pub false_positive_weight: f64,
    pub false_negative_weight: f64,
    /// Explicit (bands, rows); when absent the optimizer chooses.
    pub band_params: Option<(usize, usize)>,
    /// How DNA shingling treats symbols outside ATCG.
    pub non_acgt: NonAcgtPolicy,
    /// Capacity of the per-family element cache.
    pub cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            shingle_len: 7,
            n_samples: 200,
            width: HashWidth::B32,
            seed: 1,
            threshold: 0.5,
            false_positive_weight: 0.5,
            false_negative_weight: 0.5,
            band_params: None,
            non_acgt: NonAcgtPolicy::Skip,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), SketchError> {
        if self.shingle_len == 0 {
            return Err(SketchError::invalid("shingle length must be at least 1"));
        }
        if self.n_samples == 0 || self.n_samples > MAX_SAMPLES {
            return Err(SketchError::invalid(format!(
                "n_samples {} outside 1..={MAX_SAMPLES}",
                self.n_samples
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SketchError::invalid(format!(
                "threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        let (w_fp, w_fn) = (self.false_positive_weight, self.false_negative_weight);
        if w_fp < 0.0 || w_fn < 0.0 || (w_fp + w_fn - 1.0).abs() > 1e-9 {
            return Err(SketchError::invalid(format!(
                "weights ({w_fp}, {w_fn}) must be non-negative and sum to 1"
            )));
        }
        if let Some((bands, rows)) = self.band_params {
            if bands == 0 || rows == 0 {
                return Err(SketchError::invalid(
                    "bands and rows must both be at least 1",
                ));
            }
            if bands * rows > self.n_samples {
                return Err(SketchError::invalid(format!(
                    "bands {bands} * rows {rows} exceeds sketch length {}",
                    self.n_samples
                )));
            }
        }
        if self.cache_capacity == 0 {
            return Err(SketchError::invalid("cache capacity must be at least 1"));
        }
        Ok(())
    }

    /// Extra bound for DNA input, where shingles must pack into a u64.
    pub fn validate_for_dna(&self) -> Result<(), SketchError> {
        self.validate()?;
        if self.shingle_len > MAX_DNA_SHINGLE_LEN {
            return Err(SketchError::invalid(format!(
                "dna shingle length {} outside 1..={MAX_DNA_SHINGLE_LEN}",
                self.shingle_len
            )));
        }
        Ok(())
    }

    /// Serialize to pretty JSON at `path`, truncating any existing file.
    pub fn dump_json<P: AsRef<Path>>(&self, path: P) -> Result<(), SketchError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(std::io::Error::from)?;
        writer.flush()?;
        info!("dumped pipeline config to {:?}", path.as_ref());
        Ok(())
    }

    /// Reload a config previously written by [`PipelineConfig::dump_json`].
    pub fn reload_json<P: AsRef<Path>>(path: P) -> Result<Self, SketchError> {
        let file = OpenOptions::new().read(true).open(path.as_ref())?;
        let reader = BufReader::new(file);
        let config: PipelineConfig =
            serde_json::from_reader(reader).map_err(std::io::Error::from)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        config.validate_for_dna().unwrap();
    }

    #[test]
    fn each_bound_is_enforced() {
        let base = PipelineConfig::default();

        let mut c = base.clone();
        c.shingle_len = 0;
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.n_samples = 0;
        assert!(c.validate().is_err());
        c.n_samples = MAX_SAMPLES + 1;
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.threshold = 1.01;
        assert!(c.validate().is_err());
        c.threshold = -0.5;
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.false_positive_weight = 0.7;
        c.false_negative_weight = 0.7;
        assert!(c.validate().is_err());
        c.false_positive_weight = -0.2;
        c.false_negative_weight = 1.2;
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.band_params = Some((40, 6));
        assert!(c.validate().is_err());
        c.band_params = Some((0, 6));
        assert!(c.validate().is_err());
        c.band_params = Some((25, 8));
        assert!(c.validate().is_ok());

        let mut c = base.clone();
        c.cache_capacity = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn dna_bound_is_stricter() {
        let mut config = PipelineConfig::default();
        config.shingle_len = 40;
        assert!(config.validate().is_ok());
        assert!(config.validate_for_dna().is_err());
    }

    #[test]
    fn json_round_trips_through_a_file() {
        let mut config = PipelineConfig::default();
        config.shingle_len = 9;
        config.seed = 99;
        config.band_params = Some((25, 8));
        config.non_acgt = NonAcgtPolicy::Fail;

        let path = std::env::temp_dir().join(format!(
            "lshsketch-config-{}.json",
            std::process::id()
        ));
        config.dump_json(&path).unwrap();
        let reloaded = PipelineConfig::reload_json(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config, reloaded);
    }

    #[test]
    fn reload_rejects_invalid_contents() {
        let path = std::env::temp_dir().join(format!(
            "lshsketch-bad-config-{}.json",
            std::process::id()
        ));
        let mut config = PipelineConfig::default();
        config.threshold = 0.9;
        config.dump_json(&path).unwrap();
        // Corrupt the stored threshold beyond its range.
        let text = std::fs::read_to_string(&path)
            .unwrap()
            .replace("0.9", "9.0");
        std::fs::write(&path, text).unwrap();
        assert!(PipelineConfig::reload_json(&path).is_err());
        std::fs::remove_file(&path).ok();
    }
}
