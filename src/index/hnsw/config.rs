use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::{KnnError, Result},
    index::{DistanceMetric, InitParameter, MetricKind},
};

pub const DEFAULT_M: usize = 16;
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;
pub const DEFAULT_EF: usize = 200;
pub const DEFAULT_SEED: u64 = 0x5eed_cafe;

const MIN_M: usize = 2;
const MAX_M: usize = 256;

/// Typed HNSW settings. Parsed from the open parameter bag of an index
/// request; unknown keys are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Max neighbours per node on upper layers. Layer 0 keeps `2 * m`.
    pub m: usize,
    /// Candidate list size while inserting.
    pub ef_construction: usize,
    /// Candidate list size while searching; raised to `k` when smaller.
    pub ef: usize,
    pub metric: DistanceMetric,
    /// Seeds level assignment so builds are reproducible.
    pub seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        HnswConfig {
            m: DEFAULT_M,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef: DEFAULT_EF,
            metric: DistanceMetric::L2,
            seed: DEFAULT_SEED,
        }
    }
}

impl HnswConfig {
    pub fn from_parameters(parameters: &[InitParameter]) -> Result<Self> {
        let mut config = HnswConfig::default();
        let mut seen = HashSet::new();

        for parameter in parameters {
            let key = parameter.name.trim().to_ascii_lowercase();
            if !seen.insert(key.clone()) {
                return Err(KnnError::InvalidIndexParameter(format!(
                    "duplicate parameter: {}",
                    parameter.name
                )));
            }
            match key.as_str() {
                "m" => config.m = parse_count(parameter)?,
                "ef_construction" => config.ef_construction = parse_count(parameter)?,
                "ef" => config.ef = parse_count(parameter)?,
                "metric" => {
                    let kind: MetricKind = parameter.value.parse().map_err(|_| {
                        KnnError::InvalidIndexParameter(format!(
                            "unknown metric: {}",
                            parameter.value
                        ))
                    })?;
                    config.metric = kind.implemented()?;
                }
                _ => {
                    return Err(KnnError::InvalidIndexParameter(format!(
                        "unknown parameter: {}",
                        parameter.name
                    )))
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_M..=MAX_M).contains(&self.m) {
            return Err(KnnError::InvalidIndexParameter(format!(
                "M must be within {}..={}, got {}",
                MIN_M, MAX_M, self.m
            )));
        }
        if self.ef_construction == 0 || self.ef == 0 {
            return Err(KnnError::InvalidIndexParameter(
                "ef and ef_construction must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn max_neighbors(&self, level: usize) -> usize {
        if level == 0 {
            self.m * 2
        } else {
            self.m
        }
    }

    pub fn level_multiplier(&self) -> f64 {
        1.0 / (self.m as f64).ln()
    }
}

fn parse_count(parameter: &InitParameter) -> Result<usize> {
    parameter.value.trim().parse().map_err(|_| {
        KnnError::InvalidIndexParameter(format!(
            "{} expects a positive integer, got {:?}",
            parameter.name, parameter.value
        ))
    })
}
