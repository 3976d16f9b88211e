use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cluster::CentroidCost;
use crate::dbscan::Dbscan;
use crate::error::{ClusterError, ClusterResult};
use crate::metric::MetricKind;
use crate::sieve::SieveMode;

pub const DEFAULT_SIEVE_SEED: u64 = 1_234_567;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub min_points: usize,
    pub epsilon: f64,
    #[serde(default = "default_sieve")]
    pub sieve: usize,
    #[serde(default)]
    pub random_sieve: bool,
    #[serde(default)]
    pub sieve_seed: Option<u64>,
    #[serde(default)]
    pub sieve_to_centroid: bool,
    #[serde(default)]
    pub centroid_cost: CentroidCost,
    #[serde(default)]
    pub metric: MetricKind,
    #[serde(default)]
    pub memory_budget_bytes: Option<usize>,
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub kdist: Option<usize>,
    #[serde(default)]
    pub load_pairdist: Option<String>,
    #[serde(default)]
    pub save_pairdist: Option<String>,
    #[serde(default)]
    pub output: OutputSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Per-frame cluster ID series.
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub kdist: Option<String>,
}

fn default_sieve() -> usize {
    1
}

impl ClusterConfig {
    pub fn new(min_points: usize, epsilon: f64) -> Self {
        Self {
            min_points,
            epsilon,
            sieve: default_sieve(),
            random_sieve: false,
            sieve_seed: None,
            sieve_to_centroid: false,
            centroid_cost: CentroidCost::default(),
            metric: MetricKind::default(),
            memory_budget_bytes: None,
            threads: None,
            kdist: None,
            load_pairdist: None,
            save_pairdist: None,
            output: OutputSpec::default(),
        }
    }

    pub fn normalized(&self) -> ClusterResult<ClusterConfig> {
        let mut cfg = self.clone();
        cfg.validate()?;
        if cfg.random_sieve && cfg.sieve_seed.is_none() {
            cfg.sieve_seed = Some(DEFAULT_SIEVE_SEED);
        }
        Ok(cfg)
    }

    pub fn validate(&self) -> ClusterResult<()> {
        if self.min_points < 1 {
            return Err(ClusterError::Config("min_points must be >= 1".into()));
        }
        if !self.epsilon.is_finite() {
            return Err(ClusterError::Config("epsilon must be a finite number".into()));
        }
        if self.sieve < 1 {
            return Err(ClusterError::Config("sieve must be >= 1".into()));
        }
        if let Some(bytes) = self.memory_budget_bytes {
            if bytes == 0 {
                return Err(ClusterError::Config("memory_budget_bytes must be > 0".into()));
            }
        }
        if let Some(threads) = self.threads {
            if threads == 0 {
                return Err(ClusterError::Config("threads must be > 0".into()));
            }
        }
        if let Some(k) = self.kdist {
            if k == 0 {
                return Err(ClusterError::Config("kdist must be >= 1".into()));
            }
        }
        if self.output.kdist.is_some() && self.kdist.is_none() {
            return Err(ClusterError::Config(
                "output.kdist requires kdist to be set".into(),
            ));
        }
        if let (Some(load), Some(save)) = (&self.load_pairdist, &self.save_pairdist) {
            if load == save {
                return Err(ClusterError::Config(
                    "load_pairdist and save_pairdist must differ".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn sieve_mode(&self) -> SieveMode {
        if self.random_sieve {
            SieveMode::Random {
                seed: self.sieve_seed.unwrap_or(DEFAULT_SIEVE_SEED),
            }
        } else {
            SieveMode::Regular
        }
    }

    pub fn dbscan(&self) -> ClusterResult<Dbscan> {
        Ok(Dbscan::new(self.min_points, self.epsilon)?.with_sieve_to_centroid(self.sieve_to_centroid))
    }
}

/// Load a config, choosing the parser by extension (`.yaml`/`.yml`, else JSON).
pub fn load_config(path: &Path) -> ClusterResult<ClusterConfig> {
    let content = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext == "yaml" || ext == "yml" {
        serde_yaml::from_str(&content)
            .map_err(|e| ClusterError::Parse(format!("yaml parse error: {e}")))
    } else {
        serde_json::from_str(&content)
            .map_err(|e| ClusterError::Parse(format!("json parse error: {e}")))
    }
}
