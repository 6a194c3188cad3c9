//! Anomaly scorer adapter over an external outlier-detection library.
//!
//! The pipeline consumes the model through the [`AnomalyScorer`] trait only;
//! any conforming outlier implementation (density-based, tree-based, or
//! statistical) can be substituted without touching the detection engine.
//! The shipped implementation wraps the `extended-isolation-forest` crate.
//!
//! Score orientation: lower = more anomalous. The forest's raw score is in
//! [0, 1] with higher = more anomalous, so the adapter negates it; the
//! default decision boundary of -0.5 therefore corresponds to a raw score
//! of 0.5.

use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

use extended_isolation_forest::{Forest, ForestOptions};

use flowsentry_analysis::FeatureSnapshot;

/// Dimensionality of the feature vector: (packet_size, packet_rate, byte_rate).
pub const FEATURE_DIM: usize = 3;

#[derive(Debug, Error)]
pub enum AnomalyError {
    /// Training was called with too few samples. Recoverable: supply more
    /// data and retry.
    #[error("Insufficient training data: got {got}, need at least {min}")]
    InsufficientData { got: usize, min: usize },

    /// Scoring was attempted before a successful training run.
    #[error("Anomaly scorer has not been trained")]
    NotTrained,

    /// The underlying model rejected the training set.
    #[error("Model training failed: {0}")]
    Model(String),
}

/// Contract between the detection engine and the statistical model.
pub trait AnomalyScorer: Send + Sync {
    /// Fits the model to a baseline of normal traffic samples.
    fn train(&self, samples: &[[f64; FEATURE_DIM]]) -> Result<(), AnomalyError>;

    /// Scores a snapshot; lower = more anomalous.
    fn score(&self, features: &FeatureSnapshot) -> Result<f64, AnomalyError>;

    /// Whether a successful training run has completed. Gates use after a
    /// restart until a model is retrained.
    fn is_trained(&self) -> bool;
}

/// Tuning knobs for the isolation-forest backend.
#[derive(Clone, Debug)]
pub struct ScorerOptions {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Sub-sample size per tree; clamped to the training-set size.
    pub sample_size: usize,
    /// Minimum number of training samples accepted.
    pub min_samples: usize,
    /// Expected fraction of anomalous samples in live traffic; used to
    /// calibrate the reported threshold from the training-score quantile.
    pub contamination: f64,
}

impl Default for ScorerOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            sample_size: 256,
            min_samples: 10,
            contamination: 0.1,
        }
    }
}

struct TrainedModel {
    forest: Forest<f64, FEATURE_DIM>,
    calibrated_threshold: f64,
}

/// [`AnomalyScorer`] backed by `extended-isolation-forest`.
///
/// The trained forest lives behind an `RwLock` and is replaced wholesale on
/// retrain, so `score` never observes a partially-updated model.
pub struct IsolationForestScorer {
    options: ScorerOptions,
    model: RwLock<Option<TrainedModel>>,
}

impl IsolationForestScorer {
    pub fn new(options: ScorerOptions) -> Self {
        Self {
            options,
            model: RwLock::new(None),
        }
    }

    /// Decision boundary suggested by the training data: the adapter-space
    /// score at the contamination quantile. Reported for operator tuning;
    /// the engine's configured threshold remains the decision boundary.
    pub fn calibrated_threshold(&self) -> Option<f64> {
        self.model.read().as_ref().map(|m| m.calibrated_threshold)
    }
}

impl Default for IsolationForestScorer {
    fn default() -> Self {
        Self::new(ScorerOptions::default())
    }
}

impl AnomalyScorer for IsolationForestScorer {
    fn train(&self, samples: &[[f64; FEATURE_DIM]]) -> Result<(), AnomalyError> {
        if samples.len() < self.options.min_samples {
            return Err(AnomalyError::InsufficientData {
                got: samples.len(),
                min: self.options.min_samples,
            });
        }

        let forest_options = ForestOptions {
            n_trees: self.options.n_trees,
            sample_size: self.options.sample_size.min(samples.len()),
            max_tree_depth: None,
            extension_level: 1,
        };

        let forest = Forest::from_slice(samples, &forest_options)
            .map_err(|e| AnomalyError::Model(format!("{e:?}")))?;

        // Calibration: the raw-score quantile that marks off the expected
        // contamination fraction of the training set, negated into adapter
        // orientation.
        let mut raw: Vec<f64> = samples.iter().map(|s| forest.score(s)).collect();
        raw.sort_by(|a, b| a.total_cmp(b));
        let idx = (((1.0 - self.options.contamination) * raw.len() as f64) as usize)
            .min(raw.len() - 1);
        let calibrated_threshold = -raw[idx];

        info!(
            samples = samples.len(),
            calibrated_threshold, "anomaly scorer trained"
        );

        *self.model.write() = Some(TrainedModel {
            forest,
            calibrated_threshold,
        });
        Ok(())
    }

    fn score(&self, features: &FeatureSnapshot) -> Result<f64, AnomalyError> {
        let guard = self.model.read();
        let model = guard.as_ref().ok_or(AnomalyError::NotTrained)?;
        Ok(-model.forest.score(&features.as_vector()))
    }

    fn is_trained(&self) -> bool {
        self.model.read().is_some()
    }
}
