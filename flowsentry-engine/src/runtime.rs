//! Runtime orchestration for the detection pipeline.
//!
//! This module wires capture, flow analysis, detection, and alerting
//! together and provides the three operating modes: live capture, offline
//! replay, and baseline training. The abstraction lets different frontends
//! share the same pipeline implementation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use flowsentry_alerts::{AlertDispatcher, AlertSink, JsonLinesSink};
use flowsentry_analysis::TrafficAnalyzer;
use flowsentry_capture::{replay_file, run_capture_loop};
use flowsentry_config::FlowsentryConfig;
use flowsentry_core::events::{PacketQueue, PacketRecord, QueueError};
use flowsentry_detection::{
    AnomalyScorer, DetectionEngine, IsolationForestScorer, ScorerOptions, FEATURE_DIM,
};
use flowsentry_telemetry::metrics::MetricsRecorder;

use crate::error::PipelineError;
use crate::rules::build_signature_engine;

/// Outcome of a training run, reported to the operator.
#[derive(Clone, Debug)]
pub struct TrainingReport {
    /// Flow snapshots collected from the capture file.
    pub samples: usize,
    /// Adapter-space score at the contamination quantile of the training
    /// set; a starting point for tuning the configured threshold.
    pub calibrated_threshold: Option<f64>,
    /// Adapter-space score distribution over the training set.
    pub score_min: f64,
    pub score_mean: f64,
    pub score_max: f64,
}

fn wall_clock_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Fully wired pipeline: one intake queue, one analyzer, one detection
/// engine, one dispatcher. Construct once per process; components are
/// shared across the capture and consumer tasks.
pub struct PipelineRuntime {
    config: FlowsentryConfig,
    queue: PacketQueue,
    analyzer: TrafficAnalyzer,
    detection: DetectionEngine,
    scorer: Arc<IsolationForestScorer>,
    dispatcher: AlertDispatcher,
    metrics: MetricsRecorder,
    warmup: Mutex<Vec<[f64; FEATURE_DIM]>>,
}

impl PipelineRuntime {
    /// Builds every component from validated configuration. The sink is
    /// injected so replay and tests can capture alerts in memory.
    pub fn new(
        config: FlowsentryConfig,
        sink: Arc<dyn AlertSink>,
    ) -> Result<Self, PipelineError> {
        let queue = PacketQueue::with_capacity(config.capture.queue_capacity)
            .map_err(|QueueError::BadCapacity(n)| PipelineError::InvalidQueueCapacity(n))?;

        let signatures = build_signature_engine(&config.detection.rules)?;
        let anomaly = &config.detection.anomaly;
        let scorer = Arc::new(IsolationForestScorer::new(ScorerOptions {
            n_trees: anomaly.n_trees,
            sample_size: anomaly.sample_size,
            min_samples: anomaly.min_samples,
            contamination: anomaly.contamination,
        }));
        let detection = DetectionEngine::new(
            signatures,
            scorer.clone() as Arc<dyn AnomalyScorer>,
            anomaly.threshold,
            anomaly.confidence_scale,
        );

        let dispatcher = AlertDispatcher::new(
            sink,
            Duration::from_secs(config.alerts.throttle_window_secs),
        );

        let metrics = MetricsRecorder::new();
        metrics.anomaly_trained.set(0.0);

        Ok(Self {
            config,
            queue,
            analyzer: TrafficAnalyzer::new(),
            detection,
            scorer,
            dispatcher,
            metrics,
            warmup: Mutex::new(Vec::new()),
        })
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Runs one packet through analysis, detection, and alerting.
    pub fn process_record(&self, record: &PacketRecord) {
        self.metrics.packets_total.inc();
        let features = self.analyzer.observe(record);
        self.collect_warmup(&features);

        let started = Instant::now();
        let threats = self.detection.detect(&features, record);
        self.metrics
            .detection_latency
            .observe(started.elapsed().as_nanos() as f64);

        for threat in &threats {
            self.metrics.threats_total.inc();
            match self.dispatcher.dispatch(threat) {
                Some(_) => self.metrics.alerts_total.inc(),
                None => self.metrics.alerts_suppressed.inc(),
            }
        }

        self.metrics.flows_active.set(self.analyzer.flow_count() as f64);
    }

    /// While warmup is configured and no model exists, snapshots accumulate
    /// as the training baseline; crossing the target trains the scorer and
    /// arms the anomaly path.
    fn collect_warmup(&self, features: &flowsentry_analysis::FeatureSnapshot) {
        let target = self.config.detection.anomaly.warmup_samples;
        if target == 0 || self.scorer.is_trained() {
            return;
        }

        let samples = {
            let mut warmup = self.warmup.lock();
            warmup.push(features.as_vector());
            if warmup.len() < target {
                return;
            }
            std::mem::take(&mut *warmup)
        };

        match self.scorer.train(&samples) {
            Ok(()) => {
                self.metrics.anomaly_trained.set(1.0);
                info!(samples = samples.len(), "warmup complete, anomaly detection armed");
            }
            Err(e) => warn!("warmup training failed: {e}"),
        }
    }

    /// Live mode: a blocking capture producer feeds the queue, an async
    /// consumer drains it. Runs until `ctrl-c`, then drains the queue and
    /// flushes the sink before returning.
    #[instrument(level = "info", name = "run_live", skip(self))]
    pub async fn run_live(self: Arc<Self>) -> Result<(), PipelineError> {
        let terminate = Arc::new(AtomicBool::new(false));
        let producer_done = Arc::new(AtomicBool::new(false));

        {
            let terminate = terminate.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("shutdown requested");
                    terminate.store(true, Ordering::Relaxed);
                }
            });
        }

        let eviction = self.spawn_eviction_timer(terminate.clone());
        let consumer = self.spawn_consumer(producer_done.clone());

        info!(
            interface = %self.config.capture.interface,
            "starting live capture"
        );
        let capture = {
            let runtime = self.clone();
            let terminate = terminate.clone();
            tokio::task::spawn_blocking(move || {
                let intake = runtime.queue.share();
                run_capture_loop(
                    &runtime.config.capture.interface,
                    runtime.config.capture.buffer_size,
                    runtime.config.capture.promiscuous,
                    &terminate,
                    |record| {
                        if !intake.push(record) {
                            runtime.metrics.packets_dropped.inc();
                        }
                    },
                )
            })
        };

        // The flags must be set before the capture result is inspected: a
        // cancelled or panicked capture task would otherwise leave the
        // consumer sleeping on an intake that never ends.
        let capture_result = capture.await;
        terminate.store(true, Ordering::Relaxed);
        producer_done.store(true, Ordering::Release);

        consumer.await?;
        eviction.abort();
        self.dispatcher.flush();

        if let Ok(report) = self.metrics.gather_metrics() {
            info!("final metrics:\n{report}");
        }

        capture_result??;
        Ok(())
    }

    /// Replay mode: runs a capture file through the full pipeline on the
    /// calling task. Returns the number of packets delivered.
    #[instrument(level = "info", name = "run_replay", skip(self, path))]
    pub fn run_replay<P: AsRef<Path>>(&self, path: P) -> Result<u64, PipelineError> {
        let delivered = replay_file(path, |record| self.process_record(&record))?;
        self.dispatcher.flush();
        info!(
            packets = delivered,
            threats = self.metrics.threats_total.get(),
            alerts = self.metrics.alerts_total.get(),
            "replay complete"
        );
        Ok(delivered)
    }

    /// Training mode: collects flow snapshots from a capture file and fits
    /// the anomaly scorer. `max_samples` caps the baseline size.
    #[instrument(level = "info", name = "run_training", skip(self, path))]
    pub fn run_training<P: AsRef<Path>>(
        &self,
        path: P,
        max_samples: Option<usize>,
    ) -> Result<TrainingReport, PipelineError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::TrainingFileNotFound(path.to_path_buf()));
        }

        let analyzer = TrafficAnalyzer::new();
        let mut snapshots = Vec::new();
        replay_file(path, |record| {
            if max_samples.is_some_and(|cap| snapshots.len() >= cap) {
                return;
            }
            snapshots.push(analyzer.observe(&record));
        })?;

        let samples: Vec<[f64; FEATURE_DIM]> =
            snapshots.iter().map(|s| s.as_vector()).collect();
        self.scorer.train(&samples)?;
        self.metrics.anomaly_trained.set(1.0);

        // Score the baseline itself so the operator sees where normal
        // traffic lands relative to the configured threshold.
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for snapshot in &snapshots {
            let score = self.scorer.score(snapshot)?;
            min = min.min(score);
            max = max.max(score);
            sum += score;
        }

        let report = TrainingReport {
            samples: snapshots.len(),
            calibrated_threshold: self.scorer.calibrated_threshold(),
            score_min: min,
            score_mean: sum / snapshots.len() as f64,
            score_max: max,
        };
        info!(
            samples = report.samples,
            calibrated_threshold = ?report.calibrated_threshold,
            score_min = report.score_min,
            score_mean = report.score_mean,
            score_max = report.score_max,
            "training complete"
        );
        Ok(report)
    }

    /// Consumer task: drains the queue until the producer is done and the
    /// queue is empty. A short sleep on empty keeps the single consumer
    /// from spinning.
    fn spawn_consumer(self: &Arc<Self>, producer_done: Arc<AtomicBool>) -> JoinHandle<()> {
        let runtime = self.clone();
        tokio::spawn(async move {
            loop {
                match runtime.queue.pop() {
                    Some(record) => runtime.process_record(&record),
                    None => {
                        if producer_done.load(Ordering::Acquire) && runtime.queue.is_empty() {
                            break;
                        }
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
    }

    /// Periodically evicts idle flows so the table tracks live traffic only.
    fn spawn_eviction_timer(self: &Arc<Self>, terminate: Arc<AtomicBool>) -> JoinHandle<()> {
        let runtime = self.clone();
        tokio::spawn(async move {
            let period = Duration::from_secs(runtime.config.analyzer.eviction_interval_secs);
            let idle_ns = runtime.config.analyzer.flow_idle_timeout_secs * 1_000_000_000;
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick fires immediately
            while !terminate.load(Ordering::Relaxed) {
                interval.tick().await;
                let evicted = runtime.analyzer.evict_idle(wall_clock_ns(), idle_ns);
                if evicted > 0 {
                    info!(evicted, remaining = runtime.analyzer.flow_count(), "idle flows evicted");
                }
                runtime
                    .metrics
                    .flows_active
                    .set(runtime.analyzer.flow_count() as f64);
            }
        })
    }
}

/// Live capture with the configured JSON-lines sink.
pub async fn run_live_mode(config: FlowsentryConfig) -> Result<(), PipelineError> {
    let sink = Arc::new(JsonLinesSink::open(&config.alerts.log_file)?);
    let runtime = Arc::new(PipelineRuntime::new(config, sink)?);
    runtime.run_live().await
}

/// Offline replay with the configured JSON-lines sink.
pub async fn run_replay_mode<P: AsRef<Path>>(
    config: FlowsentryConfig,
    path: P,
) -> Result<u64, PipelineError> {
    let sink = Arc::new(JsonLinesSink::open(&config.alerts.log_file)?);
    let runtime = PipelineRuntime::new(config, sink)?;
    runtime.run_replay(path)
}

/// Baseline training from a capture file.
pub async fn run_training_mode<P: AsRef<Path>>(
    config: FlowsentryConfig,
    path: P,
    max_samples: Option<usize>,
) -> Result<TrainingReport, PipelineError> {
    let sink = Arc::new(JsonLinesSink::open(&config.alerts.log_file)?);
    let runtime = PipelineRuntime::new(config, sink)?;
    runtime.run_training(path, max_samples)
}
