// Periodic sampling loop
// Drives the PMU exporter on a fixed interval until cancelled

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use perfmon_raw::RegisterBackend;

use crate::prom::PmuMetricExporter;

/// Configuration for the collection loop
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub interval: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// Collector that samples the PMU exporter on every tick
pub struct MetricCollector<B: RegisterBackend> {
    collector_config: CollectorConfig,
    exporter: Arc<PmuMetricExporter<B>>,
}

impl<B: RegisterBackend + Send + 'static> MetricCollector<B> {
    pub fn new(exporter: PmuMetricExporter<B>, collector_config: CollectorConfig) -> Self {
        Self {
            collector_config,
            exporter: Arc::new(exporter),
        }
    }

    /// Start the collection loop (consumes the collector)
    pub fn start(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tracing::warn!(
            "Starting PMU collection loop every {:?}",
            self.collector_config.interval
        );

        tokio::spawn(async move {
            self.collection_loop(cancel_token).await;
        })
    }

    async fn collection_loop(self, cancel_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.collector_config.interval);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    tracing::info!("Collection loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.exporter.collect().await;
                }
            }
        }
    }

    /// Get a reference to the exporter for the metrics handler
    pub fn exporter(&self) -> Arc<PmuMetricExporter<B>> {
        Arc::clone(&self.exporter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pmu::Pmu;
    use perfmon_raw::current_arch::events::INST_RETIRED;
    use perfmon_raw::FakeBackend;

    #[tokio::test]
    async fn test_collection_loop_stops_on_cancel() {
        let mut pmu = Pmu::new(FakeBackend::new(4));
        pmu.events().add(INST_RETIRED, false).unwrap();
        let pmu = Arc::new(parking_lot::Mutex::new(pmu));

        let exporter = PmuMetricExporter::new(0, pmu).unwrap();
        let collector = MetricCollector::new(
            exporter,
            CollectorConfig {
                interval: Duration::from_millis(5),
            },
        );

        let token = CancellationToken::new();
        let handle = collector.start(token.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        assert!(handle.await.is_ok());
    }
}
