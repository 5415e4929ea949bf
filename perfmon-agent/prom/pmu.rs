use prometheus::{Gauge, Opts, Registry};
use std::collections::HashMap;
use std::sync::Arc;

use perfmon_raw::{EventCode, RegisterBackend};

use crate::counters::event_name;
use crate::error::Result;
use crate::metrics::PmuMetric;
use crate::pmu::Pmu;

pub struct PmuMetricExporter<B: RegisterBackend> {
    core: usize,
    registry: Arc<Registry>,
    pmu: Arc<parking_lot::Mutex<Pmu<B>>>,
    event_gauges: HashMap<EventCode, Gauge>,
    cycle_gauge: Gauge,
    slots_in_use_gauge: Gauge,
}

impl<B: RegisterBackend> PmuMetricExporter<B> {
    /// Create gauges for every event currently watched on `pmu`
    pub fn new(core: usize, pmu: Arc<parking_lot::Mutex<Pmu<B>>>) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let core_label = core.to_string();

        let gauge = |metric: PmuMetric, labels: &[(&str, String)]| -> Result<Gauge> {
            let mut opts = Opts::new(metric.name(), metric.help()).const_label("core", &core_label);
            for (name, value) in labels {
                opts = opts.const_label(*name, value);
            }
            let gauge = Gauge::with_opts(opts)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        let (watches, slot_count) = {
            let mut pmu = pmu.lock();
            let slot_count = pmu.slot_count();
            (pmu.events().watches(), slot_count)
        };

        let mut event_gauges = HashMap::new();
        for watch in &watches {
            let g = gauge(
                PmuMetric::EventCount,
                &[
                    ("event", event_name(watch.code)),
                    ("slot", watch.slot.to_string()),
                    ("wide", watch.wide.to_string()),
                ],
            )?;
            event_gauges.insert(watch.code, g);
        }

        let cycle_gauge = gauge(PmuMetric::CycleCount, &[])?;
        let slots_in_use_gauge = gauge(PmuMetric::SlotsInUse, &[])?;
        gauge(PmuMetric::SlotCount, &[])?.set(slot_count as f64);

        tracing::info!(
            "Exporting {} PMU events on core {}",
            event_gauges.len(),
            core
        );

        Ok(Self {
            core,
            registry,
            pmu,
            event_gauges,
            cycle_gauge,
            slots_in_use_gauge,
        })
    }

    /// Sample every watched event once (called by orchestrator)
    pub async fn collect(&self) {
        let mut pmu = self.pmu.lock();

        {
            let events = pmu.events();
            for (&code, gauge) in &self.event_gauges {
                match events.read(code) {
                    Ok((_, value)) => gauge.set(value as f64),
                    Err(e) => {
                        tracing::warn!(
                            "Failed to read {} on core {}: {}",
                            event_name(code),
                            self.core,
                            e
                        );
                    }
                }
            }

            let in_use: usize = events
                .watches()
                .iter()
                .map(|w| if w.wide { 2 } else { 1 })
                .sum();
            self.slots_in_use_gauge.set(in_use as f64);
        }

        let cycles = pmu.cycles();
        if cycles.is_enabled() {
            self.cycle_gauge.set(cycles.read() as f64);
        }
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn pmu(&self) -> Arc<parking_lot::Mutex<Pmu<B>>> {
        Arc::clone(&self.pmu)
    }
}
