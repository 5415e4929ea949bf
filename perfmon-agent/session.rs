//! A monitoring session: take the PMU over, program it, give it back
//!
//! Starting a session saves whatever configuration the PMU had, then binds
//! the configured events. Ending it returns the PMU to a quiescent state and
//! restores the saved configuration, so the previous owner finds it as it
//! left it (counter values aside).

use std::sync::Arc;

use perfmon_raw::{RegisterBackend, SlotIndex};

use crate::config::SessionConfig;
use crate::counters::{event_name, Watch};
use crate::error::Result;
use crate::pmu::Pmu;
use crate::state::SavedState;

pub struct Session<B: RegisterBackend> {
    pmu: Arc<parking_lot::Mutex<Pmu<B>>>,
    saved: SavedState,
    watches: Vec<Watch>,
}

impl<B: RegisterBackend> Session<B> {
    /// Take over the shared PMU
    ///
    /// The configured events are checked against the PMU before any register
    /// is written, so a start that fails leaves the PMU as it was found,
    /// counter values included.
    pub fn start(pmu: Arc<parking_lot::Mutex<Pmu<B>>>, config: &SessionConfig) -> Result<Self> {
        let (saved, watches) = {
            let mut guard = pmu.lock();
            guard.events().plan(&config.events)?;

            let saved = guard.state().save();
            if let Err(e) = Self::program(&mut guard, config) {
                tracing::error!("Failed to program PMU, restoring previous state: {}", e);
                guard.state().restore(saved);
                return Err(e);
            }

            let watches = guard.events().watches();
            (saved, watches)
        };

        Ok(Self {
            pmu,
            saved,
            watches,
        })
    }

    fn program(pmu: &mut Pmu<B>, config: &SessionConfig) -> Result<()> {
        pmu.events().disable_all();
        pmu.enable();

        if config.user_enable {
            pmu.user_enable();
        }

        if let Some(cycles) = config.cycles {
            pmu.cycles().configure(cycles.wide, cycles.divide_by_64);
        }

        for spec in &config.events {
            let slot: SlotIndex = pmu.events().add(spec.code, spec.wide)?;
            tracing::info!(
                "Watching {} on slot {}{}",
                event_name(spec.code),
                slot,
                if spec.wide { " (64-bit)" } else { "" }
            );
        }

        Ok(())
    }

    pub fn pmu(&self) -> Arc<parking_lot::Mutex<Pmu<B>>> {
        Arc::clone(&self.pmu)
    }

    pub fn watches(&self) -> &[Watch] {
        &self.watches
    }

    /// Snapshot taken when the session started
    pub fn saved_state(&self) -> &SavedState {
        &self.saved
    }

    /// Quiesce the PMU and hand it back in its pre-session configuration
    pub fn end(self) {
        let mut pmu = self.pmu.lock();
        pmu.events().disable_all();
        pmu.state().restore(self.saved);
        tracing::info!("PMU returned to its previous configuration");
    }
}
