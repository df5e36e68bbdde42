//! Once-per-second downstream writer.
//!
//! Each tick snapshots every device, writes one state batch and one
//! heartbeat batch, and may hand a ZDA-derived time to the clock setter.
//! Ticks are aligned to whole UTC seconds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fpu_core::write::BatchBuilder;
use fpu_core::{DriverConfig, FpuState, StateStore};

use crate::clock::ClockSetter;
use crate::sink::{SinkError, TelemetrySink};
use crate::SharedStore;

/// Time from `now` to the next whole UTC second, never zero.
pub fn delay_to_next_second(now: DateTime<Utc>) -> Duration {
    let nanos = u64::from(now.timestamp_subsec_nanos()).min(999_999_999);
    Duration::from_nanos(1_000_000_000 - nanos)
}

/// Time a synced clock should adopt: the device UTC advanced by the time
/// elapsed since it was received.
pub fn sync_time(state: &FpuState, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if state.time_sync_active_interface == 0 {
        return None;
    }
    let utc = state.utc?;
    let received = state.utc_received?;
    let elapsed = (now - received).max(chrono::Duration::zero());
    Some(utc + elapsed)
}

pub struct TickWriter {
    config: Arc<DriverConfig>,
    store: SharedStore,
    sink: Arc<dyn TelemetrySink>,
    clock: Arc<dyn ClockSetter>,
    /// Device name to side token
    sides: HashMap<String, String>,
    heartbeat: u16,
    last_time_sync: Option<Instant>,
}

impl TickWriter {
    pub fn new(
        config: Arc<DriverConfig>,
        store: SharedStore,
        sink: Arc<dyn TelemetrySink>,
        clock: Arc<dyn ClockSetter>,
    ) -> Self {
        let sides = config
            .device_settings()
            .into_iter()
            .map(|s| (s.name, s.side))
            .collect();
        Self {
            config,
            store,
            sink,
            clock,
            sides,
            heartbeat: 0,
            last_time_sync: None,
        }
    }

    /// Heartbeat value the next tick will write.
    pub fn heartbeat(&self) -> u16 {
        self.heartbeat
    }

    /// Wait the initial delay, then tick on every whole second until
    /// cancelled. Write failures are logged and never stop the schedule.
    pub async fn run(mut self, cancel: CancellationToken) {
        let initial = Duration::from_millis(self.config.data_handler.initial_delay_ms);
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(initial) => {}
        }
        info!("tick writer started");

        loop {
            if let Err(e) = self.tick().await {
                warn!("tick write failed: {}", e);
            }
            let delay = delay_to_next_second(Utc::now());
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        info!("tick writer stopped");
    }

    /// One tick. The heartbeat counter advances whatever the outcome.
    pub async fn tick(&mut self) -> Result<(), SinkError> {
        let snapshot = self.store.read().await.snapshot();
        self.maybe_sync_clock(&snapshot);

        let result = if self.sink.is_connected() {
            self.write(&snapshot).await
        } else {
            debug!("sink not connected, skipping writes");
            Ok(())
        };
        self.heartbeat = self.heartbeat.wrapping_add(1);
        result
    }

    async fn write(&self, snapshot: &[FpuState]) -> Result<(), SinkError> {
        let now = Utc::now();

        let mut batch = BatchBuilder::new(&self.config, now);
        for state in snapshot {
            let side = self.sides.get(&state.name).unwrap_or(&state.name);
            batch.push_device(side, state);
        }
        if !batch.skipped().is_empty() {
            debug!(skipped = ?batch.skipped(), "tags not configured");
        }
        let values = batch.finish();
        if !values.is_empty() {
            self.sink.write_batch(values).await?;
        }

        let mut heartbeat = BatchBuilder::new(&self.config, now);
        heartbeat.push_heartbeat(self.heartbeat);
        let values = heartbeat.finish();
        if !values.is_empty() {
            self.sink.write_batch(values).await?;
        }
        Ok(())
    }

    fn maybe_sync_clock(&mut self, snapshot: &[FpuState]) {
        let period_minutes = self.config.data_handler.time_sync_period_minutes;
        if period_minutes == 0 {
            return;
        }
        let period = Duration::from_secs(period_minutes.saturating_mul(60));
        if let Some(last) = self.last_time_sync {
            if last.elapsed() < period {
                return;
            }
        }

        let now = Utc::now();
        let Some((device, utc)) = snapshot
            .iter()
            .find_map(|state| sync_time(state, now).map(|utc| (state.name.as_str(), utc)))
        else {
            return;
        };

        self.last_time_sync = Some(Instant::now());
        match self.clock.set_system_clock(utc) {
            Ok(()) => info!(
                device,
                utc = %utc.to_rfc3339_opts(SecondsFormat::Millis, true),
                "system clock synced"
            ),
            Err(e) => warn!(device, "system clock sync failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::RecordingClock;
    use crate::sink::RecordingSink;
    use chrono::TimeZone;
    use fpu_core::{FpuUpdate, MemoryStore, TagValue};
    use tokio::sync::RwLock;

    const CONFIG: &str = r#"{
        "devices": [{ "name": "fpu1", "logicalName": "PS" }],
        "writeTags": [
            { "name": "FPU_HEADING", "path": "FPU.{side}.Heading", "replaceKeyword": "{side}", "dataType": "Float" },
            { "name": "FPU_GPS_QUALITY", "path": "FPU.{side}.Quality", "replaceKeyword": "{side}", "dataType": "Int" },
            { "name": "APP_HEARTBEAT", "path": "App.Heartbeat{side}", "replaceKeyword": "{side}", "dataType": "Word" }
        ]
    }"#;

    fn writer(sink: Arc<RecordingSink>, clock: Arc<RecordingClock>) -> (TickWriter, SharedStore) {
        let config = Arc::new(DriverConfig::from_json(CONFIG).unwrap());
        let store: SharedStore = Arc::new(RwLock::new(MemoryStore::new(["fpu1"])));
        (TickWriter::new(config, store.clone(), sink, clock), store)
    }

    #[test]
    fn test_delay_to_next_second() {
        let now = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
        assert_eq!(delay_to_next_second(now), Duration::from_millis(750));
        let whole = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(delay_to_next_second(whole), Duration::from_secs(1));
    }

    #[test]
    fn test_sync_time_requires_active_interface() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 10).unwrap();
        let mut state = FpuState::new("fpu1");
        state.utc = Some(Utc.with_ymd_and_hms(2024, 2, 1, 11, 0, 0).unwrap());
        state.utc_received = Some(Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap());
        assert_eq!(sync_time(&state, now), None);

        state.time_sync_active_interface = 2;
        assert_eq!(
            sync_time(&state, now),
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 11, 0, 10).unwrap())
        );
    }

    #[tokio::test]
    async fn test_tick_writes_state_and_heartbeat() {
        let sink = Arc::new(RecordingSink::new());
        let (mut writer, store) = writer(sink.clone(), Arc::new(RecordingClock::new()));
        store
            .write()
            .await
            .apply("fpu1", &FpuUpdate::Heading(90.5), Utc::now());

        writer.tick().await.unwrap();
        writer.tick().await.unwrap();

        let batches = sink.batches().await;
        assert_eq!(batches.len(), 4);
        let paths: Vec<&str> = batches[0].iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["FPU.PS.Heading", "FPU.PS.Quality"]);
        assert_eq!(batches[0][0].value, TagValue::Float(90.5));
        assert_eq!(batches[1][0].path, "App.Heartbeat");
        assert_eq!(batches[1][0].value, TagValue::Word(0));
        assert_eq!(batches[3][0].value, TagValue::Word(1));
    }

    #[tokio::test]
    async fn test_heartbeat_advances_while_disconnected() {
        let sink = Arc::new(RecordingSink::new());
        sink.set_connected(false);
        let (mut writer, _) = writer(sink.clone(), Arc::new(RecordingClock::new()));

        writer.tick().await.unwrap();
        writer.tick().await.unwrap();
        assert!(sink.batches().await.is_empty());
        assert_eq!(writer.heartbeat(), 2);
    }

    #[tokio::test]
    async fn test_heartbeat_wraps() {
        let sink = Arc::new(RecordingSink::new());
        let (mut writer, _) = writer(sink, Arc::new(RecordingClock::new()));
        writer.heartbeat = u16::MAX;
        writer.tick().await.unwrap();
        assert_eq!(writer.heartbeat(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_is_reported_and_counter_advances() {
        let sink = Arc::new(RecordingSink::new());
        sink.set_failing(true);
        let (mut writer, _) = writer(sink, Arc::new(RecordingClock::new()));
        assert!(writer.tick().await.is_err());
        assert!(writer.tick().await.is_err());
        assert_eq!(writer.heartbeat(), 2);
    }

    #[tokio::test]
    async fn test_clock_synced_once_per_period() {
        let clock = Arc::new(RecordingClock::new());
        let (mut writer, store) = writer(Arc::new(RecordingSink::new()), clock.clone());
        {
            let mut store = store.write().await;
            let utc = Utc.with_ymd_and_hms(2024, 2, 1, 12, 35, 19).unwrap();
            store.apply("fpu1", &FpuUpdate::Time { utc, local: None }, Utc::now());
            store.set_active_interface("fpu1", 1);
        }

        writer.tick().await.unwrap();
        writer.tick().await.unwrap();

        let requests = clock.requests();
        assert_eq!(requests.len(), 1);
        let utc = Utc.with_ymd_and_hms(2024, 2, 1, 12, 35, 19).unwrap();
        assert!(requests[0] >= utc && requests[0] - utc < chrono::Duration::seconds(5));
    }

    #[tokio::test]
    async fn test_no_clock_sync_without_active_interface() {
        let clock = Arc::new(RecordingClock::new());
        let (mut writer, store) = writer(Arc::new(RecordingSink::new()), clock.clone());
        let utc = Utc.with_ymd_and_hms(2024, 2, 1, 12, 35, 19).unwrap();
        store
            .write()
            .await
            .apply("fpu1", &FpuUpdate::Time { utc, local: None }, Utc::now());

        writer.tick().await.unwrap();
        assert!(clock.requests().is_empty());
    }
}
