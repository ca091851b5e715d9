//! # Receive Worker
//!
//! The long-lived worker that synchronizes to the receiver's byte stream,
//! validates and decodes frames, and keeps telemetry flowing.
//!
//! This module handles:
//! - Frame synchronization on the 3-byte sync pattern
//! - Header/payload/checksum assembly and validation
//! - Dispatch of validated frames to the decoder and sinks
//! - The staleness watchdog that re-issues LOG after the stream goes quiet
//! - Graceful shutdown (UNLOG on exit)

use std::sync::Arc;
use std::time::Instant;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ReceiverConfig;
use crate::error::{NovatelError, Result};
use crate::oem4::commands::{build_log_command, build_unlog_command};
use crate::oem4::crc::crc32;
use crate::oem4::decoder::{decode, Decoded};
use crate::oem4::frame::FrameHeader;
use crate::oem4::protocol::{
    NavigationSample, ResponseStatus, CHECKSUM_SIZE, HEADER_SIZE, SYNC_BYTES,
};
use crate::serial::port_trait::SerialLink;
use crate::sink::{NavigationSink, ShutdownFlag, TimeAuthority};
use crate::telemetry::SampleLogger;

/// Samples between periodic status log lines (~10 s at the nominal 4 Hz)
const STATUS_LOG_INTERVAL_SAMPLES: u64 = 40;

/// Progress through the 3-byte sync pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    /// No sync bytes matched
    NoSync,
    /// Matched 0xAA
    Sync1,
    /// Matched 0xAA 0x44
    Sync2,
}

/// The receive worker
///
/// Owns the serial link exclusively and holds handles to its collaborators;
/// nothing here is reached through process-wide lookups. All decode work
/// runs synchronously on this worker.
pub struct GpsReceiver<L: SerialLink> {
    link: L,
    config: ReceiverConfig,
    nav: Arc<dyn NavigationSink>,
    time: Arc<dyn TimeAuthority>,
    logger: Option<SampleLogger>,
    shutdown: ShutdownFlag,
    sync: SyncState,
    last_data: Instant,
    samples_received: u64,
}

impl<L: SerialLink> GpsReceiver<L> {
    /// Build a worker around an already-open link
    ///
    /// # Arguments
    ///
    /// * `link` - Exclusively-owned byte stream to the receiver
    /// * `config` - Protocol and watchdog settings
    /// * `nav` - Destination for decoded navigation data
    /// * `time` - Destination for header GPS time
    /// * `logger` - Optional durable sample log
    /// * `shutdown` - Termination flag polled every loop iteration
    pub fn new(
        link: L,
        config: ReceiverConfig,
        nav: Arc<dyn NavigationSink>,
        time: Arc<dyn TimeAuthority>,
        logger: Option<SampleLogger>,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            link,
            config,
            nav,
            time,
            logger,
            shutdown,
            sync: SyncState::NoSync,
            last_data: Instant::now(),
            samples_received: 0,
        }
    }

    /// Run the receive loop until shutdown is requested
    ///
    /// Startup waits out the receiver's settle time and requests telemetry;
    /// shutdown stops it again. Every frame-level failure in between is
    /// absorbed: the loop resynchronizes and keeps going.
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Starting GPS receive loop (message id {}, period {}s)",
            self.config.telemetry_message_id, self.config.log_period_s
        );

        sleep(self.config.settle_delay()).await;
        self.send_log_command().await;
        self.last_data = Instant::now();

        while !self.shutdown.check_terminate() {
            self.check_watchdog().await;
            self.poll_stream().await;
        }

        info!(
            "GPS receive loop terminated after {} samples, unlogging telemetry",
            self.samples_received
        );
        self.send_unlog_command().await;

        Ok(())
    }

    /// Request periodic telemetry from the receiver
    async fn send_log_command(&mut self) {
        let command = build_log_command(
            self.config.telemetry_message_id,
            self.config.log_period_s,
            self.config.log_offset_s,
        );
        self.send_command(&command, "LOG").await;
    }

    /// Stop the telemetry the receiver is currently producing
    async fn send_unlog_command(&mut self) {
        let command = build_unlog_command(self.config.telemetry_message_id);
        self.send_command(&command, "UNLOG").await;
    }

    /// Fire-and-forget command write; failures are logged, never fatal
    async fn send_command(&mut self, command: &[u8], name: &str) {
        debug!("Sending {} command ({} bytes)", name, command.len());

        if let Err(e) = self.link.write_all(command).await {
            warn!("Failed to send {} command: {}", name, e);
            return;
        }
        if let Err(e) = self.link.flush().await {
            warn!("Failed to flush {} command: {}", name, e);
        }
    }

    /// Restart telemetry logging when the stream has gone stale
    ///
    /// Leaves sync progress untouched: staleness says nothing about where
    /// frame boundaries are.
    async fn check_watchdog(&mut self) {
        if self.last_data.elapsed() < self.config.stale_timeout() {
            return;
        }

        warn!("{}", NovatelError::StaleLink(self.config.stale_timeout()));
        self.last_data = Instant::now();
        self.send_unlog_command().await;
        sleep(self.config.restart_delay()).await;
        self.send_log_command().await;
    }

    /// Read one byte and advance the sync state machine
    async fn poll_stream(&mut self) {
        let mut byte = [0u8; 1];

        let n = match self
            .link
            .read_with_timeout(&mut byte, self.config.read_timeout())
            .await
        {
            Ok(n) => n,
            Err(e) => {
                warn!("Serial read failed: {}", e);
                // don't spin on a broken port
                sleep(self.config.read_timeout()).await;
                return;
            }
        };
        if n == 0 {
            return;
        }

        self.sync = match (self.sync, byte[0]) {
            (SyncState::NoSync, 0xAA) => SyncState::Sync1,
            (SyncState::Sync1, 0x44) => SyncState::Sync2,
            // another 0xAA may itself start the pattern
            (SyncState::Sync1, 0xAA) => SyncState::Sync1,
            (SyncState::Sync2, 0x12) => {
                if let Err(e) = self.receive_frame().await {
                    self.report_frame_error(&e);
                }
                SyncState::NoSync
            }
            _ => SyncState::NoSync,
        };
    }

    /// Assemble and process the frame whose sync pattern just matched
    ///
    /// # Errors
    ///
    /// All returned errors are recoverable; the caller logs them and the
    /// loop resynchronizes on the stream.
    async fn receive_frame(&mut self) -> Result<()> {
        let timeout = self.config.read_timeout();

        let mut header_bytes = [0u8; HEADER_SIZE];
        let n = self
            .link
            .read_exact_with_timeout(&mut header_bytes, timeout)
            .await?;
        if n < HEADER_SIZE {
            return Err(NovatelError::ShortRead {
                stage: "header",
                expected: HEADER_SIZE,
                got: n,
            });
        }

        let header = FrameHeader::parse(&header_bytes)?;

        let mut payload = vec![0u8; header.payload_length as usize];
        let n = self
            .link
            .read_exact_with_timeout(&mut payload, timeout)
            .await?;
        if n < payload.len() {
            return Err(NovatelError::ShortRead {
                stage: "payload",
                expected: payload.len(),
                got: n,
            });
        }

        let mut checksum_bytes = [0u8; CHECKSUM_SIZE];
        let n = self
            .link
            .read_exact_with_timeout(&mut checksum_bytes, timeout)
            .await?;
        if n < CHECKSUM_SIZE {
            return Err(NovatelError::ShortRead {
                stage: "checksum",
                expected: CHECKSUM_SIZE,
                got: n,
            });
        }

        let received = u32::from_le_bytes(checksum_bytes);
        let mut message = Vec::with_capacity(SYNC_BYTES.len() + HEADER_SIZE + payload.len());
        message.extend_from_slice(&SYNC_BYTES);
        message.extend_from_slice(&header_bytes);
        message.extend_from_slice(&payload);
        let computed = crc32(&message);

        if received != computed {
            return Err(NovatelError::ChecksumMismatch { received, computed });
        }

        self.last_data = Instant::now();
        // the header's time is good for any validated frame, responses included
        self.time.set_gps_time(header.gps_time());

        match decode(&header, &payload)? {
            Decoded::LogResponse(status) => self.handle_log_response(status),
            Decoded::Navigation(sample) => self.handle_sample(*sample),
            Decoded::ResponseDiscarded => {}
        }

        Ok(())
    }

    fn handle_log_response(&self, status: ResponseStatus) {
        match status {
            ResponseStatus::Ok => info!("GPS telemetry logging initialized"),
            ResponseStatus::InvalidChecksum => {
                warn!("GPS reports checksum failure for our command")
            }
            other => warn!("{}", NovatelError::ReceiverErrorResponse(other)),
        }
    }

    fn handle_sample(&mut self, sample: NavigationSample) {
        self.samples_received += 1;
        self.nav.publish(&sample);

        if let Some(logger) = &mut self.logger {
            if let Err(e) = logger.persist(&sample) {
                warn!("Failed to persist navigation sample: {}", e);
            }
        }

        if self.samples_received % STATUS_LOG_INTERVAL_SAMPLES == 0 {
            info!(
                "Received {} samples ({} satellites in last solution)",
                self.samples_received, sample.satellites
            );
        }
    }

    fn report_frame_error(&self, error: &NovatelError) {
        match error {
            NovatelError::ShortRead { .. } => warn!("{}; resynchronizing", error),
            NovatelError::ChecksumMismatch { .. } => warn!("{}; discarding frame", error),
            NovatelError::UnexpectedMessageId(_) => warn!("{}", error),
            other => warn!("Frame discarded: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oem4::frame::encode_header;
    use crate::oem4::protocol::{MSG_BESTXYZ, MSG_LOG, PVT_PAYLOAD_SIZE};
    use crate::serial::port_trait::mocks::MockSerialLink;
    use crate::sink::SharedNavState;
    use bytes::BufMut;
    use tokio_test::assert_ok;
    use std::time::Duration;

    fn test_config() -> ReceiverConfig {
        ReceiverConfig {
            telemetry_message_id: MSG_BESTXYZ,
            log_period_s: 0.25,
            log_offset_s: 0.0,
            read_timeout_ms: 2,
            stale_timeout_ms: 200,
            restart_delay_ms: 1,
            settle_delay_ms: 0,
        }
    }

    /// Payload with the given ECEF position and everything else zeroed
    fn pvt_payload(position: [f64; 3]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(PVT_PAYLOAD_SIZE);
        payload.put_u32_le(0);
        payload.put_u32_le(16);
        for value in position {
            payload.put_f64_le(value);
        }
        payload.put_bytes(0, 12);
        payload.put_u32_le(0);
        payload.put_u32_le(8);
        payload.put_bytes(0, 24 + 12 + 16);
        payload.put_u8(7);
        payload
    }

    /// Complete wire frame: header, payload, valid checksum
    fn build_frame(message_id: u16, payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&encode_header(message_id, payload.len() as u16));
        frame.extend_from_slice(payload);
        let crc = crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    struct Harness {
        link: MockSerialLink,
        state: Arc<SharedNavState>,
        shutdown: ShutdownFlag,
        worker: tokio::task::JoinHandle<Result<()>>,
    }

    fn spawn_receiver(config: ReceiverConfig) -> Harness {
        let link = MockSerialLink::new();
        let state = SharedNavState::new();
        let shutdown = ShutdownFlag::new();

        let nav: Arc<dyn NavigationSink> = state.clone();
        let time: Arc<dyn TimeAuthority> = state.clone();
        let receiver = GpsReceiver::new(
            link.clone(),
            config,
            nav,
            time,
            None,
            shutdown.clone(),
        );
        let worker = tokio::spawn(receiver.run());

        Harness {
            link,
            state,
            shutdown,
            worker,
        }
    }

    async fn await_update(harness: &Harness) {
        let mut updates = harness.state.subscribe();
        tokio::time::timeout(Duration::from_secs(2), updates.changed())
            .await
            .expect("no sample published")
            .unwrap();
    }

    async fn stop(harness: Harness) -> Vec<Vec<u8>> {
        harness.shutdown.request_shutdown();
        let result = harness.worker.await.unwrap();
        assert_ok!(result);
        harness.link.get_written_data()
    }

    #[tokio::test]
    async fn test_end_to_end_valid_frame_publishes_sample() {
        let harness = spawn_receiver(test_config());
        harness
            .link
            .feed(&build_frame(MSG_BESTXYZ, &pvt_payload([6_378_137.0, 0.0, 0.0])));

        await_update(&harness).await;

        let snapshot = harness.state.snapshot();
        let llh = snapshot.llh_position.expect("no position published");
        assert!(llh[0].abs() < 1e-9, "latitude {}", llh[0]);
        assert!(llh[1].abs() < 1e-9, "longitude {}", llh[1]);
        assert!(llh[2].abs() < 1e-6, "height {}", llh[2]);
        assert_eq!(snapshot.num_sats, Some(7));
        assert!(snapshot.gps_time.is_some());

        let written = stop(harness).await;
        assert_eq!(written[0], build_log_command(MSG_BESTXYZ, 0.25, 0.0));
    }

    #[tokio::test]
    async fn test_corrupted_checksum_publishes_nothing() {
        let harness = spawn_receiver(test_config());

        let mut frame = build_frame(MSG_BESTXYZ, &pvt_payload([6_378_137.0, 0.0, 0.0]));
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        harness.link.feed(&frame);

        tokio::time::sleep(Duration::from_millis(50)).await;

        let snapshot = harness.state.snapshot();
        assert!(snapshot.llh_position.is_none());
        // gps time is only pushed for frames that validate
        assert!(snapshot.gps_time.is_none());

        stop(harness).await;
    }

    #[tokio::test]
    async fn test_resynchronizes_past_garbage() {
        let harness = spawn_receiver(test_config());

        let mut stream = vec![0x00, 0xAA, 0x55, 0xAA, 0xAA, 0x44, 0x99];
        stream.extend_from_slice(&build_frame(MSG_BESTXYZ, &pvt_payload([6_378_137.0, 0.0, 0.0])));
        harness.link.feed(&stream);

        await_update(&harness).await;

        assert!(harness.state.snapshot().llh_position.is_some());
        stop(harness).await;
    }

    #[tokio::test]
    async fn test_log_response_publishes_no_sample() {
        let harness = spawn_receiver(test_config());

        let mut payload = Vec::new();
        payload.put_u32_le(1); // OK
        payload.extend_from_slice(b"OK");
        let mut frame = build_frame(MSG_LOG, &payload);
        frame[6] |= 0x80; // response bit
        // reseal: flipping the type byte invalidated the checksum
        let body_len = frame.len() - CHECKSUM_SIZE;
        let crc = crc32(&frame[..body_len]);
        frame.truncate(body_len);
        frame.extend_from_slice(&crc.to_le_bytes());
        harness.link.feed(&frame);

        // the header still carries usable gps time
        let deadline = Instant::now() + Duration::from_secs(2);
        while harness.state.snapshot().gps_time.is_none() {
            assert!(Instant::now() < deadline, "gps time never published");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(harness.state.snapshot().llh_position.is_none());
        stop(harness).await;
    }

    #[tokio::test]
    async fn test_watchdog_reissues_commands_on_silent_link() {
        let mut config = test_config();
        config.stale_timeout_ms = 40;
        let harness = spawn_receiver(config);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let written = stop(harness).await;

        let log = build_log_command(MSG_BESTXYZ, 0.25, 0.0);
        let unlog = build_unlog_command(MSG_BESTXYZ);

        // startup LOG, then at least one UNLOG/LOG watchdog cycle, then the
        // shutdown UNLOG
        assert!(written.len() >= 4, "only {} writes", written.len());
        assert_eq!(written[0], log);
        assert_eq!(written[1], unlog);
        assert_eq!(written[2], log);
        assert_eq!(*written.last().unwrap(), unlog);
    }

    #[tokio::test]
    async fn test_watchdog_resets_staleness_clock() {
        let mut config = test_config();
        config.stale_timeout_ms = 50;
        let harness = spawn_receiver(config);

        // long enough for ~3 cycles, nowhere near enough for one per
        // iteration if the clock failed to reset
        tokio::time::sleep(Duration::from_millis(170)).await;
        let written = stop(harness).await;

        let cycles = written
            .iter()
            .filter(|w| **w == build_unlog_command(MSG_BESTXYZ))
            .count();
        // final shutdown UNLOG included
        assert!((2..=6).contains(&cycles), "{} unlog writes", cycles);
    }

    #[tokio::test]
    async fn test_shutdown_sends_unlog() {
        let harness = spawn_receiver(test_config());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let written = stop(harness).await;
        assert_eq!(
            *written.last().unwrap(),
            build_unlog_command(MSG_BESTXYZ)
        );
    }

    #[tokio::test]
    async fn test_truncated_frame_is_absorbed() {
        let harness = spawn_receiver(test_config());

        // sync plus half a header, then silence
        harness.link.feed(&[0xAA, 0x44, 0x12, 0x1C, 0xF1, 0x00]);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // loop is still alive and processes a later valid frame
        harness
            .link
            .feed(&build_frame(MSG_BESTXYZ, &pvt_payload([6_378_137.0, 0.0, 0.0])));
        await_update(&harness).await;

        stop(harness).await;
    }

    #[tokio::test]
    async fn test_persists_samples_when_logger_attached() {
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let logger = SampleLogger::create(dir.path(), 100, 2).unwrap();

        let link = MockSerialLink::new();
        let state = SharedNavState::new();
        let shutdown = ShutdownFlag::new();
        let nav: Arc<dyn NavigationSink> = state.clone();
        let time: Arc<dyn TimeAuthority> = state.clone();
        let receiver = GpsReceiver::new(
            link.clone(),
            test_config(),
            nav,
            time,
            Some(logger),
            shutdown.clone(),
        );
        let worker = tokio::spawn(receiver.run());

        link.feed(&build_frame(MSG_BESTXYZ, &pvt_payload([6_378_137.0, 0.0, 0.0])));

        let mut updates = state.subscribe();
        tokio::time::timeout(Duration::from_secs(2), updates.changed())
            .await
            .expect("no sample published")
            .unwrap();

        shutdown.request_shutdown();
        worker.await.unwrap().unwrap();

        let mut contents = String::new();
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            contents.push_str(&std::fs::read_to_string(entry.unwrap().path()).unwrap());
        }
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("\"satellites\":7"));
    }
}
