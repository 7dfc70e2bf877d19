//! Background row transfer toward a device-style endpoint

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use static_assertions::assert_impl_all;
use tracing::{debug, info, warn};

use rowpipe_core::{DatasetDescription, Epochs, Error, ExecutionTree, Pull, Result, Row};

use crate::consumer::{Consumer, ConsumerCore, LifecycleState};

/// How long a suspended sender sleeps between resume checks
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long the sender waits before re-offering a handed-back packet
const RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// One unit of transfer handed to a [`DeviceChannel`]
#[derive(Debug, Clone, PartialEq)]
pub enum DevicePacket {
    /// A data row
    Row(Row),

    /// An epoch boundary signal
    EpochEnd,

    /// The stream is complete; nothing follows
    End,
}

/// Endpoint the sender loop pushes packets into
///
/// `try_send` must not block. A saturated target hands the packet back
/// and the sender re-offers it later, so a slow device throttles the
/// whole transfer while the loop stays responsive between attempts.
pub trait DeviceChannel: Send {
    /// Offer one packet to the device
    ///
    /// Returns `Ok(None)` when the packet was accepted and
    /// `Ok(Some(packet))` when the target is full and the same packet
    /// must be offered again.
    fn try_send(&mut self, packet: DevicePacket) -> Result<Option<DevicePacket>>;
}

/// Sending half of an in-process loopback endpoint
///
/// Backed by a bounded queue; the capacity chosen at creation is the
/// back-pressure window of the transfer.
pub struct HostQueueChannel {
    sender: Sender<DevicePacket>,
}

impl DeviceChannel for HostQueueChannel {
    fn try_send(&mut self, packet: DevicePacket) -> Result<Option<DevicePacket>> {
        match self.sender.try_send(packet) {
            Ok(()) => Ok(None),
            Err(TrySendError::Full(packet)) => Ok(Some(packet)),
            Err(TrySendError::Disconnected(_)) => Err(Error::pipeline(
                "device_stream",
                "try_send",
                "host queue receiver dropped",
            )),
        }
    }
}

/// Receiving half of an in-process loopback endpoint
pub struct HostQueueReceiver {
    receiver: Receiver<DevicePacket>,
}

impl HostQueueReceiver {
    /// Block until the next packet arrives
    pub fn recv(&self) -> Result<DevicePacket> {
        self.receiver.recv().map_err(|_| {
            Error::pipeline("device_stream", "recv", "sender side closed")
        })
    }

    /// Block up to `timeout` for the next packet; `None` on timeout
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<DevicePacket>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(packet) => Ok(Some(packet)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::pipeline(
                "device_stream",
                "recv_timeout",
                "sender side closed",
            )),
        }
    }

    /// Packets currently queued
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether the queue is currently empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Create a loopback endpoint pair with room for `capacity` packets
pub fn host_queue_channel(capacity: usize) -> (HostQueueChannel, HostQueueReceiver) {
    let (sender, receiver) = channel::bounded(capacity);
    (HostQueueChannel { sender }, HostQueueReceiver { receiver })
}

/// Configuration for [`DeviceStreamConsumer`]
#[derive(Debug, Clone)]
pub struct DeviceStreamOptions {
    /// Diagnostic name of the transfer target
    pub device_type: String,

    /// Whether epoch boundaries are forwarded down the channel
    pub send_epoch_end: bool,

    /// Epoch budget for the transfer
    pub epochs: Epochs,
}

impl DeviceStreamOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the diagnostic name of the transfer target
    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    /// Set whether epoch boundaries are forwarded down the channel
    ///
    /// When disabled the receiver sees rows only and infers epochs from
    /// the row count it was configured with.
    pub fn with_send_epoch_end(mut self, send_epoch_end: bool) -> Self {
        self.send_epoch_end = send_epoch_end;
        self
    }

    /// Set the epoch budget for the transfer
    pub fn with_epochs(mut self, epochs: Epochs) -> Self {
        self.epochs = epochs;
        self
    }
}

impl Default for DeviceStreamOptions {
    fn default() -> Self {
        Self {
            device_type: "host".to_string(),
            send_epoch_end: true,
            epochs: Epochs::Unbounded,
        }
    }
}

/// Observable position of a transfer in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// `send()` has not run yet
    Idle,

    /// The sender loop is moving rows
    Sending,

    /// Suspended by `stop()`; `continue_()` resumes
    Stopped,

    /// The transfer is over, normally or not
    Terminated,
}

/// Flags and counters shared with the sender thread
#[derive(Clone, Default)]
struct TransferShared {
    /// Sender holds between rows while set
    paused: Arc<AtomicBool>,

    /// Sender exits at its next check while set
    cancelled: Arc<AtomicBool>,

    /// Set once the sender loop has exited
    finished: Arc<AtomicBool>,

    /// Rows handed to the channel so far
    rows_sent: Arc<AtomicU64>,

    /// First failure the sender hit, surfaced at shutdown
    failure: Arc<Mutex<Option<Error>>>,
}

impl TransferShared {
    fn store_failure(&self, error: Error) {
        let mut slot = match self.failure.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Only the first failure is kept; it is the one that ended the
        // transfer.
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    fn take_failure(&self) -> Option<Error> {
        let mut slot = match self.failure.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.take()
    }
}

/// Streams rows into a [`DeviceChannel`] from a dedicated sender thread
///
/// `send()` starts the transfer and returns immediately; `stop()` and
/// `continue_()` suspend and resume it with whole-row granularity. The
/// channel's own capacity provides back-pressure against the tree.
pub struct DeviceStreamConsumer {
    /// Shared lifecycle and tree ownership
    core: ConsumerCore,

    /// Transfer configuration
    options: DeviceStreamOptions,

    /// Endpoint installed at construction, consumed by `send()`
    channel: Option<Box<dyn DeviceChannel>>,

    /// Sender thread handle while the transfer is live
    worker: Option<JoinHandle<()>>,

    /// State shared with the sender thread
    shared: TransferShared,

    /// Whether `send()` has ever run
    started: bool,
}

impl DeviceStreamConsumer {
    /// Create a consumer that will stream into `channel`
    pub fn new(channel: Box<dyn DeviceChannel>, options: DeviceStreamOptions) -> Self {
        Self {
            core: ConsumerCore::new("device_stream"),
            options,
            channel: Some(channel),
            worker: None,
            shared: TransferShared::default(),
            started: false,
        }
    }

    /// Start the background transfer
    ///
    /// Idempotent while the transfer is running; a second call is a
    /// no-op. A transfer that already ended cannot be restarted.
    pub fn send(&mut self) -> Result<()> {
        if self.phase() == TransferPhase::Terminated {
            return Err(Error::InvalidOperation(
                "device transfer already ran; it cannot be restarted".to_string(),
            ));
        }
        if self.worker.is_some() {
            debug!(consumer = self.core.name(), "transfer already running");
            return Ok(());
        }

        let tree = self.core.take_tree()?;
        let channel = match self.channel.take() {
            Some(channel) => channel,
            None => {
                return Err(Error::InvalidOperation(
                    "device channel already consumed".to_string(),
                ))
            }
        };
        let shared = self.shared.clone();
        let send_epoch_end = self.options.send_epoch_end;

        info!(
            consumer = self.core.name(),
            device_type = %self.options.device_type,
            send_epoch_end,
            "starting device transfer"
        );

        let handle = thread::Builder::new()
            .name("rowpipe-device-send".to_string())
            .spawn(move || run_transfer(tree, channel, shared, send_epoch_end))?;

        self.worker = Some(handle);
        self.started = true;
        Ok(())
    }

    /// Suspend the transfer after the row currently in flight
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_started("stop")?;
        self.shared.paused.store(true, Ordering::SeqCst);
        debug!(consumer = self.core.name(), "transfer suspended");
        Ok(())
    }

    /// Resume a suspended transfer from the next untransmitted row
    pub fn continue_(&mut self) -> Result<()> {
        self.ensure_started("continue_")?;
        self.shared.paused.store(false, Ordering::SeqCst);
        debug!(consumer = self.core.name(), "transfer resumed");
        Ok(())
    }

    /// Current phase of the transfer
    pub fn phase(&self) -> TransferPhase {
        if !self.started {
            return TransferPhase::Idle;
        }
        let over = self.worker.is_none()
            || self.shared.finished.load(Ordering::SeqCst)
            || self.shared.cancelled.load(Ordering::SeqCst);
        if over {
            TransferPhase::Terminated
        } else if self.shared.paused.load(Ordering::SeqCst) {
            TransferPhase::Stopped
        } else {
            TransferPhase::Sending
        }
    }

    /// Rows handed to the channel so far
    pub fn rows_sent(&self) -> u64 {
        self.shared.rows_sent.load(Ordering::SeqCst)
    }

    fn ensure_started(&self, operation: &str) -> Result<()> {
        if self.started {
            Ok(())
        } else {
            Err(Error::NotStarted(format!(
                "device transfer has not been started; call send() before {operation}()"
            )))
        }
    }

    /// Cancel the sender, join it, and surface any stored failure
    fn terminate(&mut self) -> Result<()> {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        self.shared.paused.store(false, Ordering::SeqCst);

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!(consumer = self.core.name(), "sender thread panicked");
            }
        }

        self.core.shutdown()?;

        match self.shared.take_failure() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Consumer for DeviceStreamConsumer {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn initialize(&mut self, description: DatasetDescription) -> Result<()> {
        self.core.bind(description, self.options.epochs)
    }

    fn shutdown(&mut self) -> Result<()> {
        self.terminate()
    }

    fn state(&self) -> LifecycleState {
        self.core.state()
    }
}

impl Drop for DeviceStreamConsumer {
    fn drop(&mut self) {
        if let Err(error) = self.terminate() {
            warn!(consumer = self.core.name(), %error, "device stream teardown failed");
        }
    }
}

assert_impl_all!(DeviceStreamConsumer: Send);

/// Sender loop body; owns the tree and the channel for its lifetime
fn run_transfer(
    mut tree: Box<dyn ExecutionTree>,
    mut channel: Box<dyn DeviceChannel>,
    shared: TransferShared,
    send_epoch_end: bool,
) {
    loop {
        while shared.paused.load(Ordering::SeqCst) {
            if shared.cancelled.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(PAUSE_POLL_INTERVAL);
        }
        if shared.cancelled.load(Ordering::SeqCst) {
            break;
        }

        match tree.pull() {
            Ok(Pull::Row(row)) => {
                if !push_packet(channel.as_mut(), &shared, DevicePacket::Row(row)) {
                    break;
                }
                shared.rows_sent.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Pull::EpochEnd) => {
                if send_epoch_end
                    && !push_packet(channel.as_mut(), &shared, DevicePacket::EpochEnd)
                {
                    break;
                }
            }
            Ok(Pull::EndOfData) => {
                push_packet(channel.as_mut(), &shared, DevicePacket::End);
                debug!(rows = shared.rows_sent.load(Ordering::SeqCst), "transfer complete");
                break;
            }
            Err(error) => {
                warn!(%error, "device transfer failed");
                shared.store_failure(Error::pipeline(
                    "device_stream",
                    "send",
                    error.to_string(),
                ));
                break;
            }
        }
    }

    if let Err(error) = tree.stop() {
        warn!(%error, "execution tree teardown failed");
    }
    shared.finished.store(true, Ordering::SeqCst);
}

/// Offer one packet until accepted; `false` when the transfer must end
fn push_packet(
    channel: &mut dyn DeviceChannel,
    shared: &TransferShared,
    packet: DevicePacket,
) -> bool {
    let mut pending = packet;
    loop {
        if shared.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        match channel.try_send(pending) {
            Ok(None) => return true,
            Ok(Some(returned)) => {
                pending = returned;
                thread::sleep(RETRY_INTERVAL);
            }
            Err(error) => {
                shared.store_failure(error);
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowpipe_core::{
        ColumnSpec, DataType, RowSchema, RowSource, Tensor, TensorShape, VecSource,
    };
    use std::io;

    fn init_logs() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn scalar_description(values: &[i32]) -> DatasetDescription {
        let schema = Arc::new(RowSchema::new(vec![ColumnSpec::new(
            "data",
            DataType::Int32,
            TensorShape::scalar(),
        )]));
        let rows = values
            .iter()
            .map(|&v| Row::new(schema.clone(), vec![Tensor::scalar(v)]).unwrap())
            .collect();
        DatasetDescription::new().with_source(Box::new(VecSource::new(schema, rows).unwrap()))
    }

    fn packet_value(packet: &DevicePacket) -> i32 {
        match packet {
            DevicePacket::Row(row) => row.column(0).to_vec::<i32>().unwrap()[0],
            other => panic!("expected a row packet, got {other:?}"),
        }
    }

    /// Yields `rows_before_failure` rows and then a hard error
    struct FailingSource {
        schema: Arc<RowSchema>,
        produced: usize,
        rows_before_failure: usize,
    }

    impl FailingSource {
        fn new(rows_before_failure: usize) -> Self {
            Self {
                schema: Arc::new(RowSchema::new(vec![ColumnSpec::new(
                    "data",
                    DataType::Int32,
                    TensorShape::scalar(),
                )])),
                produced: 0,
                rows_before_failure,
            }
        }
    }

    impl RowSource for FailingSource {
        fn schema(&self) -> Arc<RowSchema> {
            self.schema.clone()
        }

        fn next_row(&mut self) -> Result<Option<Row>> {
            if self.produced == self.rows_before_failure {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "simulated source fault",
                )));
            }
            self.produced += 1;
            let value = self.produced as i32;
            Ok(Some(
                Row::new(self.schema.clone(), vec![Tensor::scalar(value)]).unwrap(),
            ))
        }

        fn reset(&mut self) -> Result<()> {
            self.produced = 0;
            Ok(())
        }
    }

    fn streaming_consumer(
        values: &[i32],
        capacity: usize,
        options: DeviceStreamOptions,
    ) -> (DeviceStreamConsumer, HostQueueReceiver) {
        let (channel, receiver) = host_queue_channel(capacity);
        let mut consumer = DeviceStreamConsumer::new(Box::new(channel), options);
        consumer.initialize(scalar_description(values)).unwrap();
        (consumer, receiver)
    }

    #[test]
    fn test_streams_rows_and_epoch_markers() {
        init_logs();
        let options = DeviceStreamOptions::new().with_epochs(Epochs::Finite(2));
        let (mut consumer, receiver) = streaming_consumer(&[1, 2, 3], 2, options);

        consumer.send().unwrap();

        let mut trace = Vec::new();
        loop {
            match receiver.recv().unwrap() {
                DevicePacket::Row(row) => {
                    trace.push(row.column(0).to_vec::<i32>().unwrap()[0].to_string());
                }
                DevicePacket::EpochEnd => trace.push("epoch".into()),
                DevicePacket::End => {
                    trace.push("end".into());
                    break;
                }
            }
        }

        assert_eq!(
            trace,
            vec!["1", "2", "3", "epoch", "1", "2", "3", "epoch", "end"]
        );
        assert_eq!(consumer.rows_sent(), 6);
        consumer.shutdown().unwrap();
        assert_eq!(consumer.phase(), TransferPhase::Terminated);
    }

    #[test]
    fn test_send_is_idempotent_while_running() {
        let options = DeviceStreamOptions::new().with_epochs(Epochs::Finite(1));
        let (mut consumer, receiver) = streaming_consumer(&[1, 2, 3, 4], 1, options);

        consumer.send().unwrap();
        // A second call must not spawn a second sender or duplicate rows.
        consumer.send().unwrap();

        let mut values = Vec::new();
        loop {
            match receiver.recv().unwrap() {
                DevicePacket::Row(row) => {
                    values.push(row.column(0).to_vec::<i32>().unwrap()[0]);
                }
                DevicePacket::EpochEnd => {}
                DevicePacket::End => break,
            }
        }

        assert_eq!(values, vec![1, 2, 3, 4]);
        consumer.shutdown().unwrap();
    }

    #[test]
    fn test_stop_and_continue_require_send_first() {
        let options = DeviceStreamOptions::new().with_epochs(Epochs::Finite(1));
        let (mut consumer, _receiver) = streaming_consumer(&[1], 1, options);

        assert!(matches!(consumer.continue_(), Err(Error::NotStarted(_))));
        assert!(matches!(consumer.stop(), Err(Error::NotStarted(_))));
        assert_eq!(consumer.phase(), TransferPhase::Idle);
    }

    #[test]
    fn test_stop_suspends_and_continue_resumes_without_loss() {
        init_logs();
        let values: Vec<i32> = (1..=50).collect();
        let options = DeviceStreamOptions::new()
            .with_epochs(Epochs::Finite(1))
            .with_send_epoch_end(false);
        let (mut consumer, receiver) = streaming_consumer(&values, 1, options);

        consumer.send().unwrap();

        let mut received = Vec::new();
        for _ in 0..5 {
            received.push(packet_value(&receiver.recv().unwrap()));
        }

        consumer.stop().unwrap();
        assert_eq!(consumer.phase(), TransferPhase::Stopped);

        // Drain whatever was already in flight when the suspension hit.
        while let Some(packet) = receiver.recv_timeout(Duration::from_millis(300)).unwrap() {
            received.push(packet_value(&packet));
        }
        let during_pause = received.len();
        assert!(during_pause < values.len());

        // The queue must stay silent while suspended.
        assert!(receiver
            .recv_timeout(Duration::from_millis(300))
            .unwrap()
            .is_none());

        consumer.continue_().unwrap();
        loop {
            match receiver.recv().unwrap() {
                DevicePacket::Row(row) => {
                    received.push(row.column(0).to_vec::<i32>().unwrap()[0]);
                }
                DevicePacket::EpochEnd => {}
                DevicePacket::End => break,
            }
        }

        // Every row exactly once, in order.
        assert_eq!(received, values);
        consumer.shutdown().unwrap();
    }

    #[test]
    fn test_epoch_markers_suppressed_when_disabled() {
        let options = DeviceStreamOptions::new()
            .with_epochs(Epochs::Finite(2))
            .with_send_epoch_end(false);
        let (mut consumer, receiver) = streaming_consumer(&[1, 2], 4, options);

        consumer.send().unwrap();

        let mut packets = Vec::new();
        loop {
            let packet = receiver.recv().unwrap();
            let done = packet == DevicePacket::End;
            packets.push(packet);
            if done {
                break;
            }
        }

        assert_eq!(packets.len(), 5);
        assert!(packets.iter().all(|p| *p != DevicePacket::EpochEnd));
        consumer.shutdown().unwrap();
    }

    #[test]
    fn test_unbounded_transfer_is_cancelled_by_shutdown() {
        let options = DeviceStreamOptions::new().with_epochs(Epochs::Unbounded);
        let (mut consumer, receiver) = streaming_consumer(&[1, 2, 3], 4, options);

        consumer.send().unwrap();

        // Two full passes with their boundary markers; the stream keeps
        // going until shutdown cancels it.
        let mut rows = 0;
        let mut markers = 0;
        for _ in 0..8 {
            match receiver.recv().unwrap() {
                DevicePacket::Row(_) => rows += 1,
                DevicePacket::EpochEnd => markers += 1,
                DevicePacket::End => panic!("unbounded transfer ended on its own"),
            }
        }
        assert_eq!(rows, 6);
        assert_eq!(markers, 2);

        consumer.shutdown().unwrap();
        assert_eq!(consumer.phase(), TransferPhase::Terminated);
        assert_eq!(consumer.state(), LifecycleState::Terminated);
    }

    #[test]
    fn test_shutdown_with_saturated_channel_does_not_hang() {
        let options = DeviceStreamOptions::new().with_epochs(Epochs::Unbounded);
        let (mut consumer, receiver) = streaming_consumer(&[1, 2, 3], 1, options);

        consumer.send().unwrap();
        // Let the sender fill the queue and park in its retry loop.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(receiver.len(), 1);

        consumer.shutdown().unwrap();
        assert_eq!(consumer.phase(), TransferPhase::Terminated);
    }

    #[test]
    fn test_send_after_shutdown_fails() {
        let options = DeviceStreamOptions::new().with_epochs(Epochs::Finite(1));
        let (mut consumer, _receiver) = streaming_consumer(&[1], 4, options);

        consumer.send().unwrap();
        consumer.shutdown().unwrap();

        assert!(matches!(
            consumer.send(),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_send_after_transfer_finishes_fails() {
        let options = DeviceStreamOptions::new().with_epochs(Epochs::Finite(1));
        let (mut consumer, receiver) = streaming_consumer(&[1, 2], 4, options);

        consumer.send().unwrap();
        loop {
            if receiver.recv().unwrap() == DevicePacket::End {
                break;
            }
        }

        // The sender exits shortly after the End packet goes out.
        for _ in 0..200 {
            if consumer.phase() == TransferPhase::Terminated {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(consumer.phase(), TransferPhase::Terminated);

        // The handle is still unjoined; send() must refuse all the same.
        assert!(matches!(
            consumer.send(),
            Err(Error::InvalidOperation(_))
        ));
        assert_eq!(consumer.rows_sent(), 2);
        consumer.shutdown().unwrap();
    }

    #[test]
    fn test_source_failure_surfaces_at_shutdown() {
        init_logs();
        let description =
            DatasetDescription::new().with_source(Box::new(FailingSource::new(2)));

        let (channel, receiver) = host_queue_channel(8);
        let options = DeviceStreamOptions::new().with_epochs(Epochs::Finite(1));
        let mut consumer = DeviceStreamConsumer::new(Box::new(channel), options);
        consumer.initialize(description).unwrap();
        consumer.send().unwrap();

        // Both produced rows arrive, then the stream goes quiet with no
        // End packet.
        assert!(matches!(receiver.recv().unwrap(), DevicePacket::Row(_)));
        assert!(matches!(receiver.recv().unwrap(), DevicePacket::Row(_)));
        assert!(receiver
            .recv_timeout(Duration::from_millis(300))
            .unwrap()
            .is_none());

        let result = consumer.shutdown();
        assert!(matches!(result, Err(Error::Pipeline { .. })));
        assert_eq!(consumer.rows_sent(), 2);
    }

    #[test]
    fn test_rows_sent_tracks_progress() {
        let options = DeviceStreamOptions::new().with_epochs(Epochs::Finite(3));
        let (mut consumer, receiver) = streaming_consumer(&[1, 2], 16, options);

        assert_eq!(consumer.rows_sent(), 0);
        consumer.send().unwrap();

        loop {
            if receiver.recv().unwrap() == DevicePacket::End {
                break;
            }
        }
        assert_eq!(consumer.rows_sent(), 6);
        consumer.shutdown().unwrap();
    }
}
