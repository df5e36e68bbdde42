//! Per-device UDP link.
//!
//! Each link runs two tasks:
//! - a receive loop that owns the socket, frames datagrams and queues the
//!   accepted sentences, reconnecting with backoff after any failure
//! - a service loop that drains the queue at a fixed interval and checks
//!   the heartbeat timeout
//!
//! Status is written under a mutex so notifications stay ordered and
//! deduplicated; reads go through an atomic mirror.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use fpu_core::{Backoff, DeviceSettings, DeviceStatus, Sentence};
use fpu_protocol::decode_datagram;

use crate::error::LinkError;
use crate::events::DriverEvent;

/// Upper bound on sentences forwarded per service tick.
pub const MAX_SENTENCES_PER_TICK: usize = 200;

/// Smallest datagram buffer a link will allocate.
const MIN_RECEIVE_BUFFER: usize = 512;

/// How long `stop` waits to publish the final `Disconnected` status.
const STOP_NOTIFY_TIMEOUT: Duration = Duration::from_secs(1);

struct LinkState {
    status: DeviceStatus,
    last_receive: Instant,
}

struct LinkInner {
    settings: DeviceSettings,
    status: AtomicU8,
    state: Mutex<LinkState>,
    events: mpsc::Sender<DriverEvent>,
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// A single FPU's UDP endpoint.
pub struct DeviceLink {
    inner: Arc<LinkInner>,
    running: Mutex<Option<Running>>,
}

impl DeviceLink {
    /// Create a stopped link that reports to `events`.
    pub fn new(settings: DeviceSettings, events: mpsc::Sender<DriverEvent>) -> Self {
        Self {
            inner: Arc::new(LinkInner {
                settings,
                status: AtomicU8::new(DeviceStatus::Disconnected.as_u8()),
                state: Mutex::new(LinkState {
                    status: DeviceStatus::Disconnected,
                    last_receive: Instant::now(),
                }),
                events,
            }),
            running: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.settings.name
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.inner.settings
    }

    /// Latest status. May lag a concurrent transition.
    pub fn status(&self) -> DeviceStatus {
        self.inner.status()
    }

    /// Spawn the receive and service loops. A running link is left alone.
    pub async fn start(&self, cancel: CancellationToken) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!(device = %self.name(), "link already running");
            return;
        }

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let receive = tokio::spawn(self.inner.clone().receive_loop(queue_tx, cancel.clone()));
        let service = tokio::spawn(self.inner.clone().service_loop(queue_rx, cancel.clone()));

        info!(device = %self.name(), port = self.inner.settings.port, "link started");
        *running = Some(Running {
            cancel,
            tasks: vec![receive, service],
        });
    }

    /// Cancel both loops, wait for them, then report `Disconnected`.
    ///
    /// Stopping a stopped link is a no-op.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        running.cancel.cancel();
        for task in running.tasks {
            if let Err(e) = task.await {
                warn!(device = %self.name(), "link task ended abnormally: {}", e);
            }
        }

        if tokio::time::timeout(
            STOP_NOTIFY_TIMEOUT,
            self.inner.set_status(DeviceStatus::Disconnected),
        )
        .await
        .is_err()
        {
            debug!(device = %self.name(), "final status notification timed out");
        }
        info!(device = %self.name(), "link stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

impl LinkInner {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn status(&self) -> DeviceStatus {
        DeviceStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Record a new status and notify, unless it is unchanged.
    async fn set_status(&self, status: DeviceStatus) {
        let mut state = self.state.lock().await;
        self.transition(&mut state, status).await;
    }

    async fn transition(&self, state: &mut LinkState, status: DeviceStatus) {
        if state.status == status {
            return;
        }
        state.status = status;
        self.status.store(status.as_u8(), Ordering::Release);
        debug!(device = %self.name(), %status, "status changed");

        // Sent under the state lock so subscribers see transitions in order.
        let event = DriverEvent::StatusChanged {
            device: self.name().to_string(),
            status,
        };
        if self.events.send(event).await.is_err() {
            trace!(device = %self.name(), "no event subscriber");
        }
    }

    /// Restart the silence clock without touching status.
    async fn touch(&self) {
        self.state.lock().await.last_receive = Instant::now();
    }

    /// A datagram produced sentences: heartbeat, refresh, force Connected.
    async fn mark_alive(&self) {
        let heartbeat = DriverEvent::Heartbeat {
            device: self.name().to_string(),
        };
        if self.events.try_send(heartbeat).is_err() {
            trace!(device = %self.name(), "heartbeat dropped, event channel full or closed");
        }
        let mut state = self.state.lock().await;
        state.last_receive = Instant::now();
        self.transition(&mut state, DeviceStatus::Connected).await;
    }

    /// Drop to Disconnected once a connected device has been silent too long.
    async fn check_heartbeat(&self) {
        let mut state = self.state.lock().await;
        if state.status != DeviceStatus::Connected {
            return;
        }
        let silence = state.last_receive.elapsed();
        if silence > self.settings.heartbeat_timeout {
            info!(
                device = %self.name(),
                silence_ms = silence.as_millis() as u64,
                "heartbeat timeout"
            );
            self.transition(&mut state, DeviceStatus::Disconnected).await;
        }
    }

    async fn receive_loop(
        self: Arc<Self>,
        queue: mpsc::UnboundedSender<Sentence>,
        cancel: CancellationToken,
    ) {
        let mut backoff = Backoff::new(&self.settings.reconnect);

        while !cancel.is_cancelled() {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.run_session(&queue, &mut backoff) => outcome,
            };
            if let Err(e) = outcome {
                warn!(device = %self.name(), "link faulted: {}", e);
                self.set_status(DeviceStatus::Faulted).await;
            }

            self.set_status(DeviceStatus::Disconnected).await;
            let fraction: f64 = rand::thread_rng().gen();
            let wait = backoff.advance_with_jitter(fraction);
            debug!(
                device = %self.name(),
                wait_ms = wait.as_millis() as u64,
                "reconnecting after backoff"
            );
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        debug!(device = %self.name(), "receive loop exited");
    }

    /// One socket lifetime: bind, then receive until an error.
    async fn run_session(
        &self,
        queue: &mpsc::UnboundedSender<Sentence>,
        backoff: &mut Backoff,
    ) -> Result<(), LinkError> {
        self.set_status(DeviceStatus::Connecting).await;

        let local_ip = resolve_local_address(self.settings.socket.local_address.as_deref()).await?;
        let bind_addr = SocketAddr::new(local_ip, self.settings.port);
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| LinkError::Bind {
                addr: bind_addr,
                source,
            })?;
        backoff.reset();
        if let Some(group) = self.settings.socket.multicast_group.as_deref() {
            join_multicast(&socket, group, local_ip)?;
        }

        let expected_sender = resolve_sender(self.name(), self.settings.host.as_deref()).await;
        self.touch().await;
        info!(
            device = %self.name(),
            %bind_addr,
            sender = ?expected_sender,
            "socket open"
        );

        let receive_timeout = self.settings.receive_timeout();
        let mut buffer = vec![0u8; self.settings.socket.buffer_size.max(MIN_RECEIVE_BUFFER)];

        loop {
            // Timeout is a liveness poll, not a failure.
            let Ok(received) =
                tokio::time::timeout(receive_timeout, socket.recv_from(&mut buffer)).await
            else {
                continue;
            };
            let (len, from) = received.map_err(LinkError::Receive)?;

            if let Some(expected) = expected_sender {
                if from.ip() != expected {
                    trace!(device = %self.name(), %from, "datagram from unexpected sender");
                    continue;
                }
            }

            let sentences = decode_datagram(
                self.name(),
                &buffer[..len],
                self.settings.emit_invalid,
                Utc::now(),
            );
            if sentences.is_empty() {
                continue;
            }
            for sentence in sentences {
                queue.send(sentence).map_err(|_| LinkError::QueueClosed)?;
            }
            self.mark_alive().await;
        }
    }

    async fn service_loop(
        self: Arc<Self>,
        mut queue: mpsc::UnboundedReceiver<Sentence>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.settings.service_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let mut forwarded = 0;
            while forwarded < MAX_SENTENCES_PER_TICK {
                let Ok(sentence) = queue.try_recv() else {
                    break;
                };
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    sent = self.events.send(DriverEvent::Sentence(sentence)) => {
                        if sent.is_err() {
                            trace!(device = %self.name(), "no sentence subscriber");
                        }
                    }
                }
                forwarded += 1;
            }
            if forwarded > 0 {
                trace!(device = %self.name(), forwarded, "sentences forwarded");
            }

            self.check_heartbeat().await;
        }
        debug!(device = %self.name(), "service loop exited");
    }
}

/// Local bind address: literal IP, else the first IPv4 from DNS, else any.
async fn resolve_local_address(local: Option<&str>) -> Result<IpAddr, LinkError> {
    let Some(host) = local.map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    };
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    let addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|source| LinkError::Resolve {
            host: host.to_string(),
            source,
        })?;
    Ok(addrs
        .map(|a| a.ip())
        .find(IpAddr::is_ipv4)
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)))
}

/// Expected sender: literal IP, else DNS (IPv4 preferred). Lookup failure
/// disables the filter.
async fn resolve_sender(device: &str, host: Option<&str>) -> Option<IpAddr> {
    let host = host?;
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Some(ip);
    }
    match tokio::net::lookup_host((host, 0)).await {
        Ok(addrs) => {
            let ips: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
            ips.iter().copied().find(IpAddr::is_ipv4).or(ips.first().copied())
        }
        Err(e) => {
            warn!(device, host, "could not resolve sender address: {}", e);
            None
        }
    }
}

fn join_multicast(socket: &UdpSocket, group: &str, local_ip: IpAddr) -> Result<(), LinkError> {
    let addr = group
        .trim()
        .parse::<Ipv4Addr>()
        .ok()
        .filter(Ipv4Addr::is_multicast)
        .ok_or_else(|| LinkError::InvalidMulticastGroup(group.to_string()))?;
    let interface = match local_ip {
        IpAddr::V4(ip) => ip,
        IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
    };
    socket
        .join_multicast_v4(addr, interface)
        .map_err(|source| LinkError::Multicast {
            group: group.to_string(),
            source,
        })
}
