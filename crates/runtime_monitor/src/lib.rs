// crates/runtime_monitor/src/lib.rs
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use bus::{EventReceiver, MonitorEvent};
use core_types::Summary;
use net::{ExitResolution, ProbeTransport, resolve_exit};

pub type SharedTransport = Arc<dyn ProbeTransport + Send + Sync>;

/// Read access to the latest Summary for downstream collaborators (rule
/// engine, report builder). `None` means no snapshot arrived yet: every
/// measured field is "unknown", not zero.
pub trait SummarySource {
    fn latest(&self) -> Option<Summary>;
}

/// Events and exit resolutions retained per load. Later ones are counted
/// and dropped.
pub const DEFAULT_RETAINED: usize = 10_000;

/// Host-side sink of the event channel.
pub struct Aggregator {
    latest: Option<Summary>,
    snapshots: u32,
    events: Vec<MonitorEvent>,
    exits: Vec<ExitResolution>,
    retained: usize,
    dropped: u64,
    transport: Option<SharedTransport>,
    base: Option<String>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            latest: None,
            snapshots: 0,
            events: Vec::new(),
            exits: Vec::new(),
            retained: DEFAULT_RETAINED,
            dropped: 0,
            transport: None,
            base: None,
        }
    }
}

impl Aggregator {
    /// Without a transport, click candidates are recorded but never
    /// resolved.
    pub fn new(transport: Option<SharedTransport>, base: Option<String>) -> Self {
        Self {
            transport,
            base,
            ..Self::default()
        }
    }

    pub fn with_retained(mut self, retained: usize) -> Self {
        self.retained = retained;
        self
    }

    pub fn apply(&mut self, event: MonitorEvent) {
        let resolution = resolve_candidate(self.transport.as_deref(), self.base.as_deref(), &event);
        self.record(event, resolution);
    }

    fn record(&mut self, event: MonitorEvent, resolution: Option<ExitResolution>) {
        if let Some(resolution) = resolution {
            log::debug!(
                target: "runtime_monitor",
                "exit {} -> {:?}",
                resolution.requested,
                resolution.status
            );
            if self.exits.len() < self.retained {
                self.exits.push(resolution);
            }
        }
        match event {
            // last write wins; snapshots are cumulative
            MonitorEvent::SummarySnapshot { summary } => {
                self.snapshots += 1;
                self.latest = Some(summary);
            }
            other if self.events.len() < self.retained => {
                log::trace!(target: "runtime_monitor", "{}", other.type_name());
                self.events.push(other);
            }
            other => {
                if self.dropped == 0 {
                    log::warn!(
                        target: "runtime_monitor",
                        "event log full at {}, dropping from {}",
                        self.retained,
                        other.type_name()
                    );
                }
                self.dropped += 1;
            }
        }
    }

    pub fn latest_summary(&self) -> Option<&Summary> {
        self.latest.as_ref()
    }

    pub fn snapshot_count(&self) -> u32 {
        self.snapshots
    }

    /// Every non-snapshot event, in arrival order.
    pub fn events(&self) -> &[MonitorEvent] {
        &self.events
    }

    pub fn exits(&self) -> &[ExitResolution] {
        &self.exits
    }

    /// Non-snapshot events past the retention limit.
    pub fn dropped_events(&self) -> u64 {
        self.dropped
    }
}

impl SummarySource for Aggregator {
    fn latest(&self) -> Option<Summary> {
        self.latest.clone()
    }
}

fn resolve_candidate(
    transport: Option<&(dyn ProbeTransport + Send + Sync)>,
    base: Option<&str>,
    event: &MonitorEvent,
) -> Option<ExitResolution> {
    let MonitorEvent::ClickCandidate { destination, .. } = event else {
        return None;
    };
    let transport = transport?;
    Some(resolve_exit(transport, destination, base))
}

/// Running aggregator. The thread ends when every sender is gone.
pub struct AggregatorHandle {
    shared: Arc<Mutex<Aggregator>>,
    thread: Option<JoinHandle<()>>,
}

impl AggregatorHandle {
    fn lock(&self) -> MutexGuard<'_, Aggregator> {
        // a panicking probe must not take the summary down with it
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn latest_summary(&self) -> Option<Summary> {
        self.lock().latest.clone()
    }

    pub fn snapshot_count(&self) -> u32 {
        self.lock().snapshots
    }

    pub fn events(&self) -> Vec<MonitorEvent> {
        self.lock().events.clone()
    }

    pub fn exits(&self) -> Vec<ExitResolution> {
        self.lock().exits.clone()
    }

    /// Wait for the channel to close and return the final state.
    pub fn join(mut self) -> Aggregator {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!(target: "runtime_monitor", "aggregator thread panicked");
            }
        }
        let mut guard = self.lock();
        std::mem::take(&mut *guard)
    }
}

impl SummarySource for AggregatorHandle {
    fn latest(&self) -> Option<Summary> {
        self.latest_summary()
    }
}

pub fn start_aggregator(
    rx: EventReceiver,
    transport: Option<SharedTransport>,
    base: Option<String>,
) -> AggregatorHandle {
    let shared = Arc::new(Mutex::new(Aggregator::new(None, None)));
    let state = shared.clone();

    let thread = thread::spawn(move || {
        while let Ok(event) = rx.recv() {
            // probe outside the lock so readers never wait on the network
            let resolution = resolve_candidate(transport.as_deref(), base.as_deref(), &event);
            let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.record(event, resolution);
        }
        log::debug!(target: "runtime_monitor", "event channel closed");
    });

    AggregatorHandle {
        shared,
        thread: Some(thread),
    }
}
