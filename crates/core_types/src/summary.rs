use serde::{Deserialize, Serialize};

use crate::{Millis, Phase};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTally {
    pub requests: u64,
    pub bytes: u64,
}

impl PhaseTally {
    fn add(&mut self, bytes: u64) {
        self.requests = self.requests.saturating_add(1);
        self.bytes = self.bytes.saturating_add(bytes);
    }
}

/// Request/byte counts partitioned by load phase.
///
/// `total` is only ever updated together with exactly one phase, so the
/// per-phase tallies always sum to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkBreakdown {
    pub initial: PhaseTally,
    pub subload: PhaseTally,
    pub user: PhaseTally,
    pub total: PhaseTally,
}

impl NetworkBreakdown {
    pub fn record(&mut self, phase: Phase, bytes: u64) {
        self.phase_mut(phase).add(bytes);
        self.total.add(bytes);
    }

    pub fn phase(&self, phase: Phase) -> PhaseTally {
        match phase {
            Phase::Initial => self.initial,
            Phase::Subload => self.subload,
            Phase::User => self.user,
        }
    }

    fn phase_mut(&mut self, phase: Phase) -> &mut PhaseTally {
        match phase {
            Phase::Initial => &mut self.initial,
            Phase::Subload => &mut self.subload,
            Phase::User => &mut self.user,
        }
    }

    pub fn is_consistent(&self) -> bool {
        let requests = self
            .initial
            .requests
            .saturating_add(self.subload.requests)
            .saturating_add(self.user.requests);
        let bytes = self
            .initial
            .bytes
            .saturating_add(self.subload.bytes)
            .saturating_add(self.user.bytes);
        requests == self.total.requests && bytes == self.total.bytes
    }
}

/// Monotonic counters held by the summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
    ConsoleErrors,
    ConsoleWarnings,
    Dialogs,
    StorageWrites,
    StorageApiUses,
    Errors,
    DocumentWrites,
}

/// Everything observed for one monitored load.
///
/// Every field stays `None` until first measured; consumers must read
/// `None` as "not yet measured", never as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Summary {
    // timing
    pub content_ready_ms: Option<Millis>,
    pub first_paint_ms: Option<Millis>,
    pub frames: Option<u64>,
    pub long_task_ms: Option<Millis>,

    // counters
    pub console_errors: Option<u32>,
    pub console_warnings: Option<u32>,
    pub dialogs: Option<u32>,
    pub storage_writes: Option<u32>,
    pub storage_api_uses: Option<u32>,
    pub errors: Option<u32>,
    pub document_writes: Option<u32>,

    // capability flags
    pub known_library: Option<bool>,
    pub exit_shim_installed: Option<bool>,

    // geometry
    pub border_sides: Option<u8>,
    pub border_rules: Option<u32>,

    // temporal
    pub max_animation_ms: Option<Millis>,
    pub max_animation_loops: Option<u32>,
    pub infinite_animation: Option<bool>,

    pub network: Option<NetworkBreakdown>,
}

impl Summary {
    pub fn increment(&mut self, counter: Counter) {
        let slot = match counter {
            Counter::ConsoleErrors => &mut self.console_errors,
            Counter::ConsoleWarnings => &mut self.console_warnings,
            Counter::Dialogs => &mut self.dialogs,
            Counter::StorageWrites => &mut self.storage_writes,
            Counter::StorageApiUses => &mut self.storage_api_uses,
            Counter::Errors => &mut self.errors,
            Counter::DocumentWrites => &mut self.document_writes,
        };
        *slot = Some(slot.unwrap_or(0).saturating_add(1));
    }

    pub fn count(&self, counter: Counter) -> Option<u32> {
        match counter {
            Counter::ConsoleErrors => self.console_errors,
            Counter::ConsoleWarnings => self.console_warnings,
            Counter::Dialogs => self.dialogs,
            Counter::StorageWrites => self.storage_writes,
            Counter::StorageApiUses => self.storage_api_uses,
            Counter::Errors => self.errors,
            Counter::DocumentWrites => self.document_writes,
        }
    }

    pub fn record_resource(&mut self, phase: Phase, bytes: u64) {
        self.network.get_or_insert_with(NetworkBreakdown::default).record(phase, bytes);
    }

    /// Raise the maximum animation duration; never lowers it.
    pub fn raise_animation_ms(&mut self, ms: Millis) {
        if !ms.is_finite() || ms < 0.0 {
            return;
        }
        match self.max_animation_ms {
            Some(current) if current >= ms => {}
            _ => self.max_animation_ms = Some(ms),
        }
    }

    /// Raise the maximum loop count; never lowers it.
    pub fn raise_animation_loops(&mut self, loops: u32) {
        match self.max_animation_loops {
            Some(current) if current >= loops => {}
            _ => self.max_animation_loops = Some(loops),
        }
    }

    /// Sticky: once infinite, always infinite.
    pub fn mark_infinite_animation(&mut self, sentinel: u32) {
        self.infinite_animation = Some(true);
        self.raise_animation_loops(sentinel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_unmeasured() {
        let mut s = Summary::default();
        assert_eq!(s.count(Counter::Dialogs), None);
        s.increment(Counter::Dialogs);
        s.increment(Counter::Dialogs);
        assert_eq!(s.count(Counter::Dialogs), Some(2));
        assert_eq!(s.count(Counter::Errors), None);
    }

    #[test]
    fn huge_byte_counts_saturate() {
        let mut net = NetworkBreakdown::default();
        net.record(Phase::Initial, u64::MAX);
        net.record(Phase::Subload, u64::MAX - 1);
        net.record(Phase::User, 5);
        assert_eq!(net.total.bytes, u64::MAX);
        assert!(net.is_consistent());
    }

    #[test]
    fn phase_tallies_sum_to_total() {
        let mut s = Summary::default();
        s.record_resource(Phase::Initial, 100);
        s.record_resource(Phase::User, 40);
        s.record_resource(Phase::Subload, 7);
        let net = s.network.unwrap();
        assert!(net.is_consistent());
        assert_eq!(net.total, PhaseTally { requests: 3, bytes: 147 });
    }

    #[test]
    fn animation_maxima_only_rise() {
        let mut s = Summary::default();
        s.raise_animation_ms(1000.0);
        s.raise_animation_ms(3000.0);
        s.raise_animation_ms(2000.0);
        assert_eq!(s.max_animation_ms, Some(3000.0));

        s.raise_animation_loops(3);
        s.mark_infinite_animation(999);
        s.raise_animation_loops(5);
        assert_eq!(s.max_animation_loops, Some(999));
        assert_eq!(s.infinite_animation, Some(true));
    }

    #[test]
    fn missing_fields_deserialize_as_unmeasured() {
        let s: Summary = serde_json::from_str(r#"{"dialogs":2,"futureField":true}"#).unwrap();
        assert_eq!(s.dialogs, Some(2));
        assert_eq!(s.network, None);
    }

    #[test]
    fn wire_names_are_camel_case() {
        let mut s = Summary::default();
        s.max_animation_ms = Some(1.5);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["maxAnimationMs"], 1.5);
    }
}
