//! Phase classification and resource accounting.
//!
//! Every resource-timing record is attributed to exactly one phase from
//! its start time alone: inside a live interaction window it is `User`,
//! at or after content-ready it is `Subload`, otherwise `Initial`.

use std::collections::{HashSet, VecDeque};

use core_types::{Millis, Phase};

use crate::config::PhaseConfig;

/// One resource-timing record as the context reports it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceTiming {
    pub name: String,
    pub start_time: Millis,
    pub transfer_size: u64,
    pub encoded_body_size: u64,
    pub decoded_body_size: u64,
}

impl ResourceTiming {
    pub fn new(name: impl Into<String>, start_time: Millis, transfer_size: u64) -> Self {
        Self {
            name: name.into(),
            start_time,
            transfer_size,
            ..Self::default()
        }
    }

    /// Name plus start time. Start times are compared bit-for-bit.
    pub fn identity(&self) -> (String, u64) {
        (self.name.clone(), self.start_time.to_bits())
    }

    /// Transferred, then encoded, then decoded size; 0 when none is known.
    pub fn best_size(&self) -> u64 {
        [self.transfer_size, self.encoded_body_size, self.decoded_body_size]
            .into_iter()
            .find(|&n| n > 0)
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResourceObservation {
    pub name: String,
    pub start_time: Millis,
    pub bytes: u64,
    pub phase: Phase,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionWindow {
    pub start: Millis,
    pub end: Millis,
}

impl InteractionWindow {
    pub fn contains(&self, t: Millis) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Primary gesture classes that open an interaction window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureKind {
    PointerDown,
    TouchStart,
    ActivationKey,
}

pub struct PhaseClassifier {
    config: PhaseConfig,
    content_loaded: Option<Millis>,
    windows: VecDeque<InteractionWindow>,
    seen: HashSet<(String, u64)>,
}

impl PhaseClassifier {
    pub fn new(config: PhaseConfig) -> Self {
        Self {
            config,
            content_loaded: None,
            windows: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Record the load-completed signal. Only the first call counts;
    /// returns whether this one did.
    pub fn content_loaded(&mut self, t: Millis) -> bool {
        if self.content_loaded.is_some() {
            return false;
        }
        self.content_loaded = Some(t);
        log::debug!(target: "monitor.phase", "content loaded at {t}");
        true
    }

    pub fn content_loaded_at(&self) -> Option<Millis> {
        self.content_loaded
    }

    pub fn open_window(&mut self, gesture: GestureKind, t: Millis) {
        self.prune(t);
        if self.windows.len() >= self.config.max_windows.max(1) {
            self.windows.pop_front();
        }
        let window = InteractionWindow {
            start: t,
            end: t + self.config.interaction_window_ms,
        };
        log::trace!(target: "monitor.phase", "{gesture:?} opens window {}..{}", window.start, window.end);
        self.windows.push_back(window);
    }

    /// Drop windows that ended more than the grace period before `now`.
    pub fn prune(&mut self, now: Millis) {
        let grace = self.config.interaction_grace_ms;
        self.windows.retain(|w| w.end + grace >= now);
    }

    pub fn windows(&self) -> impl Iterator<Item = &InteractionWindow> {
        self.windows.iter()
    }

    /// Phase for a start time against the current state. Pure.
    pub fn phase_for(&self, start: Millis) -> Phase {
        if self.windows.iter().any(|w| w.contains(start)) {
            return Phase::User;
        }
        match self.content_loaded {
            Some(loaded) if start >= loaded => Phase::Subload,
            _ => Phase::Initial,
        }
    }

    /// Classify one record, or `None` if its identity was already counted.
    /// `fallback_size` supplies a byte length when the record reports none.
    pub fn classify(
        &mut self,
        timing: &ResourceTiming,
        fallback_size: impl FnOnce(&str) -> Option<u64>,
        now: Millis,
    ) -> Option<ResourceObservation> {
        if !self.seen.insert(timing.identity()) {
            return None;
        }
        self.prune(now);
        let phase = self.phase_for(timing.start_time);
        let bytes = match timing.best_size() {
            0 => fallback_size(&timing.name).unwrap_or(0),
            n => n,
        };
        Some(ResourceObservation {
            name: timing.name.clone(),
            start_time: timing.start_time,
            bytes,
            phase,
        })
    }

    pub fn observed(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PhaseClassifier {
        PhaseClassifier::new(PhaseConfig::default())
    }

    #[test]
    fn before_content_loaded_is_initial() {
        let mut c = classifier();
        let obs = c.classify(&ResourceTiming::new("a.js", 10.0, 100), |_| None, 20.0);
        assert_eq!(obs.map(|o| o.phase), Some(Phase::Initial));
    }

    #[test]
    fn after_content_loaded_is_subload_until_a_gesture() {
        let mut c = classifier();
        c.content_loaded(1000.0);
        assert_eq!(c.phase_for(999.0), Phase::Initial);
        assert_eq!(c.phase_for(1000.0), Phase::Subload);
        c.open_window(GestureKind::PointerDown, 4000.0);
        assert_eq!(c.phase_for(4010.0), Phase::User);
        assert_eq!(c.phase_for(6500.0), Phase::User);
        assert_eq!(c.phase_for(6501.0), Phase::Subload);
    }

    #[test]
    fn first_content_loaded_wins() {
        let mut c = classifier();
        assert!(c.content_loaded(500.0));
        assert!(!c.content_loaded(100.0));
        assert_eq!(c.content_loaded_at(), Some(500.0));
    }

    #[test]
    fn duplicate_identity_is_discarded() {
        let mut c = classifier();
        let t = ResourceTiming::new("x.png", 5.0, 10);
        assert!(c.classify(&t, |_| None, 6.0).is_some());
        assert!(c.classify(&t, |_| None, 7.0).is_none());
        let later = ResourceTiming::new("x.png", 8.0, 10);
        assert!(c.classify(&later, |_| None, 9.0).is_some());
        assert_eq!(c.observed(), 2);
    }

    #[test]
    fn size_falls_back_through_the_reported_sizes() {
        let mut t = ResourceTiming::new("local://bundle/a.png", 1.0, 0);
        t.decoded_body_size = 70;
        assert_eq!(t.best_size(), 70);
        t.encoded_body_size = 40;
        assert_eq!(t.best_size(), 40);

        let mut c = classifier();
        let empty = ResourceTiming::new("local://bundle/a.png", 2.0, 0);
        let obs = c.classify(&empty, |name| (name == "local://bundle/a.png").then_some(1234), 3.0);
        assert_eq!(obs.map(|o| o.bytes), Some(1234));
    }

    #[test]
    fn ring_is_capped_and_pruned() {
        let mut c = PhaseClassifier::new(PhaseConfig {
            interaction_window_ms: 100.0,
            interaction_grace_ms: 10.0,
            max_windows: 2,
        });
        c.open_window(GestureKind::TouchStart, 0.0);
        c.open_window(GestureKind::TouchStart, 20.0);
        c.open_window(GestureKind::TouchStart, 40.0);
        assert_eq!(c.windows().count(), 2);
        assert_eq!(c.windows().next().map(|w| w.start), Some(20.0));
        c.prune(500.0);
        assert_eq!(c.windows().count(), 0);
    }
}
