//! Script-visible globals the monitor cares about: plain string
//! variables (click destinations), exit APIs and animation-timeline
//! libraries. Entry points can appear at any time during the load.

use std::collections::{BTreeMap, HashSet};

pub type Vars = BTreeMap<String, String>;

/// A vendor exit call. `destination` is `None` when the caller relies on
/// a destination configured elsewhere.
pub trait ExitApi {
    fn exit(&mut self, destination: Option<&str>, vars: &Vars);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RepeatSpec {
    Once,
    /// Total number of plays.
    Times(u32),
    Forever,
}

/// Declared timing of a tween or timeline, in the library's own unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TweenParams {
    pub duration: f64,
    pub repeat: RepeatSpec,
}

impl TweenParams {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            repeat: RepeatSpec::Once,
        }
    }

    pub fn repeat(mut self, repeat: RepeatSpec) -> Self {
        self.repeat = repeat;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DurationUnit {
    Seconds,
    Millis,
}

impl DurationUnit {
    pub fn to_ms(self, value: f64) -> f64 {
        match self {
            DurationUnit::Seconds => value * 1000.0,
            DurationUnit::Millis => value,
        }
    }
}

pub trait TimelineLibrary {
    fn unit(&self) -> DurationUnit;
    fn tween(&mut self, target: &str, params: &TweenParams);
    fn timeline(&mut self, params: &TweenParams);
}

#[derive(Default)]
pub struct Globals {
    vars: Vars,
    exit_apis: BTreeMap<String, Box<dyn ExitApi>>,
    libraries: BTreeMap<String, Box<dyn TimelineLibrary>>,
    hooked: HashSet<String>,
}

impl Globals {
    pub fn set_var(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    /// Defines (or redefines) an exit API. A redefinition drops any hook.
    pub fn define_exit_api(&mut self, name: &str, api: Box<dyn ExitApi>) {
        self.hooked.remove(name);
        self.exit_apis.insert(name.to_string(), api);
    }

    pub fn has_exit_api(&self, name: &str) -> bool {
        self.exit_apis.contains_key(name)
    }

    /// What the creative's `name.exit(...)` does. Returns false when no
    /// such API exists.
    pub fn call_exit(&mut self, name: &str, destination: Option<&str>) -> bool {
        let Some(api) = self.exit_apis.get_mut(name) else {
            return false;
        };
        api.exit(destination, &self.vars);
        true
    }

    pub fn define_library(&mut self, name: &str, library: Box<dyn TimelineLibrary>) {
        self.hooked.remove(name);
        self.libraries.insert(name.to_string(), library);
    }

    pub fn has_library(&self, name: &str) -> bool {
        self.libraries.contains_key(name)
    }

    pub fn tween(&mut self, library: &str, target: &str, params: &TweenParams) -> bool {
        match self.libraries.get_mut(library) {
            Some(lib) => {
                lib.tween(target, params);
                true
            }
            None => false,
        }
    }

    pub fn timeline(&mut self, library: &str, params: &TweenParams) -> bool {
        match self.libraries.get_mut(library) {
            Some(lib) => {
                lib.timeline(params);
                true
            }
            None => false,
        }
    }

    pub fn is_hooked(&self, name: &str) -> bool {
        self.hooked.contains(name)
    }

    /// Replace a present, not yet hooked exit API with `wrap(original)`.
    pub(crate) fn hook_exit_api(
        &mut self,
        name: &str,
        wrap: impl FnOnce(Box<dyn ExitApi>) -> Box<dyn ExitApi>,
    ) -> bool {
        if self.hooked.contains(name) {
            return false;
        }
        let Some(original) = self.exit_apis.remove(name) else {
            return false;
        };
        self.exit_apis.insert(name.to_string(), wrap(original));
        self.hooked.insert(name.to_string());
        true
    }

    pub(crate) fn hook_library(
        &mut self,
        name: &str,
        wrap: impl FnOnce(Box<dyn TimelineLibrary>) -> Box<dyn TimelineLibrary>,
    ) -> bool {
        if self.hooked.contains(name) {
            return false;
        }
        let Some(original) = self.libraries.remove(name) else {
            return false;
        };
        self.libraries.insert(name.to_string(), wrap(original));
        self.hooked.insert(name.to_string());
        true
    }
}
