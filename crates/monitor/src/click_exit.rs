//! Click-exit tracking inside the monitored context.
//!
//! Trusted activations are traced to a destination, navigation is
//! suppressed and a `click-candidate` goes to the host instead. Vendor
//! exit APIs get the same treatment whenever they are called. Resolving
//! the destination happens host-side.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bus::{MonitorEvent, Provenance};
use core_types::Millis;

use crate::capability::globals::{ExitApi, Globals, Vars};
use crate::context::MonitorContext;
use crate::error::MonitorError;
use crate::phase::GestureKind;
use crate::scheduler::Next;

#[derive(Clone, Debug, PartialEq)]
pub enum InputKind {
    PointerDown,
    TouchStart,
    KeyDown(String),
    Click,
}

/// One node on the event path, target first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetNode {
    pub tag: String,
    pub href: Option<String>,
}

impl TargetNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            href: None,
        }
    }

    pub fn link(tag: &str, href: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            href: Some(href.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub time: Millis,
    pub trusted: bool,
    pub path: Vec<TargetNode>,
}

impl InputEvent {
    pub fn new(kind: InputKind, time: Millis) -> Self {
        Self {
            kind,
            time,
            trusted: true,
            path: Vec::new(),
        }
    }

    pub fn on(mut self, path: Vec<TargetNode>) -> Self {
        self.path = path;
        self
    }

    pub fn untrusted(mut self) -> Self {
        self.trusted = false;
        self
    }

    /// The primary gesture class this input belongs to, if any.
    pub fn gesture(&self) -> Option<GestureKind> {
        match &self.kind {
            InputKind::PointerDown => Some(GestureKind::PointerDown),
            InputKind::TouchStart => Some(GestureKind::TouchStart),
            InputKind::KeyDown(key) if is_activation_key(key) => Some(GestureKind::ActivationKey),
            _ => None,
        }
    }

    fn activates(&self) -> bool {
        match &self.kind {
            InputKind::Click => true,
            InputKind::KeyDown(key) => is_activation_key(key),
            _ => false,
        }
    }
}

fn is_activation_key(key: &str) -> bool {
    matches!(key, "Enter" | " " | "Spacebar" | "Space")
}

/// What the host should do with the input's default action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputDisposition {
    PreventDefault,
    Continue,
}

fn is_navigable(href: &str) -> bool {
    let h = href.trim();
    !h.is_empty() && !h.starts_with('#') && !h.to_ascii_lowercase().starts_with("javascript:")
}

fn destination_from_vars(vars: &Vars, names: &[String]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| vars.get(name))
        .find(|v| is_navigable(v))
        .cloned()
}

/// Trace a trusted activation to its exit destination.
pub fn on_input(ctx: &MonitorContext, globals: &RefCell<Globals>, event: &InputEvent) -> InputDisposition {
    if !event.trusted || !event.activates() {
        return InputDisposition::Continue;
    }

    let from_path = event
        .path
        .iter()
        .find(|node| matches!(node.tag.as_str(), "a" | "area") && node.href.as_deref().is_some_and(is_navigable))
        .and_then(|node| node.href.clone());
    let destination = from_path.or_else(|| {
        let globals = globals.try_borrow().ok()?;
        destination_from_vars(globals.vars(), &ctx.config().exit.destination_globals)
    });

    let Some(destination) = destination else {
        return InputDisposition::Continue;
    };
    log::debug!(target: "monitor.exit", "gesture exit to {destination}");
    ctx.emit(MonitorEvent::ClickCandidate {
        destination: bus::clip(&destination),
        provenance: Provenance::UserGesture,
        api: None,
    });
    InputDisposition::PreventDefault
}

/// Reports exit calls instead of navigating.
pub struct ExitInterceptor {
    name: String,
    // never called; kept so the original is released with the wrapper
    _original: Box<dyn ExitApi>,
    ctx: MonitorContext,
}

impl ExitInterceptor {
    pub fn wrap(name: &str, original: Box<dyn ExitApi>, ctx: MonitorContext) -> Box<dyn ExitApi> {
        Box::new(Self {
            name: name.to_string(),
            _original: original,
            ctx,
        })
    }
}

impl ExitApi for ExitInterceptor {
    fn exit(&mut self, destination: Option<&str>, vars: &Vars) {
        let name = self.name.as_str();
        self.ctx.observe("exit.api", |ctx| {
            let destination = destination
                .filter(|d| is_navigable(d))
                .map(str::to_string)
                .or_else(|| destination_from_vars(vars, &ctx.config().exit.destination_globals));
            match destination {
                Some(destination) => {
                    log::debug!(target: "monitor.exit", "{name}.exit to {destination}");
                    ctx.emit(MonitorEvent::ClickCandidate {
                        destination: bus::clip(&destination),
                        provenance: Provenance::ExitApi,
                        api: Some(name.to_string()),
                    });
                }
                None => log::debug!(target: "monitor.exit", "{name}.exit without a destination"),
            }
            Ok(())
        });
    }
}

/// Installed when no exit API ever shows up.
pub struct NoopExitApi;

impl ExitApi for NoopExitApi {
    fn exit(&mut self, _destination: Option<&str>, _vars: &Vars) {}
}

/// Hook every configured exit API present and not yet hooked. Returns
/// how many APIs are present.
pub fn hook_exit_apis(ctx: &MonitorContext, globals: &RefCell<Globals>) -> Result<usize, MonitorError> {
    let mut globals = globals
        .try_borrow_mut()
        .map_err(|_| MonitorError::Hook("globals are busy".into()))?;
    let mut present = 0;
    for name in &ctx.config().exit.api_names {
        if !globals.has_exit_api(name) {
            continue;
        }
        present += 1;
        if globals.hook_exit_api(name, |original| ExitInterceptor::wrap(name, original, ctx.clone())) {
            log::debug!(target: "monitor.exit", "hooked exit api {name}");
        }
    }
    Ok(present)
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProbeState {
    Searching { attempts: u32 },
    Found,
    Exhausted,
}

/// Bounded search for a late-appearing exit API. One scheduled task
/// drives it; the state says where it ended.
#[derive(Clone)]
pub struct ExitProbe {
    state: Rc<RefCell<ProbeState>>,
    shim: Rc<Cell<bool>>,
}

impl Default for ExitProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ExitProbe {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ProbeState::Searching { attempts: 0 })),
            shim: Rc::new(Cell::new(false)),
        }
    }

    pub fn state(&self) -> ProbeState {
        self.state.borrow().clone()
    }

    pub fn shim_installed(&self) -> bool {
        self.shim.get()
    }

    /// One attempt. Returns when to try again, or `Next::Done` once the
    /// probe reached a terminal state.
    pub fn attempt(&self, ctx: &MonitorContext, globals: &RefCell<Globals>) -> Next {
        let attempts = match *self.state.borrow() {
            ProbeState::Searching { attempts } => attempts,
            ProbeState::Found | ProbeState::Exhausted => return Next::Done,
        };

        let mut present = 0;
        ctx.observe("exit.probe", |ctx| {
            present = hook_exit_apis(ctx, globals)?;
            Ok(())
        });
        if present > 0 {
            *self.state.borrow_mut() = ProbeState::Found;
            ctx.observe("exit.probe", |ctx| ctx.update(|s| s.exit_shim_installed = Some(false)));
            return Next::Done;
        }

        let config = &ctx.config().exit;
        let attempts = attempts + 1;
        if attempts < config.probe_max_attempts {
            *self.state.borrow_mut() = ProbeState::Searching { attempts };
            return Next::After(config.probe_interval_ms);
        }

        *self.state.borrow_mut() = ProbeState::Exhausted;
        if let Some(name) = config.api_names.first() {
            ctx.observe("exit.shim", |ctx| {
                let mut globals = globals
                    .try_borrow_mut()
                    .map_err(|_| MonitorError::Hook("globals are busy".into()))?;
                globals.define_exit_api(name, Box::new(NoopExitApi));
                globals.hook_exit_api(name, |original| ExitInterceptor::wrap(name, original, ctx.clone()));
                drop(globals);
                self.shim.set(true);
                ctx.update(|s| s.exit_shim_installed = Some(true))
            });
            log::debug!(target: "monitor.exit", "no exit api after {attempts} attempts; installed {name} shim");
        }
        Next::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_keys_open_windows_and_activate() {
        let key = InputEvent::new(InputKind::KeyDown("Enter".into()), 0.0);
        assert_eq!(key.gesture(), Some(GestureKind::ActivationKey));
        assert!(key.activates());
        let other = InputEvent::new(InputKind::KeyDown("a".into()), 0.0);
        assert_eq!(other.gesture(), None);
        assert!(!other.activates());
        assert_eq!(InputEvent::new(InputKind::Click, 0.0).gesture(), None);
    }

    #[test]
    fn navigable_hrefs() {
        assert!(is_navigable("https://example.com"));
        assert!(is_navigable("landing.html"));
        assert!(!is_navigable("#"));
        assert!(!is_navigable("javascript:void(0)"));
        assert!(!is_navigable("  "));
    }

    #[test]
    fn destination_globals_in_preference_order() {
        let mut vars = Vars::new();
        vars.insert("clickTAG".into(), "https://b.example".into());
        vars.insert("clickTag".into(), "".into());
        let names = vec!["clickTag".to_string(), "clickTAG".to_string()];
        assert_eq!(destination_from_vars(&vars, &names), Some("https://b.example".into()));
    }
}
