//! In-context side of the creative monitor.
//!
//! [`inject`] wraps every capability of an [`ExecutionContext`] and hands
//! back a [`Monitor`]; from then on the creative's calls, the host's
//! timing records and input events all land in one [`Summary`] that is
//! re-published over the event channel.
//!
//! [`Summary`]: core_types::Summary

pub mod animation;
pub mod assets;
pub mod capability;
pub mod click_exit;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod geometry;
pub mod guard;
pub mod inject;
pub mod phase;
pub mod scheduler;

pub use assets::{AssetPayload, AssetTable};
pub use capability::{DocumentView, ElementSnapshot, ExecutionContext, Globals};
pub use click_exit::{InputDisposition, InputEvent, InputKind, ProbeState, TargetNode};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MonitorConfig;
pub use context::MonitorContext;
pub use error::{ConfigError, MonitorError};
pub use inject::{InjectOptions, Monitor, inject};
pub use phase::{GestureKind, ResourceTiming};
