use std::panic::{self, AssertUnwindSafe};

use crate::error::MonitorError;

/// Run one observation hook. Errors and panics stop here: the hook's only
/// visible failure mode is a missing summary field.
pub fn fail_open<F>(hook: &'static str, f: F)
where
    F: FnOnce() -> Result<(), MonitorError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            log::debug!(target: "monitor.guard", "{hook}: {err}");
        }
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic".to_string());
            log::debug!(target: "monitor.guard", "{hook} panicked: {msg}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swallows_errors_and_panics() {
        fail_open("err", || Err(MonitorError::Hook("nope".into())));
        fail_open("panic", || panic!("boom"));
        let mut ran = false;
        fail_open("ok", || {
            ran = true;
            Ok(())
        });
        assert!(ran);
    }
}
