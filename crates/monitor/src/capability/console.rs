use bus::{LogLevel, MonitorEvent};
use core_types::Counter;

use crate::context::MonitorContext;

pub trait ConsoleCapability {
    fn error(&mut self, message: &str);
    fn warn(&mut self, message: &str);
    fn log(&mut self, message: &str);
}

pub struct InterceptedConsole {
    inner: Box<dyn ConsoleCapability>,
    ctx: MonitorContext,
}

impl InterceptedConsole {
    pub fn wrap(original: Box<dyn ConsoleCapability>, ctx: MonitorContext) -> Box<dyn ConsoleCapability> {
        Box::new(Self { inner: original, ctx })
    }

    fn report(&self, level: LogLevel, message: &str) {
        let counter = match level {
            LogLevel::Error => Counter::ConsoleErrors,
            LogLevel::Warn => Counter::ConsoleWarnings,
        };
        self.ctx.observe("console", |ctx| {
            ctx.increment(counter)?;
            ctx.emit(MonitorEvent::LogEntry {
                level,
                message: bus::clip(message),
            });
            Ok(())
        });
    }
}

impl ConsoleCapability for InterceptedConsole {
    fn error(&mut self, message: &str) {
        self.report(LogLevel::Error, message);
        self.inner.error(message);
    }

    fn warn(&mut self, message: &str) {
        self.report(LogLevel::Warn, message);
        self.inner.warn(message);
    }

    // plain logging is not a compliance signal
    fn log(&mut self, message: &str) {
        self.inner.log(message);
    }
}
