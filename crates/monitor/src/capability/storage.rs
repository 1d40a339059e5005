use bus::{MonitorEvent, StorageOp};
use core_types::Counter;

use crate::context::MonitorContext;

/// Persistent key-value storage.
pub trait StorageCapability {
    fn get_item(&mut self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: &str);
    fn remove_item(&mut self, key: &str);
    fn clear(&mut self);
}

pub struct InterceptedStorage {
    inner: Box<dyn StorageCapability>,
    ctx: MonitorContext,
}

impl InterceptedStorage {
    pub fn wrap(original: Box<dyn StorageCapability>, ctx: MonitorContext) -> Box<dyn StorageCapability> {
        Box::new(Self { inner: original, ctx })
    }

    fn write(&self, op: StorageOp, key: Option<&str>) {
        self.ctx.observe("storage.write", |ctx| {
            ctx.update(|s| {
                s.increment(Counter::StorageWrites);
                s.increment(Counter::StorageApiUses);
            })?;
            ctx.emit(MonitorEvent::StorageWrite {
                op,
                key: key.map(bus::clip),
            });
            Ok(())
        });
    }
}

impl StorageCapability for InterceptedStorage {
    fn get_item(&mut self, key: &str) -> Option<String> {
        self.ctx
            .observe("storage.read", |ctx| ctx.increment(Counter::StorageApiUses));
        self.inner.get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) {
        self.write(StorageOp::Set, Some(key));
        self.inner.set_item(key, value);
    }

    fn remove_item(&mut self, key: &str) {
        self.write(StorageOp::Remove, Some(key));
        self.inner.remove_item(key);
    }

    fn clear(&mut self) {
        self.write(StorageOp::Clear, None);
        self.inner.clear();
    }
}
