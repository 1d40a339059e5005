use std::collections::VecDeque;

use bus::{MonitorEvent, NetworkApi};

use crate::context::MonitorContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// Request issuance: a one-shot call and a stateful open/send pair.
pub trait NetworkCapability {
    fn fetch(&mut self, method: &str, url: &str) -> RequestId;
    fn open(&mut self, method: &str, url: &str) -> RequestId;
    fn send(&mut self, request: RequestId);
}

// Opened requests waiting for their send; the oldest go first.
const MAX_UNSENT: usize = 64;

struct Unsent {
    id: RequestId,
    method: String,
    url: String,
    rewritten: bool,
}

pub struct InterceptedNetwork {
    inner: Box<dyn NetworkCapability>,
    ctx: MonitorContext,
    opened: VecDeque<Unsent>,
}

impl InterceptedNetwork {
    pub fn wrap(original: Box<dyn NetworkCapability>, ctx: MonitorContext) -> Box<dyn NetworkCapability> {
        Box::new(Self {
            inner: original,
            ctx,
            opened: VecDeque::new(),
        })
    }

    fn report(&self, api: NetworkApi, method: &str, url: &str, rewritten: bool) {
        self.ctx.observe("network.report", |ctx| {
            ctx.emit(MonitorEvent::NetworkActivity {
                api,
                method: method.to_ascii_uppercase(),
                url: bus::clip(url),
                rewritten,
            });
            Ok(())
        });
    }
}

impl NetworkCapability for InterceptedNetwork {
    fn fetch(&mut self, method: &str, url: &str) -> RequestId {
        let local = self.ctx.resolve_reference(url);
        let target = local.as_deref().unwrap_or(url);
        self.report(NetworkApi::Fetch, method, target, local.is_some());
        self.inner.fetch(method, target)
    }

    fn open(&mut self, method: &str, url: &str) -> RequestId {
        let local = self.ctx.resolve_reference(url);
        let target = local.as_deref().unwrap_or(url);
        let id = self.inner.open(method, target);
        self.opened.retain(|u| u.id != id);
        if self.opened.len() >= MAX_UNSENT {
            if let Some(dropped) = self.opened.pop_front() {
                log::debug!(target: "monitor.capability", "forgetting unsent request {:?}", dropped.id);
            }
        }
        self.opened.push_back(Unsent {
            id,
            method: method.to_string(),
            url: target.to_string(),
            rewritten: local.is_some(),
        });
        id
    }

    fn send(&mut self, request: RequestId) {
        let pending = self.opened.iter().position(|u| u.id == request);
        if let Some(u) = pending.and_then(|i| self.opened.remove(i)) {
            self.report(NetworkApi::Xhr, &u.method, &u.url, u.rewritten);
        }
        self.inner.send(request);
    }
}
