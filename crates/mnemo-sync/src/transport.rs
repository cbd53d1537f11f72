use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::message::{Message, TabId};

/// Stands in for a browser `BroadcastChannel`: something a tab can post
/// messages onto and poll for messages other tabs posted.
pub trait Transport: Send {
    fn tab_id(&self) -> &TabId;
    fn post(&self, msg: Message);
    /// Drains and returns every message currently queued for this tab,
    /// oldest first. Never blocks.
    fn drain(&self) -> Vec<Message>;
}

/// The shared broadcast bus backing every tab's `InProcessTransport`.
/// A real extension has one per-window `BroadcastChannel`; this repository's
/// equivalent is an in-process fan-out over `mpsc` channels.
#[derive(Default)]
pub struct Hub {
    subscribers: Mutex<Vec<(TabId, Sender<Message>)>>,
}

impl Hub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn join(self: &Arc<Self>, tab_id: TabId) -> InProcessTransport {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .expect("hub subscriber lock poisoned")
            .push((tab_id.clone(), tx));
        InProcessTransport {
            hub: Arc::clone(self),
            tab_id,
            rx: Mutex::new(rx),
        }
    }

    fn broadcast(&self, from: &TabId, msg: Message) {
        let subscribers = self.subscribers.lock().expect("hub subscriber lock poisoned");
        for (tab_id, tx) in subscribers.iter() {
            if tab_id == from {
                continue;
            }
            let _ = tx.send(msg.clone());
        }
    }

    pub fn leave(&self, tab_id: &TabId) {
        self.subscribers
            .lock()
            .expect("hub subscriber lock poisoned")
            .retain(|(id, _)| id != tab_id);
    }
}

pub struct InProcessTransport {
    hub: Arc<Hub>,
    tab_id: TabId,
    rx: Mutex<Receiver<Message>>,
}

impl Transport for InProcessTransport {
    fn tab_id(&self) -> &TabId {
        &self.tab_id
    }

    fn post(&self, msg: Message) {
        self.hub.broadcast(&self.tab_id, msg);
    }

    fn drain(&self) -> Vec<Message> {
        let rx = self.rx.lock().expect("transport receiver lock poisoned");
        rx.try_iter().collect()
    }
}

impl Drop for InProcessTransport {
    fn drop(&mut self) {
        self.hub.leave(&self.tab_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_fan_out_to_other_tabs_but_not_the_sender() {
        let hub = Hub::new();
        let a = hub.join(TabId("a".into()));
        let b = hub.join(TabId("b".into()));

        a.post(Message::Heartbeat { tab_id: "a".into() });

        assert!(a.drain().is_empty());
        let received = b.drain();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].tab_id(), "a");
    }

    #[test]
    fn leaving_tab_stops_receiving_broadcasts() {
        let hub = Hub::new();
        let a = hub.join(TabId("a".into()));
        {
            let b = hub.join(TabId("b".into()));
            drop(b);
        }
        a.post(Message::Heartbeat { tab_id: "a".into() });
        // no subscribers left besides `a` itself, should not panic or error
    }
}
