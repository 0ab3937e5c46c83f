// generic host events: polled once per tick and fanned out to named
// observers before user systems run. payloads stay as json values, the
// runtime never interprets them.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

/// the event names the host is known to emit
pub mod event_ids {
    pub const ENTER_SCENE: &str = "onEnterScene";
    pub const LEAVE_SCENE: &str = "onLeaveScene";
    pub const PLAYER_CONNECTED: &str = "playerConnected";
    pub const PLAYER_DISCONNECTED: &str = "playerDisconnected";
    pub const REALM_CHANGED: &str = "onRealmChanged";
    pub const PLAYER_EXPRESSION: &str = "playerExpression";
    pub const VIDEO_EVENT: &str = "videoEvent";
    pub const COMMS: &str = "comms";
    pub const PLAYER_CLICKED: &str = "playerClicked";
}

#[derive(Debug, Clone)]
pub struct HostEvent {
    pub event_id: String,
    pub event_data: Value,
}

/// Where events come from. Implemented over the host's `send_batch`
/// surface; the actions side of that call is host business the runtime
/// does not model.
pub trait EventSource {
    fn poll_events(&mut self) -> Vec<HostEvent>;
}

type Observer = Box<dyn FnMut(&Value)>;

#[derive(Default)]
pub struct EventBus {
    observers: HashMap<String, Vec<Observer>>,
}

impl EventBus {
    pub fn observe(&mut self, event_id: impl Into<String>, observer: impl FnMut(&Value) + 'static) {
        self.observers
            .entry(event_id.into())
            .or_default()
            .push(Box::new(observer));
    }

    pub fn dispatch(&mut self, event: &HostEvent) {
        match self.observers.get_mut(&event.event_id) {
            Some(observers) => {
                for observer in observers {
                    observer(&event.event_data);
                }
            }
            None => debug!("no observers for host event {}", event.event_id),
        }
    }
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[test]
    fn events_fan_out_to_their_observers_only() {
        let mut bus = EventBus::default();
        let seen = Rc::new(RefCell::new(Vec::<String>::default()));

        let sink = seen.clone();
        bus.observe(event_ids::PLAYER_CONNECTED, move |data| {
            sink.borrow_mut()
                .push(data["userId"].as_str().unwrap_or_default().to_owned());
        });
        let sink = seen.clone();
        bus.observe(event_ids::PLAYER_CONNECTED, move |_| {
            sink.borrow_mut().push("second".to_owned());
        });

        bus.dispatch(&HostEvent {
            event_id: event_ids::PLAYER_CONNECTED.to_owned(),
            event_data: serde_json::json!({ "userId": "0xabc" }),
        });
        bus.dispatch(&HostEvent {
            event_id: event_ids::LEAVE_SCENE.to_owned(),
            event_data: Value::Null,
        });

        assert_eq!(seen.borrow().as_slice(), &["0xabc", "second"]);
    }
}
