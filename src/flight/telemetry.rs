use bevy::math::Vec3;
use bevy::prelude::Message;
use std::fmt::{Debug, Formatter};

/// Telemetry published by the flight model. Consumers (HUD, audio, host)
/// must cope with one `Position`/`Delta`/`Drop` per tick, i.e. 40 Hz at
/// real time and more under time acceleration.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub enum FlightEvent {
    Position { position: Vec3 },
    /// Vertical displacement per second over the last tick.
    Delta { delta: f32 },
    /// Sink rate in still air.
    Drop { drop: f32 },
    DynamicLift { lift: f32 },
    ThermalLift { lift: f32 },
    Gradient { gradient: f32 },
    HeightAboveGround { height: f32 },
    TouchedGround { ground_touches: u32 },
    Crashed,
}

pub type TelemetryListener = Box<dyn FnMut(&FlightEvent) + Send + Sync>;

/// Synchronous observer list plus a pending queue.
///
/// Listeners see each event as it is published, inside the tick. The queue
/// keeps the same events for a host that forwards them once per frame; such
/// a host must drain it. Hosts that only listen turn the queue off.
pub struct TelemetryBus {
    listeners: Vec<TelemetryListener>,
    pending: Vec<FlightEvent>,
    queue_events: bool,
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TelemetryBus {
    pub fn new(queue_events: bool) -> Self {
        Self {
            listeners: Vec::new(),
            pending: Vec::new(),
            queue_events,
        }
    }

    pub fn subscribe(&mut self, listener: TelemetryListener) {
        self.listeners.push(listener);
    }

    pub fn publish(&mut self, event: FlightEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
        if self.queue_events {
            self.pending.push(event);
        }
    }

    pub fn drain(&mut self) -> impl Iterator<Item = FlightEvent> + '_ {
        self.pending.drain(..)
    }
}

impl Debug for TelemetryBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryBus")
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending.len())
            .field("queue_events", &self.queue_events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn listeners_and_queue_see_the_same_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut bus = TelemetryBus::default();
        bus.subscribe(Box::new(move |event: &FlightEvent| {
            sink.lock().expect("listener lock").push(*event);
        }));
        bus.publish(FlightEvent::Drop { drop: 1.0 });
        bus.publish(FlightEvent::Crashed);

        let published = vec![FlightEvent::Drop { drop: 1.0 }, FlightEvent::Crashed];
        assert_eq!(*seen.lock().expect("listener lock"), published);
        let drained: Vec<_> = bus.drain().collect();
        assert_eq!(drained, published);
        assert_eq!(bus.drain().count(), 0);
    }

    #[test]
    fn listener_only_bus_keeps_no_backlog() {
        let seen = Arc::new(Mutex::new(0_usize));
        let counter = Arc::clone(&seen);

        let mut bus = TelemetryBus::new(false);
        bus.subscribe(Box::new(move |_: &FlightEvent| {
            *counter.lock().expect("listener lock") += 1;
        }));
        for _ in 0..1_000 {
            bus.publish(FlightEvent::Delta { delta: -1.0 });
        }

        assert_eq!(*seen.lock().expect("listener lock"), 1_000);
        assert_eq!(bus.drain().count(), 0);
    }
}
