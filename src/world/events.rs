use glam::DVec3;

use crate::world::body::BodyHandle;
use crate::world::PhysicsWorld;

/// One genuine impact detected during a physics step.
///
/// `impact_speed` is the magnitude of the relative velocity along the
/// contact normal sampled *before* resolution, so consumers observe the
/// incoming impact energy rather than the post-bounce residual. Events are
/// ephemeral: buffered during the step, delivered on flush, then dropped.
#[derive(Debug, Clone)]
pub struct CollisionEvent {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub normal: DVec3,
    pub impact_speed: f64,
    /// Simulation step index, the ordering tie-break across frames.
    pub step: u64,
}

/// Downstream consumer of collision events. Listeners run after the step
/// completes and get read-only world access; mutation requests must go
/// through the command queue instead.
pub trait CollisionListener {
    fn on_collision(&mut self, event: &CollisionEvent, world: &PhysicsWorld)
        -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Buffers events emitted during stepping and delivers them afterwards.
///
/// Dispatch order is ascending step index then emission order, stable for a
/// given input. A failing listener is reported and skipped; it never blocks
/// delivery to the others.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(SubscriptionId, Box<dyn CollisionListener>)>,
    buffered: Vec<CollisionEvent>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn CollisionListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Takes effect from the next flush; returns false for an unknown id.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    pub fn buffer(&mut self, events: impl IntoIterator<Item = CollisionEvent>) {
        self.buffered.extend(events);
    }

    pub fn pending(&self) -> usize {
        self.buffered.len()
    }

    pub fn flush(&mut self, world: &PhysicsWorld) {
        if self.buffered.is_empty() {
            return;
        }
        let events: Vec<CollisionEvent> = self.buffered.drain(..).collect();
        for event in &events {
            for (id, listener) in &mut self.listeners {
                if let Err(err) = listener.on_collision(event, world) {
                    log::warn!("collision listener {:?} failed: {err:#}", id);
                }
            }
        }
    }
}
