//! Physics world: body storage, fixed-step integration, and contact
//! resolution.

pub mod body;
pub mod collision;
pub mod events;
pub mod material;
pub mod shape;

use glam::DVec3;
use thiserror::Error;

use body::{BodyDesc, BodyError, BodyHandle, BodyStore, RigidBody};
use collision::{AnalyticBackend, CollisionBackend};
use events::CollisionEvent;
use material::{ContactRule, MaterialRegistry};

use crate::config::SimConfig;

/// Fraction of remaining penetration corrected per step, with a small slop
/// so resting bodies do not jitter.
const CORRECTION_FACTOR: f64 = 0.8;
const PENETRATION_SLOP: f64 = 0.005;

/// Rule used when a contact resolves against materials that have neither a
/// specific nor a default rule. Contact resolution never fails mid-step.
const FALLBACK_RULE: ContactRule = ContactRule {
    friction: 0.3,
    restitution: 0.0,
};

#[derive(Debug, Error)]
pub enum StepError {
    #[error("step() called while a step is already in progress")]
    Reentrant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepPhase {
    Idle,
    Integrating,
    ResolvingContacts,
}

/// Owns gravity, the body store, and the material registry, and advances
/// the simulation one fixed step at a time. `step` is the sole mutating
/// entry point; everything else either configures the world between frames
/// or reads it.
pub struct PhysicsWorld {
    gravity: DVec3,
    fixed_dt: f64,
    contact_epsilon: f64,
    step_index: u64,
    phase: StepPhase,
    store: BodyStore,
    registry: MaterialRegistry,
    backend: Box<dyn CollisionBackend>,
    pending_events: Vec<CollisionEvent>,
}

impl PhysicsWorld {
    pub fn new(config: &SimConfig) -> Self {
        Self::with_backend(config, Box::new(AnalyticBackend))
    }

    pub fn with_backend(config: &SimConfig, backend: Box<dyn CollisionBackend>) -> Self {
        Self {
            gravity: config.gravity,
            fixed_dt: config.fixed_dt,
            contact_epsilon: config.contact_epsilon,
            step_index: 0,
            phase: StepPhase::Idle,
            store: BodyStore::new(),
            registry: MaterialRegistry::new(),
            backend,
            pending_events: Vec::new(),
        }
    }

    pub fn gravity(&self) -> DVec3 {
        self.gravity
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    /// Monotonic step counter, stamped onto events for ordering.
    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub fn materials(&self) -> &MaterialRegistry {
        &self.registry
    }

    pub fn materials_mut(&mut self) -> &mut MaterialRegistry {
        &mut self.registry
    }

    pub fn add_body(&mut self, desc: BodyDesc) -> Result<BodyHandle, BodyError> {
        self.store.add_body(desc)
    }

    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<(), BodyError> {
        self.store.remove_body(handle).map(|_| ())
    }

    pub fn apply_impulse(
        &mut self,
        handle: BodyHandle,
        impulse: DVec3,
        point_local: DVec3,
    ) -> Result<(), BodyError> {
        self.store.apply_impulse(handle, impulse, point_local)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.store.get(handle)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.store.contains(handle)
    }

    pub fn body_count(&self) -> usize {
        self.store.len()
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.store.iter()
    }

    /// Drains events emitted by completed steps, in emission order.
    pub fn take_events(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Advances the simulation by one fixed timestep: queued impulses and
    /// gravity, then semi-implicit Euler integration, then contact
    /// resolution. Impacts faster than the contact epsilon are recorded for
    /// the event bus.
    pub fn step(&mut self) -> Result<(), StepError> {
        if self.phase != StepPhase::Idle {
            return Err(StepError::Reentrant);
        }
        self.phase = StepPhase::Integrating;
        self.integrate();
        self.phase = StepPhase::ResolvingContacts;
        self.resolve_contacts();
        self.step_index += 1;
        self.phase = StepPhase::Idle;
        Ok(())
    }

    fn integrate(&mut self) {
        let h = self.fixed_dt;
        let gravity = self.gravity;
        for (_, body) in self.store.iter_mut() {
            if body.is_static() {
                body.queued_impulse = DVec3::ZERO;
                continue;
            }
            // Velocity first, then position (semi-implicit Euler).
            body.velocity += body.queued_impulse * body.inv_mass();
            body.queued_impulse = DVec3::ZERO;
            body.velocity += gravity * h;
            body.position += body.velocity * h;
        }
    }

    fn resolve_contacts(&mut self) {
        let handles = self.store.handles();
        for i in 0..handles.len() {
            for j in (i + 1)..handles.len() {
                let (ha, hb) = (handles[i], handles[j]);
                let (a, b) = match (self.store.get(ha), self.store.get(hb)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => continue,
                };
                if a.is_static() && b.is_static() {
                    continue;
                }
                // Broad phase: skip pairs whose bounds cannot touch.
                // Unbounded shapes (planes) always pass.
                if let (Some(ba), Some(bb)) = (a.aabb(), b.aabb()) {
                    if !ba.intersects(&bb) {
                        continue;
                    }
                }
                let Some(geom) = self.backend.contact(a, b) else {
                    continue;
                };
                let rule = self.registry.resolve(a.material, b.material).unwrap_or_else(|_| {
                    log::warn!(
                        "no contact rule for materials {:?}/{:?}, using fallback",
                        a.material,
                        b.material
                    );
                    FALLBACK_RULE
                });
                let emits = a.casts_contact || b.casts_contact;
                let Some((a, b)) = self.store.pair_mut(ha, hb) else {
                    continue;
                };
                let impact_speed = resolve_contact(a, b, geom.normal, geom.depth, rule);
                if emits && impact_speed > self.contact_epsilon {
                    self.pending_events.push(CollisionEvent {
                        body_a: ha,
                        body_b: hb,
                        normal: geom.normal,
                        impact_speed,
                        step: self.step_index,
                    });
                }
            }
        }
    }

    #[cfg(test)]
    fn force_phase_for_test(&mut self, mid_step: bool) {
        self.phase = if mid_step {
            StepPhase::Integrating
        } else {
            StepPhase::Idle
        };
    }
}

/// Impulse-based response for a single contact. Returns the pre-resolution
/// approach speed along the normal (non-negative; zero when separating).
fn resolve_contact(
    a: &mut RigidBody,
    b: &mut RigidBody,
    normal: DVec3,
    depth: f64,
    rule: ContactRule,
) -> f64 {
    let inv_sum = a.inv_mass() + b.inv_mass();
    if inv_sum == 0.0 {
        return 0.0;
    }

    let relative = b.velocity - a.velocity;
    let approach = relative.dot(normal);
    let impact_speed = (-approach).max(0.0);

    if approach < 0.0 {
        // Normal impulse scaled by restitution.
        let jn = -(1.0 + rule.restitution) * approach / inv_sum;
        a.velocity -= normal * (jn * a.inv_mass());
        b.velocity += normal * (jn * b.inv_mass());

        // Coulomb friction: tangential impulse clamped by mu * jn.
        let relative = b.velocity - a.velocity;
        let tangent_vel = relative - normal * relative.dot(normal);
        let tangent_speed = tangent_vel.length();
        if tangent_speed > 1e-9 {
            let tangent = tangent_vel / tangent_speed;
            let jt = (tangent_speed / inv_sum).min(rule.friction * jn);
            a.velocity += tangent * (jt * a.inv_mass());
            b.velocity -= tangent * (jt * b.inv_mass());
        }
    }

    // Positional correction keeps stacks from sinking without adding
    // measurable energy.
    let correction = (depth - PENETRATION_SLOP).max(0.0) * CORRECTION_FACTOR / inv_sum;
    a.position -= normal * (correction * a.inv_mass());
    b.position += normal * (correction * b.inv_mass());

    impact_speed
}
