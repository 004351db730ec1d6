use std::sync::Arc;

use glam::{DQuat, DVec3};
use thiserror::Error;

use crate::world::material::MaterialId;
use crate::world::shape::{Aabb, Shape};

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("body mass must be >= 0, got {0}")]
    InvalidMass(f64),

    #[error("unknown or stale body handle {0:?}")]
    UnknownHandle(BodyHandle),

    #[error("static body {0:?} cannot receive forces")]
    StaticBodyMutation(BodyHandle),
}

/// Stable handle for a body in the store. Generational: once a body is
/// removed its handle goes stale and is never re-issued for another body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// A simulated rigid body. Mass 0 marks a static body: it participates in
/// contacts as immovable and is never integrated.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub shape: Arc<Shape>,
    pub material: MaterialId,
    pub position: DVec3,
    pub orientation: DQuat,
    pub velocity: DVec3,
    pub mass: f64,
    pub casts_contact: bool,
    pub(crate) queued_impulse: DVec3,
}

impl RigidBody {
    pub fn is_static(&self) -> bool {
        self.mass == 0.0
    }

    pub fn inv_mass(&self) -> f64 {
        if self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    pub fn aabb(&self) -> Option<Aabb> {
        self.shape.aabb(self.position, self.orientation)
    }
}

/// Construction parameters for [`BodyStore::add_body`].
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub shape: Arc<Shape>,
    pub material: MaterialId,
    pub position: DVec3,
    pub orientation: DQuat,
    pub velocity: DVec3,
    pub mass: f64,
    pub casts_contact: bool,
}

impl BodyDesc {
    pub fn new(shape: Arc<Shape>, material: MaterialId) -> Self {
        Self {
            shape,
            material,
            position: DVec3::ZERO,
            orientation: DQuat::IDENTITY,
            velocity: DVec3::ZERO,
            mass: 1.0,
            casts_contact: true,
        }
    }

    /// Static variant: mass 0, never integrated.
    pub fn fixed(shape: Arc<Shape>, material: MaterialId) -> Self {
        Self {
            mass: 0.0,
            ..Self::new(shape, material)
        }
    }

    pub fn with_position(mut self, position: DVec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: DQuat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_velocity(mut self, velocity: DVec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_casts_contact(mut self, casts_contact: bool) -> Self {
        self.casts_contact = casts_contact;
        self
    }
}

struct Slot {
    generation: u32,
    body: Option<RigidBody>,
}

/// Generational arena owning every rigid body in a world.
#[derive(Default)]
pub struct BodyStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    count: usize,
}

impl BodyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_body(&mut self, desc: BodyDesc) -> Result<BodyHandle, BodyError> {
        if desc.mass < 0.0 {
            return Err(BodyError::InvalidMass(desc.mass));
        }
        let body = RigidBody {
            shape: desc.shape,
            material: desc.material,
            position: desc.position,
            orientation: desc.orientation,
            velocity: desc.velocity,
            mass: desc.mass,
            casts_contact: desc.casts_contact,
            queued_impulse: DVec3::ZERO,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].body = Some(body);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    body: Some(body),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.count += 1;
        Ok(BodyHandle {
            index,
            generation: self.slots[index as usize].generation,
        })
    }

    /// Removal is not idempotent: a second removal through the same handle
    /// reports the handle as stale.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody, BodyError> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation)
            .ok_or(BodyError::UnknownHandle(handle))?;
        let body = slot.body.take().ok_or(BodyError::UnknownHandle(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.count -= 1;
        Ok(body)
    }

    /// Queues an instantaneous impulse consumed on the next integration
    /// step. Only the linear component is integrated; the application point
    /// is accepted for interface symmetry but bodies carry no angular
    /// velocity.
    pub fn apply_impulse(
        &mut self,
        handle: BodyHandle,
        impulse: DVec3,
        _point_local: DVec3,
    ) -> Result<(), BodyError> {
        let body = self
            .get_mut(handle)
            .ok_or(BodyError::UnknownHandle(handle))?;
        if body.is_static() {
            return Err(BodyError::StaticBodyMutation(handle));
        }
        body.queued_impulse += impulse;
        Ok(())
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.slots
            .get(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_ref())
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_mut())
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Live handles in slot-index order. The fixed order keeps contact
    /// discovery, and therefore event dispatch, deterministic.
    pub fn handles(&self) -> Vec<BodyHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.body.is_some())
            .map(|(index, slot)| BodyHandle {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.body.as_ref().map(|body| {
                (
                    BodyHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    body,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut RigidBody)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.body.as_mut().map(move |body| {
                (
                    BodyHandle {
                        index: index as u32,
                        generation,
                    },
                    body,
                )
            })
        })
    }

    /// Mutable access to two distinct bodies at once, as needed by contact
    /// resolution.
    pub fn pair_mut(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
    ) -> Option<(&mut RigidBody, &mut RigidBody)> {
        if a.index == b.index || !self.contains(a) || !self.contains(b) {
            return None;
        }
        let (lo, hi) = (a.index().min(b.index()), a.index().max(b.index()));
        let (left, right) = self.slots.split_at_mut(hi);
        let lo_body = left[lo].body.as_mut()?;
        let hi_body = right[0].body.as_mut()?;
        if a.index() < b.index() {
            Some((lo_body, hi_body))
        } else {
            Some((hi_body, lo_body))
        }
    }
}
