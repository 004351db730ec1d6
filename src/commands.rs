use std::collections::VecDeque;

use glam::DVec3;

use crate::sync::{ProxyHandle, Renderer, SyncLayer, VisualDescriptor};
use crate::world::body::{BodyDesc, BodyHandle};
use crate::world::PhysicsWorld;

/// Deferred world mutation. Input handlers and collision listeners are not
/// allowed to touch the world mid-cycle; they queue commands instead, and
/// the host drains the queue in the pre-step phase of the next frame.
pub enum SimCommand {
    Spawn {
        body: BodyDesc,
        visual: VisualDescriptor,
    },
    ApplyImpulse {
        body: BodyHandle,
        impulse: DVec3,
        point_local: DVec3,
    },
    Remove {
        body: BodyHandle,
    },
}

#[derive(Default)]
pub struct CommandQueue {
    pending: VecDeque<SimCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: SimCommand) {
        self.pending.push_back(command);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Applies every queued command in order. Individual failures (a stale
    /// handle, a renderer refusing a proxy) are reported and skipped; one
    /// bad request never blocks the rest of the queue. Returns the handles
    /// of bodies spawned this drain.
    pub fn drain_into<R: Renderer>(
        &mut self,
        world: &mut PhysicsWorld,
        sync: &mut SyncLayer,
        renderer: &mut R,
    ) -> Vec<(BodyHandle, ProxyHandle)> {
        let mut spawned = Vec::new();
        while let Some(command) = self.pending.pop_front() {
            match command {
                SimCommand::Spawn { body, visual } => {
                    match sync.spawn(world, renderer, body, &visual) {
                        Ok(pair) => spawned.push(pair),
                        Err(err) => log::warn!("spawn command failed: {err}"),
                    }
                }
                SimCommand::ApplyImpulse {
                    body,
                    impulse,
                    point_local,
                } => {
                    if let Err(err) = world.apply_impulse(body, impulse, point_local) {
                        log::warn!("impulse command dropped: {err}");
                    }
                }
                SimCommand::Remove { body } => {
                    if let Err(err) = sync.despawn(world, renderer, body) {
                        log::warn!("remove command dropped: {err}");
                    }
                }
            }
        }
        spawned
    }
}
