use std::collections::HashMap;
use std::sync::Arc;

use glam::{DQuat, DVec3};
use thiserror::Error;

use crate::world::body::{BodyDesc, BodyError, BodyHandle};
use crate::world::shape::Shape;
use crate::world::PhysicsWorld;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("body {0:?} is already paired with a proxy")]
    AlreadyPaired(BodyHandle),

    #[error("spawn rolled back: {source}")]
    SpawnRollback {
        #[source]
        source: anyhow::Error,
    },
}

/// Renderer-side identity for a visual proxy. The renderer owns the proxy;
/// the sync layer only holds the pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyHandle(pub u64);

/// What the renderer needs to build a proxy for a body.
#[derive(Debug, Clone)]
pub struct VisualDescriptor {
    pub shape: Arc<Shape>,
    pub label: String,
}

/// External renderer collaborator. Consumes pose updates once per frame and
/// owns proxy lifetimes.
pub trait Renderer {
    fn create_proxy(&mut self, descriptor: &VisualDescriptor) -> anyhow::Result<ProxyHandle>;
    fn destroy_proxy(&mut self, proxy: ProxyHandle);
    fn update_proxy(&mut self, proxy: ProxyHandle, position: DVec3, orientation: DQuat);
}

/// Pairing table between physics bodies and visual proxies.
///
/// One proxy per body. Pairings for bodies that have been removed from the
/// world are pruned silently on the next `apply`; the proxies themselves
/// belong to the renderer and are only destroyed through `despawn`.
#[derive(Default)]
pub struct SyncLayer {
    pairs: HashMap<BodyHandle, ProxyHandle>,
}

impl SyncLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pair(&mut self, body: BodyHandle, proxy: ProxyHandle) -> Result<(), SyncError> {
        if self.pairs.contains_key(&body) {
            return Err(SyncError::AlreadyPaired(body));
        }
        self.pairs.insert(body, proxy);
        Ok(())
    }

    /// Idempotent: unpairing an unknown handle is a no-op since cleanup
    /// paths may race with a manual unpair.
    pub fn unpair(&mut self, body: BodyHandle) {
        self.pairs.remove(&body);
    }

    pub fn proxy_for(&self, body: BodyHandle) -> Option<ProxyHandle> {
        self.pairs.get(&body).copied()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Copies each live paired body's pose to its proxy. Called once per
    /// rendered frame after all physics steps for that frame.
    pub fn apply<R: Renderer>(&mut self, world: &PhysicsWorld, renderer: &mut R) {
        self.pairs.retain(|&body, &mut proxy| match world.body(body) {
            Some(state) => {
                renderer.update_proxy(proxy, state.position, state.orientation);
                true
            }
            None => false,
        });
    }

    /// Creates a body, its proxy, and the pairing as one logical operation.
    /// If the proxy cannot be created the body is rolled back so no
    /// physics body exists without a visual counterpart.
    pub fn spawn<R: Renderer>(
        &mut self,
        world: &mut PhysicsWorld,
        renderer: &mut R,
        body: BodyDesc,
        visual: &VisualDescriptor,
    ) -> Result<(BodyHandle, ProxyHandle), SyncError> {
        let handle = world.add_body(body).map_err(|err| SyncError::SpawnRollback {
            source: err.into(),
        })?;
        match renderer.create_proxy(visual) {
            Ok(proxy) => {
                // A fresh handle cannot already be paired.
                self.pairs.insert(handle, proxy);
                Ok((handle, proxy))
            }
            Err(source) => {
                if let Err(err) = world.remove_body(handle) {
                    log::error!("rollback of spawned body failed: {err}");
                }
                Err(SyncError::SpawnRollback { source })
            }
        }
    }

    /// Removes the body, destroys its proxy, and drops the pairing.
    pub fn despawn<R: Renderer>(
        &mut self,
        world: &mut PhysicsWorld,
        renderer: &mut R,
        body: BodyHandle,
    ) -> Result<(), BodyError> {
        world.remove_body(body)?;
        if let Some(proxy) = self.pairs.remove(&body) {
            renderer.destroy_proxy(proxy);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::bail;

    use super::*;

    /// In-memory renderer recording every call, used across the test suite.
    #[derive(Default)]
    pub struct RecordingRenderer {
        pub next_id: u64,
        pub live: Vec<ProxyHandle>,
        pub updates: Rc<RefCell<Vec<(ProxyHandle, DVec3)>>>,
        pub fail_creates: bool,
    }

    impl Renderer for RecordingRenderer {
        fn create_proxy(&mut self, _descriptor: &VisualDescriptor) -> anyhow::Result<ProxyHandle> {
            if self.fail_creates {
                bail!("renderer out of proxy slots");
            }
            let proxy = ProxyHandle(self.next_id);
            self.next_id += 1;
            self.live.push(proxy);
            Ok(proxy)
        }

        fn destroy_proxy(&mut self, proxy: ProxyHandle) {
            self.live.retain(|&p| p != proxy);
        }

        fn update_proxy(&mut self, proxy: ProxyHandle, position: DVec3, _orientation: DQuat) {
            self.updates.borrow_mut().push((proxy, position));
        }
    }
}
