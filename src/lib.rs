pub mod audio;
pub mod commands;
pub mod config;
pub mod frame;
pub mod sync;
pub mod world;

// Re-export commonly used types
pub use audio::{AudioError, AudioOutput, ImpactAudio, LoggingOutput, RodioOutput};
pub use commands::{CommandQueue, SimCommand};
pub use config::{ConfigError, EngineConfig, ImpactAudioConfig, SimConfig};
pub use frame::FrameDriver;
pub use sync::{ProxyHandle, Renderer, SyncError, SyncLayer, VisualDescriptor};
pub use world::body::{BodyDesc, BodyError, BodyHandle, RigidBody};
pub use world::collision::{AnalyticBackend, CollisionBackend, ContactGeom};
pub use world::events::{CollisionEvent, CollisionListener, EventBus, SubscriptionId};
pub use world::material::{ContactRule, MaterialDesc, MaterialId, MaterialRegistry, RegistryError};
pub use world::shape::{Aabb, Shape};
pub use world::{PhysicsWorld, StepError};
