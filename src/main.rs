use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use glam::{DQuat, DVec3};
use log::{info, LevelFilter};
use rand::Rng;
use simple_logger::SimpleLogger;

use tumble::{
    BodyDesc, CollisionListener, CommandQueue, ContactRule, EngineConfig, EventBus, FrameDriver,
    ImpactAudio, LoggingOutput, PhysicsWorld, ProxyHandle, Renderer, RodioOutput, Shape,
    SimCommand, SyncLayer, VisualDescriptor,
};

/// Renderer stand-in for the headless demo: logs pose updates instead of
/// drawing them.
#[derive(Default)]
struct ConsoleRenderer {
    next_id: u64,
}

impl Renderer for ConsoleRenderer {
    fn create_proxy(&mut self, descriptor: &VisualDescriptor) -> Result<ProxyHandle> {
        let proxy = ProxyHandle(self.next_id);
        self.next_id += 1;
        info!("proxy {:?} created for {}", proxy, descriptor.label);
        Ok(proxy)
    }

    fn destroy_proxy(&mut self, proxy: ProxyHandle) {
        info!("proxy {:?} destroyed", proxy);
    }

    fn update_proxy(&mut self, proxy: ProxyHandle, position: DVec3, _orientation: DQuat) {
        log::debug!("proxy {:?} at {:.2?}", proxy, position);
    }
}

fn impact_listener(config: &EngineConfig) -> Box<dyn CollisionListener> {
    match RodioOutput::new() {
        Ok(mut output) => {
            output.register_tone("metal_hit", 660.0);
            Box::new(ImpactAudio::new(output, config.impact_audio.clone()))
        }
        Err(err) => {
            info!("audio device unavailable ({err}), falling back to log output");
            Box::new(ImpactAudio::new(
                LoggingOutput,
                config.impact_audio.clone(),
            ))
        }
    }
}

fn main() -> Result<()> {
    SimpleLogger::new().with_level(LevelFilter::Info).init()?;
    let config = EngineConfig::default();

    let mut world = PhysicsWorld::new(&config.sim);
    let cube_material = world.materials_mut().register_with(
        "cube",
        tumble::MaterialDesc {
            sound: Some("metal_hit".to_string()),
        },
    )?;
    let floor_material = world.materials_mut().register("floor")?;
    world.materials_mut().register_contact_rule(
        cube_material,
        floor_material,
        ContactRule::new(0.1, 0.7),
    );
    world
        .materials_mut()
        .set_default_rule(ContactRule::new(0.1, 0.7));

    // Static floor five units below the origin.
    world.add_body(
        BodyDesc::fixed(Arc::new(Shape::ground_plane()), floor_material)
            .with_position(DVec3::new(0.0, -5.0, 0.0)),
    )?;

    let mut driver = FrameDriver::new(&config.sim);
    let mut bus = EventBus::new();
    let mut sync = SyncLayer::new();
    let mut renderer = ConsoleRenderer::default();
    let mut queue = CommandQueue::new();
    bus.subscribe(impact_listener(&config));

    let cube_shape = Arc::new(Shape::cuboid(DVec3::splat(0.5)));
    let mut rng = rand::thread_rng();
    let mut last_frame = Instant::now();
    let started = Instant::now();
    let mut frame: u64 = 0;

    info!("dropping cubes for five seconds...");
    while started.elapsed() < Duration::from_secs(5) {
        // A click would enqueue a spawn; here a timer stands in for input.
        if frame % 45 == 0 {
            let jitter = DVec3::new(rng.gen_range(-0.5..0.5), 0.0, rng.gen_range(-0.5..0.5));
            queue.push(SimCommand::Spawn {
                body: BodyDesc::new(cube_shape.clone(), cube_material)
                    .with_position(DVec3::new(0.0, 5.0, 0.0) + jitter),
                visual: VisualDescriptor {
                    shape: cube_shape.clone(),
                    label: format!("cube-{frame}"),
                },
            });
        }
        let spawned = queue.drain_into(&mut world, &mut sync, &mut renderer);
        for (body, _) in spawned {
            // Sideways kick so the cubes scatter instead of stacking.
            world.apply_impulse(body, DVec3::new(1.5, 0.0, 0.0), DVec3::ZERO)?;
        }

        let now = Instant::now();
        let elapsed = now - last_frame;
        last_frame = now;

        driver.advance(&mut world, &mut bus, elapsed)?;
        sync.apply(&world, &mut renderer);

        frame += 1;
        std::thread::sleep(Duration::from_millis(16));
    }

    info!(
        "done: {} bodies, {} pairings after {} frames",
        world.body_count(),
        sync.pair_count(),
        frame
    );
    Ok(())
}
