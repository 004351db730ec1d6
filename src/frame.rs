use std::time::Duration;

use crate::config::SimConfig;
use crate::world::events::EventBus;
use crate::world::{PhysicsWorld, StepError};

/// Fixed-timestep accumulator decoupling simulation rate from display rate.
///
/// Each rendered frame reports its wall-clock delta; the driver runs as
/// many whole fixed steps as the accumulated time allows and carries the
/// remainder forward. Elapsed time beyond `max_frame_delta` is discarded
/// rather than caught up, which bounds worst-case steps per frame.
pub struct FrameDriver {
    fixed_dt: f64,
    max_frame_delta: f64,
    accumulator: f64,
}

impl FrameDriver {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            fixed_dt: config.fixed_dt,
            max_frame_delta: config.max_frame_delta,
            accumulator: 0.0,
        }
    }

    pub fn accumulated(&self) -> f64 {
        self.accumulator
    }

    /// Consumes one frame's elapsed time: steps the world, then buffers and
    /// flushes that frame's collision events. Returns the number of steps
    /// taken.
    pub fn advance(
        &mut self,
        world: &mut PhysicsWorld,
        bus: &mut EventBus,
        elapsed: Duration,
    ) -> Result<u32, StepError> {
        self.accumulator += elapsed.as_secs_f64().min(self.max_frame_delta);
        let mut steps = 0;
        while self.accumulator >= self.fixed_dt {
            world.step()?;
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }
        bus.buffer(world.take_events());
        bus.flush(world);
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (FrameDriver, PhysicsWorld, EventBus) {
        let config = SimConfig::default();
        (
            FrameDriver::new(&config),
            PhysicsWorld::new(&config),
            EventBus::new(),
        )
    }

    #[test]
    fn test_whole_steps_with_carry() {
        let (mut driver, mut world, mut bus) = fixture();
        // 2.5 fixed steps worth of time: two steps now, half a step kept.
        let elapsed = Duration::from_secs_f64(2.5 / 60.0);
        let steps = driver.advance(&mut world, &mut bus, elapsed).unwrap();
        assert_eq!(steps, 2);
        assert!((driver.accumulated() - 0.5 / 60.0).abs() < 1e-9);
        assert_eq!(world.step_index(), 2);

        // The carried remainder tops up the next frame.
        let steps = driver.advance(&mut world, &mut bus, elapsed).unwrap();
        assert_eq!(steps, 3);
    }

    #[test]
    fn test_short_frame_takes_no_step() {
        let (mut driver, mut world, mut bus) = fixture();
        let steps = driver
            .advance(&mut world, &mut bus, Duration::from_secs_f64(0.005))
            .unwrap();
        assert_eq!(steps, 0);
        assert_eq!(world.step_index(), 0);
    }

    #[test]
    fn test_long_stall_is_clamped_not_caught_up() {
        let (mut driver, mut world, mut bus) = fixture();
        // A 10 second hitch must not trigger a 600-step catch-up spiral.
        let steps = driver
            .advance(&mut world, &mut bus, Duration::from_secs(10))
            .unwrap();
        let bound = (SimConfig::default().max_frame_delta / SimConfig::default().fixed_dt).ceil();
        assert!(steps as f64 <= bound);
    }
}
