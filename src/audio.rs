use std::collections::HashMap;
use std::time::Duration;

use rodio::source::{SineWave, Source};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use thiserror::Error;

use crate::config::ImpactAudioConfig;
use crate::world::events::{CollisionEvent, CollisionListener};
use crate::world::PhysicsWorld;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    Device,
}

/// Fire-and-forget playback collaborator. Implementations must never block;
/// the physics step cannot wait on an output device.
pub trait AudioOutput {
    fn play(&mut self, sound: &str, volume: f64);
}

/// Tone-synthesis output backed by a rodio device. Each sound id maps to a
/// frequency; playback is a short detached sine blip, so a missing or slow
/// device never stalls the caller.
pub struct RodioOutput {
    // Dropping the stream kills playback, so it rides along unused.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    tones: HashMap<String, f32>,
    blip: Duration,
}

impl RodioOutput {
    pub fn new() -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default().map_err(|_| AudioError::Device)?;
        Ok(Self {
            _stream: stream,
            handle,
            tones: HashMap::new(),
            blip: Duration::from_millis(150),
        })
    }

    pub fn register_tone(&mut self, sound: &str, frequency_hz: f32) {
        self.tones.insert(sound.to_string(), frequency_hz);
    }
}

impl AudioOutput for RodioOutput {
    fn play(&mut self, sound: &str, volume: f64) {
        let frequency = self.tones.get(sound).copied().unwrap_or(440.0);
        match Sink::try_new(&self.handle) {
            Ok(sink) => {
                let source = SineWave::new(frequency)
                    .take_duration(self.blip)
                    .amplify(volume.clamp(0.0, 1.0) as f32);
                sink.append(source);
                sink.detach();
            }
            Err(err) => log::warn!("audio playback skipped: {err}"),
        }
    }
}

/// Output that only logs, for headless hosts and environments without an
/// audio device.
#[derive(Default)]
pub struct LoggingOutput;

impl AudioOutput for LoggingOutput {
    fn play(&mut self, sound: &str, volume: f64) {
        log::info!("audio: {sound} at volume {volume:.2}");
    }
}

/// Collision listener that turns impact energy into sound.
///
/// Impacts above the configured threshold play at
/// `volume = clamp(impact_speed / normalization, 0, 1)`; softer contacts
/// stay silent. The sound id comes from the struck materials' sound tags
/// when present, else the configured fallback.
pub struct ImpactAudio<A: AudioOutput> {
    output: A,
    config: ImpactAudioConfig,
}

impl<A: AudioOutput> ImpactAudio<A> {
    pub fn new(output: A, config: ImpactAudioConfig) -> Self {
        Self { output, config }
    }
}

impl<A: AudioOutput> CollisionListener for ImpactAudio<A> {
    fn on_collision(
        &mut self,
        event: &CollisionEvent,
        world: &PhysicsWorld,
    ) -> anyhow::Result<()> {
        if event.impact_speed <= self.config.threshold {
            return Ok(());
        }
        let volume = (event.impact_speed / self.config.normalization).clamp(0.0, 1.0);
        let sound = [event.body_a, event.body_b]
            .into_iter()
            .filter_map(|handle| world.body(handle))
            .find_map(|body| world.materials().sound_tag(body.material))
            .unwrap_or(&self.config.sound);
        self.output.play(sound, volume);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use glam::DVec3;

    use super::*;
    use crate::config::SimConfig;
    use crate::world::body::BodyDesc;
    use crate::world::material::MaterialDesc;
    use crate::world::shape::Shape;

    #[derive(Default, Clone)]
    struct MockOutput {
        played: Rc<RefCell<Vec<(String, f64)>>>,
    }

    impl AudioOutput for MockOutput {
        fn play(&mut self, sound: &str, volume: f64) {
            self.played.borrow_mut().push((sound.to_string(), volume));
        }
    }

    fn world_with_sphere(sound: Option<&str>) -> (PhysicsWorld, CollisionEvent) {
        let mut world = PhysicsWorld::new(&SimConfig::default());
        let desc = MaterialDesc {
            sound: sound.map(str::to_string),
        };
        let material = world.materials_mut().register_with("metal", desc).unwrap();
        let handle = world
            .add_body(BodyDesc::new(Arc::new(Shape::sphere(1.0)), material))
            .unwrap();
        let event = CollisionEvent {
            body_a: handle,
            body_b: handle,
            normal: DVec3::Y,
            impact_speed: 10.0,
            step: 0,
        };
        (world, event)
    }

    #[test]
    fn test_volume_scales_linearly_and_clamps() {
        let (world, mut event) = world_with_sphere(None);
        let output = MockOutput::default();
        let mut listener = ImpactAudio::new(output.clone(), ImpactAudioConfig::default());

        listener.on_collision(&event, &world).unwrap();
        event.impact_speed = 80.0;
        listener.on_collision(&event, &world).unwrap();

        let played = output.played.borrow();
        assert_eq!(played.len(), 2);
        assert!((played[0].1 - 0.5).abs() < 1e-12);
        assert_eq!(played[1].1, 1.0);
    }

    #[test]
    fn test_soft_contact_stays_silent() {
        let (world, mut event) = world_with_sphere(None);
        event.impact_speed = 0.9;
        let output = MockOutput::default();
        let mut listener = ImpactAudio::new(output.clone(), ImpactAudioConfig::default());
        listener.on_collision(&event, &world).unwrap();
        assert!(output.played.borrow().is_empty());
    }

    #[test]
    fn test_material_sound_tag_wins_over_fallback() {
        let (world, event) = world_with_sphere(Some("clang"));
        let output = MockOutput::default();
        let mut listener = ImpactAudio::new(output.clone(), ImpactAudioConfig::default());
        listener.on_collision(&event, &world).unwrap();
        assert_eq!(output.played.borrow()[0].0, "clang");
    }

    #[test]
    fn test_fallback_sound_used_without_tag() {
        let (world, event) = world_with_sphere(None);
        let output = MockOutput::default();
        let mut listener = ImpactAudio::new(output.clone(), ImpactAudioConfig::default());
        listener.on_collision(&event, &world).unwrap();
        assert_eq!(output.played.borrow()[0].0, "impact");
    }
}
