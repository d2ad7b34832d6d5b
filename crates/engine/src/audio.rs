use tracing::debug;

use crate::world::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(pub u16);

/// Playback collaborator. Spatialisation is the sink's business; callers only
/// pass the world position the cue originates from, when it has one.
pub trait SoundSink {
    fn play(&mut self, sound: SoundId, position: Option<Vec3>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSound;

impl SoundSink for NullSound {
    fn play(&mut self, _sound: SoundId, _position: Option<Vec3>) {}
}

/// Logs every cue; useful when running without an audio backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSound;

impl SoundSink for TracingSound {
    fn play(&mut self, sound: SoundId, position: Option<Vec3>) {
        match position {
            Some(position) => debug!(
                sound = sound.0,
                x = position.x,
                y = position.y,
                z = position.z,
                "sound_cue"
            ),
            None => debug!(sound = sound.0, "sound_cue"),
        }
    }
}

/// Keeps cues in memory so tests can assert on what was played.
#[derive(Debug, Default, Clone)]
pub struct RecordedSound {
    pub cues: Vec<(SoundId, Option<Vec3>)>,
}

impl SoundSink for RecordedSound {
    fn play(&mut self, sound: SoundId, position: Option<Vec3>) {
        self.cues.push((sound, position));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_sink_keeps_order_and_positions() {
        let mut sink = RecordedSound::default();
        sink.play(SoundId(2), None);
        sink.play(SoundId(1), Some(Vec3::new(1.0, 2.0, 0.5)));

        assert_eq!(sink.cues.len(), 2);
        assert_eq!(sink.cues[0], (SoundId(2), None));
        assert_eq!(sink.cues[1].1, Some(Vec3::new(1.0, 2.0, 0.5)));
    }

    #[test]
    fn trait_objects_accept_every_sink() {
        let mut sinks: Vec<Box<dyn SoundSink>> = vec![
            Box::new(NullSound),
            Box::new(TracingSound),
            Box::new(RecordedSound::default()),
        ];
        for sink in sinks.iter_mut() {
            sink.play(SoundId(0), None);
        }
    }
}
