use std::collections::BTreeSet;

use gridturn_core::AudioCues;

/// Audio collaborator for headless runs: tracks playing cues and logs changes.
#[derive(Debug, Default)]
pub(crate) struct LoggingAudio {
    playing: BTreeSet<String>,
}

impl LoggingAudio {
    /// Names of the cues currently playing, in sorted order.
    pub(crate) fn playing(&self) -> impl Iterator<Item = &str> {
        self.playing.iter().map(String::as_str)
    }
}

impl AudioCues for LoggingAudio {
    fn play(&mut self, name: &str) {
        if self.playing.insert(name.to_owned()) {
            tracing::info!(cue = name, "ambience started");
        }
    }

    fn stop(&mut self, name: &str) {
        if self.playing.remove(name) {
            tracing::info!(cue = name, "ambience stopped");
        }
    }

    fn is_playing(&self, name: &str) -> bool {
        self.playing.contains(name)
    }
}
