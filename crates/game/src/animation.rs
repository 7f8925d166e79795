//! Animation clip playback state.
//!
//! The mixer is the driver-side view of an avatar's animation groups: which
//! clips play, whether they loop, and at what weight. The renderer samples it
//! each frame.

/// Index of a clip in its mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct ClipState {
    pub name: String,
    pub playing: bool,
    pub looping: bool,
    pub weight: f32,
    /// Number of times `play` started this clip from the top.
    pub starts: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ClipMixer {
    clips: Vec<ClipState>,
}

impl ClipMixer {
    /// Mixer with every named clip stopped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            clips: names
                .into_iter()
                .map(|name| ClipState {
                    name: name.into(),
                    playing: false,
                    looping: false,
                    weight: 1.0,
                    starts: 0,
                })
                .collect(),
        }
    }

    pub fn find(&self, name: &str) -> Option<ClipId> {
        self.clips.iter().position(|c| c.name == name).map(ClipId)
    }

    pub fn play(&mut self, id: ClipId, looping: bool) {
        if let Some(clip) = self.clips.get_mut(id.0) {
            clip.playing = true;
            clip.looping = looping;
            clip.starts += 1;
        }
    }

    pub fn stop(&mut self, id: ClipId) {
        if let Some(clip) = self.clips.get_mut(id.0) {
            clip.playing = false;
        }
    }

    pub fn stop_all(&mut self) {
        for clip in &mut self.clips {
            clip.playing = false;
        }
    }

    pub fn set_weight(&mut self, id: ClipId, weight: f32) {
        if let Some(clip) = self.clips.get_mut(id.0) {
            clip.weight = weight.clamp(0.0, 1.0);
        }
    }

    pub fn clip(&self, id: ClipId) -> Option<&ClipState> {
        self.clips.get(id.0)
    }

    pub fn by_name(&self, name: &str) -> Option<&ClipState> {
        self.clips.iter().find(|c| c.name == name)
    }

    pub fn playing(&self) -> impl Iterator<Item = &ClipState> {
        self.clips.iter().filter(|c| c.playing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_and_stop_by_name() {
        let mut mixer = ClipMixer::from_names(["idle", "walk"]);
        let walk = mixer.find("walk").unwrap();
        mixer.play(walk, true);
        mixer.set_weight(walk, 1.5);

        let state = mixer.by_name("walk").unwrap();
        assert!(state.playing && state.looping);
        assert_eq!(state.weight, 1.0);
        assert_eq!(mixer.playing().count(), 1);

        mixer.stop(walk);
        assert_eq!(mixer.playing().count(), 0);
        assert!(mixer.find("attack").is_none());
    }
}
