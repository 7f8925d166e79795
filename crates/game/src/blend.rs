//! Frame-stepped cross-fade between two clips.
//!
//! A session is advanced once per simulation tick by its owner and yields
//! back after every weight step. Replacing an in-flight session means
//! dropping it through [`BlendSession::supersede`] and starting a new one.

use crate::animation::{ClipId, ClipMixer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendStep {
    Running,
    Finished,
}

#[derive(Debug, Clone)]
pub struct BlendSession {
    from: ClipId,
    to: ClipId,
    step: f32,
    incoming: f32,
}

impl BlendSession {
    /// Start `to` at weight 0 with `from` at full weight.
    pub fn start(mixer: &mut ClipMixer, from: ClipId, to: ClipId, looping: bool, step: f32) -> Self {
        mixer.play(to, looping);
        mixer.set_weight(to, 0.0);
        mixer.set_weight(from, 1.0);
        Self {
            from,
            to,
            step: step.max(f32::EPSILON),
            incoming: 0.0,
        }
    }

    /// Move one step toward the incoming clip. Stops the outgoing clip on
    /// the step its weight reaches zero.
    pub fn advance(&mut self, mixer: &mut ClipMixer) -> BlendStep {
        self.incoming = (self.incoming + self.step).min(1.0);
        if 1.0 - self.incoming < 1e-4 {
            self.incoming = 1.0;
        }

        mixer.set_weight(self.to, self.incoming);
        mixer.set_weight(self.from, 1.0 - self.incoming);

        if self.incoming >= 1.0 {
            mixer.stop(self.from);
            BlendStep::Finished
        } else {
            BlendStep::Running
        }
    }

    /// Drop this session in favour of one fading into `next`. The outgoing
    /// clip this session never finished fading is stopped outright.
    pub fn supersede(self, mixer: &mut ClipMixer, next: ClipId) {
        if self.from != next && self.from != self.to {
            mixer.stop(self.from);
        }
    }

    /// `(outgoing, incoming)` weights.
    pub fn weights(&self) -> (f32, f32) {
        (1.0 - self.incoming, self.incoming)
    }

    pub fn from(&self) -> ClipId {
        self.from
    }

    pub fn to(&self) -> ClipId {
        self.to
    }
}
