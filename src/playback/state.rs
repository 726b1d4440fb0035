//! Playback control as an explicit finite-state machine.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    /// No streams loaded yet.
    NotReady,
    /// Streams loaded, positioned at the first frame.
    Ready,
    Playing,
    Paused,
    SlowPlaying,
    SpeedPlaying,
}

/// A control button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Play,
    Pause,
    Stop,
    Slow,
    Speed,
}

/// What the player has to do after a control action changed (or kept) its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Begin playback from the current position.
    Start,
    /// Continue paused playback.
    Resume,
    /// Halt frame delivery, keeping the position.
    Suspend,
    /// Halt and rewind to the first frame.
    Stop,
    SlowDown,
    SpeedUp,
    /// Show the next frame pair once.
    StepForward,
    /// Show the previous frame pair once.
    StepBack,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("illegal player state change from {from} to {to}")]
pub struct IllegalStateChange {
    pub from: PlayerState,
    pub to: PlayerState,
}

impl PlayerState {
    pub fn can_transition(self, to: PlayerState) -> bool {
        use PlayerState::*;
        match self {
            NotReady => matches!(to, NotReady | Ready),
            Ready => matches!(to, NotReady | Ready | Playing),
            Playing => matches!(to, Playing | Paused | Ready | SlowPlaying | SpeedPlaying),
            Paused => matches!(to, Paused | Playing | Ready),
            SlowPlaying => matches!(to, SlowPlaying | Paused | Playing | Ready),
            SpeedPlaying => matches!(to, SpeedPlaying | Paused | Playing | Ready),
        }
    }

    pub fn transition(self, to: PlayerState) -> Result<PlayerState, IllegalStateChange> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(IllegalStateChange { from: self, to })
        }
    }

    /// Frames are being delivered continuously, at any rate.
    pub fn is_playing(self) -> bool {
        matches!(
            self,
            PlayerState::Playing | PlayerState::SlowPlaying | PlayerState::SpeedPlaying
        )
    }

    /// Resolve a button press into the next state and the effect to carry
    /// out. Presses that mean nothing in the current state return
    /// `(self, None)`.
    pub fn apply(self, action: Action) -> Result<(PlayerState, Option<Effect>), IllegalStateChange> {
        use PlayerState::*;
        let (to, effect) = match (action, self) {
            (Action::Play, Ready) => (Playing, Effect::Start),
            (Action::Play, Paused) => (Playing, Effect::Resume),
            (Action::Play, SpeedPlaying) => (Playing, Effect::SlowDown),
            (Action::Play, SlowPlaying) => (Playing, Effect::SpeedUp),

            (Action::Pause, Playing | SlowPlaying | SpeedPlaying) => (Paused, Effect::Suspend),
            (Action::Pause, Paused) => (Playing, Effect::Resume),

            (Action::Stop, Playing | SlowPlaying | SpeedPlaying | Paused) => (Ready, Effect::Stop),

            (Action::Slow, Playing) => (SlowPlaying, Effect::SlowDown),
            (Action::Slow, Paused) => (Paused, Effect::StepBack),
            (Action::Slow, SpeedPlaying) => (Playing, Effect::SlowDown),

            (Action::Speed, Playing) => (SpeedPlaying, Effect::SpeedUp),
            (Action::Speed, Paused) => (Paused, Effect::StepForward),
            (Action::Speed, SlowPlaying) => (Playing, Effect::SpeedUp),

            _ => return Ok((self, None)),
        };
        Ok((self.transition(to)?, Some(effect)))
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerState::NotReady => "not ready",
            PlayerState::Ready => "ready",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::SlowPlaying => "slow playing",
            PlayerState::SpeedPlaying => "speed playing",
        };
        f.write_str(name)
    }
}
