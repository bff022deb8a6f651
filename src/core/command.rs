//! Outbound commands and their rendering to bus messages.

use crate::bus::Message;
use crate::config::{Cues, Topics};
use serde::{Deserialize, Serialize};

/// Face shown on the screen collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Face {
    /// Shown while touch holds attention
    Attention,
    /// Shown while someone is nearby
    Proximity,
    Normal,
}

/// Ear servo pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EarPose {
    Attention,
    Neutral,
}

/// A command the engine sends to an actuator collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Haptic(bool),
    Ear(EarPose),
    Face(Face),
    /// The attention sound cue
    Chirp,
    Sleep(bool),
}

impl Command {
    /// Render to the topic and payload configured for it.
    pub fn to_message(self, topics: &Topics, cues: &Cues) -> Message {
        match self {
            Command::Haptic(on) => Message::new(&topics.haptic, flag(on)),
            Command::Ear(EarPose::Attention) => Message::new(&topics.servo, &cues.ear_attention),
            Command::Ear(EarPose::Neutral) => Message::new(&topics.servo, &cues.ear_neutral),
            Command::Face(face) => {
                let token = match face {
                    Face::Attention => &cues.face_attention,
                    Face::Proximity => &cues.face_proximity,
                    Face::Normal => &cues.face_normal,
                };
                Message::new(&topics.screen, token)
            }
            Command::Chirp => Message::new(&topics.sound, &cues.sound_attention),
            Command::Sleep(sleeping) => Message::new(&topics.sleep, flag(sleeping)),
        }
    }
}

fn flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}
