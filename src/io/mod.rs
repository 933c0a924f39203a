//! Collaborators the runtime reaches through narrow interfaces: sound
//! voices, MIDI ports and text storage.

pub mod midi;
pub mod storage;
pub mod voice;
