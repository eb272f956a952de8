// Purpose - external interfaces, format conversions

pub mod converter;
pub mod midi;
pub mod pcm;
pub mod wav;

pub use midi::{MidiClip, MidiEvent, MidiMap};
pub use pcm::PcmFormat;
