pub mod envelope;
pub mod oscillator;

pub use envelope::AmpShape;
pub use oscillator::{Oscillator, Waveform};
