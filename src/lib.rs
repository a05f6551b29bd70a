pub mod director; // Game-event driven audio lifecycle
pub mod dsp;
pub mod error;
pub mod graph; // Audio output graph and backends
pub mod melody; // Melody catalog and notation parser
pub mod pitch;
pub mod prefs;
pub mod scheduler; // Look-ahead melody playback
pub mod sfx;
pub mod synth;
pub mod voice;

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
