use thiserror::Error;

/// Failures raised while creating or driving an audio backend.
///
/// Nothing in the playback core propagates these across component
/// boundaries during normal operation; they surface only from backend
/// construction, where the caller degrades to a silent session.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no default audio output device available")]
    NoOutputDevice,

    #[error("failed to open audio output stream: {0}")]
    Stream(String),

    #[error("audio backend has been closed")]
    Closed,
}
