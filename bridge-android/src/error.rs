use core_playback::PlaybackError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("JNI call failed: {0}")]
    Jni(#[from] jni::errors::Error),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("Native bindings not initialized; JNI_OnLoad has not run")]
    NotLoaded,

    #[error("Invalid binding descriptor: {0}")]
    InvalidDescriptor(String),
}

impl Error {
    /// Message for the Java exception raised from this error.
    ///
    /// Playback errors are prefixed with their stable kind code so Java
    /// callers can branch without parsing the text.
    pub fn exception_message(&self) -> String {
        match self {
            Error::Playback(e) => format!("{}: {}", e.kind(), e),
            other => other.to_string(),
        }
    }

    /// Returns `true` if a Java exception is already pending.
    pub fn is_java_exception(&self) -> bool {
        matches!(self, Error::Jni(jni::errors::Error::JavaException))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
