//! # Binding Descriptor
//!
//! Names of every Java class, method, field and signature the native library
//! touches. Built once in `JNI_OnLoad`, never mutated, and handed by
//! reference to each entry point.

use crate::error::{Error, Result};
use core_playback::SessionConfig;
use std::sync::OnceLock;

static DESCRIPTOR: OnceLock<BindingDescriptor> = OnceLock::new();

/// A Java method or constructor, by name and JNI signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    pub name: String,
    pub signature: String,
}

impl MethodRef {
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
        }
    }

    fn validate(&self, what: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidDescriptor(format!("{} has no name", what)));
        }
        if !self.signature.starts_with('(') || !self.signature.contains(')') {
            return Err(Error::InvalidDescriptor(format!(
                "{} has malformed signature {:?}",
                what, self.signature
            )));
        }
        Ok(())
    }
}

/// Immutable description of the Java side of the bridge.
#[derive(Debug, Clone)]
pub struct BindingDescriptor {
    /// Class declaring the static `play` native.
    pub player_class: String,
    pub play: MethodRef,
    /// Method invoked on the callback object with each chunk.
    pub pcm_callback: MethodRef,
    /// Class declaring `sniff` and `release`, constructed by `sniff`.
    pub probe_class: String,
    pub sniff: MethodRef,
    pub release: MethodRef,
    pub probe_constructor: MethodRef,
    /// `long` field of the probe object holding the native handle.
    pub handle_field: String,
    /// Class of exceptions thrown for native failures.
    pub exception_class: String,
    /// Session settings used by `play`.
    pub session: SessionConfig,
}

impl Default for BindingDescriptor {
    fn default() -> Self {
        Self {
            player_class: "com/google/android/exoplayer2/ext/ffmpeg/FFmpegTest".to_string(),
            play: MethodRef::new(
                "play",
                "(Ljava/lang/String;Lcom/google/android/exoplayer2/ext/ffmpeg/FFmpegTest$FFmpegCallback;)V",
            ),
            pcm_callback: MethodRef::new("pcm", "([B)V"),
            probe_class: "com/glee/exoffmpeg/ape/APEDecoderJni".to_string(),
            sniff: MethodRef::new(
                "sniff",
                "(Ljava/lang/String;)Lcom/glee/exoffmpeg/ape/APEDecoderJni;",
            ),
            release: MethodRef::new("release", "()V"),
            probe_constructor: MethodRef::new("<init>", "(JJI)V"),
            handle_field: "pFormatCtx".to_string(),
            exception_class: "java/io/IOException".to_string(),
            session: SessionConfig::realtime(),
        }
    }
}

impl BindingDescriptor {
    /// Check every name and signature, and the session config.
    pub fn validate(&self) -> Result<()> {
        for (what, class) in [
            ("player_class", &self.player_class),
            ("probe_class", &self.probe_class),
            ("exception_class", &self.exception_class),
        ] {
            if class.is_empty() || class.contains('.') {
                return Err(Error::InvalidDescriptor(format!(
                    "{} must be a slash-separated class name, got {:?}",
                    what, class
                )));
            }
        }

        self.play.validate("play")?;
        self.pcm_callback.validate("pcm_callback")?;
        self.sniff.validate("sniff")?;
        self.release.validate("release")?;
        self.probe_constructor.validate("probe_constructor")?;

        if self.handle_field.is_empty() {
            return Err(Error::InvalidDescriptor("handle_field is empty".to_string()));
        }

        self.session
            .validate()
            .map_err(|e| Error::InvalidDescriptor(format!("session: {}", e)))
    }
}

/// Install the process-wide descriptor.
///
/// The first successful call wins; later calls (a second `JNI_OnLoad` from
/// another class loader) get the descriptor already installed.
pub fn install(descriptor: BindingDescriptor) -> Result<&'static BindingDescriptor> {
    descriptor.validate()?;
    Ok(DESCRIPTOR.get_or_init(|| descriptor))
}

/// The installed descriptor.
pub fn descriptor() -> Result<&'static BindingDescriptor> {
    DESCRIPTOR.get().ok_or(Error::NotLoaded)
}
