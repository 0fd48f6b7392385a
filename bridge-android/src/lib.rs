//! # Android Bridge
//!
//! JNI entry points exposing the decode session to Java.
//!
//! ## Overview
//!
//! `JNI_OnLoad` initializes logging, installs the [`BindingDescriptor`] and
//! registers the natives with `RegisterNatives`:
//!
//! | Java method | Native |
//! |-------------|--------|
//! | `FFmpegTest.play(String, FFmpegCallback)` | decode the file, calling `callback.pcm(byte[])` per chunk |
//! | `APEDecoderJni.sniff(String)` | probe the file, return a handle object or `null` |
//! | `APEDecoderJni.release()` | free the probe handle (idempotent) |
//!
//! A class missing from the application is skipped with a warning, so an app
//! shipping only `FFmpegTest` still loads.
//!
//! Failures surface as a Java exception of the descriptor's
//! `exception_class`, its message prefixed with the error kind. When the
//! callback itself threw, that exception is left pending instead.

pub mod bindings;
pub mod error;
mod sink;

pub use bindings::{BindingDescriptor, MethodRef};
pub use error::{Error, Result};
pub use sink::JniPcmSink;

use core_playback::{probe_file, DecodeSession, ProbeReport, RunSummary, SymphoniaBackend};
use core_runtime::error::Error as RuntimeError;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use jni::objects::{JClass, JObject, JString, JValue};
use jni::sys::{jint, jlong, jobject, JNI_ERR, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM, NativeMethod};
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Thrown when the descriptor is unavailable.
const FALLBACK_EXCEPTION_CLASS: &str = "java/lang/IllegalStateException";

/// Native state behind the probe object's handle field.
struct ProbeHandle {
    report: ProbeReport,
}

// ============================================================================
// Library Load
// ============================================================================

/// # Safety
///
/// Called by the JVM with a valid `JavaVM` pointer.
#[no_mangle]
pub unsafe extern "system" fn JNI_OnLoad(vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    init_logging_once();

    match unsafe { on_load(vm) } {
        Ok(()) => JNI_VERSION_1_6,
        Err(e) => {
            error!("Failed to load native bindings: {}", e);
            JNI_ERR
        }
    }
}

fn init_logging_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_pii_redaction(true);

    match init_logging(config) {
        Ok(()) | Err(RuntimeError::AlreadyInitialized(_)) => {}
        Err(e) => eprintln!("bridge-android: logging unavailable: {}", e),
    }
}

unsafe fn on_load(vm: *mut jni::sys::JavaVM) -> Result<()> {
    let vm = unsafe { JavaVM::from_raw(vm) }?;
    let mut env = vm.get_env()?;

    let descriptor = bindings::install(BindingDescriptor::default())?;
    let registered = register_natives(&mut env, descriptor)?;
    info!("Native bindings loaded ({} classes registered)", registered);
    Ok(())
}

/// Register every native on the classes present. Returns how many classes
/// were registered; zero is an error.
fn register_natives(env: &mut JNIEnv, descriptor: &BindingDescriptor) -> Result<usize> {
    let player = [NativeMethod {
        name: descriptor.play.name.as_str().into(),
        sig: descriptor.play.signature.as_str().into(),
        fn_ptr: native_play as *mut c_void,
    }];
    let probe = [
        NativeMethod {
            name: descriptor.sniff.name.as_str().into(),
            sig: descriptor.sniff.signature.as_str().into(),
            fn_ptr: native_sniff as *mut c_void,
        },
        NativeMethod {
            name: descriptor.release.name.as_str().into(),
            sig: descriptor.release.signature.as_str().into(),
            fn_ptr: native_release as *mut c_void,
        },
    ];

    let mut registered = 0;
    for (class_name, methods) in [
        (&descriptor.player_class, &player[..]),
        (&descriptor.probe_class, &probe[..]),
    ] {
        let outcome = env
            .find_class(class_name.as_str())
            .and_then(|class| env.register_native_methods(&class, methods));

        match outcome {
            Ok(()) => {
                debug!("Registered {} native(s) on {}", methods.len(), class_name);
                registered += 1;
            }
            Err(e) => {
                // find_class leaves NoClassDefFoundError pending
                env.exception_clear()?;
                warn!("Skipping natives for {}: {}", class_name, e);
            }
        }
    }

    if registered == 0 {
        return Err(Error::InvalidDescriptor(
            "none of the bound classes could be registered".to_string(),
        ));
    }
    Ok(registered)
}

/// Raise `err` in Java unless an exception is already pending.
fn raise(env: &mut JNIEnv, err: &Error) {
    error!("Native call failed: {}", err);

    if env.exception_check().unwrap_or(true) {
        return;
    }

    let class = bindings::descriptor()
        .map(|d| d.exception_class.as_str())
        .unwrap_or(FALLBACK_EXCEPTION_CLASS);
    if let Err(e) = env.throw_new(class, err.exception_message()) {
        error!("Failed to throw {}: {}", class, e);
    }
}

fn panic_error(payload: Box<dyn std::any::Any + Send>) -> Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    Error::Playback(core_playback::PlaybackError::Internal(format!(
        "native panic: {}",
        message
    )))
}

// ============================================================================
// FFmpegTest.play
// ============================================================================

extern "system" fn native_play<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    path: JString<'local>,
    callback: JObject<'local>,
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let descriptor = bindings::descriptor()?;
        play(&mut env, descriptor, &path, &callback)
    }))
    .unwrap_or_else(|payload| Err(panic_error(payload)));

    match outcome {
        Ok(summary) => debug!(
            "play finished: {} chunks, {} bytes",
            summary.chunks_delivered, summary.bytes_delivered
        ),
        Err(e) => raise(&mut env, &e),
    }
}

fn play<'local>(
    env: &mut JNIEnv<'local>,
    descriptor: &BindingDescriptor,
    path: &JString<'local>,
    callback: &JObject<'local>,
) -> Result<RunSummary> {
    if path.is_null() || callback.is_null() {
        return Err(Error::Jni(jni::errors::Error::NullPtr("play argument")));
    }

    let path: String = env.get_string(path)?.into();
    let mut sink = JniPcmSink::new(
        env,
        callback,
        &descriptor.pcm_callback.name,
        &descriptor.pcm_callback.signature,
    )?;

    let mut session =
        DecodeSession::open(&SymphoniaBackend::new(), &path, descriptor.session.clone())?;
    Ok(session.run(&mut sink)?)
}

// ============================================================================
// APEDecoderJni.sniff / release
// ============================================================================

extern "system" fn native_sniff<'local>(
    mut env: JNIEnv<'local>,
    class: JClass<'local>,
    path: JString<'local>,
) -> jobject {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let descriptor = bindings::descriptor()?;
        sniff(&mut env, descriptor, &class, &path)
    }))
    .unwrap_or_else(|payload| Err(panic_error(payload)));

    match outcome {
        Ok(object) => object.into_raw(),
        Err(e) => {
            // Unprobeable files are reported as null, not as an exception
            warn!("sniff returned null: {}", e);
            JObject::null().into_raw()
        }
    }
}

fn sniff<'local>(
    env: &mut JNIEnv<'local>,
    descriptor: &BindingDescriptor,
    class: &JClass<'local>,
    path: &JString<'local>,
) -> Result<JObject<'local>> {
    if path.is_null() {
        return Err(Error::Jni(jni::errors::Error::NullPtr("sniff path")));
    }

    let path: String = env.get_string(path)?.into();
    let report = probe_file(&SymphoniaBackend::new(), Path::new(&path))?;
    let codec = report.selected().codec.code() as jlong;
    let stream_index = report.selected().index as jint;

    let handle = Box::into_raw(Box::new(ProbeHandle { report })) as jlong;
    let object = env.new_object(
        class,
        descriptor.probe_constructor.signature.as_str(),
        &[
            JValue::Long(codec),
            JValue::Long(handle),
            JValue::Int(stream_index),
        ],
    );

    object.map_err(|e| {
        // SAFETY: `handle` came from `Box::into_raw` above and was never published
        drop(unsafe { Box::from_raw(handle as *mut ProbeHandle) });
        Error::from(e)
    })
}

extern "system" fn native_release<'local>(mut env: JNIEnv<'local>, this: JObject<'local>) {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let descriptor = bindings::descriptor()?;
        release(&mut env, descriptor, &this)
    }))
    .unwrap_or_else(|payload| Err(panic_error(payload)));

    if let Err(e) = outcome {
        raise(&mut env, &e);
    }
}

fn release(env: &mut JNIEnv, descriptor: &BindingDescriptor, this: &JObject) -> Result<()> {
    let field = descriptor.handle_field.as_str();
    let handle = env.get_field(this, field, "J")?.j()?;
    if handle == 0 {
        debug!("Probe handle already released");
        return Ok(());
    }

    env.set_field(this, field, "J", JValue::Long(0))?;

    // SAFETY: non-zero handle values are only written by `sniff`, and the
    // field is zeroed before the box is freed.
    let probe = unsafe { Box::from_raw(handle as *mut ProbeHandle) };
    debug!(
        "Released probe handle for stream {} of {}",
        probe.report.audio_stream,
        probe.report.streams.len()
    );
    Ok(())
}
