//! PCM sink calling back into Java

use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::playback::PcmSink;
use jni::objects::{JMethodID, JObject, JValue};
use jni::signature::{Primitive, ReturnType};
use jni::JNIEnv;
use tracing::{trace, warn};

/// Delivers each chunk as a fresh `byte[]` to a Java callback method.
///
/// Runs on the thread that called the native method. The array's local
/// reference is deleted after every call so long files do not exhaust the
/// local reference table.
pub struct JniPcmSink<'a, 'local> {
    env: &'a mut JNIEnv<'local>,
    callback: &'a JObject<'local>,
    method: JMethodID,
    chunks: u64,
}

impl<'a, 'local> JniPcmSink<'a, 'local> {
    /// Look up `name`/`signature` on the callback's class.
    pub fn new(
        env: &'a mut JNIEnv<'local>,
        callback: &'a JObject<'local>,
        name: &str,
        signature: &str,
    ) -> jni::errors::Result<Self> {
        let class = env.get_object_class(callback)?;
        let method = env.get_method_id(&class, name, signature)?;
        env.delete_local_ref(class)?;

        Ok(Self {
            env,
            callback,
            method,
            chunks: 0,
        })
    }

    pub fn chunks_delivered(&self) -> u64 {
        self.chunks
    }

    fn host_error(&self, e: jni::errors::Error) -> BridgeError {
        match e {
            jni::errors::Error::JavaException => {
                // Leave the exception pending; it reaches Java when the native returns
                warn!("PCM callback threw on chunk {}", self.chunks);
                BridgeError::HostException(format!("callback threw on chunk {}", self.chunks))
            }
            other => BridgeError::OperationFailed(format!("PCM callback failed: {}", other)),
        }
    }
}

impl PcmSink for JniPcmSink<'_, '_> {
    fn deliver(&mut self, chunk: &[u8]) -> BridgeResult<()> {
        let array = self
            .env
            .byte_array_from_slice(chunk)
            .map_err(|e| self.host_error(e))?;

        // SAFETY: the method id was resolved against the callback's own class
        // with the `([B)V` shape, and the single argument is a byte array.
        let result = unsafe {
            self.env.call_method_unchecked(
                self.callback,
                self.method,
                ReturnType::Primitive(Primitive::Void),
                &[JValue::Object(&array).as_jni()],
            )
        };

        if let Err(e) = self.env.delete_local_ref(array) {
            warn!("Failed to delete PCM array reference: {}", e);
        }

        result.map_err(|e| self.host_error(e))?;

        self.chunks += 1;
        trace!("Delivered chunk {} ({} bytes)", self.chunks, chunk.len());
        Ok(())
    }
}
