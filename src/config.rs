//! Process-wide client configuration.
//!
//! Built once at startup and shared by `Arc` with every client; there are
//! no setters, so steady-state reconfiguration is impossible by
//! construction rather than by convention.

use std::sync::Arc;

use crate::codec::{EventClientCodec, JsonCodec};

/// Configuration shared by stream clients: the active codec and the name
/// this service stamps on events it emits.
pub struct EventClientConfig {
    codec: Arc<dyn EventClientCodec>,
    source: String,
}

impl Default for EventClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EventClientConfig {
    /// JSON codec, source name `"unknown-service"`.
    pub fn new() -> Self {
        Self {
            codec: Arc::new(JsonCodec::new()),
            source: "unknown-service".to_string(),
        }
    }

    /// Select the codec used to encode emitted events and decode delivered
    /// ones.
    pub fn with_codec(mut self, codec: Arc<dyn EventClientCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Set the service name stamped as `source` on emitted events that do
    /// not carry one.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn codec(&self) -> &dyn EventClientCodec {
        self.codec.as_ref()
    }

    pub fn codec_arc(&self) -> Arc<dyn EventClientCodec> {
        Arc::clone(&self.codec)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}
