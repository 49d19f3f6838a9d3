//! Owned handle to a connected transport.

use hubdrop_protocol::Message;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::transport::Transport;

/// A live transport session, returned by the establisher and passed
/// explicitly to every transfer.
pub struct Session {
    device_id: String,
    assigned_hub: String,
    transport: Box<dyn Transport>,
}

impl Session {
    /// Wraps an already connected transport.
    pub fn new(
        device_id: impl Into<String>,
        assigned_hub: impl Into<String>,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            assigned_hub: assigned_hub.into(),
            transport,
        }
    }

    /// Device id confirmed during registration.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Hostname of the endpoint this session is connected to.
    pub fn assigned_hub(&self) -> &str {
        &self.assigned_hub
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Sends one message through the transport.
    pub async fn send(&self, message: Message) -> Result<(), TransportError> {
        debug!(
            device = %self.device_id,
            bytes = message.body_len(),
            "sending message"
        );
        self.transport.send(message).await
    }

    /// Closes the transport, consuming the handle.
    pub async fn disconnect(self) -> Result<(), TransportError> {
        info!(device = %self.device_id, hub = %self.assigned_hub, "disconnecting");
        self.transport.disconnect().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("device_id", &self.device_id)
            .field("assigned_hub", &self.assigned_hub)
            .field("connected", &self.is_connected())
            .finish()
    }
}
