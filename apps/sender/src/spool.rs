//! Offline transport and provisioner.
//!
//! The spool "hub" appends every message as one JSON line to a local file,
//! so a batch can be dry-run and inspected without a cloud endpoint.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use hubdrop_protocol::Message;
use hubdrop_session::{
    HubEndpoint, Provisioner, Registration, RegistrationRequest, RegistrationStatus, Transport,
    TransportError, TransportFactory,
};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Assigns every device to a fixed hub.
pub struct SpoolProvisioner {
    hub: String,
}

impl SpoolProvisioner {
    pub fn new(hub: impl Into<String>) -> Self {
        Self { hub: hub.into() }
    }
}

impl Provisioner for SpoolProvisioner {
    fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Registration, TransportError>> + Send + '_>> {
        let registration = Registration {
            status: RegistrationStatus::Assigned,
            assigned_hub: self.hub.clone(),
            device_id: request.registration_id.clone(),
        };
        tracing::debug!(
            device = %registration.device_id,
            hub = %registration.assigned_hub,
            "spool registration"
        );
        Box::pin(async move { Ok(registration) })
    }
}

/// Creates [`SpoolTransport`]s writing to one file.
pub struct SpoolFactory {
    path: PathBuf,
}

impl SpoolFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TransportFactory for SpoolFactory {
    fn create(&self, _endpoint: &HubEndpoint) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(SpoolTransport::new(&self.path)))
    }
}

/// Appends messages to a JSON-lines file while connected.
pub struct SpoolTransport {
    path: PathBuf,
    file: Mutex<Option<tokio::fs::File>>,
    connected: AtomicBool,
}

impl SpoolTransport {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }
}

impl Transport for SpoolTransport {
    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(async move {
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| TransportError::Connect(format!("{}: {e}", self.path.display())))?;
            *self.file.lock().await = Some(file);
            self.connected.store(true, Ordering::SeqCst);
            tracing::info!(path = %self.path.display(), "spool opened");
            Ok(())
        })
    }

    fn disconnect(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(async move {
            self.connected.store(false, Ordering::SeqCst);
            if let Some(mut file) = self.file.lock().await.take() {
                file.flush().await?;
            }
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn send(
        &self,
        message: Message,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(async move {
            let mut line =
                serde_json::to_vec(&message).map_err(|e| TransportError::Send(e.to_string()))?;
            line.push(b'\n');

            let mut guard = self.file.lock().await;
            let file = guard.as_mut().ok_or(TransportError::NotConnected)?;
            file.write_all(&line).await?;
            Ok(())
        })
    }
}
