//! Provisioning plus connect with a bounded number of attempts.
//!
//! Every attempt redoes registration before connecting; the assigned
//! endpoint is never cached between attempts.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::credentials::derive_device_key;
use crate::error::{ConnectionError, TransportError};
use crate::session::Session;
use crate::transport::{Provisioner, TransportFactory};
use crate::types::{
    AttemptFailure, AttemptStage, ConnectionState, DeviceIdentity, EndpointConfig, HubEndpoint,
    ProvisioningPayload, Registration, RegistrationRequest, RegistrationStatus, RetryConfig,
};

/// Turns device credentials into a connected [`Session`].
pub struct SessionEstablisher {
    provisioner: Arc<dyn Provisioner>,
    factory: Arc<dyn TransportFactory>,
    retry: RetryConfig,
    state_tx: watch::Sender<ConnectionState>,
}

impl SessionEstablisher {
    /// Creates an establisher with the default [`RetryConfig`].
    pub fn new(provisioner: Arc<dyn Provisioner>, factory: Arc<dyn TransportFactory>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            provisioner,
            factory,
            retry: RetryConfig::default(),
            state_tx,
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Subscribes to connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Derives the device key from the group key, then establishes a session.
    ///
    /// A malformed group key fails before any network attempt.
    pub async fn connect(
        &self,
        identity: &DeviceIdentity,
        endpoint: &EndpointConfig,
    ) -> Result<Session, ConnectionError> {
        let device_key = derive_device_key(&identity.device_id, &identity.group_key)?;
        self.establish(&identity.device_id, &device_key, endpoint)
            .await
    }

    /// Registers and connects, retrying the pair up to `max_attempts` times.
    pub async fn establish(
        &self,
        device_id: &str,
        device_key: &str,
        endpoint: &EndpointConfig,
    ) -> Result<Session, ConnectionError> {
        let attempts = self.retry.attempts();
        let mut failures = Vec::new();

        for attempt in 1..=attempts {
            match self.attempt(attempt, device_id, device_key, endpoint).await {
                Ok(session) => {
                    self.set_state(ConnectionState::Connected);
                    info!(
                        device = %session.device_id(),
                        hub = %session.assigned_hub(),
                        attempt,
                        "connected"
                    );
                    return Ok(session);
                }
                Err((stage, e)) => {
                    warn!(
                        device = %device_id,
                        attempt,
                        max_attempts = attempts,
                        stage = %stage,
                        error = %e,
                        "connection attempt failed"
                    );
                    failures.push(AttemptFailure {
                        attempt,
                        stage,
                        cause: e.to_string(),
                    });
                }
            }

            if attempt < attempts {
                let delay = self.retry.delay_for_attempt(attempt);
                if !delay.is_zero() {
                    debug!(
                        attempt,
                        delay_secs = format_args!("{:.2}", delay.as_secs_f64()),
                        "waiting before next attempt"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        self.set_state(ConnectionState::Failed);
        Err(ConnectionError::AttemptsExhausted { attempts, failures })
    }

    /// One registration + connect unit.
    async fn attempt(
        &self,
        attempt: u32,
        device_id: &str,
        device_key: &str,
        endpoint: &EndpointConfig,
    ) -> Result<Session, (AttemptStage, TransportError)> {
        self.set_state(ConnectionState::Provisioning { attempt });
        let registration = self
            .register(device_id, device_key, endpoint)
            .await
            .map_err(|e| (AttemptStage::Register, e))?;
        self.set_state(ConnectionState::Provisioned { attempt });
        debug!(
            device = %registration.device_id,
            hub = %registration.assigned_hub,
            "device assigned"
        );

        self.set_state(ConnectionState::Connecting { attempt });
        let hub = HubEndpoint {
            hostname: registration.assigned_hub.clone(),
            device_id: registration.device_id.clone(),
            symmetric_key: device_key.to_string(),
            use_websockets: endpoint.use_websockets,
        };
        let transport = self
            .factory
            .create(&hub)
            .map_err(|e| (AttemptStage::Connect, e))?;
        transport
            .connect()
            .await
            .map_err(|e| (AttemptStage::Connect, e))?;

        Ok(Session::new(
            registration.device_id,
            registration.assigned_hub,
            transport,
        ))
    }

    async fn register(
        &self,
        device_id: &str,
        device_key: &str,
        endpoint: &EndpointConfig,
    ) -> Result<Registration, TransportError> {
        let request = RegistrationRequest {
            provisioning_host: endpoint.provisioning_host.clone(),
            registration_id: device_id.to_string(),
            id_scope: endpoint.id_scope.clone(),
            symmetric_key: device_key.to_string(),
            use_websockets: endpoint.use_websockets,
            payload: ProvisioningPayload {
                model_id: endpoint.model_id.clone(),
            },
        };
        let registration = self.provisioner.register(&request).await?;
        if registration.status != RegistrationStatus::Assigned {
            return Err(TransportError::Registration(format!(
                "device not assigned (status: {:?})",
                registration.status
            )));
        }
        Ok(registration)
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }
}
