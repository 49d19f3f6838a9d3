//! Device sessions: credential derivation, provisioning and connect.
//!
//! A [`SessionEstablisher`] derives the device key, registers with the
//! provisioning service and opens the transport at the assigned endpoint,
//! retrying the whole unit a bounded number of times. The resulting
//! [`Session`] is an owned handle passed explicitly to transfers.

pub mod credentials;
pub mod error;
pub mod establish;
pub mod session;
pub mod transport;
pub mod types;

pub use credentials::derive_device_key;
pub use error::{ConnectionError, CredentialError, TransportError};
pub use establish::SessionEstablisher;
pub use session::Session;
pub use transport::{Provisioner, Transport, TransportFactory};
pub use types::{
    AttemptFailure, AttemptStage, ConnectionState, DeviceIdentity, EndpointConfig, HubEndpoint,
    ProvisioningPayload, Registration, RegistrationRequest, RegistrationStatus, RetryConfig,
};
