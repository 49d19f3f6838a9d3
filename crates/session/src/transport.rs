//! Collaborator traits for the message transport and provisioning service.
//!
//! The embedding application implements these on top of its real clients.
//! Keeping them as traits leaves session and transfer logic testable with
//! mocks.

use std::future::Future;
use std::pin::Pin;

use hubdrop_protocol::Message;

use crate::error::TransportError;
use crate::types::{HubEndpoint, Registration, RegistrationRequest};

/// A connected-or-not message transport client.
pub trait Transport: Send + Sync {
    /// Opens the connection.
    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;

    /// Closes the connection.
    fn disconnect(&self)
    -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;

    /// Reports whether the connection is currently open.
    fn is_connected(&self) -> bool;

    /// Sends one message.
    fn send(
        &self,
        message: Message,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;
}

/// Creates (unconnected) transport clients for an assigned endpoint.
pub trait TransportFactory: Send + Sync {
    fn create(&self, endpoint: &HubEndpoint) -> Result<Box<dyn Transport>, TransportError>;
}

/// Identity/provisioning service that assigns a device to an endpoint.
pub trait Provisioner: Send + Sync {
    fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Registration, TransportError>> + Send + '_>>;
}
