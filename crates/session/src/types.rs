//! Public types for session establishment.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection state owned by the [`SessionEstablisher`](crate::SessionEstablisher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session and no attempt in progress.
    Disconnected,
    /// Registering with the provisioning service.
    Provisioning { attempt: u32 },
    /// A transport endpoint has been assigned.
    Provisioned { attempt: u32 },
    /// Opening the transport connection.
    Connecting { attempt: u32 },
    /// Session open.
    Connected,
    /// All attempts exhausted.
    Failed,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

/// Step of an attempt that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
    Register,
    Connect,
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => f.write_str("register"),
            Self::Connect => f.write_str("connect"),
        }
    }
}

/// One failed establishment attempt, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// 1-based attempt index.
    pub attempt: u32,
    pub stage: AttemptStage,
    pub cause: String,
}

/// Device credentials consumed by [`SessionEstablisher::connect`](crate::SessionEstablisher::connect).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    #[serde(default = "default_device_id")]
    pub device_id: String,
    /// Base64 group enrollment key.
    pub group_key: String,
}

/// Provisioning endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_provisioning_host")]
    pub provisioning_host: String,
    pub id_scope: String,
    /// Device model forwarded in the registration payload.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_true")]
    pub use_websockets: bool,
}

fn default_device_id() -> String {
    "file-transfer-device-01".into()
}

fn default_provisioning_host() -> String {
    "global.azure-devices-provisioning.net".into()
}

fn default_model_id() -> String {
    "dtmi:sample:fileTransfer;1".into()
}

fn default_true() -> bool {
    true
}

impl EndpointConfig {
    /// Creates a config for `id_scope` with default host and model.
    pub fn new(id_scope: impl Into<String>) -> Self {
        Self {
            provisioning_host: default_provisioning_host(),
            id_scope: id_scope.into(),
            model_id: default_model_id(),
            use_websockets: true,
        }
    }
}

/// Registration payload sent to the provisioning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningPayload {
    #[serde(rename = "iotcModelId")]
    pub model_id: String,
}

/// Everything the provisioning service needs to register a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub provisioning_host: String,
    pub registration_id: String,
    pub id_scope: String,
    /// Derived device key (base64).
    pub symmetric_key: String,
    pub use_websockets: bool,
    pub payload: ProvisioningPayload,
}

/// Outcome reported by the provisioning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Assigned,
    Assigning,
    Unassigned,
    Failed,
    Disabled,
}

/// Result of a registration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub status: RegistrationStatus,
    /// Hostname of the assigned transport endpoint.
    pub assigned_hub: String,
    /// Device id confirmed by the service.
    pub device_id: String,
}

/// Where and how to open the transport after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubEndpoint {
    pub hostname: String,
    pub device_id: String,
    pub symmetric_key: String,
    pub use_websockets: bool,
}

/// Bounded retry policy for session establishment.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, each one registration plus connect. Values below 1
    /// are treated as 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub max_delay: Duration,
    /// Multiplier for each subsequent attempt.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(15),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Retries immediately, as many times as `max_attempts` allows.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Calculates the delay after failed attempt `attempt` (1-based),
    /// with ±25% jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        self.delay_with_offset(attempt, jitter_offset(nanos))
    }

    /// Backoff delay for `attempt` scaled by `1 + 0.25 * offset`.
    fn delay_with_offset(&self, attempt: u32, offset: f64) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        let capped = secs.min(self.max_delay.as_secs_f64());
        if capped <= 0.0 {
            return Duration::ZERO;
        }
        let jitter = capped * 0.25;
        Duration::from_secs_f64((capped + jitter * offset).max(0.0))
    }
}

/// Maps the sub-second nanos of a clock reading onto [-1.0, 1.0).
fn jitter_offset(subsec_nanos: u32) -> f64 {
    let nanos = subsec_nanos.min(999_999_999) as f64;
    nanos / 1_000_000_000.0 * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_state_equality() {
        assert_eq!(ConnectionState::Connected, ConnectionState::Connected);
        assert_ne!(
            ConnectionState::Provisioning { attempt: 1 },
            ConnectionState::Provisioning { attempt: 2 },
        );
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting { attempt: 1 }.is_connected());
    }

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(250));
        assert_eq!(config.max_delay, Duration::from_secs(15));
        assert!((config.backoff_factor - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn retry_config_delay_backoff() {
        let config = RetryConfig::default();
        let expected_base = [0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 15.0, 15.0];
        for (i, &base) in expected_base.iter().enumerate() {
            let secs = config.delay_for_attempt((i + 1) as u32).as_secs_f64();
            let lo = base * 0.75 - 1e-9;
            let hi = base * 1.25 + 1e-9;
            assert!(
                secs >= lo && secs < hi,
                "attempt {}: {secs:.3}s not in [{lo:.3}, {hi:.3})",
                i + 1
            );
        }
    }

    #[test]
    fn jitter_offset_spans_both_signs() {
        assert_eq!(jitter_offset(0), -1.0);
        assert_eq!(jitter_offset(500_000_000), 0.0);
        assert!(jitter_offset(250_000_000) < 0.0);
        assert!(jitter_offset(750_000_000) > 0.0);
        assert!(jitter_offset(999_999_999) > 0.99);
        assert!(jitter_offset(999_999_999) < 1.0);
        // Leap-second readings can exceed one second of nanos.
        assert!(jitter_offset(u32::MAX) < 1.0);
    }

    #[test]
    fn jittered_delay_reaches_above_and_below_base() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(1),
            ..RetryConfig::default()
        };
        let low = config.delay_with_offset(1, jitter_offset(0));
        let mid = config.delay_with_offset(1, jitter_offset(500_000_000));
        let high = config.delay_with_offset(1, jitter_offset(999_999_999));

        assert_eq!(low, Duration::from_millis(750));
        assert_eq!(mid, Duration::from_secs(1));
        assert!(high > Duration::from_millis(1249));
        assert!(high <= Duration::from_millis(1250));
    }

    #[test]
    fn immediate_retry_has_no_delay() {
        let config = RetryConfig::immediate(5);
        assert_eq!(config.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(4), Duration::ZERO);
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        assert_eq!(RetryConfig::immediate(0).attempts(), 1);
    }

    #[test]
    fn endpoint_config_defaults_from_json() {
        let config: EndpointConfig =
            serde_json::from_str(r#"{"id_scope": "0ne000ABCDE"}"#).unwrap();
        assert_eq!(config, EndpointConfig::new("0ne000ABCDE"));
        assert_eq!(config.provisioning_host, "global.azure-devices-provisioning.net");
        assert!(config.use_websockets);
    }

    #[test]
    fn provisioning_payload_wire_name() {
        let payload = ProvisioningPayload {
            model_id: "dtmi:sample:fileTransfer;1".into(),
        };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"iotcModelId":"dtmi:sample:fileTransfer;1"}"#
        );
    }

    #[test]
    fn device_identity_default_id() {
        let id: DeviceIdentity = serde_json::from_str(r#"{"group_key": "a2V5"}"#).unwrap();
        assert_eq!(id.device_id, "file-transfer-device-01");
    }
}
