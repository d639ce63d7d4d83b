//! Error types for the showcase-core crate.

use thiserror::Error;

use crate::ble::radio::RadioState;
use crate::permissions::Permission;

/// The main error type for this crate.
///
/// Every variant carries a user-displayable message; callers surface these
/// directly as notifications. Nothing here is fatal to the process and no
/// failed operation is retried automatically.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// One or more required runtime permissions were denied.
    #[error("Bluetooth permissions are required")]
    PermissionDenied {
        /// The permissions that were denied.
        denied: Vec<Permission>,
    },

    /// The radio is not powered on, so scanning cannot start.
    #[error("Bluetooth radio is not ready (state: {state})")]
    RadioNotReady {
        /// The radio state that was observed.
        state: RadioState,
    },

    /// Scanning failed to start or aborted.
    #[error("Scan error: {reason}")]
    Scan {
        /// Description of the scan failure.
        reason: String,
    },

    /// The specified peripheral was not found in the scan results.
    #[error("Device not found: {identifier}")]
    DeviceNotFound {
        /// The identifier that was searched for.
        identifier: String,
    },

    /// The connect handshake did not complete within its deadline.
    #[error("Connection timed out after {seconds} seconds")]
    ConnectTimeout {
        /// The handshake deadline that elapsed, in seconds.
        seconds: u64,
    },

    /// The connect handshake was refused, or a new attempt was rejected
    /// because one is already in flight.
    #[error("Connection failed: {reason}")]
    ConnectRejected {
        /// Description of why the connection was rejected.
        reason: String,
    },

    /// The handshake succeeded but service enumeration failed. The link is
    /// torn down; the connection as a whole counts as failed.
    #[error("Service discovery failed: {reason}")]
    CapabilityDiscovery {
        /// Description of the discovery failure.
        reason: String,
    },

    /// Tearing down the active connection failed.
    #[error("Disconnect failed: {reason}")]
    Disconnect {
        /// Description of the disconnect failure.
        reason: String,
    },

    /// The remote list fetch failed.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The remote list payload could not be decoded.
    #[error("Malformed item payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
