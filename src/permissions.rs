//! Runtime permission gating for radio operations.
//!
//! Android requires explicit runtime grants before any BLE scan or connect
//! may proceed; which grants depends on the OS level. Desktop platforms have
//! no runtime grant step and pass the gate immediately. The gate never
//! retries a denied request; the caller aborts and surfaces the denial.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info};

/// Lowest Android API level with runtime permission grants.
const RUNTIME_GRANT_FLOOR_API: u32 = 23;

/// First Android API level using the dedicated Bluetooth permissions
/// instead of location.
const MODERN_BLUETOOTH_API: u32 = 31;

/// Permission set for Android 12 (API 31) and newer.
const MODERN_SET: &[Permission] = &[Permission::BluetoothScan, Permission::BluetoothConnect];

/// Permission set for Android releases before API 31, where BLE scanning
/// rides on the location permission.
const LEGACY_SET: &[Permission] = &[Permission::FineLocation];

/// A runtime permission relevant to BLE scanning and connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Fine location access (pre-API-31 BLE scanning requirement).
    FineLocation,
    /// Dedicated BLE scan permission (API 31+).
    BluetoothScan,
    /// Dedicated BLE connect permission (API 31+).
    BluetoothConnect,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FineLocation => write!(f, "ACCESS_FINE_LOCATION"),
            Self::BluetoothScan => write!(f, "BLUETOOTH_SCAN"),
            Self::BluetoothConnect => write!(f, "BLUETOOTH_CONNECT"),
        }
    }
}

/// The host platform, as far as permission policy is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Android with the given API level.
    Android {
        /// The device's API level.
        api_level: u32,
    },
    /// A platform without runtime permission grants.
    Desktop,
}

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// All required permissions are granted (possibly trivially).
    Granted,
    /// At least one required permission was denied.
    Denied(Vec<Permission>),
}

impl PermissionOutcome {
    /// Check whether the gate passed.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// The platform permission subsystem, consumed as a black box.
///
/// The returned mapping reports a grant decision per requested permission;
/// a permission missing from the mapping counts as denied. Requesting may
/// display a system dialog, so the future can take arbitrarily long.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionRequester: Send + Sync {
    /// Request the given permissions, returning the per-permission decision.
    async fn request(&self, permissions: &[Permission]) -> HashMap<Permission, bool>;
}

/// Requester for platforms where every permission is implicitly granted.
#[derive(Debug, Default)]
pub struct AlwaysGranted;

#[async_trait]
impl PermissionRequester for AlwaysGranted {
    async fn request(&self, permissions: &[Permission]) -> HashMap<Permission, bool> {
        permissions.iter().map(|p| (*p, true)).collect()
    }
}

/// Gate that must pass before any radio operation proceeds.
pub struct PermissionGate {
    platform: Platform,
    requester: Box<dyn PermissionRequester>,
}

impl PermissionGate {
    /// Create a gate for the given platform and permission subsystem.
    pub fn new(platform: Platform, requester: impl PermissionRequester + 'static) -> Self {
        Self {
            platform,
            requester: Box::new(requester),
        }
    }

    /// Create a gate for a desktop host, which has no runtime grant step.
    pub fn desktop() -> Self {
        Self::new(Platform::Desktop, AlwaysGranted)
    }

    /// Check (and if necessary request) the permissions required for BLE
    /// scanning and connection on this platform.
    ///
    /// A denial is final: the caller aborts the scan and surfaces a message,
    /// no automatic retry.
    pub async fn ensure_permissions(&self) -> PermissionOutcome {
        let required = match self.platform {
            Platform::Desktop => {
                debug!("No runtime permission grants on this platform");
                return PermissionOutcome::Granted;
            }
            Platform::Android { api_level } if api_level < RUNTIME_GRANT_FLOOR_API => {
                debug!(api_level, "Install-time permissions only");
                return PermissionOutcome::Granted;
            }
            Platform::Android { api_level } if api_level >= MODERN_BLUETOOTH_API => MODERN_SET,
            Platform::Android { .. } => LEGACY_SET,
        };

        debug!(?required, "Requesting runtime permissions");

        let decisions = self.requester.request(required).await;

        let denied: Vec<Permission> = required
            .iter()
            .filter(|p| !decisions.get(*p).copied().unwrap_or(false))
            .copied()
            .collect();

        if denied.is_empty() {
            info!("All required permissions granted");
            PermissionOutcome::Granted
        } else {
            info!(?denied, "Permissions denied");
            PermissionOutcome::Denied(denied)
        }
    }
}
