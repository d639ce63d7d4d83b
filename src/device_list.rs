//! Device list screen.
//!
//! Ties the permission gate, scan controller, and connection controller
//! together the way the screen uses them: mount checks permissions and
//! starts the scan, a row tap connects, unmount force-stops everything.

use std::sync::Arc;
use tracing::warn;

use crate::ble::connection::{Connection, ConnectionController};
use crate::ble::scanner::{Peripheral, ScanController};
use crate::error::{Error, Result};
use crate::permissions::{PermissionGate, PermissionOutcome};

/// View model for the BLE device list screen.
pub struct DeviceListScreen {
    gate: PermissionGate,
    scanner: Arc<ScanController>,
    connection: Arc<ConnectionController>,
}

impl DeviceListScreen {
    /// Assemble the screen from its controllers.
    pub fn new(
        gate: PermissionGate,
        scanner: Arc<ScanController>,
        connection: Arc<ConnectionController>,
    ) -> Self {
        Self {
            gate,
            scanner,
            connection,
        }
    }

    /// Screen mount: pass the permission gate, then start scanning.
    ///
    /// # Errors
    ///
    /// [`Error::PermissionDenied`] if any required permission is denied (no
    /// retry; the scan is aborted), or a scan-start error.
    pub async fn activate(&self) -> Result<()> {
        match self.gate.ensure_permissions().await {
            PermissionOutcome::Granted => {}
            PermissionOutcome::Denied(denied) => {
                warn!(?denied, "Aborting scan, permissions denied");
                return Err(Error::PermissionDenied { denied });
            }
        }

        self.scanner.start_scan().await
    }

    /// Header line for the screen.
    pub fn title(&self) -> String {
        match self.connection.connection() {
            Some(c) => format!("Connected to: {}", c.peripheral.display_name()),
            None => "Available Devices".to_string(),
        }
    }

    /// The ranked visible device list.
    pub fn devices(&self) -> Vec<Peripheral> {
        self.scanner.devices()
    }

    /// User selection of a row: connect to that peripheral.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceNotFound`] if the identifier is not in the current
    /// list, otherwise whatever the connection attempt surfaces.
    pub async fn select(&self, id: &str) -> Result<Connection> {
        let peripheral = self
            .scanner
            .device(id)
            .ok_or_else(|| Error::DeviceNotFound {
                identifier: id.to_string(),
            })?;

        self.connection.connect(&peripheral).await
    }

    /// Screen unmount: force-stop scanning and tear down any connection.
    /// Failures are logged, never propagated; teardown always completes.
    pub async fn deactivate(&self) {
        self.scanner.shutdown().await;
        if let Err(e) = self.connection.disconnect().await {
            warn!("Failed to disconnect on teardown: {}", e);
        }
    }
}
