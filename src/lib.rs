//! # showcase-core
//!
//! The headless orchestration core of a three-screen demo application:
//! Bluetooth Low Energy scanning and connection, a swipe-to-act gesture
//! card, and a simple remote product list. Rendering is left to the host
//! application; this crate owns the state machines, lifecycles, and
//! contracts behind each screen.
//!
//! ## Screens
//!
//! - **Device list**: permission gate, scan lifecycle with auto-timeout, a
//!   deduplicated list ranked by signal strength, and a single serialized
//!   connection with capability discovery.
//! - **Gesture card**: a one-directional drag state machine with
//!   proportional visual feedback and a threshold-committed action.
//! - **Remote list**: one fetch of a fixed resource, rendered in order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use showcase_core::{
//!     BtleRadio, ConnectionController, DeviceListScreen, PermissionGate,
//!     Radio, Result, ScanController,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let radio: Arc<dyn Radio> = Arc::new(BtleRadio::new().await?);
//!     let scanner = Arc::new(ScanController::new(radio.clone()));
//!     let connection = Arc::new(ConnectionController::new(radio, scanner.clone()));
//!
//!     let screen = DeviceListScreen::new(PermissionGate::desktop(), scanner, connection);
//!     screen.activate().await?;
//!
//!     // Scanning auto-stops after 10 seconds.
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!
//!     for device in screen.devices() {
//!         println!("{} ({:?} dBm)", device.display_name(), device.rssi);
//!     }
//!
//!     screen.deactivate().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.

// Public modules
pub mod ble;
pub mod device_list;
pub mod error;
pub mod gesture;
pub mod permissions;
pub mod remote;
pub mod timer;

// Re-exports for convenience
pub use ble::connection::{
    ConnectConfig, Connection, ConnectionController, ConnectionState, DEFAULT_CONNECT_TIMEOUT,
};
pub use ble::radio::{Advertisement, BtleRadio, ConnectOptions, Radio, RadioState, ServiceInfo};
pub use ble::scanner::{
    CallbackHandle, Peripheral, ScanConfig, ScanController, ScanState, DEFAULT_SCAN_TIMEOUT,
};
pub use device_list::DeviceListScreen;
pub use error::{Error, Result};
pub use gesture::{
    SwipeCard, SwipeCardController, SwipeOutcome, SwipePhase, Visual, DEFAULT_SWIPE_THRESHOLD,
};
pub use permissions::{
    AlwaysGranted, Permission, PermissionGate, PermissionOutcome, PermissionRequester, Platform,
};
pub use remote::{HttpFetcher, ItemFetcher, ItemId, RemoteItem, RemoteListScreen, PRODUCTS_URL};
pub use timer::Deadline;
