//! Scan lifecycle and the ranked device list.
//!
//! The controller owns the scan from start to stop: it gates on radio power,
//! holds the event subscription, deduplicates discovered peripherals by
//! identifier, keeps the visible list sorted by signal strength, and
//! auto-stops after a fixed timeout.

use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::ble::radio::{Advertisement, Radio, RadioState};
use crate::error::{Error, Result};
use crate::timer::Deadline;

/// Default scan duration before the controller auto-stops.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a scan session.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// How long a scan runs before auto-stopping, regardless of result
    /// count.
    pub timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

/// Scan lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    /// No scan in progress.
    #[default]
    Idle,
    /// Actively receiving discovery events.
    Scanning,
}

/// A peripheral discovered during the current scan session.
///
/// Not persisted; discarded when the list is cleared or the process exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peripheral {
    /// Stable identifier for this session.
    pub id: String,
    /// Advertised name. Entries without one never reach the visible list.
    pub name: Option<String>,
    /// Signal strength in dBm (more negative = weaker).
    pub rssi: Option<i16>,
}

impl Peripheral {
    /// Name for display, falling back to the identifier.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Handle for a registered discovery callback. Dropping it unregisters the
/// callback.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

/// Owns scan lifecycle and the deduplicated, ranked result list.
pub struct ScanController {
    radio: Arc<dyn Radio>,
    config: ScanConfig,
    state: Arc<RwLock<ScanState>>,
    devices: Arc<RwLock<Vec<Peripheral>>>,
    discovered_tx: broadcast::Sender<Peripheral>,
    pump: Arc<RwLock<Option<JoinHandle<()>>>>,
    timer: Mutex<Option<Deadline>>,
    callback_counter: AtomicU64,
}

impl ScanController {
    /// Create a controller with the default 10-second scan timeout.
    pub fn new(radio: Arc<dyn Radio>) -> Self {
        Self::with_config(radio, ScanConfig::default())
    }

    /// Create a controller with an explicit configuration.
    pub fn with_config(radio: Arc<dyn Radio>, config: ScanConfig) -> Self {
        let (discovered_tx, _) = broadcast::channel(64);

        Self {
            radio,
            config,
            state: Arc::new(RwLock::new(ScanState::Idle)),
            devices: Arc::new(RwLock::new(Vec::new())),
            discovered_tx,
            pump: Arc::new(RwLock::new(None)),
            timer: Mutex::new(None),
            callback_counter: AtomicU64::new(0),
        }
    }

    /// Start a scan session.
    ///
    /// No-op if a scan is already active: the existing list is kept and no
    /// second subscription is created. Prior results are cleared only when a
    /// fresh scan actually starts. The scan auto-stops after the configured
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RadioNotReady`] if the radio is not powered on, or
    /// [`Error::Scan`] if the radio refuses to start.
    pub async fn start_scan(&self) -> Result<()> {
        // Claim the scanning state before the first await so an
        // overlapping start sees it and backs off.
        {
            let mut state = self.state.write();
            match *state {
                ScanState::Scanning => {
                    debug!("Already scanning, ignoring start request");
                    return Ok(());
                }
                ScanState::Idle => *state = ScanState::Scanning,
            }
        }

        let radio_state = self.radio.state().await;
        if radio_state != RadioState::PoweredOn {
            *self.state.write() = ScanState::Idle;
            return Err(Error::RadioNotReady { state: radio_state });
        }

        info!("Starting BLE scan");

        self.devices.write().clear();

        let mut subscription = match self.radio.start_scan().await {
            Ok(subscription) => subscription,
            Err(e) => {
                *self.state.write() = ScanState::Idle;
                return Err(Error::Scan {
                    reason: e.to_string(),
                });
            }
        };

        let state = self.state.clone();
        let devices = self.devices.clone();
        let discovered_tx = self.discovered_tx.clone();

        let handle = tokio::spawn(async move {
            while let Some(advertisement) = subscription.recv().await {
                Self::ingest(advertisement, &devices, &discovered_tx);
            }

            // The subscription closing while we still think we are scanning
            // is the radio-error path.
            let mut state = state.write();
            if *state == ScanState::Scanning {
                error!("Scan event stream ended unexpectedly");
                *state = ScanState::Idle;
            }
        });

        *self.pump.write() = Some(handle);

        let radio = self.radio.clone();
        let state = self.state.clone();
        let pump = self.pump.clone();
        let timeout = self.config.timeout;

        *self.timer.lock() = Some(Deadline::after(timeout, move || async move {
            info!(?timeout, "Scan timeout reached, auto-stopping");
            Self::halt(&radio, &state, &pump).await;
        }));

        Ok(())
    }

    /// Stop the current scan. Idempotent; safe to call from any state.
    pub async fn stop_scan(&self) -> Result<()> {
        self.timer.lock().take();

        if *self.state.read() == ScanState::Idle {
            debug!("Not scanning, ignoring stop request");
            return Ok(());
        }

        info!("Stopping BLE scan");

        Self::halt(&self.radio, &self.state, &self.pump).await;

        Ok(())
    }

    /// Deterministic async teardown. Cancels the auto-stop timer and
    /// releases the radio, waiting for the stop to complete rather than
    /// relying on [`Drop`]'s best-effort abort.
    pub async fn shutdown(&self) {
        info!("Shutting down scan controller");
        self.timer.lock().take();
        Self::halt(&self.radio, &self.state, &self.pump).await;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ScanState {
        *self.state.read()
    }

    /// Check if a scan is active.
    pub fn is_scanning(&self) -> bool {
        *self.state.read() == ScanState::Scanning
    }

    /// Snapshot of the visible device list, sorted by signal strength
    /// descending with missing readings last.
    pub fn devices(&self) -> Vec<Peripheral> {
        self.devices.read().clone()
    }

    /// Look up a discovered peripheral by identifier.
    pub fn device(&self, id: &str) -> Option<Peripheral> {
        self.devices.read().iter().find(|d| d.id == id).cloned()
    }

    /// Subscribe to discovery events.
    pub fn subscribe(&self) -> broadcast::Receiver<Peripheral> {
        self.discovered_tx.subscribe()
    }

    /// Register a callback for newly discovered peripherals.
    pub fn on_device_discovered<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(Peripheral) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, AtomicOrdering::SeqCst);
        let mut rx = self.discovered_tx.subscribe();

        let handle = tokio::spawn(async move {
            while let Ok(peripheral) = rx.recv().await {
                callback(peripheral);
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    /// Insert an advertisement into the result list.
    ///
    /// Unnamed advertisements are dropped; known identifiers are not
    /// re-inserted; the list is re-ranked after every insert.
    fn ingest(
        advertisement: Advertisement,
        devices: &Arc<RwLock<Vec<Peripheral>>>,
        discovered_tx: &broadcast::Sender<Peripheral>,
    ) {
        let name = match &advertisement.local_name {
            Some(n) if !n.trim().is_empty() => n.clone(),
            _ => {
                trace!(id = %advertisement.id, "Ignoring unnamed advertisement");
                return;
            }
        };

        let peripheral = {
            let mut devices = devices.write();

            if devices.iter().any(|d| d.id == advertisement.id) {
                trace!(id = %advertisement.id, "Duplicate advertisement");
                return;
            }

            let peripheral = Peripheral {
                id: advertisement.id,
                name: Some(name),
                rssi: advertisement.rssi,
            };

            devices.push(peripheral.clone());
            devices.sort_by(signal_rank);
            peripheral
        };

        debug!(
            "Discovered device: {} ({}, {:?} dBm)",
            peripheral.display_name(),
            peripheral.id,
            peripheral.rssi
        );

        let _ = discovered_tx.send(peripheral);
    }

    /// Transition to idle and release radio resources. Shared by manual
    /// stop and the timeout path.
    async fn halt(
        radio: &Arc<dyn Radio>,
        state: &Arc<RwLock<ScanState>>,
        pump: &Arc<RwLock<Option<JoinHandle<()>>>>,
    ) {
        {
            let mut state = state.write();
            if *state == ScanState::Idle {
                return;
            }
            *state = ScanState::Idle;
        }

        if let Some(handle) = pump.write().take() {
            handle.abort();
        }

        if let Err(e) = radio.stop_scan().await {
            warn!("Failed to release radio scan: {}", e);
        }
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        // Force-stop: cancel the timeout and the pump so no event lands
        // after teardown. The radio itself is released when its owner drops.
        *self.state.write() = ScanState::Idle;
        if let Some(handle) = self.pump.write().take() {
            handle.abort();
        }
    }
}

/// Ranking for the visible list: RSSI descending, missing readings last,
/// otherwise stable.
fn signal_rank(a: &Peripheral, b: &Peripheral) -> Ordering {
    match (a.rssi, b.rssi) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
