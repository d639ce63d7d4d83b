//! Connection lifecycle.
//!
//! The controller serializes connection attempts: at most one connection per
//! instance, concurrent attempts rejected rather than queued. A successful
//! handshake is not enough; the connection counts as ready only once
//! capability discovery completes, and a link whose discovery fails is torn
//! down rather than left half-open.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::ble::radio::{ConnectOptions, Radio, ServiceInfo};
use crate::ble::scanner::{Peripheral, ScanController};
use crate::error::{Error, Result};

/// Default handshake deadline.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection state for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No connection and no attempt in flight.
    #[default]
    Disconnected,
    /// Handshake or capability discovery in progress.
    Connecting,
    /// Connected and capability discovery complete.
    Connected,
    /// Teardown in progress.
    Disconnecting,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Event for connection state changes.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    /// The identifier of the peripheral.
    pub identifier: String,
    /// The new connection state.
    pub state: ConnectionState,
}

/// A ready connection: handshake done, capabilities enumerated.
#[derive(Debug, Clone)]
pub struct Connection {
    /// The connected peripheral.
    pub peripheral: Peripheral,
    /// Services discovered on the peripheral.
    pub services: Vec<ServiceInfo>,
}

/// Configuration for connection attempts.
#[derive(Debug, Clone, Copy)]
pub struct ConnectConfig {
    /// Deadline for the connect handshake.
    pub timeout: Duration,
    /// Options passed to the handshake.
    pub options: ConnectOptions,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONNECT_TIMEOUT,
            options: ConnectOptions::default(),
        }
    }
}

/// Serializes connection attempts and enforces a single live connection.
pub struct ConnectionController {
    radio: Arc<dyn Radio>,
    scanner: Arc<ScanController>,
    config: ConnectConfig,
    state: Arc<RwLock<ConnectionState>>,
    current: RwLock<Option<Connection>>,
    event_tx: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionController {
    /// Create a controller with the default handshake deadline.
    pub fn new(radio: Arc<dyn Radio>, scanner: Arc<ScanController>) -> Self {
        Self::with_config(radio, scanner, ConnectConfig::default())
    }

    /// Create a controller with an explicit configuration.
    pub fn with_config(
        radio: Arc<dyn Radio>,
        scanner: Arc<ScanController>,
        config: ConnectConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(16);

        Self {
            radio,
            scanner,
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            current: RwLock::new(None),
            event_tx,
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// The active connection, if any.
    pub fn connection(&self) -> Option<Connection> {
        self.current.read().clone()
    }

    /// Subscribe to connection events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.event_tx.subscribe()
    }

    /// Attempt to connect to the given peripheral.
    ///
    /// Rejects (without queuing) if an attempt is already in flight or a
    /// connection is live. Stops any active scan before the handshake. The
    /// handshake runs under the configured deadline; after it succeeds,
    /// capability discovery must also succeed before the connection counts
    /// as ready. No step is retried automatically.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectRejected`] if busy or refused,
    /// [`Error::ConnectTimeout`] if the handshake deadline elapses,
    /// [`Error::CapabilityDiscovery`] if service enumeration fails (the
    /// link is torn down first).
    pub async fn connect(&self, peripheral: &Peripheral) -> Result<Connection> {
        {
            let mut state = self.state.write();
            match *state {
                ConnectionState::Disconnected => *state = ConnectionState::Connecting,
                ConnectionState::Connecting | ConnectionState::Disconnecting => {
                    return Err(Error::ConnectRejected {
                        reason: "a connection attempt is already in progress".to_string(),
                    });
                }
                ConnectionState::Connected => {
                    return Err(Error::ConnectRejected {
                        reason: "another device is already connected".to_string(),
                    });
                }
            }
        }

        self.emit(&peripheral.id, ConnectionState::Connecting);
        info!("Connecting to {} ({})", peripheral.display_name(), peripheral.id);

        if let Err(e) = self.scanner.stop_scan().await {
            warn!("Failed to stop scan before connecting: {}", e);
        }

        let handshake = self.radio.connect(&peripheral.id, self.config.options);

        match tokio::time::timeout(self.config.timeout, handshake).await {
            Err(_elapsed) => {
                self.set_state(&peripheral.id, ConnectionState::Disconnected);
                return Err(Error::ConnectTimeout {
                    seconds: self.config.timeout.as_secs(),
                });
            }
            Ok(Err(e)) => {
                self.set_state(&peripheral.id, ConnectionState::Disconnected);
                return Err(Error::ConnectRejected {
                    reason: e.to_string(),
                });
            }
            Ok(Ok(())) => {}
        }

        debug!("Handshake complete, discovering services");

        match self.radio.discover_services(&peripheral.id).await {
            Err(e) => {
                // A link without enumerated capabilities must not linger.
                if let Err(te) = self.radio.disconnect(&peripheral.id).await {
                    warn!("Teardown after failed discovery also failed: {}", te);
                }
                self.set_state(&peripheral.id, ConnectionState::Disconnected);
                Err(Error::CapabilityDiscovery {
                    reason: e.to_string(),
                })
            }
            Ok(services) => {
                let connection = Connection {
                    peripheral: peripheral.clone(),
                    services,
                };

                *self.current.write() = Some(connection.clone());
                self.set_state(&peripheral.id, ConnectionState::Connected);

                info!(
                    "Connected to {} ({} services)",
                    connection.peripheral.display_name(),
                    connection.services.len()
                );

                Ok(connection)
            }
        }
    }

    /// Tear down the active connection. Idempotent if none is active.
    ///
    /// # Errors
    ///
    /// [`Error::Disconnect`] if the radio reports a teardown failure; local
    /// connection state is cleared regardless.
    pub async fn disconnect(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            match *state {
                ConnectionState::Connected => *state = ConnectionState::Disconnecting,
                _ => {
                    debug!("No active connection, ignoring disconnect");
                    return Ok(());
                }
            }
        }

        let connection = self.current.write().take();
        let identifier = match connection {
            Some(c) => c.peripheral.id,
            None => {
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }
        };

        self.emit(&identifier, ConnectionState::Disconnecting);

        match self.radio.disconnect(&identifier).await {
            Ok(()) => {
                info!("Disconnected from {}", identifier);
                self.set_state(&identifier, ConnectionState::Disconnected);
                Ok(())
            }
            Err(e) => {
                self.set_state(&identifier, ConnectionState::Disconnected);
                Err(Error::Disconnect {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Update the connection state and emit an event if it changed.
    fn set_state(&self, identifier: &str, new_state: ConnectionState) {
        let old_state = {
            let mut state = self.state.write();
            let old = *state;
            *state = new_state;
            old
        };

        if old_state != new_state {
            debug!("Connection state changed: {} -> {}", old_state, new_state);
            self.emit(identifier, new_state);
        }
    }

    fn emit(&self, identifier: &str, state: ConnectionState) {
        let _ = self.event_tx.send(ConnectionEvent {
            identifier: identifier.to_string(),
            state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::radio::testing::{ConnectBehavior, DiscoverBehavior, FakeRadio};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;

    fn peripheral(id: &str) -> Peripheral {
        Peripheral {
            id: id.to_string(),
            name: Some(format!("Device {id}")),
            rssi: Some(-50),
        }
    }

    fn fixture() -> (Arc<FakeRadio>, Arc<ScanController>, Arc<ConnectionController>) {
        let radio = Arc::new(FakeRadio::new());
        let scanner = Arc::new(ScanController::new(radio.clone() as Arc<dyn Radio>));
        let connection = Arc::new(ConnectionController::new(
            radio.clone() as Arc<dyn Radio>,
            scanner.clone(),
        ));
        (radio, scanner, connection)
    }

    #[test]
    fn test_connection_state_helpers() {
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());

        assert!(ConnectionState::Connecting.is_transitioning());
        assert!(ConnectionState::Disconnecting.is_transitioning());
        assert!(!ConnectionState::Connected.is_transitioning());
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(format!("{}", ConnectionState::Connected), "Connected");
        assert_eq!(format!("{}", ConnectionState::Disconnected), "Disconnected");
    }

    #[tokio::test]
    async fn test_connect_success() {
        let (radio, _scanner, controller) = fixture();

        let connection = controller.connect(&peripheral("aa")).await.unwrap();

        assert!(!connection.services.is_empty());
        assert_eq!(controller.state(), ConnectionState::Connected);
        assert_eq!(radio.connect_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_stops_active_scan() {
        let (radio, scanner, controller) = fixture();
        scanner.start_scan().await.unwrap();

        controller.connect(&peripheral("aa")).await.unwrap();

        assert!(!scanner.is_scanning());
        assert_eq!(radio.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_connect_rejected_without_second_handshake() {
        let (radio, _scanner, controller) = fixture();
        radio.set_connect(ConnectBehavior::Hang);

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.connect(&peripheral("aa")).await })
        };
        tokio::task::yield_now().await;

        let err = controller.connect(&peripheral("bb")).await.unwrap_err();
        assert!(matches!(err, Error::ConnectRejected { .. }));
        assert_eq!(radio.connect_calls.load(Ordering::SeqCst), 1);

        first.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timeout() {
        let (radio, _scanner, controller) = fixture();
        radio.set_connect(ConnectBehavior::Hang);

        let err = controller.connect(&peripheral("aa")).await.unwrap_err();

        assert!(matches!(err, Error::ConnectTimeout { seconds: 10 }));
        assert_eq!(controller.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_handshake_rejection() {
        let (radio, _scanner, controller) = fixture();
        radio.set_connect(ConnectBehavior::Reject("refused by peer".into()));

        let err = controller.connect(&peripheral("aa")).await.unwrap_err();

        assert!(matches!(err, Error::ConnectRejected { .. }));
        assert_eq!(controller.state(), ConnectionState::Disconnected);
        assert_eq!(radio.disconnect_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_discovery_failure_tears_down_link() {
        let (radio, _scanner, controller) = fixture();
        radio.set_discover(DiscoverBehavior::Fail("gatt unavailable".into()));

        let err = controller.connect(&peripheral("aa")).await.unwrap_err();

        assert!(matches!(err, Error::CapabilityDiscovery { .. }));
        // No dangling half-open link.
        assert_eq!(radio.disconnect_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), ConnectionState::Disconnected);
        assert!(controller.connection().is_none());
    }

    #[tokio::test]
    async fn test_second_connect_while_connected_rejected() {
        let (radio, _scanner, controller) = fixture();

        controller.connect(&peripheral("aa")).await.unwrap();
        let err = controller.connect(&peripheral("bb")).await.unwrap_err();

        assert!(matches!(err, Error::ConnectRejected { .. }));
        assert_eq!(radio.connect_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (radio, _scanner, controller) = fixture();

        controller.disconnect().await.unwrap();
        assert_eq!(radio.disconnect_calls.load(Ordering::SeqCst), 0);

        controller.connect(&peripheral("aa")).await.unwrap();
        controller.disconnect().await.unwrap();
        controller.disconnect().await.unwrap();

        assert_eq!(radio.disconnect_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_reconnect_after_disconnect_allowed() {
        let (_radio, _scanner, controller) = fixture();

        controller.connect(&peripheral("aa")).await.unwrap();
        controller.disconnect().await.unwrap();
        controller.connect(&peripheral("bb")).await.unwrap();

        assert_eq!(
            controller.connection().unwrap().peripheral.id,
            "bb".to_string()
        );
    }
}
