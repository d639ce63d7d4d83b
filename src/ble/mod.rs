//! BLE orchestration module.
//!
//! The radio itself is a black box behind the [`radio::Radio`] trait; this
//! module owns scan and connection lifecycle on top of it.

pub mod connection;
pub mod radio;
pub mod scanner;

pub use connection::{ConnectConfig, Connection, ConnectionController, ConnectionState};
pub use radio::{
    Advertisement, BtleRadio, ConnectOptions, Radio, RadioState, ScanSubscription, ServiceInfo,
};
pub use scanner::{CallbackHandle, Peripheral, ScanConfig, ScanController, ScanState};
