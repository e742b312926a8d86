//! Device Module
//!
//! Contract of the vendor communication driver, as consumed by the
//! instrument glue, plus an in-memory implementation.
//!
//! ## Responsibilities
//! - Blocking connect / disconnect against a port range
//! - Scope selection (whole system vs. the addressed module)
//! - Quantity reads and writes, error trees, slope ramps
//! - Status query used to classify faults
//!
//! Every call may fail with [`BridgeError::Device`](crate::BridgeError::Device).

mod simulated;

pub use simulated::{SimulatedGateway, SimulatorHandle, InjectedFault};

use std::fmt;

use crate::config::PortRange;
use crate::error::Result;

/// Number of entries in an error or warning tree
pub const ERROR_TREE_LEN: usize = 32;

/// Link status as reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommStatus {
    Ok,
    CommandError,
    CommunicationError,
    Disconnected,
    Unknown,
}

impl fmt::Display for CommStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CommStatus::Ok => "ok",
            CommStatus::CommandError => "device reported command execution error",
            CommStatus::CommunicationError => "communication error",
            CommStatus::Disconnected => "disconnected",
            CommStatus::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

/// Which set of values subsequent calls address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Aggregate values of all modules (selector 64)
    System,

    /// The module the link is attached to (selector 0)
    Module,
}

impl Scope {
    /// Raw selector value understood by the driver
    pub fn selector(&self) -> u32 {
        match self {
            Scope::System => 64,
            Scope::Module => 0,
        }
    }
}

/// Scalar quantities readable (and partly writable) through the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    ActualVoltage,
    ActualCurrent,
    ActualPower,
    ActualResistance,
    State,
    ControlMode,
    VoltageRef,
    CurrentRef,
    PowerRef,
    ResistanceRef,
    OutputVoltageEnable,
    RemoteControlInput,
    DcLinkVoltage,
    PrimaryCurrent,
    IgbtTemperature,
    RectifierTemperature,
    PcbTemperature,
}

impl Quantity {
    /// Whether the driver accepts writes of this quantity
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            Quantity::VoltageRef
                | Quantity::CurrentRef
                | Quantity::PowerRef
                | Quantity::ResistanceRef
                | Quantity::OutputVoltageEnable
        )
    }
}

/// Physical limits of one scope
///
/// Units: V, A, kW, mOhm.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhysicalLimits {
    pub min: Electrical,
    pub max: Electrical,
    pub nom: Electrical,
}

/// One value per electrical dimension
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Electrical {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub resistance: f64,
}

/// Error and warning bitmaps of the selected scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorTrees {
    pub error_group: u32,
    pub errors: [u32; ERROR_TREE_LEN],
    pub warning_group: u32,
    pub warnings: [u32; ERROR_TREE_LEN],
}

/// DSP firmware identification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DspVersion {
    pub main: u32,
    pub sub: u32,
    pub revision: u32,
}

impl fmt::Display for DspVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.main, self.sub, self.revision)
    }
}

/// Which ramp a slope call addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeKind {
    Voltage,
    Current,
}

/// Raw ramp register pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlopeRamp {
    /// Ramp used during normal operation
    pub raw: u32,

    /// Ramp used on output startup
    pub startup_raw: u32,
}

/// Blocking interface of the vendor communication driver
///
/// Calls act on the scope chosen by the last [`select`](Self::select).
pub trait DeviceGateway: Send {
    /// Driver library version string
    fn driver_version(&self) -> String;

    /// Search `ports` for a device and open the link; returns the port found
    fn connect(&mut self, ports: PortRange) -> Result<u32>;

    /// Close the link; safe to call when already closed
    fn disconnect(&mut self);

    /// Current link status
    fn status(&mut self) -> CommStatus;

    fn select(&mut self, scope: Scope) -> Result<()>;

    fn module_id(&mut self) -> Result<u32>;

    fn dsp_version(&mut self) -> Result<DspVersion>;

    fn physical_limits(&mut self, scope: Scope) -> Result<PhysicalLimits>;

    fn read(&mut self, quantity: Quantity) -> Result<f64>;

    fn write(&mut self, quantity: Quantity, value: f64) -> Result<()>;

    fn error_trees(&mut self) -> Result<ErrorTrees>;

    fn slope_ramp(&mut self, kind: SlopeKind) -> Result<SlopeRamp>;

    fn set_slope_ramp(&mut self, kind: SlopeKind, ramp: SlopeRamp) -> Result<()>;

    fn clear_errors(&mut self) -> Result<()>;

    fn store_parameters(&mut self) -> Result<()>;
}

/// Link management the session loop needs from a dispatch context
pub trait DeviceLink {
    /// Connect if not connected; returns whether the link is usable
    fn ensure_connected(&mut self) -> bool;

    /// Query the driver status, for fault reports
    fn comm_status(&mut self) -> CommStatus;

    /// Drop the link so the next request reconnects
    fn force_disconnect(&mut self);
}
