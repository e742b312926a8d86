//! Simulated gateway
//!
//! In-memory stand-in for the vendor driver. Behaves like a single-module
//! master unit: references follow writes, actual values follow references
//! while the output is enabled. A [`SimulatorHandle`] shares the state so
//! callers can inject faults and observe connection attempts.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::PortRange;
use crate::error::{BridgeError, Result};
use super::{
    CommStatus, DeviceGateway, DspVersion, Electrical, ErrorTrees, PhysicalLimits, Quantity,
    Scope, SlopeKind, SlopeRamp,
};

/// Simulated load seen by the output (Ohm)
const LOAD_OHM: f64 = 10.0;

/// Remote control input selected on connect (RS232)
const REMOTE_CONTROL_RS232: f64 = 2.0;

/// Fault to raise on the next gateway call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFault {
    /// Transport failure; the link stays open at the driver level
    Communication,

    /// The device refused to execute the command
    Command,
}

struct SimState {
    connected: bool,
    status: CommStatus,
    fail_connect: bool,
    device_port: Option<u32>,
    fault: Option<InjectedFault>,
    connect_attempts: usize,
    calls: usize,
    module_id: u32,
    selected: Scope,
    limits: PhysicalLimits,
    refs: Electrical,
    output_enabled: bool,
    control_mode: u32,
    remote_control_input: f64,
    voltage_slope: SlopeRamp,
    current_slope: SlopeRamp,
    trees: ErrorTrees,
    stored_parameters: usize,
}

impl SimState {
    fn new() -> Self {
        let max = Electrical {
            voltage: 1000.0,
            current: 32.0,
            power: 32.0,
            resistance: 1_000_000.0,
        };
        Self {
            connected: false,
            status: CommStatus::Disconnected,
            fail_connect: false,
            device_port: None,
            fault: None,
            connect_attempts: 0,
            calls: 0,
            module_id: 0,
            selected: Scope::System,
            limits: PhysicalLimits {
                min: Electrical::default(),
                max,
                nom: max,
            },
            refs: Electrical::default(),
            output_enabled: false,
            control_mode: 1,
            remote_control_input: 0.0,
            voltage_slope: SlopeRamp { raw: 32000, startup_raw: 32000 },
            current_slope: SlopeRamp { raw: 32000, startup_raw: 32000 },
            trees: ErrorTrees::default(),
            stored_parameters: 0,
        }
    }

    /// Checks every call must pass; consumes a pending injected fault
    fn begin(&mut self, operation: &str) -> Result<()> {
        self.calls += 1;
        if !self.connected {
            return Err(BridgeError::device(
                CommStatus::Disconnected,
                format!("{}: device not connected", operation),
            ));
        }
        match self.fault.take() {
            Some(InjectedFault::Communication) => {
                self.status = CommStatus::CommunicationError;
                Err(BridgeError::device(
                    self.status,
                    format!("{}: communication failure", operation),
                ))
            }
            Some(InjectedFault::Command) => {
                self.status = CommStatus::CommandError;
                Err(BridgeError::device(
                    self.status,
                    format!("{}: command rejected by device", operation),
                ))
            }
            None => {
                self.status = CommStatus::Ok;
                Ok(())
            }
        }
    }

    fn actual_current(&self) -> f64 {
        if !self.output_enabled {
            return 0.0;
        }
        (self.refs.voltage / LOAD_OHM).min(self.refs.current)
    }

    fn actual_voltage(&self) -> f64 {
        if !self.output_enabled {
            return 0.0;
        }
        self.actual_current() * LOAD_OHM
    }

    fn reject(&mut self, message: String) -> BridgeError {
        self.status = CommStatus::CommandError;
        BridgeError::device(self.status, message)
    }
}

/// In-memory gateway; cloning shares the same simulated device
#[derive(Clone)]
pub struct SimulatedGateway {
    state: Arc<Mutex<SimState>>,
}

/// Test and demo control over a [`SimulatedGateway`]
#[derive(Clone)]
pub struct SimulatorHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedGateway {
    /// Create a disconnected simulated master module
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new())),
        }
    }

    /// Get a handle sharing this device's state
    pub fn handle(&self) -> SimulatorHandle {
        SimulatorHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorHandle {
    /// Make the next gateway call fail with `fault`
    pub fn fail_next(&self, fault: InjectedFault) {
        self.state.lock().fault = Some(fault);
    }

    /// Make connection attempts fail until cleared
    pub fn set_fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    /// Only answer on this port (None = answer on the first searched port)
    pub fn set_device_port(&self, port: Option<u32>) {
        self.state.lock().device_port = port;
    }

    /// Report this module id (0 = master)
    pub fn set_module_id(&self, id: u32) {
        self.state.lock().module_id = id;
    }

    /// Simulate losing the link without the driver being told
    pub fn drop_link(&self) {
        let mut state = self.state.lock();
        state.connected = false;
        state.status = CommStatus::CommunicationError;
    }

    /// Set one entry of the error tree
    pub fn raise_error(&self, group: u32, index: usize, bits: u32) {
        let mut state = self.state.lock();
        state.trees.error_group |= group;
        if let Some(entry) = state.trees.errors.get_mut(index) {
            *entry |= bits;
        }
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().connect_attempts
    }

    /// Number of gateway calls made while a session was active
    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    pub fn stored_parameters(&self) -> usize {
        self.state.lock().stored_parameters
    }

    pub fn slope_ramp(&self, kind: SlopeKind) -> SlopeRamp {
        let state = self.state.lock();
        match kind {
            SlopeKind::Voltage => state.voltage_slope,
            SlopeKind::Current => state.current_slope,
        }
    }
}

impl DeviceGateway for SimulatedGateway {
    fn driver_version(&self) -> String {
        "3.88.0 (simulated)".to_string()
    }

    fn connect(&mut self, ports: PortRange) -> Result<u32> {
        let mut state = self.state.lock();
        state.connect_attempts += 1;

        if state.connected {
            return Err(BridgeError::device(
                CommStatus::CommandError,
                "already connected to a device",
            ));
        }

        let found = match state.device_port {
            Some(port) if port >= ports.from && port <= ports.to => Some(port),
            Some(_) => None,
            None => Some(ports.from),
        };

        match found {
            Some(port) if !state.fail_connect => {
                state.connected = true;
                state.status = CommStatus::Ok;
                state.selected = Scope::System;
                state.remote_control_input = REMOTE_CONTROL_RS232;
                Ok(port)
            }
            _ => {
                state.status = CommStatus::CommunicationError;
                Err(BridgeError::device(
                    state.status,
                    format!("no device found on ports {}", ports),
                ))
            }
        }
    }

    fn disconnect(&mut self) {
        let mut state = self.state.lock();
        state.connected = false;
        state.status = CommStatus::Disconnected;
    }

    fn status(&mut self) -> CommStatus {
        self.state.lock().status
    }

    fn select(&mut self, scope: Scope) -> Result<()> {
        let mut state = self.state.lock();
        state.begin("select")?;
        tracing::trace!("Selecting {:?} (selector {})", scope, scope.selector());
        state.selected = scope;
        Ok(())
    }

    fn module_id(&mut self) -> Result<u32> {
        let mut state = self.state.lock();
        state.begin("module id")?;
        Ok(state.module_id)
    }

    fn dsp_version(&mut self) -> Result<DspVersion> {
        let mut state = self.state.lock();
        state.begin("dsp version")?;
        Ok(DspVersion { main: 4, sub: 20, revision: 3 })
    }

    fn physical_limits(&mut self, _scope: Scope) -> Result<PhysicalLimits> {
        let mut state = self.state.lock();
        state.begin("physical limits")?;
        Ok(state.limits)
    }

    fn read(&mut self, quantity: Quantity) -> Result<f64> {
        let mut state = self.state.lock();
        state.begin("read")?;

        let value = match quantity {
            Quantity::ActualVoltage => state.actual_voltage(),
            Quantity::ActualCurrent => state.actual_current(),
            Quantity::ActualPower => state.actual_voltage() * state.actual_current() / 1000.0,
            Quantity::ActualResistance => {
                let current = state.actual_current();
                if current > 0.0 {
                    state.actual_voltage() / current * 1000.0
                } else {
                    0.0
                }
            }
            Quantity::State => {
                if state.output_enabled {
                    8.0
                } else {
                    4.0
                }
            }
            Quantity::ControlMode => f64::from(state.control_mode),
            Quantity::VoltageRef => state.refs.voltage,
            Quantity::CurrentRef => state.refs.current,
            Quantity::PowerRef => state.refs.power,
            Quantity::ResistanceRef => state.refs.resistance,
            Quantity::OutputVoltageEnable => f64::from(u8::from(state.output_enabled)),
            Quantity::RemoteControlInput => state.remote_control_input,
            Quantity::DcLinkVoltage => 650.0,
            Quantity::PrimaryCurrent => state.actual_current() * 0.4,
            Quantity::IgbtTemperature => 31.5,
            Quantity::RectifierTemperature => 29.0,
            Quantity::PcbTemperature => 35.25,
        };
        Ok(value)
    }

    fn write(&mut self, quantity: Quantity, value: f64) -> Result<()> {
        let mut state = self.state.lock();
        state.begin("write")?;

        if !quantity.is_writable() || state.selected != Scope::System {
            let message = format!("{:?} is not writable in {:?} scope", quantity, state.selected);
            return Err(state.reject(message));
        }

        let (min, max) = match quantity {
            Quantity::VoltageRef => (state.limits.min.voltage, state.limits.max.voltage),
            Quantity::CurrentRef => (state.limits.min.current, state.limits.max.current),
            Quantity::PowerRef => (state.limits.min.power, state.limits.max.power),
            Quantity::ResistanceRef => (state.limits.min.resistance, state.limits.max.resistance),
            _ => (0.0, 1.0),
        };
        if value < min || value > max {
            let message = format!("{:?} value {} outside {}..={}", quantity, value, min, max);
            return Err(state.reject(message));
        }

        match quantity {
            Quantity::VoltageRef => state.refs.voltage = value,
            Quantity::CurrentRef => state.refs.current = value,
            Quantity::PowerRef => state.refs.power = value,
            Quantity::ResistanceRef => state.refs.resistance = value,
            Quantity::OutputVoltageEnable => state.output_enabled = value != 0.0,
            _ => {}
        }
        Ok(())
    }

    fn error_trees(&mut self) -> Result<ErrorTrees> {
        let mut state = self.state.lock();
        state.begin("error tree")?;
        Ok(state.trees)
    }

    fn slope_ramp(&mut self, kind: SlopeKind) -> Result<SlopeRamp> {
        let mut state = self.state.lock();
        state.begin("slope ramp")?;
        Ok(match kind {
            SlopeKind::Voltage => state.voltage_slope,
            SlopeKind::Current => state.current_slope,
        })
    }

    fn set_slope_ramp(&mut self, kind: SlopeKind, ramp: SlopeRamp) -> Result<()> {
        let mut state = self.state.lock();
        state.begin("set slope ramp")?;
        match kind {
            SlopeKind::Voltage => state.voltage_slope = ramp,
            SlopeKind::Current => state.current_slope = ramp,
        }
        Ok(())
    }

    fn clear_errors(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.begin("clear errors")?;
        state.trees = ErrorTrees::default();
        Ok(())
    }

    fn store_parameters(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.begin("store parameters")?;
        state.stored_parameters += 1;
        Ok(())
    }
}
