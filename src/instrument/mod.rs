//! Instrument Module
//!
//! Device-specific glue between the command registry and the gateway.
//!
//! ## Responsibilities
//! - Own the gateway and the `connected` flag of the device link
//! - Cache one-time readings (module id, physical limits) per connection
//! - Stage slope setpoints before writing them to the device
//! - Hold the debug scratch value exposed as the `debug` command
//! - Provide the standard command set ([`standard_registry`])
//!
//! ## Connect sequence
//! 1. Gateway searches the configured port range
//! 2. Read module id (0 = master)
//! 3. Read module limits; on a master also the system limits
//! 4. Select system scope (the default for all later calls)

mod commands;
pub mod slope;

pub use commands::standard_registry;

use std::fmt::Display;

use crate::config::PortRange;
use crate::device::{
    CommStatus, DeviceGateway, DeviceLink, PhysicalLimits, Quantity, Scope, SlopeKind, SlopeRamp,
};
use crate::error::{BridgeError, Result};

/// Slope setpoints waiting to be written, as raw register values
///
/// Zero means "not staged yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StagedSlopes {
    pub voltage: SlopeRamp,
    pub current: SlopeRamp,
}

impl StagedSlopes {
    fn ramp(&self, kind: SlopeKind) -> SlopeRamp {
        match kind {
            SlopeKind::Voltage => self.voltage,
            SlopeKind::Current => self.current,
        }
    }

    fn ramp_mut(&mut self, kind: SlopeKind) -> &mut SlopeRamp {
        match kind {
            SlopeKind::Voltage => &mut self.voltage,
            SlopeKind::Current => &mut self.current,
        }
    }
}

/// Instrument context passed to every binding
pub struct Instrument<G> {
    /// Vendor driver (exclusive to the active session)
    gateway: G,

    /// Ports searched on every (re)connect
    ports: PortRange,

    /// Whether the device link is established
    connected: bool,

    /// Port the device answered on at the last connect
    port_found: Option<u32>,

    // One-time readings, refreshed on every connect
    module_id: u32,
    system_limits: PhysicalLimits,
    module_limits: PhysicalLimits,

    staged: StagedSlopes,

    /// Scratch value behind the `debug` command
    debug: f64,
}

impl<G: DeviceGateway> Instrument<G> {
    /// Create a disconnected instrument
    pub fn new(gateway: G, ports: PortRange) -> Self {
        tracing::info!("Driver version: {}", gateway.driver_version());
        Self {
            gateway,
            ports,
            connected: false,
            port_found: None,
            module_id: 0,
            system_limits: PhysicalLimits::default(),
            module_limits: PhysicalLimits::default(),
            staged: StagedSlopes::default(),
            debug: 0.0,
        }
    }

    // =========================================================================
    // Link
    // =========================================================================

    /// Open the device link and refresh the one-time readings
    pub fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }

        tracing::info!("Searching device on ports {}", self.ports);
        let port = self.gateway.connect(self.ports)?;
        self.port_found = Some(port);

        if let Err(e) = self.initialize() {
            self.gateway.disconnect();
            return Err(e);
        }

        self.connected = true;
        tracing::info!(
            "Device connected at port {:02}, configured as {} with module ID {}",
            port,
            if self.is_master() { "master" } else { "slave" },
            self.module_id
        );
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        self.module_id = self.gateway.module_id()?;
        self.module_limits = self.gateway.physical_limits(Scope::Module)?;
        if self.is_master() {
            self.system_limits = self.gateway.physical_limits(Scope::System)?;
        }
        self.gateway.select(Scope::System)
    }

    /// Close the device link; safe to call when already closed
    pub fn disconnect(&mut self) {
        self.gateway.disconnect();
        if self.connected {
            tracing::warn!("Device link closed");
        }
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn port_found(&self) -> Option<u32> {
        self.port_found
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    // =========================================================================
    // Cached values
    // =========================================================================

    pub fn module_id(&self) -> u32 {
        self.module_id
    }

    pub fn is_master(&self) -> bool {
        self.module_id == 0
    }

    pub fn limits(&self, scope: Scope) -> &PhysicalLimits {
        match scope {
            Scope::System => &self.system_limits,
            Scope::Module => &self.module_limits,
        }
    }

    pub fn debug(&self) -> f64 {
        self.debug
    }

    pub fn set_debug(&mut self, value: f64) {
        self.debug = value;
    }

    // =========================================================================
    // Readings
    // =========================================================================

    /// Read a quantity from `scope`, leaving system scope selected
    pub fn read_in(&mut self, scope: Scope, quantity: Quantity) -> Result<f64> {
        self.gateway.select(scope)?;
        let value = self.gateway.read(quantity);
        if scope != Scope::System {
            self.gateway.select(Scope::System)?;
        }
        value
    }

    /// `[voltage,current,power,resistance,state]` of `scope`
    pub fn readings(&mut self, scope: Scope) -> Result<String> {
        let quantities = [
            Quantity::ActualVoltage,
            Quantity::ActualCurrent,
            Quantity::ActualPower,
            Quantity::ActualResistance,
            Quantity::State,
        ];
        let mut values = Vec::with_capacity(quantities.len());
        for quantity in quantities {
            values.push(self.read_in(scope, quantity)?);
        }
        Ok(array(&values))
    }

    /// Cached limits as `[min V,I,P,R, max V,I,P,R, nom V,I,P,R]`
    pub fn min_max_nom(&self, scope: Scope) -> String {
        let limits = self.limits(scope);
        let values: Vec<f64> = [limits.min, limits.max, limits.nom]
            .iter()
            .flat_map(|e| [e.voltage, e.current, e.power, e.resistance])
            .collect();
        array(&values)
    }

    /// `[group,errors..,warning group,warnings..]` of `scope`
    pub fn error_tree(&mut self, scope: Scope) -> Result<String> {
        self.gateway.select(scope)?;
        let trees = self.gateway.error_trees();
        if scope != Scope::System {
            self.gateway.select(Scope::System)?;
        }
        let trees = trees?;

        let mut values = Vec::with_capacity(2 + 2 * trees.errors.len());
        values.push(trees.error_group);
        values.extend_from_slice(&trees.errors);
        values.push(trees.warning_group);
        values.extend_from_slice(&trees.warnings);
        Ok(array(&values))
    }

    /// `[igbt,rectifier,pcb]` heat sink and board temperatures
    pub fn temperatures(&mut self) -> Result<String> {
        let igbt = self.gateway.read(Quantity::IgbtTemperature)?;
        let rectifier = self.gateway.read(Quantity::RectifierTemperature)?;
        let pcb = self.gateway.read(Quantity::PcbTemperature)?;
        Ok(array(&[igbt, rectifier, pcb]))
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Write a system reference after checking it against the system limits
    pub fn set_reference(&mut self, quantity: Quantity, value: f64) -> Result<()> {
        let limits = &self.system_limits;
        let (min, max) = match quantity {
            Quantity::VoltageRef => (limits.min.voltage, limits.max.voltage),
            Quantity::CurrentRef => (limits.min.current, limits.max.current),
            Quantity::PowerRef => (limits.min.power, limits.max.power),
            Quantity::ResistanceRef => (limits.min.resistance, limits.max.resistance),
            other => {
                return Err(BridgeError::Runtime(format!(
                    "{:?} is not a reference value",
                    other
                )))
            }
        };

        if value < min || value > max {
            return Err(BridgeError::InvalidArgument(format!(
                "{:?} {} outside system limits {}..={}",
                quantity, value, min, max
            )));
        }

        self.gateway.select(Scope::System)?;
        self.gateway.write(quantity, value)
    }

    /// Enable (1) or disable (0) the system output voltage
    pub fn set_output_enable(&mut self, value: f64) -> Result<()> {
        if value != 0.0 && value != 1.0 {
            return Err(BridgeError::InvalidArgument(format!(
                "output enable must be 0 or 1, got {}",
                value
            )));
        }
        self.gateway.select(Scope::System)?;
        self.gateway.write(Quantity::OutputVoltageEnable, value)
    }

    pub fn clear_errors(&mut self) -> Result<()> {
        self.gateway.clear_errors()?;
        tracing::info!("Device errors cleared");
        Ok(())
    }

    pub fn store_parameters(&mut self) -> Result<()> {
        self.gateway.store_parameters()?;
        tracing::info!("Device parameters stored");
        Ok(())
    }

    // =========================================================================
    // Slopes
    // =========================================================================

    /// System full scale value the slope of `kind` is relative to
    pub fn full_scale(&self, kind: SlopeKind) -> f64 {
        match kind {
            SlopeKind::Voltage => self.system_limits.max.voltage,
            SlopeKind::Current => self.system_limits.max.current,
        }
    }

    /// Stage a slope setpoint given in units/ms
    pub fn stage_slope(&mut self, kind: SlopeKind, startup: bool, per_ms: f64) -> Result<()> {
        let raw = slope::to_raw(per_ms, self.full_scale(kind))?;
        let ramp = self.staged.ramp_mut(kind);
        if startup {
            ramp.startup_raw = raw;
        } else {
            ramp.raw = raw;
        }
        tracing::info!(
            "{:?} {}slope: {}/ms = raw {}",
            kind,
            if startup { "startup " } else { "" },
            per_ms,
            raw
        );
        Ok(())
    }

    /// Staged setpoint in units/ms
    pub fn staged_slope(&self, kind: SlopeKind, startup: bool) -> Result<f64> {
        let ramp = self.staged.ramp(kind);
        let raw = if startup { ramp.startup_raw } else { ramp.raw };
        slope::from_raw(raw, self.full_scale(kind))
    }

    pub fn staged_slopes(&self) -> StagedSlopes {
        self.staged
    }

    /// Representable slope range in units/ms: `(slowest, fastest)`
    pub fn slope_range(&self, kind: SlopeKind) -> Result<(f64, f64)> {
        slope::range(self.full_scale(kind))
    }

    /// Write both staged setpoints of `kind` to the device
    pub fn write_slope(&mut self, kind: SlopeKind) -> Result<()> {
        let ramp = self.staged.ramp(kind);
        if !slope::is_valid_raw(ramp.raw) || !slope::is_valid_raw(ramp.startup_raw) {
            return Err(BridgeError::InvalidArgument(format!(
                "{:?} slope setpoints ({}, {}) must be within {}..={}",
                kind,
                ramp.startup_raw,
                ramp.raw,
                slope::MIN_RAW,
                slope::MAX_RAW
            )));
        }
        self.gateway.set_slope_ramp(kind, ramp)?;
        tracing::debug!("{:?} slope written: startup {} raw {}", kind, ramp.startup_raw, ramp.raw);
        Ok(())
    }

    /// Device ramp as `[raw startup,raw,startup per ms,per ms]`
    pub fn device_slope(&mut self, kind: SlopeKind) -> Result<String> {
        let ramp = self.gateway.slope_ramp(kind)?;
        let full_scale = self.full_scale(kind);
        Ok(format!(
            "[{},{},{},{}]",
            ramp.startup_raw,
            ramp.raw,
            slope::from_raw(ramp.startup_raw, full_scale)?,
            slope::from_raw(ramp.raw, full_scale)?
        ))
    }
}

impl<G: DeviceGateway> DeviceLink for Instrument<G> {
    fn ensure_connected(&mut self) -> bool {
        if self.connected {
            return true;
        }
        match self.connect() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to connect to device: {}", e);
                false
            }
        }
    }

    fn comm_status(&mut self) -> CommStatus {
        self.gateway.status()
    }

    fn force_disconnect(&mut self) {
        self.disconnect();
    }
}

/// Format values as `[a,b,c]`
fn array<T: Display>(values: &[T]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(","))
}
