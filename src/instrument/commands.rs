//! Standard command set
//!
//! Every name the bridge answers to, wired to [`Instrument`] methods.

use crate::device::{DeviceGateway, Quantity, Scope, SlopeKind};
use crate::error::Result;
use crate::registry::{Binding, Registry};
use super::Instrument;

/// System references: readable and writable
const SYSTEM_REFERENCES: [(&str, Quantity); 4] = [
    ("sysVoltageRef", Quantity::VoltageRef),
    ("sysCurrentRef", Quantity::CurrentRef),
    ("sysPowerRef", Quantity::PowerRef),
    ("sysResistanceRef", Quantity::ResistanceRef),
];

/// Module references: read-only
const MODULE_REFERENCES: [(&str, Quantity); 4] = [
    ("modVoltageRef", Quantity::VoltageRef),
    ("modCurrentRef", Quantity::CurrentRef),
    ("modPowerRef", Quantity::PowerRef),
    ("modResistanceRef", Quantity::ResistanceRef),
];

const MONITORS: [(&str, Quantity); 3] = [
    ("dcLinkVoltage", Quantity::DcLinkVoltage),
    ("primaryCurrent", Quantity::PrimaryCurrent),
    ("remoteControlInput", Quantity::RemoteControlInput),
];

const SCOPES: [(&str, Scope); 2] = [("sys", Scope::System), ("mod", Scope::Module)];

const SLOPES: [(&str, SlopeKind); 2] = [("Volt", SlopeKind::Voltage), ("Current", SlopeKind::Current)];

/// Build the registry of every instrument command
pub fn standard_registry<G>() -> Result<Registry<Instrument<G>>>
where
    G: DeviceGateway + 'static,
{
    let mut builder = Registry::builder();

    builder
        .register(Binding::setting(
            "debug",
            |i: &mut Instrument<G>| Ok(i.debug()),
            |i: &mut Instrument<G>, value| {
                i.set_debug(value);
                Ok(())
            },
        ))?
        .register(Binding::reader("moduleID", |i: &mut Instrument<G>| {
            Ok(i.module_id().to_string())
        }))?
        .register(Binding::reader("isMaster", |i: &mut Instrument<G>| {
            Ok(u8::from(i.is_master()).to_string())
        }))?
        .register(Binding::reader("dllVersion", |i: &mut Instrument<G>| {
            Ok(i.gateway().driver_version())
        }))?
        .register(Binding::reader("dspVersion", |i: &mut Instrument<G>| {
            Ok(i.gateway_mut().dsp_version()?.to_string())
        }))?;

    for (prefix, scope) in SCOPES {
        builder
            .register(Binding::reader(format!("{}Readings", prefix), move |i: &mut Instrument<G>| {
                i.readings(scope)
            }))?
            .register(Binding::reader(format!("{}MinMaxNom", prefix), move |i: &mut Instrument<G>| {
                Ok(i.min_max_nom(scope))
            }))?
            .register(Binding::reader(format!("{}Errors", prefix), move |i: &mut Instrument<G>| {
                i.error_tree(scope)
            }))?
            .register(Binding::value(format!("{}ControlMode", prefix), move |i: &mut Instrument<G>| {
                i.read_in(scope, Quantity::ControlMode)
            }))?;
    }

    for (name, quantity) in SYSTEM_REFERENCES {
        builder.register(Binding::setting(
            name,
            move |i: &mut Instrument<G>| i.read_in(Scope::System, quantity),
            move |i: &mut Instrument<G>, value| i.set_reference(quantity, value),
        ))?;
    }

    for (name, quantity) in MODULE_REFERENCES {
        builder.register(Binding::value(name, move |i: &mut Instrument<G>| {
            i.read_in(Scope::Module, quantity)
        }))?;
    }

    builder.register(Binding::setting(
        "sysOutVoltEnable",
        |i: &mut Instrument<G>| i.read_in(Scope::System, Quantity::OutputVoltageEnable),
        |i: &mut Instrument<G>, value| i.set_output_enable(value),
    ))?;

    for (name, quantity) in MONITORS {
        builder.register(Binding::value(name, move |i: &mut Instrument<G>| {
            i.read_in(Scope::System, quantity)
        }))?;
    }

    builder.register(Binding::reader("temperatures", |i: &mut Instrument<G>| {
        i.temperatures()
    }))?;

    for (suffix, kind) in SLOPES {
        builder
            .register(Binding::reader(format!("slope{}", suffix), move |i: &mut Instrument<G>| {
                i.device_slope(kind)
            }))?
            .register(Binding::setting(
                format!("slope{}Sp", suffix),
                move |i: &mut Instrument<G>| i.staged_slope(kind, false),
                move |i: &mut Instrument<G>, value| i.stage_slope(kind, false, value),
            ))?
            .register(Binding::setting(
                format!("slopeStartup{}Sp", suffix),
                move |i: &mut Instrument<G>| i.staged_slope(kind, true),
                move |i: &mut Instrument<G>, value| i.stage_slope(kind, true, value),
            ))?
            .register(Binding::value(format!("slope{}Min", suffix), move |i: &mut Instrument<G>| {
                Ok(i.slope_range(kind)?.0)
            }))?
            .register(Binding::value(format!("slope{}Max", suffix), move |i: &mut Instrument<G>| {
                Ok(i.slope_range(kind)?.1)
            }))?
            .register(Binding::action(format!("slope{}Write", suffix), move |i: &mut Instrument<G>, _| {
                i.write_slope(kind)
            }))?;
    }

    builder
        .register(Binding::action("clearErrors", |i: &mut Instrument<G>, _| i.clear_errors()))?
        .register(Binding::action("storeParameters", |i: &mut Instrument<G>, _| {
            i.store_parameters()
        }))?;

    let registry = builder.build();
    tracing::debug!("Standard registry built with {} commands", registry.len());
    Ok(registry)
}
