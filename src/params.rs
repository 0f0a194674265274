//! Parameter table for the SR830 command set.
//!
//! Each settable scalar is described once by a [`Param`]: its mnemonic, the
//! inclusive domain from the SR830 manual and how the value is written on the
//! wire. The driver has a single generic get/set pair that works from these
//! descriptors.

use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    /// Real number, written with a fixed number of decimals.
    Float { min: f64, max: f64, decimals: usize },
    /// Integer or integer-coded enumeration. `choices[i]` labels value
    /// `min + i` when the parameter is an enumeration.
    Integer {
        min: i64,
        max: i64,
        choices: &'static [&'static str],
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    /// Short name used on the command line.
    pub name: &'static str,
    pub mnemonic: &'static str,
    pub label: &'static str,
    pub domain: Domain,
    /// Values in `[clamp_from, min)` are raised to `min` instead of rejected.
    pub clamp_from: Option<f64>,
}

impl Param {
    const fn float(
        name: &'static str,
        mnemonic: &'static str,
        label: &'static str,
        min: f64,
        max: f64,
        decimals: usize,
    ) -> Self {
        Self {
            name,
            mnemonic,
            label,
            domain: Domain::Float { min, max, decimals },
            clamp_from: None,
        }
    }

    const fn int(
        name: &'static str,
        mnemonic: &'static str,
        label: &'static str,
        min: i64,
        max: i64,
        choices: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            mnemonic,
            label,
            domain: Domain::Integer { min, max, choices },
            clamp_from: None,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self.domain, Domain::Float { .. })
    }

    pub fn query_command(&self) -> String {
        format!("{}?", self.mnemonic)
    }

    /// Validate `value` and build the set command. Integer parameters accept
    /// a float only if it has no fractional part.
    pub fn set_command(&self, value: Value) -> Result<String> {
        match (self.domain, value) {
            (Domain::Float { .. }, Value::Float(v)) => self.float_command(v),
            (Domain::Float { .. }, Value::Int(v)) => self.float_command(v as f64),
            (Domain::Integer { .. }, Value::Int(v)) => self.int_command(v),
            (Domain::Integer { .. }, Value::Float(v)) => {
                if v.fract() != 0.0 || !v.is_finite() {
                    return Err(Error::Validation(format!(
                        "{} takes an integer, got {v}",
                        self.label
                    )));
                }
                self.int_command(v as i64)
            }
        }
    }

    pub fn float_command(&self, value: f64) -> Result<String> {
        let Domain::Float { min, max, decimals } = self.domain else {
            return Err(Error::Validation(format!(
                "{} takes an integer, got {value}",
                self.label
            )));
        };
        let value = match self.clamp_from {
            Some(floor) if (floor..min).contains(&value) => {
                tracing::warn!(
                    parameter = self.name,
                    requested = value,
                    applied = min,
                    "value below instrument minimum, clamped"
                );
                min
            }
            _ => value,
        };
        if !(min..=max).contains(&value) {
            let lower = self.clamp_from.unwrap_or(min);
            return Err(Error::Validation(format!(
                "{} must be between {lower} and {max}, got {value}",
                self.label
            )));
        }
        Ok(format!("{}{:.*}", self.mnemonic, decimals, value))
    }

    pub fn int_command(&self, value: i64) -> Result<String> {
        let Domain::Integer { min, max, choices } = self.domain else {
            return self.float_command(value as f64);
        };
        if !(min..=max).contains(&value) {
            return Err(Error::Validation(self.int_range_message(min, max, choices, value)));
        }
        Ok(format!("{}{}", self.mnemonic, value))
    }

    fn int_range_message(&self, min: i64, max: i64, choices: &[&str], value: i64) -> String {
        if choices.is_empty() {
            return format!("{} must be between {min} and {max}, got {value}", self.label);
        }
        let options = choices
            .iter()
            .zip(min..)
            .map(|(label, code)| format!("{code} ({label})"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} must be one of {options}, got {value}", self.label)
    }

    /// Parse a reply to [`Param::query_command`] according to the domain.
    pub fn parse_reply(&self, reply: &str) -> Result<Value> {
        let command = self.query_command();
        match self.domain {
            Domain::Float { .. } => parse_float(&command, reply).map(Value::Float),
            Domain::Integer { .. } => parse_int(&command, reply).map(Value::Int),
        }
    }

    /// Parse user input (e.g. a command-line argument) into a [`Value`] of
    /// the right kind. Range checking happens when the command is built.
    pub fn parse_input(&self, input: &str) -> Result<Value> {
        let input = input.trim();
        let bad = || Error::Validation(format!("{} cannot be set to {input:?}", self.label));
        if self.is_float() {
            input.parse().map(Value::Float).map_err(|_| bad())
        } else {
            input.parse().map(Value::Int).map_err(|_| bad())
        }
    }

    /// Human-readable meaning of an enumeration code, if it has one.
    pub fn choice_label(&self, code: i64) -> Option<&'static str> {
        match self.domain {
            Domain::Integer { min, choices, .. } => usize::try_from(code - min)
                .ok()
                .and_then(|i| choices.get(i).copied()),
            Domain::Float { .. } => None,
        }
    }
}

pub(crate) fn parse_float(command: &str, reply: &str) -> Result<f64> {
    reply
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::parse(command, reply))
}

pub(crate) fn parse_int(command: &str, reply: &str) -> Result<i64> {
    reply
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::parse(command, reply))
}

pub const PHASE: Param = Param::float("phase", "PHAS", "Phase shift", -360.0, 729.99, 2);

pub const REFERENCE_SOURCE: Param = Param::int(
    "fmod",
    "FMOD",
    "Reference source",
    0,
    1,
    &["external", "internal"],
);

// The manual also limits harmonic * frequency to 102 kHz; that is left to the
// instrument.
pub const FREQUENCY: Param = Param::float("freq", "FREQ", "Frequency", 0.001, 102_000.0, 3);

pub const REFERENCE_SLOPE: Param = Param::int(
    "rslp",
    "RSLP",
    "Reference trigger",
    0,
    2,
    &["zero crossing", "rising edge", "falling edge"],
);

pub const HARMONIC: Param = Param::int("harm", "HARM", "Detection harmonic", 1, 19_999, &[]);

pub const SINE_LEVEL: Param = Param {
    clamp_from: Some(0.0),
    ..Param::float("slvl", "SLVL", "Sine output amplitude", 0.004, 5.0, 3)
};

pub const INPUT_SOURCE: Param = Param::int(
    "isrc",
    "ISRC",
    "Input configuration",
    0,
    3,
    &["A", "A-B", "I (1 MOhm)", "I (100 MOhm)"],
);

pub const INPUT_GROUNDING: Param = Param::int(
    "ignd",
    "IGND",
    "Shield grounding",
    0,
    1,
    &["float", "ground"],
);

pub const INPUT_COUPLING: Param =
    Param::int("icpl", "ICPL", "Input coupling", 0, 1, &["AC", "DC"]);

pub const LINE_FILTER: Param = Param::int(
    "ilin",
    "ILIN",
    "Input line notch filter",
    0,
    3,
    &["no filter", "line", "2x line", "both"],
);

pub const SENSITIVITY: Param = Param::int("sens", "SENS", "Sensitivity index", 0, 26, &[]);

pub const RESERVE_MODE: Param = Param::int(
    "rmod",
    "RMOD",
    "Reserve mode",
    0,
    2,
    &["high reserve", "normal", "low noise"],
);

pub const TIME_CONSTANT: Param = Param::int("oflt", "OFLT", "Time constant index", 0, 19, &[]);

pub const FILTER_SLOPE: Param = Param::int(
    "ofsl",
    "OFSL",
    "Low pass filter slope",
    0,
    3,
    &["6 dB/oct", "12 dB/oct", "18 dB/oct", "24 dB/oct"],
);

pub const SYNC_FILTER: Param = Param::int(
    "sync",
    "SYNC",
    "Synchronous filter",
    0,
    1,
    &["off", "on below 200 Hz"],
);

pub const PARAMS: &[Param] = &[
    PHASE,
    REFERENCE_SOURCE,
    FREQUENCY,
    REFERENCE_SLOPE,
    HARMONIC,
    SINE_LEVEL,
    INPUT_SOURCE,
    INPUT_GROUNDING,
    INPUT_COUPLING,
    LINE_FILTER,
    SENSITIVITY,
    RESERVE_MODE,
    TIME_CONSTANT,
    FILTER_SLOPE,
    SYNC_FILTER,
];

/// Find a parameter by its short name or its mnemonic, ignoring case.
pub fn lookup(name: &str) -> Result<&'static Param> {
    PARAMS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name) || p.mnemonic.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::UnknownParameter(name.to_string()))
}

/// Full-scale sensitivity in volts rms, indexed by the `SENS` value.
pub const SENSITIVITIES: [f64; 27] = [
    2e-9, 5e-9, 10e-9, 20e-9, 50e-9, 100e-9, 200e-9, 500e-9, 1e-6, 2e-6, 5e-6, 10e-6, 20e-6,
    50e-6, 100e-6, 200e-6, 500e-6, 1e-3, 2e-3, 5e-3, 10e-3, 20e-3, 50e-3, 100e-3, 200e-3,
    500e-3, 1.0,
];

/// Time constant in seconds, indexed by the `OFLT` value.
pub const TIME_CONSTANTS: [f64; 20] = [
    10e-6, 30e-6, 100e-6, 300e-6, 1e-3, 3e-3, 10e-3, 30e-3, 100e-3, 300e-3, 1.0, 3.0, 10.0,
    30.0, 100.0, 300.0, 1e3, 3e3, 10e3, 30e3,
];

// Table entries are decimal literals; don't let representation error push a
// request for exactly "1 ms" to the next entry.
const TABLE_TOLERANCE: f64 = 1e-9;

pub fn sensitivity_volts(index: i64) -> Result<f64> {
    table_value(&SENSITIVITY, &SENSITIVITIES, index)
}

/// Smallest full-scale range that covers `volts`.
pub fn sensitivity_index_for(volts: f64) -> Result<i64> {
    table_index(&SENSITIVITY, &SENSITIVITIES, volts, "V")
}

pub fn time_constant_seconds(index: i64) -> Result<f64> {
    table_value(&TIME_CONSTANT, &TIME_CONSTANTS, index)
}

/// Shortest time constant that is at least `seconds`.
pub fn time_constant_index_for(seconds: f64) -> Result<i64> {
    table_index(&TIME_CONSTANT, &TIME_CONSTANTS, seconds, "s")
}

fn table_value(param: &Param, table: &[f64], index: i64) -> Result<f64> {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i).copied())
        .ok_or_else(|| {
            Error::Validation(format!(
                "{} must be between 0 and {}, got {index}",
                param.label,
                table.len() - 1
            ))
        })
}

fn table_index(param: &Param, table: &[f64], wanted: f64, unit: &str) -> Result<i64> {
    let out_of_range = || {
        Error::Validation(format!(
            "{} table covers {} {unit} to {} {unit}, got {wanted} {unit}",
            param.label,
            table[0],
            table[table.len() - 1]
        ))
    };
    if !wanted.is_finite() || wanted <= 0.0 {
        return Err(out_of_range());
    }
    table
        .iter()
        .position(|&v| v >= wanted * (1.0 - TABLE_TOLERANCE))
        .map(|i| i as i64)
        .ok_or_else(out_of_range)
}
