//! Driver for the Stanford Research Systems SR830 lock-in amplifier.
//!
//! Every method maps to one command (or, for the auxiliary channel reads,
//! one command per channel). Setters check their argument against the range
//! given in the SR830 manual and fail before anything is sent. Nothing is
//! cached and nothing is read back after a write.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::params::{self, Param, Value, parse_float};
use crate::transport::Transport;

/// Auxiliary input and output channels are numbered 1 to 4.
pub const AUX_CHANNELS: std::ops::RangeInclusive<u8> = 1..=4;

/// Largest magnitude accepted by `AUXV`, in volts.
pub const AUX_OUTPUT_MAX: f64 = 10.5;

/// Valid `SNAP?` selectors (X, Y, R, θ, Aux In 1-4, reference frequency,
/// CH1 and CH2 display).
pub const SNAP_SELECTORS: std::ops::RangeInclusive<u8> = 1..=11;

/// Number of values one `SNAP?` may request.
pub const SNAP_LEN: std::ops::RangeInclusive<usize> = 2..=6;

/// Quantities available through `OUTP?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    X = 1,
    Y = 2,
    R = 3,
    Theta = 4,
}

/// Channel the auto-offset function works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetChannel {
    X = 1,
    Y = 2,
    R = 3,
}

impl TryFrom<u8> for OffsetChannel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(OffsetChannel::X),
            2 => Ok(OffsetChannel::Y),
            3 => Ok(OffsetChannel::R),
            _ => Err(Error::Validation(format!(
                "Auto offset channel should be 1 (X), 2 (Y) or 3 (R), got {value}"
            ))),
        }
    }
}

/// An open connection to one SR830.
pub struct Sr830<T: Transport> {
    transport: T,
}

#[cfg(feature = "instrument_visa")]
impl Sr830<crate::transport::VisaTransport> {
    /// Open the instrument at a VISA resource such as `GPIB0::7::INSTR`.
    ///
    /// No command is sent; the instrument keeps whatever state it is in.
    pub fn open(resource: &str) -> Result<Self> {
        crate::transport::VisaTransport::open(resource).map(Self::new)
    }
}

impl<T: Transport> Sr830<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    // ---------- Generic accessors

    /// Query a parameter and parse the reply according to its domain.
    pub fn get(&mut self, param: &Param) -> Result<Value> {
        let reply = self.transport.query(&param.query_command())?;
        param.parse_reply(&reply)
    }

    /// Validate and send a new value for a parameter.
    pub fn set(&mut self, param: &Param, value: Value) -> Result<()> {
        let command = param.set_command(value)?;
        debug!(parameter = param.name, %value, "set");
        self.transport.write(&command)
    }

    fn get_float(&mut self, param: &Param) -> Result<f64> {
        match self.get(param)? {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
        }
    }

    fn get_int(&mut self, param: &Param) -> Result<i64> {
        match self.get(param)? {
            Value::Int(v) => Ok(v),
            Value::Float(_) => Err(Error::Validation(format!(
                "{} is not an integer parameter",
                param.label
            ))),
        }
    }

    fn set_float(&mut self, param: &Param, value: f64) -> Result<()> {
        self.set(param, Value::Float(value))
    }

    fn set_int(&mut self, param: &Param, value: i64) -> Result<()> {
        self.set(param, Value::Int(value))
    }

    // ---------- Reference and phase

    /// Reference phase shift in degrees.
    pub fn phase_shift(&mut self) -> Result<f64> {
        self.get_float(&params::PHASE)
    }

    /// Set the phase shift, -360.00 to 729.99 degrees, rounded to 0.01.
    ///
    /// The instrument wraps the value into ±180° itself; `541.0` is sent as
    /// `PHAS541.00` and reads back as -179.00.
    pub fn set_phase_shift(&mut self, degrees: f64) -> Result<()> {
        self.set_float(&params::PHASE, degrees)
    }

    /// 0 = external, 1 = internal reference.
    pub fn reference_source(&mut self) -> Result<i64> {
        self.get_int(&params::REFERENCE_SOURCE)
    }

    pub fn set_reference_source(&mut self, source: i64) -> Result<()> {
        self.set_int(&params::REFERENCE_SOURCE, source)
    }

    /// Reference frequency in Hz, in internal or external mode.
    pub fn frequency(&mut self) -> Result<f64> {
        self.get_float(&params::FREQUENCY)
    }

    /// Set the internal oscillator frequency, 0.001 Hz to 102 kHz.
    ///
    /// Only honoured by the instrument with the internal reference selected.
    /// With a harmonic n > 1 the instrument further limits n * f to 102 kHz.
    pub fn set_frequency(&mut self, hz: f64) -> Result<()> {
        self.set_float(&params::FREQUENCY, hz)
    }

    /// External reference trigger: 0 = sine zero crossing, 1 = TTL rising
    /// edge, 2 = TTL falling edge.
    pub fn reference_slope(&mut self) -> Result<i64> {
        self.get_int(&params::REFERENCE_SLOPE)
    }

    pub fn set_reference_slope(&mut self, slope: i64) -> Result<()> {
        self.set_int(&params::REFERENCE_SLOPE, slope)
    }

    pub fn harmonic(&mut self) -> Result<i64> {
        self.get_int(&params::HARMONIC)
    }

    /// Detection harmonic, 1 to 19999.
    pub fn set_harmonic(&mut self, harmonic: i64) -> Result<()> {
        self.set_int(&params::HARMONIC, harmonic)
    }

    /// Sine output amplitude in volts rms.
    pub fn sine_level(&mut self) -> Result<f64> {
        self.get_float(&params::SINE_LEVEL)
    }

    /// Set the sine output amplitude, 0.004 V to 5 V.
    ///
    /// Requests between 0 and 0.004 V are raised to 0.004 V.
    pub fn set_sine_level(&mut self, volts: f64) -> Result<()> {
        self.set_float(&params::SINE_LEVEL, volts)
    }

    // ---------- Input and filter

    /// 0 = A, 1 = A-B, 2 = I (1 MΩ), 3 = I (100 MΩ).
    pub fn input_source(&mut self) -> Result<i64> {
        self.get_int(&params::INPUT_SOURCE)
    }

    pub fn set_input_source(&mut self, source: i64) -> Result<()> {
        self.set_int(&params::INPUT_SOURCE, source)
    }

    /// 0 = float, 1 = ground.
    pub fn input_grounding(&mut self) -> Result<i64> {
        self.get_int(&params::INPUT_GROUNDING)
    }

    pub fn set_input_grounding(&mut self, grounding: i64) -> Result<()> {
        self.set_int(&params::INPUT_GROUNDING, grounding)
    }

    /// 0 = AC, 1 = DC.
    pub fn input_coupling(&mut self) -> Result<i64> {
        self.get_int(&params::INPUT_COUPLING)
    }

    pub fn set_input_coupling(&mut self, coupling: i64) -> Result<()> {
        self.set_int(&params::INPUT_COUPLING, coupling)
    }

    /// 0 = no filter, 1 = line, 2 = 2x line, 3 = both notch filters.
    pub fn line_filter(&mut self) -> Result<i64> {
        self.get_int(&params::LINE_FILTER)
    }

    pub fn set_line_filter(&mut self, filter: i64) -> Result<()> {
        self.set_int(&params::LINE_FILTER, filter)
    }

    // ---------- Gain and time constant

    /// Sensitivity as an index into [`params::SENSITIVITIES`].
    pub fn sensitivity(&mut self) -> Result<i64> {
        self.get_int(&params::SENSITIVITY)
    }

    pub fn set_sensitivity(&mut self, index: i64) -> Result<()> {
        self.set_int(&params::SENSITIVITY, index)
    }

    /// Full-scale sensitivity in volts rms.
    pub fn sensitivity_volts(&mut self) -> Result<f64> {
        let index = self.sensitivity()?;
        params::sensitivity_volts(index)
    }

    /// Select the smallest full-scale range that covers `volts`.
    pub fn set_sensitivity_volts(&mut self, volts: f64) -> Result<()> {
        let index = params::sensitivity_index_for(volts)?;
        self.set_sensitivity(index)
    }

    /// 0 = high reserve, 1 = normal, 2 = low noise.
    pub fn reserve_mode(&mut self) -> Result<i64> {
        self.get_int(&params::RESERVE_MODE)
    }

    pub fn set_reserve_mode(&mut self, mode: i64) -> Result<()> {
        self.set_int(&params::RESERVE_MODE, mode)
    }

    /// Time constant as an index into [`params::TIME_CONSTANTS`].
    pub fn time_constant(&mut self) -> Result<i64> {
        self.get_int(&params::TIME_CONSTANT)
    }

    pub fn set_time_constant(&mut self, index: i64) -> Result<()> {
        self.set_int(&params::TIME_CONSTANT, index)
    }

    pub fn time_constant_seconds(&mut self) -> Result<f64> {
        let index = self.time_constant()?;
        params::time_constant_seconds(index)
    }

    /// Select the shortest time constant of at least `seconds`.
    pub fn set_time_constant_seconds(&mut self, seconds: f64) -> Result<()> {
        let index = params::time_constant_index_for(seconds)?;
        self.set_time_constant(index)
    }

    /// 0 = 6, 1 = 12, 2 = 18, 3 = 24 dB/oct.
    pub fn filter_slope(&mut self) -> Result<i64> {
        self.get_int(&params::FILTER_SLOPE)
    }

    pub fn set_filter_slope(&mut self, slope: i64) -> Result<()> {
        self.set_int(&params::FILTER_SLOPE, slope)
    }

    /// 0 = off, 1 = synchronous filtering below 200 Hz.
    pub fn sync_filter(&mut self) -> Result<i64> {
        self.get_int(&params::SYNC_FILTER)
    }

    pub fn set_sync_filter(&mut self, sync: i64) -> Result<()> {
        self.set_int(&params::SYNC_FILTER, sync)
    }

    // ---------- Auxiliary channels

    fn check_aux_channel(channel: u8) -> Result<()> {
        if AUX_CHANNELS.contains(&channel) {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "Aux channel should be 1, 2, 3 or 4, got {channel}"
            )))
        }
    }

    fn query_channel(&mut self, mnemonic: &str, channel: u8) -> Result<f64> {
        let command = format!("{mnemonic}?{channel}");
        let reply = self.transport.query(&command)?;
        parse_float(&command, &reply)
    }

    /// Voltage of one auxiliary output.
    pub fn aux_output(&mut self, channel: u8) -> Result<f64> {
        Self::check_aux_channel(channel)?;
        self.query_channel("AUXV", channel)
    }

    /// Voltages of all four auxiliary outputs, one query per channel.
    pub fn aux_outputs(&mut self) -> Result<BTreeMap<u8, f64>> {
        AUX_CHANNELS
            .map(|ch| self.query_channel("AUXV", ch).map(|v| (ch, v)))
            .collect()
    }

    /// Set one auxiliary output, -10.5 V to 10.5 V, rounded to 1 mV.
    pub fn set_aux_output(&mut self, channel: u8, volts: f64) -> Result<()> {
        Self::check_aux_channel(channel)?;
        if !(-AUX_OUTPUT_MAX..=AUX_OUTPUT_MAX).contains(&volts) {
            return Err(Error::Validation(format!(
                "Output voltage should be between -{AUX_OUTPUT_MAX} V and {AUX_OUTPUT_MAX} V, got {volts}"
            )));
        }
        self.transport.write(&format!("AUXV{channel},{volts:.3}"))
    }

    /// Reading of one auxiliary input in volts.
    pub fn aux_input(&mut self, channel: u8) -> Result<f64> {
        Self::check_aux_channel(channel)?;
        self.query_channel("OAUX", channel)
    }

    /// Readings of all four auxiliary inputs, one query per channel.
    pub fn aux_inputs(&mut self) -> Result<BTreeMap<u8, f64>> {
        AUX_CHANNELS
            .map(|ch| self.query_channel("OAUX", ch).map(|v| (ch, v)))
            .collect()
    }

    // ---------- Auto functions

    pub fn auto_gain(&mut self) -> Result<()> {
        self.transport.write("AGAN")
    }

    pub fn auto_reserve(&mut self) -> Result<()> {
        self.transport.write("ARSV")
    }

    pub fn auto_phase(&mut self) -> Result<()> {
        self.transport.write("APHS")
    }

    /// Auto-offset X, Y or R.
    pub fn auto_offset(&mut self, channel: OffsetChannel) -> Result<()> {
        self.transport.write(&format!("AOFF {}", channel as u8))
    }

    // ---------- Data transfer

    /// One of X, Y, R or θ.
    pub fn output(&mut self, quantity: Quantity) -> Result<f64> {
        self.query_channel("OUTP", quantity as u8)
    }

    pub fn x(&mut self) -> Result<f64> {
        self.output(Quantity::X)
    }

    pub fn y(&mut self) -> Result<f64> {
        self.output(Quantity::Y)
    }

    pub fn r(&mut self) -> Result<f64> {
        self.output(Quantity::R)
    }

    pub fn theta(&mut self) -> Result<f64> {
        self.output(Quantity::Theta)
    }

    /// Read 2 to 6 values recorded at the same instant.
    ///
    /// Selectors: 1 X, 2 Y, 3 R, 4 θ, 5-8 Aux In 1-4, 9 reference
    /// frequency, 10 CH1 display, 11 CH2 display. Values come back in the
    /// order requested.
    pub fn snap(&mut self, selectors: &[u8]) -> Result<Vec<f64>> {
        if !SNAP_LEN.contains(&selectors.len()) {
            return Err(Error::Validation(format!(
                "Snap takes 2 to 6 selectors, got {}",
                selectors.len()
            )));
        }
        if let Some(bad) = selectors.iter().find(|&&s| !SNAP_SELECTORS.contains(&s)) {
            return Err(Error::Validation(format!(
                "Snap selectors should be between 1 and 11, got {bad}"
            )));
        }

        let mut command = String::from("SNAP?");
        for s in selectors {
            command.push_str(&format!("{s},"));
        }
        let reply = self.transport.query(&command)?;

        let values = reply
            .split(',')
            .map(|field| parse_float(&command, field))
            .collect::<Result<Vec<_>>>()
            .map_err(|_| Error::parse(&command, &reply))?;
        if values.len() != selectors.len() {
            return Err(Error::parse(&command, &reply));
        }
        Ok(values)
    }

    // ---------- Interface

    /// The `*IDN?` string, e.g. `Stanford_Research_Systems,SR830,s/n00111,ver1.000`.
    pub fn identify(&mut self) -> Result<String> {
        self.transport.query("*IDN?")
    }

    /// Reset the instrument to its default configuration.
    ///
    /// The default sine output is 1 V; anything connected to it will see that.
    pub fn reset(&mut self) -> Result<()> {
        self.transport.write("*RST")
    }
}
