use std::collections::HashMap;
use std::io;

use sr830::params::{self, Domain, PARAMS};
use sr830::{Error, MockTransport, OffsetChannel, Quantity, Sr830, Transport, Value};

/// Stand-in instrument that stores the raw text of each set command and
/// returns it verbatim to the matching query.
#[derive(Default)]
struct EchoInstrument {
    registers: HashMap<String, String>,
}

fn split_mnemonic(command: &str) -> (&str, &str) {
    let end = command
        .find(|c: char| !(c.is_ascii_uppercase() || c == '*'))
        .unwrap_or(command.len());
    command.split_at(end)
}

impl Transport for EchoInstrument {
    fn write(&mut self, command: &str) -> sr830::Result<()> {
        let (mnemonic, args) = split_mnemonic(command);
        let (key, value) = match args.split_once(',') {
            Some((channel, value)) => (format!("{mnemonic}{channel}"), value),
            None => (mnemonic.to_string(), args),
        };
        self.registers.insert(key, value.to_string());
        Ok(())
    }

    fn query(&mut self, command: &str) -> sr830::Result<String> {
        let key = command.replace('?', "");
        self.registers.get(&key).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("nothing stored for {key}")).into()
        })
    }
}

fn lockin() -> Sr830<MockTransport> {
    Sr830::new(MockTransport::new())
}

#[test]
fn in_range_values_produce_documented_commands() {
    let cases = [
        (&params::PHASE, Value::Float(-45.5), "PHAS-45.50"),
        (&params::REFERENCE_SOURCE, Value::Int(1), "FMOD1"),
        (&params::FREQUENCY, Value::Float(1000.0), "FREQ1000.000"),
        (&params::FREQUENCY, Value::Float(102_000.0), "FREQ102000.000"),
        (&params::REFERENCE_SLOPE, Value::Int(2), "RSLP2"),
        (&params::HARMONIC, Value::Int(19_999), "HARM19999"),
        (&params::SINE_LEVEL, Value::Float(5.0), "SLVL5.000"),
        (&params::INPUT_SOURCE, Value::Int(3), "ISRC3"),
        (&params::INPUT_GROUNDING, Value::Int(0), "IGND0"),
        (&params::INPUT_COUPLING, Value::Int(1), "ICPL1"),
        (&params::LINE_FILTER, Value::Int(3), "ILIN3"),
        (&params::SENSITIVITY, Value::Int(26), "SENS26"),
        (&params::RESERVE_MODE, Value::Int(0), "RMOD0"),
        (&params::TIME_CONSTANT, Value::Int(19), "OFLT19"),
        (&params::FILTER_SLOPE, Value::Int(3), "OFSL3"),
        (&params::SYNC_FILTER, Value::Int(1), "SYNC1"),
    ];

    for (param, value, expected) in cases {
        let mut lia = lockin();
        lia.set(param, value).unwrap();
        assert_eq!(lia.transport().sent(), [expected], "{}", param.name);
    }
}

#[test]
fn out_of_range_values_are_rejected_before_sending() {
    for param in PARAMS {
        let (below, above) = match param.domain {
            Domain::Float { min, max, .. } => (Value::Float(min - 1.0), Value::Float(max + 1.0)),
            Domain::Integer { min, max, .. } => (Value::Int(min - 1), Value::Int(max + 1)),
        };
        for value in [below, above] {
            let mut lia = lockin();
            let err = lia.set(param, value).unwrap_err();
            assert!(err.is_validation(), "{} accepted {value}", param.name);
            assert!(lia.transport().sent().is_empty());
        }
    }
}

#[test]
fn named_setters_reject_without_sending() {
    let mut lia = lockin();
    assert!(lia.set_phase_shift(730.0).is_err());
    assert!(lia.set_frequency(0.0).is_err());
    assert!(lia.set_harmonic(20_000).is_err());
    assert!(lia.set_sine_level(-0.5).is_err());
    assert!(lia.set_sensitivity(27).is_err());
    assert!(lia.set_time_constant(-1).is_err());
    assert!(lia.set_sync_filter(2).is_err());
    assert!(lia.transport().sent().is_empty());
}

#[test]
fn sine_level_below_minimum_is_clamped() {
    for volts in [0.0001, 0.002, 0.0039] {
        let mut lia = lockin();
        lia.set_sine_level(volts).unwrap();
        assert_eq!(lia.transport().last_sent(), Some("SLVL0.004"));
    }
}

#[test]
fn phase_is_range_checked_but_not_wrapped() {
    let mut lia = lockin();
    lia.set_phase_shift(541.0).unwrap();
    lia.set_phase_shift(729.99).unwrap();
    lia.set_phase_shift(-360.0).unwrap();
    assert_eq!(
        lia.transport().sent(),
        ["PHAS541.00", "PHAS729.99", "PHAS-360.00"]
    );
}

#[test]
fn scalar_getters_send_queries_and_parse_replies() {
    let mut lia = Sr830::new(MockTransport::with_replies([
        "-179.00\n", "1\n", "1000.0\n", "0\n", "3\n", "0.004\n", "17\n", "10\n",
    ]));
    assert_eq!(lia.phase_shift().unwrap(), -179.0);
    assert_eq!(lia.reference_source().unwrap(), 1);
    assert_eq!(lia.frequency().unwrap(), 1000.0);
    assert_eq!(lia.reference_slope().unwrap(), 0);
    assert_eq!(lia.harmonic().unwrap(), 3);
    assert_eq!(lia.sine_level().unwrap(), 0.004);
    assert_eq!(lia.sensitivity().unwrap(), 17);
    assert_eq!(lia.time_constant_seconds().unwrap(), 1.0);
    assert_eq!(
        lia.transport().sent(),
        ["PHAS?", "FMOD?", "FREQ?", "RSLP?", "HARM?", "SLVL?", "SENS?", "OFLT?"]
    );
}

#[test]
fn get_after_set_returns_transmitted_value() {
    let mut lia = Sr830::new(EchoInstrument::default());
    for param in PARAMS {
        let value = match param.domain {
            Domain::Float { min, max, .. } => Value::Float(min + (max - min) / 3.0),
            Domain::Integer { min, max, .. } => Value::Int((min + max) / 2),
        };
        let command = param.set_command(value).unwrap();
        lia.set(param, value).unwrap();

        let transmitted = param.parse_reply(&command[param.mnemonic.len()..]).unwrap();
        assert_eq!(lia.get(param).unwrap(), transmitted, "{}", param.name);
    }
}

#[test]
fn phase_round_trip_keeps_two_decimals() {
    let mut lia = Sr830::new(EchoInstrument::default());
    lia.set_phase_shift(12.3456).unwrap();
    assert_eq!(lia.phase_shift().unwrap(), 12.35);
    lia.set_sine_level(0.001).unwrap();
    assert_eq!(lia.sine_level().unwrap(), 0.004);
}

#[test]
fn aux_output_round_trip() {
    let mut lia = Sr830::new(EchoInstrument::default());
    lia.set_aux_output(2, -3.25).unwrap();
    assert_eq!(lia.aux_output(2).unwrap(), -3.25);
}

#[test]
fn snap_formats_one_query_and_keeps_order() {
    let mut lia = Sr830::new(MockTransport::with_replies(["1.0,2.0,3.0\n"]));
    let values = lia.snap(&[1, 2, 3]).unwrap();
    assert_eq!(values, [1.0, 2.0, 3.0]);
    assert_eq!(lia.transport().sent(), ["SNAP?1,2,3,"]);

    let mut lia = Sr830::new(MockTransport::with_replies(["1000.0,-2.5e-6"]));
    assert_eq!(lia.snap(&[9, 2]).unwrap(), [1000.0, -2.5e-6]);
    assert_eq!(lia.transport().sent(), ["SNAP?9,2,"]);
}

#[test]
fn snap_rejects_bad_selector_lists() {
    let cases: [&[u8]; 5] = [&[1], &[1, 2, 3, 4, 5, 6, 7], &[0, 2], &[1, 12], &[3, 12, 5]];
    for selectors in cases {
        let mut lia = lockin();
        let err = lia.snap(selectors).unwrap_err();
        assert!(err.is_validation(), "{selectors:?}");
        assert!(lia.transport().sent().is_empty());
    }
}

#[test]
fn aux_voltage_out_of_range_is_rejected() {
    let mut lia = lockin();
    assert!(lia.set_aux_output(2, 11.0).unwrap_err().is_validation());
    assert!(lia.set_aux_output(2, -10.6).unwrap_err().is_validation());
    assert!(lia.set_aux_output(0, 1.0).unwrap_err().is_validation());
    assert!(lia.set_aux_output(5, 1.0).unwrap_err().is_validation());
    assert!(lia.transport().sent().is_empty());

    lia.set_aux_output(4, -10.5).unwrap();
    assert_eq!(lia.transport().sent(), ["AUXV4,-10.500"]);
}

#[test]
fn aux_reads_issue_one_query_per_channel() {
    let mut lia = Sr830::new(MockTransport::with_replies([
        "0.100", "0.200", "0.300", "0.400", "-1.5", "0", "2.25", "10.5",
    ]));

    let outputs = lia.aux_outputs().unwrap();
    assert_eq!(outputs.keys().copied().collect::<Vec<_>>(), [1, 2, 3, 4]);
    assert_eq!(outputs[&3], 0.3);

    let inputs = lia.aux_inputs().unwrap();
    assert_eq!(inputs[&1], -1.5);
    assert_eq!(inputs[&4], 10.5);

    assert_eq!(
        lia.transport().sent(),
        [
            "AUXV?1", "AUXV?2", "AUXV?3", "AUXV?4", "OAUX?1", "OAUX?2", "OAUX?3", "OAUX?4",
        ]
    );
}

#[test]
fn single_aux_channel_reads_are_checked() {
    let mut lia = Sr830::new(MockTransport::with_replies(["1.25"]));
    assert!(lia.aux_input(0).unwrap_err().is_validation());
    assert_eq!(lia.aux_input(3).unwrap(), 1.25);
    assert_eq!(lia.transport().sent(), ["OAUX?3"]);
}

#[test]
fn auto_functions_and_reset() {
    let mut lia = lockin();
    lia.auto_gain().unwrap();
    lia.auto_reserve().unwrap();
    lia.auto_phase().unwrap();
    lia.auto_offset(OffsetChannel::R).unwrap();
    lia.auto_offset(OffsetChannel::try_from(1).unwrap()).unwrap();
    lia.reset().unwrap();
    assert_eq!(
        lia.transport().sent(),
        ["AGAN", "ARSV", "APHS", "AOFF 3", "AOFF 1", "*RST"]
    );
    assert!(OffsetChannel::try_from(4).unwrap_err().is_validation());
}

#[test]
fn identify_returns_reply_text() {
    let mut lia = Sr830::new(MockTransport::with_replies([
        "Stanford_Research_Systems,SR830,s/n48501,ver1.07 \r\n",
    ]));
    assert_eq!(
        lia.identify().unwrap(),
        "Stanford_Research_Systems,SR830,s/n48501,ver1.07"
    );
    assert_eq!(lia.transport().sent(), ["*IDN?"]);
}

#[test]
fn output_reads_one_quantity() {
    let mut lia = Sr830::new(MockTransport::with_replies(["-0.5"]));
    assert_eq!(lia.output(Quantity::Theta).unwrap(), -0.5);
    assert_eq!(lia.transport().sent(), ["OUTP?4"]);
}

#[test]
fn physical_units_map_to_table_indices() {
    let mut lia = Sr830::new(MockTransport::with_replies(["26"]));
    lia.set_sensitivity_volts(1e-3).unwrap();
    lia.set_time_constant_seconds(0.3).unwrap();
    assert_eq!(lia.sensitivity_volts().unwrap(), 1.0);
    assert_eq!(lia.transport().sent(), ["SENS17", "OFLT9", "SENS?"]);

    assert!(lia.set_sensitivity_volts(2.0).unwrap_err().is_validation());
}

#[test]
fn transport_failures_are_not_validation_errors() {
    let mut lia = lockin();
    let err = lia.frequency().unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!err.is_validation());

    let mut lia = Sr830::new(MockTransport::with_replies(["1.0,abc"]));
    assert!(matches!(lia.snap(&[1, 2]), Err(Error::Parse { .. })));
}

#[test]
fn unknown_parameter_names() {
    assert!(params::lookup("volume").unwrap_err().is_validation());
    let param = params::lookup("sens").unwrap();
    assert_eq!(param.parse_input("12").unwrap(), Value::Int(12));
    assert!(param.parse_input("twelve").unwrap_err().is_validation());
}
