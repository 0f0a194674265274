use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use sr830::{DEFAULT_RESOURCE, OffsetChannel, Quantity, Sr830, Value, params};

/// Talk to an SR830 lock-in amplifier over VISA.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// VISA resource of the instrument.
    #[arg(short, long, default_value = DEFAULT_RESOURCE)]
    resource: String,

    /// Log every command and reply.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the *IDN? string.
    Idn,
    /// Read a parameter (phase, fmod, freq, rslp, harm, slvl, isrc, ignd,
    /// icpl, ilin, sens, rmod, oflt, ofsl, sync).
    Get { param: String },
    /// Write a parameter.
    Set {
        param: String,
        #[arg(allow_negative_numbers = true)]
        value: String,
    },
    /// Read all four auxiliary inputs.
    AuxIn,
    /// Read all four auxiliary outputs.
    AuxOut,
    /// Set one auxiliary output voltage.
    SetAux {
        channel: u8,
        #[arg(allow_negative_numbers = true)]
        volts: f64,
    },
    /// Read X, Y, R and theta.
    Outputs,
    /// Read 2 to 6 values at the same instant (1 X, 2 Y, 3 R, 4 theta,
    /// 5-8 aux in, 9 frequency, 10-11 displays).
    Snap {
        #[arg(required = true, num_args = 2..=6)]
        selectors: Vec<u8>,
    },
    /// Run an auto function.
    Auto {
        function: AutoFunction,
        /// Channel for `offset`: 1 X, 2 Y, 3 R.
        selector: Option<u8>,
    },
    /// Reset the instrument to its defaults.
    Reset,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AutoFunction {
    Gain,
    Reserve,
    Phase,
    Offset,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut lia = Sr830::open(&cli.resource)?;

    match cli.command {
        Command::Idn => println!("{}", lia.identify()?),
        Command::Get { param } => {
            let param = params::lookup(&param)?;
            let value = lia.get(param)?;
            match value {
                Value::Int(code) => match param.choice_label(code) {
                    Some(label) => println!("{}: {code} ({label})", param.label),
                    None => println!("{}: {code}", param.label),
                },
                Value::Float(v) => println!("{}: {v}", param.label),
            }
        }
        Command::Set { param, value } => {
            let param = params::lookup(&param)?;
            let value = param.parse_input(&value)?;
            lia.set(param, value)?;
        }
        Command::AuxIn => {
            for (channel, volts) in lia.aux_inputs()? {
                println!("Aux In {channel}: {volts} V");
            }
        }
        Command::AuxOut => {
            for (channel, volts) in lia.aux_outputs()? {
                println!("Aux Out {channel}: {volts} V");
            }
        }
        Command::SetAux { channel, volts } => lia.set_aux_output(channel, volts)?,
        Command::Outputs => {
            for (name, quantity) in [
                ("X", Quantity::X),
                ("Y", Quantity::Y),
                ("R", Quantity::R),
                ("theta", Quantity::Theta),
            ] {
                println!("{name}: {}", lia.output(quantity)?);
            }
        }
        Command::Snap { selectors } => {
            let values = lia.snap(&selectors)?;
            let line = values
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            println!("{line}");
        }
        Command::Auto { function, selector } => match function {
            AutoFunction::Gain => lia.auto_gain()?,
            AutoFunction::Reserve => lia.auto_reserve()?,
            AutoFunction::Phase => lia.auto_phase()?,
            AutoFunction::Offset => {
                let selector = selector.ok_or("auto offset needs a channel: 1 X, 2 Y, 3 R")?;
                lia.auto_offset(OffsetChannel::try_from(selector)?)?;
            }
        },
        Command::Reset => lia.reset()?,
    }

    Ok(())
}
