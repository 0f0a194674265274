//! Driver for the Stanford Research Systems SR830 lock-in amplifier.
//!
//! Property reads and writes on [`Sr830`] translate one-to-one into the
//! instrument's ASCII command set. Setters are range checked against the
//! SR830 manual before anything is sent.
//!
//! ```no_run
//! # #[cfg(feature = "instrument_visa")]
//! # fn main() -> sr830::Result<()> {
//! use sr830::{DEFAULT_RESOURCE, Sr830};
//!
//! let mut lia = Sr830::open(DEFAULT_RESOURCE)?;
//! println!("{}", lia.identify()?);
//!
//! lia.set_frequency(1_000.0)?;
//! lia.set_sensitivity_volts(10e-3)?;
//! let xy = lia.snap(&[1, 2])?;
//! println!("X = {} V, Y = {} V", xy[0], xy[1]);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "instrument_visa"))]
//! # fn main() {}
//! ```
//!
//! Without the `instrument_visa` feature the crate has no link-time
//! dependency on a VISA library; drive [`Sr830`] through any other
//! [`Transport`], e.g. [`MockTransport`].

pub mod error;
pub mod mock;
pub mod params;
pub mod sr830;
pub mod transport;

pub use error::{Error, Result};
pub use mock::MockTransport;
pub use params::{Param, Value};
pub use sr830::{OffsetChannel, Quantity, Sr830};
pub use transport::{DEFAULT_RESOURCE, Transport, WRITE_TERMINATOR};

#[cfg(feature = "instrument_visa")]
pub use transport::VisaTransport;
