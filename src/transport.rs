//! Byte-level link to the instrument.
//!
//! The driver only needs two primitives: send a command, and send a query and
//! read one reply. Anything that can do that implements [`Transport`]; the
//! VISA implementation is the one used against real hardware.

use crate::error::Result;

/// Terminator appended to every command written to the bus.
pub const WRITE_TERMINATOR: &str = "\r\n";

/// Default VISA address of the lock-in on the bench.
pub const DEFAULT_RESOURCE: &str = "GPIB0::7::INSTR";

pub trait Transport {
    /// Send a command. No reply is read.
    fn write(&mut self, command: &str) -> Result<()>;

    /// Send a query and return the reply with trailing whitespace removed.
    fn query(&mut self, command: &str) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, command: &str) -> Result<()> {
        (**self).write(command)
    }

    fn query(&mut self, command: &str) -> Result<String> {
        (**self).query(command)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, command: &str) -> Result<()> {
        (**self).write(command)
    }

    fn query(&mut self, command: &str) -> Result<String> {
        (**self).query(command)
    }
}

#[cfg(feature = "instrument_visa")]
pub use visa::VisaTransport;

#[cfg(feature = "instrument_visa")]
mod visa {
    use std::ffi::CString;
    use std::io::{BufRead, BufReader, Write};
    use std::time::Duration;

    use tracing::debug;
    use visa_rs::prelude::*;

    use super::{Transport, WRITE_TERMINATOR};
    use crate::error::{Error, Result};

    fn io_to_vs_err(err: std::io::Error) -> visa_rs::Error {
        visa_rs::io_to_vs_err(err)
    }

    /// A VISA session to one instrument.
    ///
    /// Commands are terminated with CR-LF. No read terminator is configured;
    /// a reply is read up to the line feed the instrument ends it with.
    pub struct VisaTransport {
        instr: Instrument,
        resource: String,
        // Closing the resource manager closes every session it opened, so it
        // has to outlive `instr`.
        _rm: DefaultRM,
    }

    impl VisaTransport {
        pub fn open(resource: &str) -> Result<Self> {
            let rm = DefaultRM::new()?;
            let resource_string = CString::new(resource).map_err(|_| {
                Error::Validation(format!("Resource string {resource:?} contains a NUL byte"))
            })?;
            let instr = rm.open(
                &resource_string.into(),
                AccessMode::NO_LOCK,
                Duration::from_secs(1),
            )?;
            debug!(resource, "opened VISA session");

            Ok(Self {
                instr,
                resource: resource.to_string(),
                _rm: rm,
            })
        }

        pub fn resource(&self) -> &str {
            &self.resource
        }
    }

    impl Transport for VisaTransport {
        fn write(&mut self, command: &str) -> Result<()> {
            let line = format!("{command}{WRITE_TERMINATOR}");
            self.instr
                .write_all(line.as_bytes())
                .map_err(io_to_vs_err)?;
            debug!(resource = %self.resource, command, "sent");
            Ok(())
        }

        fn query(&mut self, command: &str) -> Result<String> {
            self.write(command)?;
            let mut response = String::new();
            {
                // The reader borrows the session; drop it before the next write.
                let mut reader = BufReader::new(&self.instr);
                reader.read_line(&mut response).map_err(io_to_vs_err)?;
            }
            let reply = response.trim_end().to_string();
            debug!(resource = %self.resource, command, reply = %reply, "received");
            Ok(reply)
        }
    }
}
