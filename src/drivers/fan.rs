//! Cooling fan driver.
//!
//! A stateless threshold switch over one digital line: `on` / `off` are
//! unconditional writes with no feedback read-back.  The temperature
//! comparison that drives it lives in the service layer.  There is no
//! hysteresis band; a reading hovering around the limit will toggle the
//! fan on consecutive reads.

use log::info;

use crate::error::LineError;
use crate::ports::{GpioBus, GpioPort, Level, LineId, LineMode};

pub struct FanDriver<P: GpioPort> {
    bus: GpioBus<P>,
    line: LineId,
}

impl<P: GpioPort> FanDriver<P> {
    /// Configure the fan line as an output, initially off.
    pub fn new(bus: GpioBus<P>, line: LineId) -> Result<Self, LineError> {
        {
            let mut port = bus.acquire()?;
            port.set_mode(line, LineMode::Output)?;
            port.write(line, Level::Low)?;
        }
        Ok(Self { bus, line })
    }

    pub fn on(&self) -> Result<(), LineError> {
        let mut port = self.bus.acquire()?;
        port.write(self.line, Level::High)?;
        info!("fan is turned on");
        Ok(())
    }

    pub fn off(&self) -> Result<(), LineError> {
        let mut port = self.bus.acquire()?;
        port.write(self.line, Level::Low)?;
        info!("fan is turned off");
        Ok(())
    }
}
