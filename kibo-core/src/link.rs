//! Split link between the two halves.
//!
//! The wire format is one byte per event: the index of a secondary switch
//! that just went down. There is no framing, acknowledgement or retry, so a
//! byte lost on the wire is a lost keypress. Releases are never sent.

use embedded_io::{Read, ReadReady, Write};
use log::{trace, warn};

use crate::switch::SwitchIndex;

pub struct SplitLink<S> {
    serial: S,
}

impl<S> SplitLink<S> {
    pub fn new(serial: S) -> Self {
        Self { serial }
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }
}

impl<S: Write> SplitLink<S> {
    /// Secondary side: announce a `Down` edge.
    pub fn send_down(&mut self, switch: SwitchIndex) {
        trace!("link tx {}", switch.get());
        if let Err(e) = self.serial.write_all(&[switch.get()]) {
            warn!("split link write failed, dropping switch {}: {:?}", switch.get(), e);
        }
    }
}

impl<S: Read + ReadReady> SplitLink<S> {
    /// Primary side: take at most one pending event without blocking.
    pub fn poll(&mut self) -> Option<SwitchIndex> {
        match self.serial.read_ready() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!("split link status failed: {:?}", e);
                return None;
            }
        }

        let mut byte = [0u8; 1];
        match self.serial.read(&mut byte) {
            Ok(1) => {}
            Ok(_) => return None,
            Err(e) => {
                warn!("split link read failed: {:?}", e);
                return None;
            }
        }

        trace!("link rx {}", byte[0]);
        let switch = SwitchIndex::new(byte[0]);
        if switch.is_none() {
            warn!("split link byte {:#04x} names no switch, dropped", byte[0]);
        }
        switch
    }
}
