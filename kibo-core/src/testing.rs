//! Recording fakes for the collaborators of the core.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};

use crate::config::SWITCH_COUNT;
use crate::keyboard::SwitchInputs;
use crate::report::{HidTransport, KeyboardReport};
use crate::switch::SwitchIndex;

pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Report(KeyboardReport),
    DelayMs(u32),
    Service,
}

/// Ordered log shared by the fake HID transport and the fake delay.
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<Event>>>);

impl EventLog {
    pub fn hid(&self) -> FakeHid {
        FakeHid(self.clone())
    }

    pub fn delay(&self) -> FakeDelay {
        FakeDelay(self.clone())
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn reports(&self) -> Vec<KeyboardReport> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Report(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }
}

pub struct FakeHid(EventLog);

impl HidTransport for FakeHid {
    fn service(&mut self) {
        self.0.push(Event::Service);
    }

    fn send_keyboard_report(&mut self, report: &KeyboardReport) {
        self.0.push(Event::Report(*report));
    }
}

pub struct FakeDelay(EventLog);

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.push(Event::DelayMs(ns / 1_000_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.push(Event::DelayMs(ms));
    }
}

/// Bytes in flight on a split link.
#[derive(Clone, Default)]
pub struct Wire(Rc<RefCell<VecDeque<u8>>>);

impl Wire {
    pub fn push(&self, bytes: &[u8]) {
        self.0.borrow_mut().extend(bytes);
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.0.borrow().iter().copied().collect()
    }
}

#[derive(Debug)]
pub struct WireError;

impl embedded_io::Error for WireError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// One end of a [`Wire`]; both halves can share the same wire.
pub struct FakeSerial {
    wire: Wire,
    pub fail_writes: bool,
    /// A failing read still takes the byte off the wire, like a UART data
    /// register read after a framing error.
    pub fail_reads: bool,
    pub fail_ready: bool,
}

impl FakeSerial {
    pub fn new(wire: &Wire) -> Self {
        Self {
            wire: wire.clone(),
            fail_writes: false,
            fail_reads: false,
            fail_ready: false,
        }
    }
}

impl ErrorType for FakeSerial {
    type Error = WireError;
}

impl Write for FakeSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(WireError);
        }
        self.wire.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Read for FakeSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut queue = self.wire.0.borrow_mut();
        if self.fail_reads {
            queue.pop_front();
            return Err(WireError);
        }
        let mut n = 0;
        while n < buf.len() {
            match queue.pop_front() {
                Some(b) => buf[n] = b,
                None => break,
            }
            n += 1;
        }
        Ok(n)
    }
}

impl ReadReady for FakeSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        if self.fail_ready {
            return Err(WireError);
        }
        Ok(!self.wire.0.borrow().is_empty())
    }
}

/// Raw switch levels, set by the test between frames.
#[derive(Default)]
pub struct FakeInputs {
    pub asserted: [bool; SWITCH_COUNT],
}

impl FakeInputs {
    pub fn set(&mut self, switch: u8, asserted: bool) {
        self.asserted[switch as usize] = asserted;
    }
}

impl SwitchInputs for FakeInputs {
    fn is_asserted(&mut self, switch: SwitchIndex) -> bool {
        self.asserted[switch.as_usize()]
    }
}
