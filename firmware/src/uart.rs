//! USART1 driver for the split link (PD2 = RXD1, PD3 = TXD1).
//!
//! 8N1 in double-speed mode. Implements the blocking `embedded-io` traits so
//! the core's split link can drive it.

use avr_device::atmega32u4::USART1;
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};
use kibo_core::config::LINK_BAUD_RATE;

const CPU_HZ: u32 = 16_000_000;
/// Double-speed divisor: F_CPU / (8 * baud) - 1, rounded to nearest.
const UBRR: u16 = ((CPU_HZ + 4 * LINK_BAUD_RATE) / (8 * LINK_BAUD_RATE) - 1) as u16;

// UCSR1A
const RXC1: u8 = 1 << 7;
const TXC1: u8 = 1 << 6;
const UDRE1: u8 = 1 << 5;
const FE1: u8 = 1 << 4;
const DOR1: u8 = 1 << 3;
const UPE1: u8 = 1 << 2;
const U2X1: u8 = 1 << 1;
// UCSR1B
const RXEN1: u8 = 1 << 4;
const TXEN1: u8 = 1 << 3;
// UCSR1C: 8 data bits
const UCSZ_8BIT: u8 = 0b11 << 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartError {
    Framing,
    Overrun,
    Parity,
}

impl core::fmt::Display for UartError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UartError::Framing => f.write_str("framing error"),
            UartError::Overrun => f.write_str("receiver overrun"),
            UartError::Parity => f.write_str("parity error"),
        }
    }
}

impl core::error::Error for UartError {}

impl embedded_io::Error for UartError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct Uart<'a> {
    usart: &'a USART1,
}

impl<'a> Uart<'a> {
    pub fn new(usart: &'a USART1) -> Self {
        usart.ubrr1.write(|w| unsafe { w.bits(UBRR) });
        usart.ucsr1a.write(|w| unsafe { w.bits(U2X1) });
        usart.ucsr1c.write(|w| unsafe { w.bits(UCSZ_8BIT) });
        usart.ucsr1b.write(|w| unsafe { w.bits(RXEN1 | TXEN1) });
        Self { usart }
    }

    fn status(&self) -> u8 {
        self.usart.ucsr1a.read().bits()
    }
}

impl ErrorType for Uart<'_> {
    type Error = UartError;
}

impl Write for Uart<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &byte in buf {
            while self.status() & UDRE1 == 0 {}
            // Clear TXC1 (write one) so flush() can wait for this byte.
            self.usart
                .ucsr1a
                .write(|w| unsafe { w.bits(U2X1 | TXC1) });
            self.usart.udr1.write(|w| unsafe { w.bits(byte) });
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        while self.status() & (UDRE1 | TXC1) != (UDRE1 | TXC1) {}
        Ok(())
    }
}

impl Read for Uart<'_> {
    /// Blocks until one byte arrives and returns it alone.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        let status = loop {
            let status = self.status();
            if status & RXC1 != 0 {
                break status;
            }
        };
        // UDR1 must be read even on error to free the receive buffer.
        let byte = self.usart.udr1.read().bits();

        if status & FE1 != 0 {
            return Err(UartError::Framing);
        }
        if status & DOR1 != 0 {
            return Err(UartError::Overrun);
        }
        if status & UPE1 != 0 {
            return Err(UartError::Parity);
        }

        buf[0] = byte;
        Ok(1)
    }
}

impl ReadReady for Uart<'_> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.status() & RXC1 != 0)
    }
}
