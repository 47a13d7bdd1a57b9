//! USB HID boot keyboard on the ATmega32U4's native USB controller.
//!
//! Only the primary half enumerates. The driver answers the standard and HID
//! class control requests on EP0 and sends 8-byte boot reports on EP1 IN.
//! Uses direct register access via avr-device.

use avr_device::atmega32u4::{PLL, USB_DEVICE};
use kibo_core::{HidTransport, KeyboardReport};

const EP0_SIZE: u8 = 64;
const EP1_SIZE: u8 = 8;

// bmRequestType, bRequest
const GET_STATUS: (u8, u8) = (0x80, 0x00);
const SET_ADDRESS: (u8, u8) = (0x00, 0x05);
const GET_DESCRIPTOR: (u8, u8) = (0x80, 0x06);
const GET_CONFIGURATION: (u8, u8) = (0x80, 0x08);
const SET_CONFIGURATION: (u8, u8) = (0x00, 0x09);
const HID_GET_DESCRIPTOR: (u8, u8) = (0x81, 0x06);
const HID_GET_REPORT: (u8, u8) = (0xA1, 0x01);
const HID_GET_PROTOCOL: (u8, u8) = (0xA1, 0x03);
const HID_SET_REPORT: (u8, u8) = (0x21, 0x09);
const HID_SET_IDLE: (u8, u8) = (0x21, 0x0A);
const HID_SET_PROTOCOL: (u8, u8) = (0x21, 0x0B);

const DESC_DEVICE: u8 = 1;
const DESC_CONFIGURATION: u8 = 2;
const DESC_STRING: u8 = 3;
const DESC_HID_REPORT: u8 = 0x22;

/// Boot keyboard report descriptor: modifiers, reserved byte, LED output,
/// six key slots.
#[rustfmt::skip]
static HID_REPORT_DESCRIPTOR: [u8; 63] = [
    0x05, 0x01,       // Usage Page (Generic Desktop)
    0x09, 0x06,       // Usage (Keyboard)
    0xA1, 0x01,       // Collection (Application)
    0x05, 0x07,       //   Usage Page (Key Codes)
    0x19, 0xE0,       //   Usage Minimum (LCtrl)
    0x29, 0xE7,       //   Usage Maximum (RGui)
    0x15, 0x00,       //   Logical Minimum (0)
    0x25, 0x01,       //   Logical Maximum (1)
    0x75, 0x01,       //   Report Size (1)
    0x95, 0x08,       //   Report Count (8)
    0x81, 0x02,       //   Input (Data, Variable, Absolute)
    0x95, 0x01,       //   Report Count (1)
    0x75, 0x08,       //   Report Size (8)
    0x81, 0x01,       //   Input (Constant)
    0x95, 0x05,       //   Report Count (5)
    0x75, 0x01,       //   Report Size (1)
    0x05, 0x08,       //   Usage Page (LEDs)
    0x19, 0x01,       //   Usage Minimum (1)
    0x29, 0x05,       //   Usage Maximum (5)
    0x91, 0x02,       //   Output (Data, Variable, Absolute)
    0x95, 0x01,       //   Report Count (1)
    0x75, 0x03,       //   Report Size (3)
    0x91, 0x01,       //   Output (Constant)
    0x95, 0x06,       //   Report Count (6)
    0x75, 0x08,       //   Report Size (8)
    0x15, 0x00,       //   Logical Minimum (0)
    0x25, 0x65,       //   Logical Maximum (101)
    0x05, 0x07,       //   Usage Page (Key Codes)
    0x19, 0x00,       //   Usage Minimum (0)
    0x29, 0x65,       //   Usage Maximum (101)
    0x81, 0x00,       //   Input (Data, Array)
    0xC0,             // End Collection
];

#[rustfmt::skip]
static DEVICE_DESCRIPTOR: [u8; 18] = [
    18, DESC_DEVICE,
    0x00, 0x02,       // bcdUSB 2.0
    0, 0, 0,          // class defined per interface
    EP0_SIZE,
    0xC0, 0x16,       // idVendor 0x16C0
    0xDB, 0x27,       // idProduct 0x27DB (shared keyboard PID)
    0x01, 0x00,       // bcdDevice 1.0
    1, 2, 0,          // iManufacturer, iProduct, no serial
    1,                // bNumConfigurations
];

#[rustfmt::skip]
static CONFIG_DESCRIPTOR: [u8; 34] = [
    // Configuration
    9, DESC_CONFIGURATION,
    34, 0,            // wTotalLength
    1,                // bNumInterfaces
    1,                // bConfigurationValue
    0,
    0x80,             // bus powered
    50,               // 100 mA
    // Interface 0: HID boot keyboard
    9, 4,
    0, 0,
    1,                // bNumEndpoints
    3, 1, 1,          // HID, boot, keyboard
    0,
    // HID
    9, 0x21,
    0x11, 0x01,       // bcdHID 1.11
    0,
    1,
    DESC_HID_REPORT,
    HID_REPORT_DESCRIPTOR.len() as u8, 0,
    // EP1 IN, interrupt
    7, 5,
    0x81,
    0x03,
    EP1_SIZE, 0,
    1,                // bInterval 1 ms
];

static STRING_LANGUAGES: [u8; 4] = [4, DESC_STRING, 0x09, 0x04];

#[rustfmt::skip]
static STRING_MANUFACTURER: [u8; 10] = [
    10, DESC_STRING,
    b'K', 0, b'i', 0, b'b', 0, b'o', 0,
];

#[rustfmt::skip]
static STRING_PRODUCT: [u8; 22] = [
    22, DESC_STRING,
    b'K', 0, b'i', 0, b'b', 0, b'o', 0, b' ', 0,
    b'S', 0, b'p', 0, b'l', 0, b'i', 0, b't', 0,
];

fn descriptor(kind: u8, index: u8) -> Option<&'static [u8]> {
    match (kind, index) {
        (DESC_DEVICE, _) => Some(&DEVICE_DESCRIPTOR),
        (DESC_CONFIGURATION, _) => Some(&CONFIG_DESCRIPTOR),
        (DESC_STRING, 0) => Some(&STRING_LANGUAGES),
        (DESC_STRING, 1) => Some(&STRING_MANUFACTURER),
        (DESC_STRING, 2) => Some(&STRING_PRODUCT),
        _ => None,
    }
}

/// 8-byte SETUP packet.
struct Setup {
    request: (u8, u8),
    value: u16,
    length: u16,
}

pub struct UsbKeyboard<'a> {
    usb: &'a USB_DEVICE,
    configured: bool,
    boot_protocol: bool,
}

impl<'a> UsbKeyboard<'a> {
    pub fn new(usb: &'a USB_DEVICE) -> Self {
        Self {
            usb,
            configured: false,
            boot_protocol: false,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Power up the controller, lock the 48 MHz USB clock and attach.
    pub fn init(&mut self, pll: &PLL) {
        let usb = self.usb;

        usb.uhwcon.write(|w| w.uvrege().set_bit());
        usb.usbcon.write(|w| w.usbe().set_bit().otgpade().set_bit());

        // 16 MHz crystal: PINDIV=1
        pll.pllcsr.write(|w| w.pindiv().set_bit().plle().set_bit());
        while pll.pllcsr.read().plock().bit_is_clear() {}

        usb.usbcon.modify(|_, w| w.frzclk().clear_bit());
        usb.udcon.modify(|_, w| w.detach().clear_bit());
        usb.udien.write(|w| w.eorste().set_bit());

        self.configured = false;
    }

    /// Handle bus reset and control requests. Call at least once per frame.
    pub fn poll(&mut self) {
        let usb = self.usb;

        if usb.udint.read().eorsti().bit_is_set() {
            usb.udint.modify(|_, w| w.eorsti().clear_bit());
            self.configure_ep0();
            self.configured = false;
        }

        self.select_endpoint(0);
        if usb.ueintx.read().rxstpi().bit_is_set() {
            let setup = self.read_setup();
            self.handle_setup(&setup);
        }
    }

    /// Reports are dropped until the host has configured the device.
    pub fn send_report(&mut self, report: &KeyboardReport) {
        if !self.configured {
            return;
        }

        let usb = self.usb;
        self.select_endpoint(1);

        let mut timeout: u16 = 0xFFFF;
        while usb.ueintx.read().rwal().bit_is_clear() {
            timeout = timeout.wrapping_sub(1);
            if timeout == 0 {
                return;
            }
        }

        for byte in report.as_bytes() {
            usb.uedatx.write(|w| w.bits(byte));
        }
        usb.ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());
    }

    fn configure_ep0(&self) {
        let usb = self.usb;
        self.select_endpoint(0);
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b00));
        usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
    }

    fn configure_ep1(&self) {
        let usb = self.usb;
        self.select_endpoint(1);
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b11).epdir().set_bit());
        usb.uecfg1x.write(|w| w.epsize().bits(0b000).alloc().set_bit());
    }

    fn select_endpoint(&self, ep: u8) {
        self.usb.uenum.write(|w| w.bits(ep & 0x07));
    }

    fn read_setup(&self) -> Setup {
        let usb = self.usb;
        let mut raw = [0u8; 8];
        for byte in raw.iter_mut() {
            *byte = usb.uedatx.read().bits();
        }
        usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());

        Setup {
            request: (raw[0], raw[1]),
            value: u16::from_le_bytes([raw[2], raw[3]]),
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    fn handle_setup(&mut self, setup: &Setup) {
        // Descriptor requests carry (index, type); the rest use the low byte.
        let [value_lo, value_hi] = setup.value.to_le_bytes();

        match setup.request {
            GET_DESCRIPTOR | HID_GET_DESCRIPTOR => {
                let found = if setup.request == HID_GET_DESCRIPTOR {
                    (value_hi == DESC_HID_REPORT).then_some(&HID_REPORT_DESCRIPTOR[..])
                } else {
                    descriptor(value_hi, value_lo)
                };
                match found {
                    Some(desc) => self.send_control(desc, setup.length),
                    None => self.stall(),
                }
            }
            SET_ADDRESS => {
                self.send_zlp();
                self.wait_in_ready();
                self.usb
                    .udaddr
                    .write(|w| w.uadd().bits(value_lo & 0x7F).adden().set_bit());
            }
            SET_CONFIGURATION => {
                self.send_zlp();
                self.configure_ep1();
                self.configured = value_lo != 0;
            }
            GET_CONFIGURATION => self.send_control(&[self.configured as u8], setup.length),
            GET_STATUS => self.send_control(&[0, 0], setup.length),
            HID_GET_REPORT => self.send_control(&KeyboardReport::empty().as_bytes(), setup.length),
            HID_GET_PROTOCOL => self.send_control(&[!self.boot_protocol as u8], setup.length),
            HID_SET_PROTOCOL => {
                self.boot_protocol = value_lo == 0;
                self.send_zlp();
            }
            HID_SET_IDLE => self.send_zlp(),
            // Host LED state (Caps Lock etc.). Acknowledged and ignored.
            HID_SET_REPORT => {
                self.discard_control_out();
                self.send_zlp();
            }
            _ => self.stall(),
        }
    }

    /// IN data stage on EP0 in `EP0_SIZE` chunks, then the OUT status stage.
    fn send_control(&self, data: &[u8], max_length: u16) {
        let usb = self.usb;
        let len = core::cmp::min(data.len(), max_length as usize);

        for chunk in data[..len].chunks(EP0_SIZE as usize) {
            self.wait_in_ready();
            for &byte in chunk {
                usb.uedatx.write(|w| w.bits(byte));
            }
            usb.ueintx.modify(|_, w| w.txini().clear_bit());
        }

        while usb.ueintx.read().rxouti().bit_is_clear() {}
        usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
    }

    /// Drain the OUT data stage on EP0.
    fn discard_control_out(&self) {
        let usb = self.usb;
        while usb.ueintx.read().rxouti().bit_is_clear() {}
        while usb.uebclx.read().bits() > 0 {
            let _ = usb.uedatx.read().bits();
        }
        usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
    }

    fn send_zlp(&self) {
        self.usb.ueintx.modify(|_, w| w.txini().clear_bit());
    }

    fn wait_in_ready(&self) {
        while self.usb.ueintx.read().txini().bit_is_clear() {}
    }

    fn stall(&self) {
        self.usb.ueconx.modify(|_, w| w.stallrq().set_bit());
    }
}

impl HidTransport for UsbKeyboard<'_> {
    fn service(&mut self) {
        self.poll();
    }

    fn send_keyboard_report(&mut self, report: &KeyboardReport) {
        self.send_report(report);
    }
}
