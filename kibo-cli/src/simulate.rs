//! Drive both halves of the keyboard from a text script on the host.
//!
//! The primary and secondary `KeyboardState`s run exactly as on the boards,
//! frame by frame, joined by an in-memory link. Every HID report the primary
//! emits is recorded with the simulated time it was sent at.
//!
//! Script format, one command per line:
//!
//! ```text
//! # comment
//! hold left 3 40      # hold switch 3 of the left half for 40 frames
//! idle 25             # release everything for 25 frames
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::fmt;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_io::{ErrorType, Read, ReadReady, Write};
use log::{debug, trace};

use kibo_core::config::{FRAME_DELAY_MS, PRESSED_THRESHOLD, SWITCH_COUNT};
use kibo_core::{
    Half, HidTransport, KeyMap, KeyboardReport, KeyboardState, ReportEmitter, SplitLink,
    SwitchIndex, SwitchInputs,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Assert one switch for a number of frames, then release it.
    Hold {
        half: Half,
        switch: SwitchIndex,
        frames: u32,
    },
    /// Run frames with every switch released.
    Idle { frames: u32 },
}

/// Parse a simulation script. Blank lines and `#` comments are ignored.
pub fn parse_script(input: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();

    for (line_num, line) in input.lines().enumerate() {
        let line_num = line_num + 1;
        let line = match line.split_once('#') {
            Some((code, _)) => code,
            None => line,
        };
        let words: Vec<&str> = line.split_whitespace().collect();

        match words.as_slice() {
            [] => continue,
            ["hold", half, switch, frames] => {
                let half = parse_half(half).with_context(|| format!("line {line_num}"))?;
                let index: u8 = switch
                    .parse()
                    .with_context(|| format!("line {line_num}: invalid switch '{switch}'"))?;
                let Some(switch) = SwitchIndex::new(index) else {
                    bail!(
                        "line {line_num}: switch {index} out of range (0..{SWITCH_COUNT})"
                    );
                };
                let frames = parse_frames(frames, line_num)?;
                if frames == 0 {
                    bail!("line {line_num}: hold needs at least one frame");
                }
                steps.push(Step::Hold {
                    half,
                    switch,
                    frames,
                });
            }
            ["idle", frames] => {
                steps.push(Step::Idle {
                    frames: parse_frames(frames, line_num)?,
                });
            }
            ["hold", ..] => bail!("line {line_num}: expected 'hold <left|right> <switch> <frames>'"),
            ["idle", ..] => bail!("line {line_num}: expected 'idle <frames>'"),
            [cmd, ..] => bail!("line {line_num}: unknown command '{cmd}'"),
        }
    }

    Ok(steps)
}

fn parse_half(word: &str) -> Result<Half> {
    match word {
        "left" => Ok(Half::Left),
        "right" => Ok(Half::Right),
        other => bail!("unknown half '{other}', expected 'left' or 'right'"),
    }
}

fn parse_frames(word: &str, line_num: usize) -> Result<u32> {
    word.parse()
        .with_context(|| format!("line {line_num}: invalid frame count '{word}'"))
}

/// One report as the host would have received it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recorded {
    pub at_ms: u64,
    pub report: KeyboardReport,
}

impl fmt::Display for Recorded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>7} ms  mods={:02x} keys=", self.at_ms, self.report.modifiers)?;
        for (i, key) in self.report.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key:02x}")?;
        }
        Ok(())
    }
}

/// Simulated millisecond clock, advanced only by delays.
#[derive(Clone, Default)]
struct Clock(Rc<Cell<u64>>);

impl Clock {
    fn now(&self) -> u64 {
        self.0.get()
    }

    fn advance_ms(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }

    fn advance_ns(&self, ns: u64) {
        // Sub-millisecond delays are not used by the pipeline; round up.
        self.0.set(self.0.get() + ns.div_ceil(1_000_000));
    }
}

struct ClockDelay(Clock);

impl DelayNs for ClockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.advance_ns(ns as u64);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.advance_ms(ms as u64);
    }
}

struct RecordingHid {
    clock: Clock,
    reports: Vec<Recorded>,
}

impl HidTransport for RecordingHid {
    fn service(&mut self) {}

    fn send_keyboard_report(&mut self, report: &KeyboardReport) {
        self.reports.push(Recorded {
            at_ms: self.clock.now(),
            report: *report,
        });
    }
}

/// One direction of the serial cable. Never fails, never blocks.
#[derive(Clone, Default)]
struct MemoryLink(Rc<RefCell<VecDeque<u8>>>);

impl ErrorType for MemoryLink {
    type Error = Infallible;
}

impl Write for MemoryLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &byte in buf {
            trace!("link <- {byte:#04x}");
        }
        self.0.borrow_mut().extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Read for MemoryLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut wire = self.0.borrow_mut();
        let n = buf.len().min(wire.len());
        for slot in &mut buf[..n] {
            if let Some(byte) = wire.pop_front() {
                *slot = byte;
            }
        }
        Ok(n)
    }
}

impl ReadReady for MemoryLink {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow().is_empty())
    }
}

#[derive(Default)]
struct ScriptedInputs {
    asserted: Option<SwitchIndex>,
}

impl SwitchInputs for ScriptedInputs {
    fn is_asserted(&mut self, switch: SwitchIndex) -> bool {
        self.asserted == Some(switch)
    }
}

struct LogLed(Half);

impl PinErrorType for LogLed {
    type Error = Infallible;
}

impl OutputPin for LogLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        trace!("{:?} led off", self.0);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        trace!("{:?} led on", self.0);
        Ok(())
    }
}

/// Both halves, wired together.
pub struct Simulation<'a> {
    primary: KeyboardState<'a>,
    secondary: KeyboardState<'a>,
    primary_inputs: ScriptedInputs,
    secondary_inputs: ScriptedInputs,
    primary_led: LogLed,
    secondary_led: LogLed,
    emitter: ReportEmitter<RecordingHid, ClockDelay>,
    rx: SplitLink<MemoryLink>,
    tx: SplitLink<MemoryLink>,
    frames: u64,
}

impl<'a> Simulation<'a> {
    pub fn new(keymap: &'a KeyMap) -> Self {
        let clock = Clock::default();
        let wire = MemoryLink::default();

        Self {
            primary: KeyboardState::new(Half::Left, keymap),
            secondary: KeyboardState::new(Half::Right, keymap),
            primary_inputs: ScriptedInputs::default(),
            secondary_inputs: ScriptedInputs::default(),
            primary_led: LogLed(Half::Left),
            secondary_led: LogLed(Half::Right),
            emitter: ReportEmitter::new(
                RecordingHid {
                    clock: clock.clone(),
                    reports: Vec::new(),
                },
                ClockDelay(clock),
            ),
            rx: SplitLink::new(wire.clone()),
            tx: SplitLink::new(wire),
            frames: 0,
        }
    }

    /// Run every step, then enough idle frames for releases to settle and
    /// the link to drain.
    pub fn run(&mut self, steps: &[Step]) {
        for step in steps {
            debug!("{step:?}");
            match *step {
                Step::Hold {
                    half,
                    switch,
                    frames,
                } => {
                    let inputs = match half {
                        Half::Left => &mut self.primary_inputs,
                        Half::Right => &mut self.secondary_inputs,
                    };
                    inputs.asserted = Some(switch);
                    self.run_frames(frames);
                    self.release_all();
                }
                Step::Idle { frames } => {
                    self.release_all();
                    self.run_frames(frames);
                }
            }
        }

        self.release_all();
        self.run_frames(PRESSED_THRESHOLD as u32);
        while !self.rx.serial_mut().0.borrow().is_empty() {
            self.run_frames(1);
        }
    }

    fn release_all(&mut self) {
        self.primary_inputs.asserted = None;
        self.secondary_inputs.asserted = None;
    }

    fn run_frames(&mut self, count: u32) {
        for _ in 0..count {
            self.secondary
                .tick_secondary(&mut self.secondary_inputs, &mut self.tx, &mut self.secondary_led);
            self.primary.tick_primary(
                &mut self.primary_inputs,
                &mut self.emitter,
                &mut self.rx,
                &mut self.primary_led,
            );
            self.emitter.delay_mut().delay_ms(FRAME_DELAY_MS);
            self.frames += 1;
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn reports(&self) -> &[Recorded] {
        &self.emitter.hid().reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kibo_core::Keycode as K;

    fn switch(index: u8) -> SwitchIndex {
        SwitchIndex::new(index).unwrap()
    }

    fn run(script: &str) -> Vec<Recorded> {
        let steps = parse_script(script).unwrap();
        let mut sim = Simulation::new(&KeyMap::DEFAULT);
        sim.run(&steps);
        sim.reports().to_vec()
    }

    fn presses(reports: &[Recorded]) -> Vec<KeyboardReport> {
        reports
            .iter()
            .map(|r| r.report)
            .filter(|r| !r.is_empty())
            .collect()
    }

    fn key(kc: K) -> KeyboardReport {
        let mut report = KeyboardReport::empty();
        report.keys[0] = kc.code();
        report
    }

    #[test]
    fn test_parse_script() {
        let steps = parse_script(
            "# warm up\n\
             idle 5\n\
             \n\
             hold left 1 40   # Q\n\
             hold right 19 30\n",
        )
        .unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Idle { frames: 5 },
                Step::Hold {
                    half: Half::Left,
                    switch: switch(1),
                    frames: 40
                },
                Step::Hold {
                    half: Half::Right,
                    switch: switch(19),
                    frames: 30
                },
            ]
        );
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = parse_script("idle 1\nhold up 1 2\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));

        let err = parse_script("hold left 20 5").unwrap_err();
        assert!(err.to_string().contains("line 1"));
        assert!(err.to_string().contains("out of range"));

        let err = parse_script("idle\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));

        let err = parse_script("idle 1\nidle 2\njump 3\n").unwrap_err();
        assert!(err.to_string().contains("line 3"));

        assert!(parse_script("hold left 1 0").is_err());
        assert!(parse_script("idle -4").is_err());
    }

    #[test]
    fn test_local_tap() {
        let reports = run("hold left 1 40");

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].report, key(K::Q));
        assert!(reports[1].report.is_empty());
        assert_eq!(reports[1].at_ms - reports[0].at_ms, 4);
    }

    #[test]
    fn test_short_bounce_sends_nothing() {
        assert!(run("hold left 1 15\nidle 30").is_empty());
    }

    #[test]
    fn test_remote_tap_goes_through_link() {
        // Right switch 0 is J on the base layer.
        assert_eq!(presses(&run("hold right 0 40")), vec![key(K::J)]);
    }

    #[test]
    fn test_toggle_shifts_both_halves() {
        let reports = run(
            "hold left 17 40\n\
             idle 30\n\
             hold left 1 40\n\
             idle 30\n\
             hold right 0 40\n",
        );

        let mut shifted_q = key(K::Q);
        shifted_q.modifiers = K::LShift.modifier_bit();
        let mut shifted_j = key(K::J);
        shifted_j.modifiers = K::LShift.modifier_bit();
        assert_eq!(presses(&reports), vec![shifted_q, shifted_j]);
    }

    #[test]
    fn test_reports_are_time_ordered() {
        let reports = run("hold left 1 40\nidle 30\nhold right 1 40\n");
        assert_eq!(reports.len(), 4);
        assert!(reports.windows(2).all(|w| w[0].at_ms < w[1].at_ms));
    }

    #[test]
    fn test_display() {
        let line = Recorded {
            at_ms: 42,
            report: key(K::A),
        }
        .to_string();
        assert_eq!(line, "     42 ms  mods=00 keys=04 00 00 00 00 00");
    }
}
