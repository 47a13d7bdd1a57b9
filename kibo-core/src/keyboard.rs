//! Per-frame keyboard processing.
//!
//! [`KeyboardState`] owns everything that changes from frame to frame (switch
//! debounce state and the active layer). The poll loop keeps it and hands the
//! hardware collaborators to one of the tick functions once per frame.

use embedded_hal::digital::OutputPin;
use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};
use log::debug;

use crate::debounce::Debouncer;
use crate::keymap::{KeyBinding, KeyMap, Layer};
use crate::link::SplitLink;
use crate::report::{HidTransport, ReportEmitter};
use crate::switch::{Half, SwitchIndex};

/// Raw switch readings for the local half.
pub trait SwitchInputs {
    /// Undebounced reading, true while the switch contacts are closed.
    fn is_asserted(&mut self, switch: SwitchIndex) -> bool;
}

pub struct KeyboardState<'a> {
    half: Half,
    keymap: &'a KeyMap,
    debouncer: Debouncer,
    layer: Layer,
}

impl<'a> KeyboardState<'a> {
    pub fn new(half: Half, keymap: &'a KeyMap) -> Self {
        Self {
            half,
            keymap,
            debouncer: Debouncer::new(),
            layer: Layer::BASE,
        }
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn toggle_layer(&mut self) {
        self.layer = self.layer.next();
        debug!("layer -> {}", self.layer.index());
    }

    /// Sample every local switch once, in index order.
    pub fn scan<I: SwitchInputs>(&mut self, inputs: &mut I) {
        for switch in SwitchIndex::all() {
            let raw = inputs.is_asserted(switch);
            self.debouncer.update(switch, raw);
        }
    }

    /// Act on a `Down` edge of `switch` on `half`: toggle the layer or send a
    /// tap. Toggles never reach the host.
    pub fn activate<H, D>(
        &mut self,
        half: Half,
        switch: SwitchIndex,
        emitter: &mut ReportEmitter<H, D>,
    ) where
        H: HidTransport,
        D: DelayNs,
    {
        match self.keymap.resolve(half, self.layer, switch) {
            KeyBinding::LayerToggle => self.toggle_layer(),
            KeyBinding::Chord(chord) => emitter.emit(&chord),
        }
    }

    /// One frame on the half that owns USB: service the transport, scan,
    /// handle local edges in index order, then at most one byte from the
    /// other half.
    pub fn tick_primary<I, H, D, S, L>(
        &mut self,
        inputs: &mut I,
        emitter: &mut ReportEmitter<H, D>,
        link: &mut SplitLink<S>,
        led: &mut L,
    ) where
        I: SwitchInputs,
        H: HidTransport,
        D: DelayNs,
        S: Read + ReadReady,
        L: OutputPin,
    {
        emitter.hid_mut().service();
        self.scan(inputs);

        let half = self.half;
        self.handle_events(led, |state, switch| state.activate(half, switch, emitter));

        if let Some(remote) = link.poll() {
            self.activate(half.other(), remote, emitter);
        }
    }

    /// One frame on the forwarding half: scan, then send every `Down` edge
    /// over the link.
    pub fn tick_secondary<I, S, L>(&mut self, inputs: &mut I, link: &mut SplitLink<S>, led: &mut L)
    where
        I: SwitchInputs,
        S: Write,
        L: OutputPin,
    {
        self.scan(inputs);
        self.handle_events(led, |_, switch| link.send_down(switch));
    }

    fn handle_events<L: OutputPin>(
        &mut self,
        led: &mut L,
        mut on_down: impl FnMut(&mut Self, SwitchIndex),
    ) {
        for switch in SwitchIndex::all() {
            if self.debouncer.is_down_edge(switch) {
                led.set_high().ok();
                on_down(self, switch);
            } else if self.debouncer.is_up_edge(switch) {
                led.set_low().ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    use super::*;
    use crate::config::{
        DOWN_THRESHOLD, KEY_SEND_COOLDOWN_MS, LAYER_COUNT, PRESSED_THRESHOLD, SWITCH_COUNT,
    };
    use crate::keycode::Keycode as K;
    use crate::keymap::HalfMap;
    use crate::report::KeyboardReport;
    use crate::testing::{
        init_log, Event, EventLog, FakeDelay, FakeHid, FakeInputs, FakeSerial, Wire,
    };

    const TOGGLE: u8 = 0;
    const Q_KEY: u8 = 3;
    const REMOTE_A: u8 = 5;
    const REMOTE_TOGGLE: u8 = 19;

    /// Switch 3 is `Q` / `Shift+Q`, switch 0 toggles the layer. The right
    /// half types `A` / `Shift+A` on switch 5 and toggles on switch 19.
    fn test_keymap() -> KeyMap {
        let mut left: HalfMap = [[KeyBinding::key(K::Z); SWITCH_COUNT]; LAYER_COUNT];
        let mut right: HalfMap = [[KeyBinding::key(K::X); SWITCH_COUNT]; LAYER_COUNT];
        left[0][TOGGLE as usize] = KeyBinding::LayerToggle;
        left[1][TOGGLE as usize] = KeyBinding::LayerToggle;
        left[0][Q_KEY as usize] = KeyBinding::key(K::Q);
        left[1][Q_KEY as usize] = KeyBinding::shifted(K::Q);
        right[0][REMOTE_A as usize] = KeyBinding::key(K::A);
        right[1][REMOTE_A as usize] = KeyBinding::shifted(K::A);
        right[0][REMOTE_TOGGLE as usize] = KeyBinding::LayerToggle;
        right[1][REMOTE_TOGGLE as usize] = KeyBinding::LayerToggle;
        KeyMap::new(left, right)
    }

    fn report(modifiers: u8, key: K) -> KeyboardReport {
        KeyboardReport {
            modifiers,
            reserved: 0,
            keys: [key.code(), 0, 0, 0, 0, 0],
        }
    }

    /// A primary half with its collaborators.
    struct Primary<'a> {
        state: KeyboardState<'a>,
        inputs: FakeInputs,
        emitter: ReportEmitter<FakeHid, FakeDelay>,
        link: SplitLink<FakeSerial>,
        log: EventLog,
    }

    impl<'a> Primary<'a> {
        fn new(keymap: &'a KeyMap, wire: &Wire) -> Self {
            init_log();
            let log = EventLog::default();
            Self {
                state: KeyboardState::new(Half::Left, keymap),
                inputs: FakeInputs::default(),
                emitter: ReportEmitter::new(log.hid(), log.delay()),
                link: SplitLink::new(FakeSerial::new(wire)),
                log,
            }
        }

        fn frames(&mut self, n: usize) {
            for _ in 0..n {
                self.state
                    .tick_primary(&mut self.inputs, &mut self.emitter, &mut self.link, &mut NoLed);
            }
        }

        fn tap(&mut self, switch: u8) {
            self.inputs.set(switch, true);
            self.frames(PRESSED_THRESHOLD as usize);
            self.inputs.set(switch, false);
            self.frames(PRESSED_THRESHOLD as usize);
        }
    }

    struct NoLed;

    impl embedded_hal::digital::ErrorType for NoLed {
        type Error = core::convert::Infallible;
    }

    impl OutputPin for NoLed {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_held_key_emits_one_tap() {
        let keymap = test_keymap();
        let wire = Wire::default();
        let mut primary = Primary::new(&keymap, &wire);

        primary.inputs.set(Q_KEY, true);
        primary.frames(DOWN_THRESHOLD as usize - 1);
        assert!(primary.log.reports().is_empty());

        primary.log.clear();
        primary.frames(1);
        assert_eq!(
            primary.log.events(),
            vec![
                Event::Service,
                Event::Report(report(0, K::Q)),
                Event::DelayMs(KEY_SEND_COOLDOWN_MS),
                Event::Service,
                Event::Report(KeyboardReport::empty()),
                Event::DelayMs(KEY_SEND_COOLDOWN_MS),
                Event::Service,
            ]
        );

        // Holding on through `Pressed` does not repeat.
        primary.frames(100);
        assert_eq!(primary.log.reports().len(), 2);
        assert!(primary.state.debouncer().is_held(SwitchIndex::new(Q_KEY).unwrap()));
    }

    #[test]
    fn test_toggle_switches_layer_without_report() {
        let keymap = test_keymap();
        let wire = Wire::default();
        let mut primary = Primary::new(&keymap, &wire);

        primary.inputs.set(TOGGLE, true);
        primary.frames(PRESSED_THRESHOLD as usize);
        assert_eq!(primary.state.layer().index(), 1);
        assert!(primary.log.reports().is_empty());

        // Still held: no second toggle.
        primary.frames(200);
        assert_eq!(primary.state.layer().index(), 1);

        primary.inputs.set(TOGGLE, false);
        primary.frames(PRESSED_THRESHOLD as usize);
        assert!(primary.log.reports().is_empty());

        primary.tap(Q_KEY);
        assert_eq!(
            primary.log.reports(),
            vec![report(0x02, K::Q), KeyboardReport::empty()]
        );
    }

    #[test]
    fn test_toggle_flips_once_per_press() {
        let keymap = test_keymap();
        let wire = Wire::default();
        let mut primary = Primary::new(&keymap, &wire);

        primary.tap(TOGGLE);
        primary.tap(TOGGLE);
        assert_eq!(primary.state.layer(), Layer::BASE);
        primary.tap(TOGGLE);
        assert_eq!(primary.state.layer().index(), 1);
    }

    #[test]
    fn test_same_frame_presses_emit_in_index_order() {
        let keymap = KeyMap::DEFAULT;
        let wire = Wire::default();
        let mut primary = Primary::new(&keymap, &wire);

        // Default left map: 1 = Q, 7 = A, 12 = Z.
        for switch in [12, 1, 7] {
            primary.inputs.set(switch, true);
        }
        primary.frames(DOWN_THRESHOLD as usize);
        assert_eq!(
            primary.log.reports(),
            vec![
                report(0, K::Q),
                KeyboardReport::empty(),
                report(0, K::A),
                KeyboardReport::empty(),
                report(0, K::Z),
                KeyboardReport::empty(),
            ]
        );
    }

    #[test]
    fn test_secondary_forwards_down_edges_only() {
        init_log();
        let keymap = test_keymap();
        let wire = Wire::default();
        let mut state = KeyboardState::new(Half::Right, &keymap);
        let mut inputs = FakeInputs::default();
        let mut link = SplitLink::new(FakeSerial::new(&wire));

        inputs.set(REMOTE_A, true);
        for _ in 0..3 * PRESSED_THRESHOLD {
            state.tick_secondary(&mut inputs, &mut link, &mut NoLed);
        }
        inputs.set(REMOTE_A, false);
        for _ in 0..3 * PRESSED_THRESHOLD {
            state.tick_secondary(&mut inputs, &mut link, &mut NoLed);
        }

        assert_eq!(wire.bytes(), vec![REMOTE_A]);
    }

    #[test]
    fn test_remote_press_round_trip() {
        init_log();
        let keymap = test_keymap();
        let wire = Wire::default();
        let mut secondary = KeyboardState::new(Half::Right, &keymap);
        let mut remote_inputs = FakeInputs::default();
        let mut remote_link = SplitLink::new(FakeSerial::new(&wire));
        let mut primary = Primary::new(&keymap, &wire);

        remote_inputs.set(REMOTE_A, true);
        for _ in 0..DOWN_THRESHOLD {
            secondary.tick_secondary(&mut remote_inputs, &mut remote_link, &mut NoLed);
        }
        assert_eq!(wire.bytes(), vec![REMOTE_A]);

        primary.frames(1);
        assert!(wire.bytes().is_empty());
        assert_eq!(
            primary.log.reports(),
            vec![report(0, K::A), KeyboardReport::empty()]
        );
    }

    #[test]
    fn test_remote_keys_follow_primary_layer() {
        let keymap = test_keymap();
        let wire = Wire::default();
        let mut primary = Primary::new(&keymap, &wire);

        // A toggle from the right half flips the primary's layer.
        wire.push(&[REMOTE_TOGGLE]);
        primary.frames(1);
        assert_eq!(primary.state.layer().index(), 1);
        assert!(primary.log.reports().is_empty());

        wire.push(&[REMOTE_A]);
        primary.frames(1);
        assert_eq!(
            primary.log.reports(),
            vec![report(0x02, K::A), KeyboardReport::empty()]
        );
    }

    #[test]
    fn test_primary_drains_one_byte_per_frame() {
        let keymap = test_keymap();
        let wire = Wire::default();
        let mut primary = Primary::new(&keymap, &wire);

        wire.push(&[REMOTE_A, REMOTE_A, REMOTE_A]);
        primary.frames(1);
        assert_eq!(primary.log.reports().len(), 2);
        assert_eq!(wire.bytes().len(), 2);
        primary.frames(2);
        assert_eq!(primary.log.reports().len(), 6);
    }

    #[test]
    fn test_status_led_follows_edges() {
        init_log();
        let keymap = test_keymap();
        let wire = Wire::default();
        let mut state = KeyboardState::new(Half::Right, &keymap);
        let mut inputs = FakeInputs::default();
        let mut link = SplitLink::new(FakeSerial::new(&wire));
        let mut led = PinMock::new(&[Transaction::set(State::High), Transaction::set(State::Low)]);

        inputs.set(REMOTE_A, true);
        for _ in 0..PRESSED_THRESHOLD {
            state.tick_secondary(&mut inputs, &mut link, &mut led);
        }
        inputs.set(REMOTE_A, false);
        for _ in 0..PRESSED_THRESHOLD {
            state.tick_secondary(&mut inputs, &mut link, &mut led);
        }

        led.done();
    }
}
