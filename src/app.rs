//! Application core: one struct owning all mutable device state
//!
//! Every event source (SysEx frames, MIDI CC, switch presses, touchscreen
//! bytes, the polling clock) funnels into methods on [`App`]. Everything
//! runs on the single polling loop; there is no concurrent mutation.

use crate::midi::{self, MidiEvent, SysexSink};
use crate::model::{
    ControllerPreset, ControllerState, PresetName, PresetState, RackPreset, RackState, Record,
    LOOP_COUNT, PRESET_COUNT, SWITCH_COUNT,
};
use crate::protocol::{self, Request, Response};
use crate::screen::{Button, LinkAccumulator, Page, ScreenCommand, ScreenEvent, ScreenPort, ScreenView};
use crate::storage::{PresetStore, StorageDevice, StoredPreset};
use crate::tap::TapTempo;
use anyhow::Result;
use tracing::{debug, trace, warn};

/// MIDI CC numbers accepted for remote control.
mod cc {
    pub const BANK_MOVE: u8 = 0;
    pub const PAGE_MOVE: u8 = 1;
    pub const BANK_SELECT: u8 = 2;
    pub const PAGE_SELECT: u8 = 3;
    pub const PAGE_ABSOLUTE: u8 = 4;
    pub const TAP: u8 = 5;
}

/// The whole device state plus its two outbound transports.
pub struct App<D, S, P> {
    store: PresetStore<D>,
    view: ScreenView,
    link: LinkAccumulator,
    tap: TapTempo,
    sysex: S,
    screen: P,
}

impl<D, S, P> App<D, S, P>
where
    D: StorageDevice,
    S: SysexSink,
    P: ScreenPort,
{
    pub fn new(store: PresetStore<D>, sysex: S, screen: P) -> Self {
        Self {
            store,
            view: ScreenView::new(),
            link: LinkAccumulator::new(),
            tap: TapTempo::new(),
            sysex,
            screen,
        }
    }

    /// Bring up the screen link and show bank 0.
    pub fn startup(&mut self, high_baud: u32) -> Result<()> {
        self.view
            .bring_up(&mut self.store, &mut self.screen, high_baud)
    }

    pub fn view(&self) -> &ScreenView {
        &self.view
    }

    pub fn store_mut(&mut self) -> &mut PresetStore<D> {
        &mut self.store
    }

    /// Handle one complete inbound SysEx frame (envelope included).
    ///
    /// Frames for another device, truncated frames, and unknown request
    /// codes are silent no-ops; storage failures propagate.
    pub fn on_sysex(&mut self, frame: &[u8]) -> Result<()> {
        let Some(decoded) = protocol::decode_request(frame) else {
            trace!("dropping sysex frame: {}", midi::format_hex(frame));
            return Ok(());
        };
        debug!(request = ?decoded.request, len = decoded.payload.len(), "sysex request");

        match decoded.request {
            Request::RequestControllerPresetState => {
                let Some(&index) = decoded.payload.first() else {
                    return Ok(());
                };
                if index as usize >= PRESET_COUNT {
                    return Ok(());
                }
                self.send_state::<ControllerPreset>(
                    index,
                    Response::ReceiveControllerPresetState,
                )?;
                self.view.select_bank(
                    &mut self.store,
                    &mut self.screen,
                    (index / SWITCH_COUNT as u8) as i16,
                )?;
            }
            Request::SendControllerPresetState => {
                let Some(state) = ControllerState::decode(decoded.payload) else {
                    return Ok(());
                };
                if state.index as usize >= PRESET_COUNT {
                    return Ok(());
                }
                self.store
                    .write_state(state.index, &state.bank_name, &state.preset)?;
                self.send_directory::<ControllerPreset>(Response::ReceiveControllerPresetIds)?;
                self.view.select_bank(
                    &mut self.store,
                    &mut self.screen,
                    (state.index / SWITCH_COUNT as u8) as i16,
                )?;
            }
            Request::RequestRackPresetState => {
                let Some(&index) = decoded.payload.first() else {
                    return Ok(());
                };
                if index as usize >= PRESET_COUNT {
                    return Ok(());
                }
                self.send_state::<RackPreset>(index, Response::ReceiveRackPresetState)?;
            }
            Request::SendRackPresetState => {
                let Some(state) = RackState::decode(decoded.payload) else {
                    return Ok(());
                };
                if state.index as usize >= PRESET_COUNT {
                    return Ok(());
                }
                self.store
                    .write_state(state.index, &state.bank_name, &state.preset)?;
                self.send_directory::<RackPreset>(Response::ReceiveRackPresetIds)?;
            }
            Request::RequestControllerPresetIds => {
                self.send_directory::<ControllerPreset>(Response::ReceiveControllerPresetIds)?;
            }
            Request::RequestRackPresetIds => {
                self.send_directory::<RackPreset>(Response::ReceiveRackPresetIds)?;
            }
            Request::SendRackLoopNames => {
                let Some(names) = decode_loop_names(decoded.payload) else {
                    return Ok(());
                };
                self.store.write_loop_names(&names)?;
                self.send_loop_names()?;
                self.view.refresh(&mut self.store, &mut self.screen)?;
            }
            Request::RequestRackLoopNames => {
                self.send_loop_names()?;
            }
            Request::Ping => {
                self.send_response(Response::Pong, &[])?;
            }
            Request::Reset => {
                self.store.reset()?;
            }
        }
        Ok(())
    }

    /// Handle a raw inbound MIDI message from the DIN port.
    pub fn on_midi(&mut self, data: &[u8], now_ms: u64) -> Result<()> {
        match MidiEvent::parse(data) {
            Some(MidiEvent::SysEx(frame)) => self.on_sysex(&frame),
            Some(MidiEvent::ControlChange { cc, value, .. }) => self.on_control_change(cc, value, now_ms),
            None => Ok(()),
        }
    }

    fn on_control_change(&mut self, control: u8, value: u8, now_ms: u64) -> Result<()> {
        debug!(control, value, "control change");
        match control {
            cc::BANK_MOVE => {
                let delta: i16 = if value != 0 { 1 } else { -1 };
                let index = self.view.bank().index as i16 + delta;
                self.view.select_bank(&mut self.store, &mut self.screen, index)
            }
            cc::PAGE_MOVE => {
                let delta: i8 = if value != 0 { 1 } else { -1 };
                self.roll_page(delta)
            }
            cc::BANK_SELECT => {
                self.view
                    .select_bank(&mut self.store, &mut self.screen, value as i16)
            }
            cc::PAGE_SELECT => self.set_page(Page::Main.rolled(value as i8)),
            cc::PAGE_ABSOLUTE => match Page::from_byte(value) {
                Some(page) => self.set_page(page),
                None => Ok(()),
            },
            cc::TAP => {
                self.tap.tap(now_ms);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// A physical switch was activated: toggle its blink bit.
    pub fn on_switch(&mut self, switch: u8) -> Result<()> {
        self.view.toggle_blink(&mut self.screen, switch)
    }

    /// Drain available touchscreen bytes and act on decoded events.
    pub fn drain_screen(&mut self, now_ms: u64) -> Result<()> {
        let mut buf = [0u8; 64];
        loop {
            let n = self.screen.try_read(&mut buf)?;
            if n == 0 {
                return Ok(());
            }
            for i in 0..n {
                if let Some(event) = self.link.feed(buf[i]) {
                    self.on_screen_event(event, now_ms)?;
                }
            }
            if n < buf.len() {
                return Ok(());
            }
        }
    }

    /// Act on one decoded touchscreen event.
    pub fn on_screen_event(&mut self, event: ScreenEvent, now_ms: u64) -> Result<()> {
        let ScreenEvent::Touch {
            page,
            button,
            toggled,
        } = event;
        debug!(page, ?button, toggled, "touch");

        match button {
            Button::BankUp if !toggled && page == Page::Main.byte() => {
                let index = self.view.bank().index as i16 + 1;
                self.view.select_bank(&mut self.store, &mut self.screen, index)
            }
            Button::BankDown if !toggled && page == Page::Main.byte() => {
                let index = self.view.bank().index as i16 - 1;
                self.view.select_bank(&mut self.store, &mut self.screen, index)
            }
            Button::PageLeft => self.roll_page(-1),
            Button::PageRight => self.roll_page(1),
            Button::Tap => {
                self.tap.tap(now_ms);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// One polling-loop iteration's housekeeping: tap staleness and the
    /// pending tap display update.
    pub fn tick(&mut self, now_ms: u64) -> Result<()> {
        if let Some(estimate) = self.tap.tick(now_ms) {
            self.send_tap(estimate)?;
        }
        Ok(())
    }

    fn set_page(&mut self, page: Page) -> Result<()> {
        self.view.set_page(&mut self.store, &mut self.screen, page)?;
        self.send_tap(self.tap.estimate_ms())
    }

    fn roll_page(&mut self, delta: i8) -> Result<()> {
        self.set_page(self.view.page().rolled(delta))
    }

    fn send_tap(&mut self, estimate_ms: u32) -> Result<()> {
        self.screen
            .send(&ScreenCommand::set_text("pInf2", estimate_ms.to_string()).encode())?;
        self.screen.send(
            &ScreenCommand::SetAttr {
                field: "tap_timer".into(),
                attr: "tim",
                value: estimate_ms,
            }
            .encode(),
        )
    }

    fn send_response(&mut self, response: Response, payload: &[u8]) -> Result<()> {
        trace!(?response, len = payload.len(), "sysex response");
        self.sysex.send(&protocol::encode_response(response, payload))
    }

    fn send_state<T: StoredPreset>(&mut self, index: u8, response: Response) -> Result<()> {
        let (bank_name, preset) = self.store.read_state::<T>(index)?;
        let state = PresetState {
            index,
            bank_name,
            preset,
        };
        self.send_response(response, &state.to_bytes())
    }

    fn send_directory<T: StoredPreset>(&mut self, response: Response) -> Result<()> {
        let ids = self.store.directory::<T>()?;
        let mut payload = Vec::with_capacity(ids.len() * crate::model::PresetId::SIZE);
        for id in &ids {
            payload.extend_from_slice(&id.to_bytes());
        }
        self.send_response(response, &payload)
    }

    fn send_loop_names(&mut self) -> Result<()> {
        let names = self.store.read_loop_names()?;
        let mut payload = Vec::with_capacity(LOOP_COUNT * PresetName::SIZE);
        for name in &names {
            payload.extend_from_slice(&name.to_bytes());
        }
        self.send_response(Response::ReceiveRackLoopNames, &payload)
    }
}

fn decode_loop_names(payload: &[u8]) -> Option<[PresetName; LOOP_COUNT]> {
    if payload.len() != LOOP_COUNT * PresetName::SIZE {
        warn!(len = payload.len(), "loop-name payload has wrong length");
        return None;
    }
    let mut names = [PresetName::default(); LOOP_COUNT];
    for (i, name) in names.iter_mut().enumerate() {
        *name = PresetName::decode_from(&payload[i * PresetName::SIZE..(i + 1) * PresetName::SIZE]);
    }
    Some(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PresetId;
    use crate::protocol::DEVICE_ID;
    use crate::screen::testing::RecordingPort;
    use crate::storage::MemStorage;

    #[derive(Default)]
    struct RecordingSink {
        bodies: Vec<Vec<u8>>,
    }

    impl SysexSink for RecordingSink {
        fn send(&mut self, body: &[u8]) -> Result<()> {
            self.bodies.push(body.to_vec());
            Ok(())
        }
    }

    type TestApp = App<MemStorage, RecordingSink, RecordingPort>;

    fn make_app() -> TestApp {
        let mut store = PresetStore::new(MemStorage::new());
        store.reset().unwrap();
        let mut app = App::new(store, RecordingSink::default(), RecordingPort::default());
        app.startup(921_600).unwrap();
        app.screen.sent.clear();
        app
    }

    fn request(code: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0xF0, DEVICE_ID, code];
        frame.extend_from_slice(payload);
        frame.push(0xF7);
        frame
    }

    fn responses(app: &TestApp) -> &[Vec<u8>] {
        &app.sysex.bodies
    }

    #[test]
    fn test_ping_pong() {
        let mut app = make_app();
        app.on_sysex(&request(8, &[])).unwrap();
        assert_eq!(responses(&app), &[vec![DEVICE_ID, 5]]);
    }

    #[test]
    fn test_state_round_trip_over_protocol() {
        let mut app = make_app();

        let mut state = ControllerState::default();
        state.index = 9;
        state.bank_name = PresetName::new("Stage");
        state.preset.name = PresetName::new("Lead");
        app.on_sysex(&request(1, &state.to_bytes())).unwrap();
        app.sysex.bodies.clear();

        app.on_sysex(&request(0, &[9])).unwrap();
        let body = &responses(&app)[0];
        assert_eq!(&body[..2], &[DEVICE_ID, 0]);

        let read = ControllerState::decode(&body[2..]).unwrap();
        assert_eq!(read, state);
    }

    #[test]
    fn test_write_echoes_directory_and_selects_bank() {
        let mut app = make_app();

        let mut state = ControllerState::default();
        state.index = 9; // bank 1
        state.bank_name = PresetName::new("Stage");
        state.preset.name = PresetName::new("Lead");
        app.on_sysex(&request(1, &state.to_bytes())).unwrap();

        // Response is the full controller directory.
        let body = &responses(&app)[0];
        assert_eq!(&body[..2], &[DEVICE_ID, 2]);
        let payload = &body[2..];
        assert_eq!(payload.len(), 128 * PresetId::SIZE);

        let entry = PresetId::decode_from(&payload[9 * PresetId::SIZE..10 * PresetId::SIZE]);
        assert_eq!(entry.index, 9);
        assert_eq!(entry.preset_name.as_str(), "Lead");
        assert_eq!(entry.bank_name.as_str(), "Stage");

        // The screen jumped to the bank containing the written preset.
        assert_eq!(app.view().bank().index, 1);
        let commands = app.screen.text_commands();
        assert!(commands.contains(&"pInf1.txt=\"Stage\"".to_string()));
    }

    #[test]
    fn test_rack_state_round_trip() {
        let mut app = make_app();

        let mut state = RackState::default();
        state.index = 40;
        state.bank_name = PresetName::new("RackB5");
        state.preset.name = PresetName::new("Wet");
        app.on_sysex(&request(3, &state.to_bytes())).unwrap();
        app.sysex.bodies.clear();

        app.on_sysex(&request(2, &[40])).unwrap();
        let body = &responses(&app)[0];
        assert_eq!(&body[..2], &[DEVICE_ID, 1]);
        assert_eq!(RackState::decode(&body[2..]).unwrap(), state);
    }

    #[test]
    fn test_directory_complete_after_reset() {
        let mut app = make_app();
        app.on_sysex(&request(6, &[])).unwrap();

        let payload = &responses(&app)[0][2..];
        assert_eq!(payload.len(), 128 * PresetId::SIZE);
        for i in 0..128usize {
            let entry = PresetId::decode_from(&payload[i * PresetId::SIZE..(i + 1) * PresetId::SIZE]);
            assert_eq!(entry.index as usize, i);
            assert_eq!(entry.preset_name.as_str(), format!("P{}", i % 8));
            assert_eq!(entry.bank_name.as_str(), format!("B{}", i / 8));
        }
    }

    #[test]
    fn test_loop_names_write_and_echo() {
        let mut app = make_app();

        let mut payload = Vec::new();
        for i in 0..9 {
            payload.extend_from_slice(&PresetName::new(&format!("FX{i}")).to_bytes());
        }
        app.on_sysex(&request(5, &payload)).unwrap();

        let body = &responses(&app)[0];
        assert_eq!(&body[..2], &[DEVICE_ID, 4]);
        assert_eq!(&body[2..], &payload[..]);

        let names = app.store_mut().read_loop_names().unwrap();
        assert_eq!(names[3].as_str(), "FX3");
    }

    #[test]
    fn test_unknown_request_is_silent() {
        let mut app = make_app();
        let before = app.store_mut().device().image().to_vec();

        app.on_sysex(&request(99, &[1, 2, 3])).unwrap();

        assert!(responses(&app).is_empty());
        assert_eq!(app.store_mut().device().image(), &before[..]);
    }

    #[test]
    fn test_wrong_device_id_is_silent() {
        let mut app = make_app();
        app.on_sysex(&[0xF0, DEVICE_ID + 1, 8, 0xF7]).unwrap();
        assert!(responses(&app).is_empty());
    }

    #[test]
    fn test_truncated_state_payload_is_dropped() {
        let mut app = make_app();
        let bytes = ControllerState::default().to_bytes();
        app.on_sysex(&request(1, &bytes[..bytes.len() - 5])).unwrap();
        assert!(responses(&app).is_empty());
    }

    #[test]
    fn test_bank_buttons_only_on_main_page_toggle_off() {
        let mut app = make_app();

        app.on_screen_event(
            ScreenEvent::Touch {
                page: 0,
                button: Button::BankUp,
                toggled: false,
            },
            0,
        )
        .unwrap();
        assert_eq!(app.view().bank().index, 1);

        // Toggle-on and wrong-page events are ignored.
        app.on_screen_event(
            ScreenEvent::Touch {
                page: 0,
                button: Button::BankUp,
                toggled: true,
            },
            0,
        )
        .unwrap();
        app.on_screen_event(
            ScreenEvent::Touch {
                page: 1,
                button: Button::BankUp,
                toggled: false,
            },
            0,
        )
        .unwrap();
        assert_eq!(app.view().bank().index, 1);
    }

    #[test]
    fn test_bank_wraps_at_edges() {
        let mut app = make_app();

        app.on_screen_event(
            ScreenEvent::Touch {
                page: 0,
                button: Button::BankDown,
                toggled: false,
            },
            0,
        )
        .unwrap();
        assert_eq!(app.view().bank().index, 15);

        app.on_screen_event(
            ScreenEvent::Touch {
                page: 0,
                button: Button::BankUp,
                toggled: false,
            },
            0,
        )
        .unwrap();
        assert_eq!(app.view().bank().index, 0);
    }

    #[test]
    fn test_page_buttons_roll_and_send_tap() {
        let mut app = make_app();

        app.on_screen_event(
            ScreenEvent::Touch {
                page: 0,
                button: Button::PageRight,
                toggled: false,
            },
            0,
        )
        .unwrap();
        assert_eq!(app.view().page(), Page::Perf1);

        let commands = app.screen.text_commands();
        assert!(commands.contains(&"page 1".to_string()));
        assert!(commands.iter().any(|c| c.starts_with("tap_timer.tim=")));
    }

    #[test]
    fn test_tap_button_drives_estimator_and_display() {
        let mut app = make_app();

        app.on_screen_event(
            ScreenEvent::Touch {
                page: 3,
                button: Button::Tap,
                toggled: false,
            },
            1000,
        )
        .unwrap();
        app.on_screen_event(
            ScreenEvent::Touch {
                page: 3,
                button: Button::Tap,
                toggled: false,
            },
            1500,
        )
        .unwrap();

        app.tick(1501).unwrap();
        let commands = app.screen.text_commands();
        assert!(commands.contains(&"pInf2.txt=\"750\"".to_string()));
        assert!(commands.contains(&"tap_timer.tim=750".to_string()));

        // Sent once per tap.
        app.screen.sent.clear();
        app.tick(1502).unwrap();
        assert!(app.screen.sent.is_empty());
    }

    #[test]
    fn test_cc_bank_and_page_control() {
        let mut app = make_app();

        app.on_midi(&[0xB0, 2, 7], 0).unwrap(); // bank select 7
        assert_eq!(app.view().bank().index, 7);

        app.on_midi(&[0xB0, 0, 127], 0).unwrap(); // bank move up
        assert_eq!(app.view().bank().index, 8);
        app.on_midi(&[0xB0, 0, 0], 0).unwrap(); // bank move down
        assert_eq!(app.view().bank().index, 7);

        app.on_midi(&[0xB0, 4, 3], 0).unwrap(); // absolute page: tap
        assert_eq!(app.view().page(), Page::Tap);
    }

    #[test]
    fn test_touch_bytes_through_link() {
        let mut app = make_app();
        app.screen.incoming = vec![0x65, 0, 6, 0, 0xFF, 0xFF, 0xFF];
        app.drain_screen(0).unwrap();
        assert_eq!(app.view().bank().index, 1);
    }

    #[test]
    fn test_switch_press_toggles_blink() {
        let mut app = make_app();
        app.on_switch(3).unwrap();
        assert_eq!(app.view().blink_mask(), 0b1000);
        let commands = app.screen.text_commands();
        assert!(commands.contains(&"blink.val=8".to_string()));
    }
}
