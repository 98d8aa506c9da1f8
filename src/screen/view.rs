//! On-screen state: current bank, visible page, blink bits
//!
//! The view owns the cached copy of the displayed bank (a mirror of
//! storage content, never persisted) and re-emits display fields whenever
//! any of them change.

use super::commands::ScreenCommand;
use super::ScreenPort;
use crate::model::{Bank, BANK_COUNT, SWITCH_COUNT};
use crate::storage::{PresetStore, StorageDevice};
use anyhow::Result;
use tracing::{debug, info};

/// Display pages. Navigation rolls through the first three; the tap page
/// is only reachable by absolute selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Main,
    Perf1,
    Perf2,
    Tap,
}

/// Pages included in page-left/page-right rolling.
const ROLLABLE_PAGES: u8 = 3;

impl Page {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Page::Main),
            1 => Some(Page::Perf1),
            2 => Some(Page::Perf2),
            3 => Some(Page::Tap),
            _ => None,
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            Page::Main => 0,
            Page::Perf1 => 1,
            Page::Perf2 => 2,
            Page::Tap => 3,
        }
    }

    /// Roll `delta` pages forward or back, wrapping within the rollable set.
    pub fn rolled(self, delta: i8) -> Page {
        let index = (self.byte() as i16 + delta as i16).rem_euclid(ROLLABLE_PAGES as i16);
        Page::from_byte(index as u8).unwrap_or(Page::Main)
    }
}

/// Mutable display state, driven by touch events, MIDI CC, and the SysEx
/// dispatcher's bank re-selection.
#[derive(Debug, Default)]
pub struct ScreenView {
    bank: Bank,
    page: Page,
    blinks: [u8; ROLLABLE_PAGES as usize],
}

impl ScreenView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// Negotiate the link speed and show bank 0.
    ///
    /// The display boots at the low rate; we ask it to switch, reopen our
    /// side at the high rate, then run the initial bank selection.
    pub fn bring_up<D: StorageDevice>(
        &mut self,
        store: &mut PresetStore<D>,
        port: &mut impl ScreenPort,
        high_baud: u32,
    ) -> Result<()> {
        port.send(&ScreenCommand::Baud(high_baud).encode())?;
        port.reopen(high_baud)?;
        info!(baud = high_baud, "screen link up");
        self.select_bank(store, port, 0)
    }

    /// Select a bank, wrapping modulo the bank count, reload its presets
    /// from storage, and refresh the visible page.
    pub fn select_bank<D: StorageDevice>(
        &mut self,
        store: &mut PresetStore<D>,
        port: &mut impl ScreenPort,
        index: i16,
    ) -> Result<()> {
        let bank = index.rem_euclid(BANK_COUNT as i16) as u8;
        self.bank = store.read_bank(bank)?;
        debug!(bank, name = %self.bank.name, "bank selected");
        self.refresh(store, port)
    }

    /// Re-emit every display field of the visible page.
    pub fn refresh<D: StorageDevice>(
        &mut self,
        store: &mut PresetStore<D>,
        port: &mut impl ScreenPort,
    ) -> Result<()> {
        match self.page {
            Page::Main => {
                for (i, preset) in self.bank.presets.iter().enumerate() {
                    port.send(
                        &ScreenCommand::set_text(format!("loop{i}"), preset.name.as_str())
                            .encode(),
                    )?;
                }
                port.send(
                    &ScreenCommand::set_text("pInf0", format!("Bank {}", self.bank.index))
                        .encode(),
                )?;
                port.send(&ScreenCommand::set_text("pInf1", self.bank.name.as_str()).encode())?;
            }
            Page::Perf1 => {
                // The performance page shows the loop-name table, read
                // fresh from storage rather than from the bank cache.
                let names = store.read_loop_names()?;
                for (i, name) in names.iter().take(SWITCH_COUNT).enumerate() {
                    port.send(
                        &ScreenCommand::set_text(format!("loop{i}"), name.as_str()).encode(),
                    )?;
                }
            }
            Page::Perf2 | Page::Tap => {}
        }
        Ok(())
    }

    /// Switch to an absolute page and re-emit its state.
    pub fn set_page<D: StorageDevice>(
        &mut self,
        store: &mut PresetStore<D>,
        port: &mut impl ScreenPort,
        page: Page,
    ) -> Result<()> {
        port.send(&ScreenCommand::Page(page.byte()).encode())?;
        self.page = page;
        self.refresh(store, port)?;
        self.send_blinks(port)
    }

    /// Roll the visible page left or right within the rollable set.
    pub fn roll_page<D: StorageDevice>(
        &mut self,
        store: &mut PresetStore<D>,
        port: &mut impl ScreenPort,
        delta: i8,
    ) -> Result<()> {
        self.set_page(store, port, self.page.rolled(delta))
    }

    /// Toggle one switch's blink bit on the current page and re-send the
    /// page's blink mask. The tap page has no blink state.
    pub fn toggle_blink(&mut self, port: &mut impl ScreenPort, switch: u8) -> Result<()> {
        let page = self.page.byte() as usize;
        if page >= self.blinks.len() || switch as usize >= SWITCH_COUNT {
            return Ok(());
        }
        self.blinks[page] ^= 1 << switch;
        self.send_blinks(port)
    }

    /// Blink state of the current page, one bit per switch.
    pub fn blink_mask(&self) -> u8 {
        self.blinks
            .get(self.page.byte() as usize)
            .copied()
            .unwrap_or(0)
    }

    fn send_blinks(&mut self, port: &mut impl ScreenPort) -> Result<()> {
        port.send(&ScreenCommand::set_value("blink", self.blink_mask() as u32).encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::testing::RecordingPort;
    use crate::storage::MemStorage;

    fn make_view() -> (ScreenView, PresetStore<MemStorage>, RecordingPort) {
        let mut store = PresetStore::new(MemStorage::new());
        store.reset().unwrap();
        (ScreenView::new(), store, RecordingPort::default())
    }

    #[test]
    fn test_page_rolls_modulo_three() {
        assert_eq!(Page::Main.rolled(1), Page::Perf1);
        assert_eq!(Page::Perf2.rolled(1), Page::Main);
        assert_eq!(Page::Main.rolled(-1), Page::Perf2);
        // Rolling off the tap page re-enters the rollable set.
        assert_eq!(Page::Tap.rolled(1), Page::Perf1);
    }

    #[test]
    fn test_bank_selection_wraps() {
        let (mut view, mut store, mut port) = make_view();

        view.select_bank(&mut store, &mut port, -1).unwrap();
        assert_eq!(view.bank().index, 15);

        view.select_bank(&mut store, &mut port, 16).unwrap();
        assert_eq!(view.bank().index, 0);
    }

    #[test]
    fn test_main_page_refresh_emits_bank_fields() {
        let (mut view, mut store, mut port) = make_view();
        view.select_bank(&mut store, &mut port, 2).unwrap();

        let commands = port.text_commands();
        assert!(commands.contains(&"loop0.txt=\"P0\"".to_string()));
        assert!(commands.contains(&"loop7.txt=\"P7\"".to_string()));
        assert!(commands.contains(&"pInf0.txt=\"Bank 2\"".to_string()));
        assert!(commands.contains(&"pInf1.txt=\"B2\"".to_string()));
    }

    #[test]
    fn test_perf_page_reads_loop_names_from_storage() {
        let (mut view, mut store, mut port) = make_view();

        let mut names = store.read_loop_names().unwrap();
        names[0] = crate::model::PresetName::new("Chorus");
        store.write_loop_names(&names).unwrap();

        view.set_page(&mut store, &mut port, Page::Perf1).unwrap();
        let commands = port.text_commands();
        assert!(commands.contains(&"page 1".to_string()));
        assert!(commands.contains(&"loop0.txt=\"Chorus\"".to_string()));
    }

    #[test]
    fn test_blink_toggles_per_page() {
        let (mut view, mut store, mut port) = make_view();

        view.toggle_blink(&mut port, 0).unwrap();
        view.toggle_blink(&mut port, 2).unwrap();
        assert_eq!(view.blink_mask(), 0b101);

        view.set_page(&mut store, &mut port, Page::Perf1).unwrap();
        assert_eq!(view.blink_mask(), 0);
        view.toggle_blink(&mut port, 1).unwrap();
        assert_eq!(view.blink_mask(), 0b010);

        // Page change re-sends the mask.
        let commands = port.text_commands();
        assert!(commands.iter().filter(|c| c.starts_with("blink.val=")).count() >= 3);
    }

    #[test]
    fn test_unknown_page_refreshes_nothing() {
        let (mut view, mut store, mut port) = make_view();
        view.set_page(&mut store, &mut port, Page::Perf2).unwrap();

        let commands = port.text_commands();
        // Just the page switch and the blink mask, no field updates.
        assert_eq!(commands.len(), 2);
    }
}
