//! Keyboard-to-gamepad mapping. Grounded on the teacher's
//! `frontend/src/input.rs` scancode-to-button-id table, reshaped for
//! Khepra's two fixed 16-bit gamepad words (`spec.md` §4: `0xFFF0–0xFFF3`)
//! instead of a per-game named-button list: each pad exposes the same
//! eight bits, so the map is a fixed table rather than name-matched.

use sdl2::keyboard::Scancode;

pub const BTN_UP: u16 = 1 << 0;
pub const BTN_DOWN: u16 = 1 << 1;
pub const BTN_LEFT: u16 = 1 << 2;
pub const BTN_RIGHT: u16 = 1 << 3;
pub const BTN_A: u16 = 1 << 4;
pub const BTN_B: u16 = 1 << 5;
pub const BTN_SELECT: u16 = 1 << 6;
pub const BTN_START: u16 = 1 << 7;

/// One (pad index, bit mask) binding per scancode.
pub struct KeyMap {
    bindings: Vec<(Scancode, u8, u16)>,
}

impl KeyMap {
    pub fn get(&self, scancode: Scancode) -> Option<(u8, u16)> {
        self.bindings
            .iter()
            .find(|(sc, _, _)| *sc == scancode)
            .map(|(_, pad, bit)| (*pad, *bit))
    }
}

/// Pad 0 on arrow keys + Z/X/Enter/RShift, pad 1 on WASD + J/K/Tab/CapsLock.
pub fn default_key_map() -> KeyMap {
    KeyMap {
        bindings: vec![
            (Scancode::Up, 0, BTN_UP),
            (Scancode::Down, 0, BTN_DOWN),
            (Scancode::Left, 0, BTN_LEFT),
            (Scancode::Right, 0, BTN_RIGHT),
            (Scancode::Z, 0, BTN_A),
            (Scancode::X, 0, BTN_B),
            (Scancode::RShift, 0, BTN_SELECT),
            (Scancode::Return, 0, BTN_START),
            (Scancode::W, 1, BTN_UP),
            (Scancode::S, 1, BTN_DOWN),
            (Scancode::A, 1, BTN_LEFT),
            (Scancode::D, 1, BTN_RIGHT),
            (Scancode::J, 1, BTN_A),
            (Scancode::K, 1, BTN_B),
            (Scancode::CapsLock, 1, BTN_SELECT),
            (Scancode::Tab, 1, BTN_START),
        ],
    }
}
