//! The assembled Khepra machine: `core`'s engine wired up against disk-level
//! ROM and palette loading. Mirrors the teacher's `machines` crate shape
//! (one module per concern, re-exported at the crate root) while Khepra, a
//! single console rather than a family of arcade boards, has exactly one
//! machine type instead of one module per game.

pub mod palette;
pub mod rom_loader;

pub use khepra_core::system::System as KhepraSystem;

use std::path::Path;

use palette::PaletteError;
use rom_loader::RomFileError;

/// Load a ROM file and, if present, a palette file, producing a machine
/// ready to have `step_cycle` driven against it.
pub fn load_machine(rom_path: &Path, palette_path: Option<&Path>) -> Result<KhepraSystem, MachineLoadError> {
    let cart = rom_loader::load_rom_file(rom_path)?;
    let mut system = KhepraSystem::from_cart(&cart);
    if let Some(path) = palette_path {
        let data = palette::load_palette_file(path)?;
        system.load_palette(&data);
    }
    Ok(system)
}

#[derive(Debug)]
pub enum MachineLoadError {
    Rom(RomFileError),
    Palette(PaletteError),
}

impl std::fmt::Display for MachineLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rom(e) => write!(f, "{e}"),
            Self::Palette(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for MachineLoadError {}

impl From<RomFileError> for MachineLoadError {
    fn from(e: RomFileError) -> Self {
        Self::Rom(e)
    }
}

impl From<PaletteError> for MachineLoadError {
    fn from(e: PaletteError) -> Self {
        Self::Palette(e)
    }
}
