//! Disk-level ROM file loading (`spec.md` §6, supplemented). Grounded on
//! `machines/src/rom_loader.rs`'s manual `RomLoadError`/`Display` style
//! (no `thiserror`), simplified for Khepra's single-file `"KHPR"` image —
//! there is no MAME-style multi-file `RomSet`/`RomRegion` to assemble here,
//! `core::cart::load_rom` already consumes the whole image as one slice.

use std::fmt;
use std::path::Path;

use khepra_core::cart::{self, Cart, CartError};

/// Errors loading a ROM file from disk, on top of whatever `CartError`
/// parsing the bytes themselves can produce.
#[derive(Debug)]
pub enum RomFileError {
    Io(std::io::Error),
    Cart(CartError),
}

impl fmt::Display for RomFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error reading ROM file: {e}"),
            Self::Cart(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RomFileError {}

impl From<std::io::Error> for RomFileError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CartError> for RomFileError {
    fn from(e: CartError) -> Self {
        Self::Cart(e)
    }
}

/// Read a ROM file from disk and parse it into a [`Cart`].
pub fn load_rom_file(path: &Path) -> Result<Cart, RomFileError> {
    let bytes = std::fs::read(path)?;
    Ok(cart::load_rom(&bytes)?)
}
