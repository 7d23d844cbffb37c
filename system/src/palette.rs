//! Palette file loading (`spec.md` §7's `PaletteIoError`, `SPEC_FULL.md`
//! §6). Grounded on `machines/src/rom_loader.rs`'s `RomRegion::load`
//! fixed-size validation, minus the CRC32 check the teacher's ROM regions
//! carry — the spec doesn't define a palette checksum, only a size.

use std::fmt;
use std::path::Path;

/// 256 RGB triples (`VPU::load_palette`'s expected input size).
pub const PALETTE_FILE_SIZE: usize = 256 * 3;

#[derive(Debug)]
pub enum PaletteError {
    PaletteIoError(std::io::Error),
    PaletteSizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for PaletteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PaletteIoError(e) => write!(f, "I/O error reading palette file: {e}"),
            Self::PaletteSizeMismatch { expected, actual } => write!(
                f,
                "palette file is {actual} bytes, expected exactly {expected}"
            ),
        }
    }
}

impl std::error::Error for PaletteError {}

impl From<std::io::Error> for PaletteError {
    fn from(e: std::io::Error) -> Self {
        Self::PaletteIoError(e)
    }
}

/// Read a 768-byte palette file from disk, validating its size.
pub fn load_palette_file(path: &Path) -> Result<Vec<u8>, PaletteError> {
    let data = std::fs::read(path)?;
    if data.len() != PALETTE_FILE_SIZE {
        return Err(PaletteError::PaletteSizeMismatch {
            expected: PALETTE_FILE_SIZE,
            actual: data.len(),
        });
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_correctly_sized_palette() {
        let dir = std::env::temp_dir().join("khepra_palette_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("palette.bin");
        std::fs::write(&path, vec![0x42u8; PALETTE_FILE_SIZE]).unwrap();

        let data = load_palette_file(&path).unwrap();
        assert_eq!(data.len(), PALETTE_FILE_SIZE);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_wrong_sized_palette() {
        let dir = std::env::temp_dir().join("khepra_palette_test_bad_size");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("palette.bin");
        std::fs::write(&path, vec![0x00u8; 10]).unwrap();

        let err = load_palette_file(&path).unwrap_err();
        assert!(matches!(
            err,
            PaletteError::PaletteSizeMismatch {
                expected: PALETTE_FILE_SIZE,
                actual: 10
            }
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_reports_io_error() {
        let path = Path::new("/nonexistent/palette.bin");
        let err = load_palette_file(path).unwrap_err();
        assert!(matches!(err, PaletteError::PaletteIoError(_)));
    }
}
