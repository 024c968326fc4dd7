//! Raw program images.
//!
//! An image is the byte sequence loaded into memory verbatim: instruction
//! words in little-endian order with any inline strings in between. There
//! is no header; the load address is supplied separately.

use crate::cpu::memory::MEMORY_SIZE;
use std::path::Path;
use thiserror::Error;

/// Load an image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ImageError> {
    let bytes = std::fs::read(path.as_ref()).map_err(|e| ImageError::IoError(e.to_string()))?;

    if bytes.len() > MEMORY_SIZE {
        return Err(ImageError::TooLarge {
            size: bytes.len(),
            max: MEMORY_SIZE,
        });
    }

    tracing::debug!(path = %path.as_ref().display(), len = bytes.len(), "image loaded");
    Ok(bytes)
}

/// Save an image to disk.
pub fn save_image<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), ImageError> {
    if bytes.len() > MEMORY_SIZE {
        return Err(ImageError::TooLarge {
            size: bytes.len(),
            max: MEMORY_SIZE,
        });
    }

    std::fs::write(path.as_ref(), bytes).map_err(|e| ImageError::IoError(e.to_string()))
}

/// Errors that can occur during image operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("image of {size} bytes does not fit in {max} bytes of memory")]
    TooLarge { size: usize, max: usize },
}
