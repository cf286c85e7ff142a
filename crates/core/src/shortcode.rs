//! Short-code generation from database-allocated ids.

use crate::error::{Error, Result};

const MIN_CODE_LENGTH: u8 = 6;

/// Encodes sequential ids into non-sequential-looking short codes.
pub struct ShortCodeGenerator {
    sqids: sqids::Sqids,
}

impl ShortCodeGenerator {
    pub fn new() -> Result<Self> {
        let sqids = sqids::Sqids::builder()
            .min_length(MIN_CODE_LENGTH)
            .build()
            .map_err(|e| Error::ShortCode(e.to_string()))?;

        Ok(Self { sqids })
    }

    /// Encodes a single id into a short code.
    pub fn generate(&self, id: u64) -> Result<String> {
        self.sqids
            .encode(&[id])
            .map_err(|e| Error::ShortCode(e.to_string()))
    }
}
