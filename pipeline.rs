//! High-level hide/reveal operations.
//!
//! This module provides [`StegoPipeline`], which chains the individual stages:
//!
//! ```text
//! hide:   pack -> compress -> encrypt -> embed
//! reveal: extract -> decrypt -> decompress -> unpack
//! ```
//!
//! Compression and the cipher variant are taken from configuration and must be
//! the same on both sides; nothing in the image records them.

use crate::compression;
use crate::config::{Config, DEFAULT_MIN_PASSWORD_LEN};
use crate::crypto::PasswordCipher;
use crate::packer::{self, ProcessedFile};
use crate::stego::{self, CapacityReport, EmbedResult, PixelBuffer};
use anyhow::{Context, Result};
use tracing::{debug, error, info};

/// Fixed per-payload overhead assumed by [`StegoPipeline::estimate_payload_size`]
const ESTIMATE_OVERHEAD: usize = 50;
/// Assumed compression ratio for [`StegoPipeline::estimate_payload_size`]
const ESTIMATE_RATIO: f64 = 0.7;

pub struct StegoPipeline {
    cipher: PasswordCipher,
    compress: bool,
    min_password_len: usize,
}

impl StegoPipeline {
    pub fn new(cipher: PasswordCipher) -> Self {
        Self {
            cipher,
            compress: true,
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.cipher())
            .with_compression(cfg.compress)
            .with_min_password_len(cfg.min_password_len)
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_min_password_len(mut self, len: usize) -> Self {
        self.min_password_len = len;
        self
    }

    /// Builds the encrypted payload for `file` without touching any image.
    pub async fn seal_file(&self, file: &ProcessedFile, password: &str) -> Result<Vec<u8>> {
        if password.chars().count() < self.min_password_len {
            anyhow::bail!(
                "password must be at least {} characters",
                self.min_password_len
            );
        }

        let packed = packer::pack(file);
        let body = if self.compress {
            let compressed = compression::compress(&packed)?;
            debug!(packed = packed.len(), compressed = compressed.len(), "payload compressed");
            compressed
        } else {
            packed
        };

        let sealed = self.cipher.encrypt(&body, password).await?;
        debug!(file = %file.filename, sealed = sealed.len(), "payload encrypted");
        Ok(sealed)
    }

    /// Reverses [`seal_file`](Self::seal_file).
    pub async fn open_file(&self, sealed: &[u8], password: &str) -> Result<ProcessedFile> {
        let body = self.cipher.decrypt(sealed, password).await?;
        let packed = if self.compress {
            compression::decompress(&body)?
        } else {
            body
        };
        Ok(packer::unpack(&packed)?)
    }

    /// Hides `file` in a copy of `carrier`.
    pub async fn conceal(
        &self,
        carrier: &PixelBuffer,
        file: &ProcessedFile,
        password: &str,
    ) -> Result<EmbedResult> {
        debug!(
            file = %file.filename,
            size = file.data.len(),
            compress = self.compress,
            "concealing file"
        );
        let sealed = self.seal_file(file, password).await?;

        let report = CapacityReport::new(carrier.width(), carrier.height(), sealed.len());
        debug!(
            capacity = report.capacity,
            used = report.used,
            usage_percent = report.usage_percent,
            "capacity checked"
        );

        let result = stego::embed(carrier, &sealed)
            .with_context(|| format!("embedding {}", file.filename))?;
        info!(
            file = %file.filename,
            original_size = file.data.len(),
            embedded_size = result.embedded_size,
            "file hidden successfully"
        );
        Ok(result)
    }

    /// Recovers a file hidden by [`conceal`](Self::conceal).
    pub async fn reveal(&self, image: &PixelBuffer, password: &str) -> Result<ProcessedFile> {
        debug!(width = image.width(), height = image.height(), "revealing file");
        let sealed = stego::extract(image)?;
        let result = self.open_file(&sealed, password).await;
        match &result {
            Ok(file) => info!(
                file = %file.filename,
                size = file.data.len(),
                "file revealed successfully"
            ),
            Err(e) => error!(error = %e, "reveal failed"),
        }
        result
    }

    /// Rough payload size for a file before it is processed.
    ///
    /// Only meant for capacity hints; the exact size is known after sealing.
    pub fn estimate_payload_size(file_size: usize, filename: &str) -> usize {
        (file_size as f64 * ESTIMATE_RATIO).ceil() as usize + ESTIMATE_OVERHEAD + filename.len()
    }
}
