use thiserror::Error;

/// Error types for StegoCrypt operations
#[derive(Debug, Error)]
pub enum StegoError {
    /// Packed blob is malformed (bad magic, truncated fields, bad encoding)
    #[error("Format error: {0}")]
    Format(String),

    /// Packed blob carries a version this build cannot read
    #[error("Unsupported file version: {0}")]
    UnsupportedVersion(u8),

    /// Carrier image is too small for the payload
    #[error("Data too large: {required} bytes, but image can only hold {available} bytes")]
    Capacity { required: usize, available: usize },

    /// Extraction found no plausible embedded payload
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// Tag mismatch, wrong password or a blob too short to hold salt and nonce
    #[error("Decryption failed: incorrect password or corrupted data")]
    Authentication,

    /// Deflate failed while writing the compressed stream
    #[error("Compression failed: {0}")]
    Compression(String),

    /// Input is not a valid zlib stream
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// Cipher provider failures during encryption
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Zero-length payloads cannot be told apart from an empty carrier
    #[error("Payload is empty")]
    EmptyPayload,

    /// Pixel buffer or image file problems
    #[error("Image error: {0}")]
    Image(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl StegoError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptData(msg.into())
    }

    pub fn compression(msg: impl Into<String>) -> Self {
        Self::Compression(msg.into())
    }

    pub fn decompression(msg: impl Into<String>) -> Self {
        Self::Decompression(msg.into())
    }

    pub fn encryption(msg: impl Into<String>) -> Self {
        Self::Encryption(msg.into())
    }

    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
