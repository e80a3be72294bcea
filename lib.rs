//! # StegoCrypt - Encrypted File Hiding in Images
//!
//! StegoCrypt hides arbitrary files inside lossless carrier images. Payloads are
//! packed with their metadata, compressed with zlib, sealed with AES-256-GCM
//! under a PBKDF2-derived key and written into the two low bits of every colour
//! channel.
//!
//! ## Features
//!
//! - **2-bit LSB embedding**: R, G and B carry data, alpha is left untouched
//! - **AES-256-GCM**: Authenticated encryption, wrong passwords never yield garbage
//! - **PBKDF2-HMAC-SHA256**: 100,000 iterations with a fresh salt per payload
//! - **Compression**: zlib at the best level before encryption
//! - **Metadata**: Original filename, MIME type and size travel with the data
//!
//! ## Quick Start
//!
//! ```no_run
//! use stegocrypt::{config::Config, image_io, packer, pipeline::StegoPipeline};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cfg = Config::load_with_env(None)?;
//!     let pipeline = StegoPipeline::from_config(&cfg);
//!
//!     // Hide a file
//!     let carrier = image_io::load_carrier(Path::new("cover.png"))?;
//!     let file = packer::read_file(Path::new("secret.pdf")).await?;
//!     let result = pipeline.conceal(&carrier, &file, "correct horse battery").await?;
//!     image_io::save_png(&result.image, Path::new("cover_stego.png"))?;
//!
//!     // Recover it
//!     let stego = image_io::load_carrier(Path::new("cover_stego.png"))?;
//!     let restored = pipeline.reveal(&stego, "correct horse battery").await?;
//!     assert_eq!(restored.filename, "secret.pdf");
//!     Ok(())
//! }
//! ```
//!
//! ## Cipher Variants
//!
//! - **Standard**: `[salt:16][nonce:12][ciphertext+tag]`
//! - **Legacy**: `[salt:16][nonce:16][ciphertext+tag]`
//!
//! The variant is configuration, never guessed from the blob.

pub mod compression;
pub mod config;
pub mod crypto;
pub mod error;
pub mod image_io;
pub mod kdf;
pub mod packer;
pub mod pipeline;
pub mod stego;

// Re-export common types for convenience
pub use crypto::{CipherVariant, PasswordCipher};
pub use error::StegoError;
pub use packer::ProcessedFile;
pub use stego::PixelBuffer;
