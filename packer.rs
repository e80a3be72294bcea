//! File packing: wraps file bytes with the metadata needed to restore them.
//!
//! ## Packed Layout
//!
//! ```text
//! [magic:4 "STEG"][version:1][name_len:2][name][mime_len:2][mime][original_size:4][data]
//! ```
//!
//! All integers are big-endian.

use crate::error::StegoError;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Packed blob signature
pub const MAGIC_BYTES: [u8; 4] = *b"STEG";

/// The single packed layout version this build reads and writes
pub const VERSION: u8 = 1;

/// Used when a file's type cannot be determined
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// A file read into memory together with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFile {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub original_size: u32,
}

impl ProcessedFile {
    /// Builds a file record whose `original_size` matches `data`.
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<Self, StegoError> {
        let original_size = u32::try_from(data.len())
            .map_err(|_| StegoError::format("file larger than 4 GiB cannot be packed"))?;
        Ok(Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            data,
            original_size,
        })
    }

    /// Human readable type, e.g. "PDF Document"
    pub fn type_description(&self) -> String {
        file_type_description(&self.mime_type, &self.filename)
    }
}

/// Reads a file from disk, guessing its MIME type from the extension.
pub async fn read_file(path: &Path) -> Result<ProcessedFile> {
    let filename = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("path has no filename: {}", path.display()))?
        .to_string_lossy()
        .into_owned();

    let data = fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let mime_type = mime_type_for(&filename);
    debug!(file = %filename, size = data.len(), mime = mime_type, "payload file read");
    Ok(ProcessedFile::new(filename, mime_type, data)?)
}

/// Serializes `file` into the packed layout.
///
/// Filename and MIME type longer than 65535 bytes are cut at the last
/// character boundary that fits.
pub fn pack(file: &ProcessedFile) -> Vec<u8> {
    let filename = clamp_utf8(&file.filename, MAX_FIELD_LEN);
    let mime_type = clamp_utf8(&file.mime_type, MAX_FIELD_LEN);

    let total = MAGIC_BYTES.len() + 1 + 2 + filename.len() + 2 + mime_type.len() + 4 + file.data.len();
    let mut out = Vec::with_capacity(total);

    out.extend_from_slice(&MAGIC_BYTES);
    out.push(VERSION);
    out.extend_from_slice(&(filename.len() as u16).to_be_bytes());
    out.extend_from_slice(filename);
    out.extend_from_slice(&(mime_type.len() as u16).to_be_bytes());
    out.extend_from_slice(mime_type);
    out.extend_from_slice(&file.original_size.to_be_bytes());
    out.extend_from_slice(&file.data);

    out
}

/// Parses a packed blob back into a [`ProcessedFile`].
pub fn unpack(bytes: &[u8]) -> Result<ProcessedFile, StegoError> {
    let mut reader = FieldReader::new(bytes);

    let magic = reader.take(MAGIC_BYTES.len(), "magic bytes")?;
    if magic != MAGIC_BYTES {
        return Err(StegoError::format("magic bytes mismatch"));
    }

    let version = reader.take(1, "version")?[0];
    if version != VERSION {
        return Err(StegoError::UnsupportedVersion(version));
    }

    let filename = reader.take_prefixed_str("filename")?;
    let mime_type = reader.take_prefixed_str("MIME type")?;
    let original_size = reader.take_u32("original size")?;
    let data = reader.rest().to_vec();

    Ok(ProcessedFile {
        filename,
        mime_type,
        data,
        original_size,
    })
}

/// Bounds-checked cursor over a packed blob
struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8], StegoError> {
        let remaining = self.buf.len() - self.pos;
        if len > remaining {
            return Err(StegoError::format(format!(
                "{} needs {} bytes but only {} remain",
                field, len, remaining
            )));
        }
        let buf = self.buf;
        let slice = &buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_u16(&mut self, field: &str) -> Result<u16, StegoError> {
        let b = self.take(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn take_u32(&mut self, field: &str) -> Result<u32, StegoError> {
        let b = self.take(4, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_prefixed_str(&mut self, field: &str) -> Result<String, StegoError> {
        let len = self.take_u16(field)? as usize;
        let bytes = self.take(len, field)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn rest(&self) -> &'a [u8] {
        let buf = self.buf;
        &buf[self.pos..]
    }
}

fn clamp_utf8(s: &str, max: usize) -> &[u8] {
    if s.len() <= max {
        return s.as_bytes();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s.as_bytes()[..end]
}

/// Lowercased extension of `filename`, empty if it has none.
pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// MIME type guessed from the filename extension.
pub fn mime_type_for(filename: &str) -> &'static str {
    match file_extension(filename).as_str() {
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "json" => "application/json",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "gif" => "image/gif",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// User-facing description of a file type.
pub fn file_type_description(mime_type: &str, filename: &str) -> String {
    let known = match mime_type {
        "application/pdf" => Some("PDF Document"),
        "application/zip" | "application/x-zip-compressed" => Some("ZIP Archive"),
        "application/msword"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            Some("Word Document")
        }
        "application/vnd.ms-excel"
        | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
            Some("Excel Spreadsheet")
        }
        "text/plain" => Some("Text File"),
        "audio/mpeg" => Some("MP3 Audio"),
        "video/mp4" => Some("MP4 Video"),
        "image/jpeg" => Some("JPEG Image"),
        "image/png" => Some("PNG Image"),
        _ => None,
    };

    match known {
        Some(desc) => desc.to_string(),
        None => {
            let ext = file_extension(filename).to_uppercase();
            if ext.is_empty() {
                "Unknown File".to_string()
            } else {
                format!("{} File", ext)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> ProcessedFile {
        ProcessedFile {
            filename: "a.txt".into(),
            mime_type: "text/plain".into(),
            data: vec![0x48, 0x69],
            original_size: 2,
        }
    }

    #[test]
    fn test_pack_layout() {
        let packed = pack(&sample());
        assert_eq!(packed.len(), 30);
        assert_eq!(&packed[..4], &[0x53, 0x54, 0x45, 0x47]);
        assert_eq!(packed[4], 0x01);
        assert_eq!(&packed[5..7], &[0x00, 0x05]);
        assert_eq!(&packed[7..12], b"a.txt");
        assert_eq!(&packed[12..14], &[0x00, 0x0a]);
        assert_eq!(&packed[14..24], b"text/plain");
        assert_eq!(&packed[24..28], &[0x00, 0x00, 0x00, 0x02]);
        assert_eq!(&packed[28..], &[0x48, 0x69]);
    }

    #[test]
    fn test_round_trip() {
        let file = ProcessedFile::new("report.pdf", "application/pdf", (0..=255).collect()).unwrap();
        assert_eq!(unpack(&pack(&file)).unwrap(), file);
    }

    #[test]
    fn test_round_trip_unicode_and_empty_data() {
        let file = ProcessedFile::new("日記.txt", "", Vec::new()).unwrap();
        assert_eq!(unpack(&pack(&file)).unwrap(), file);
    }

    #[test]
    fn test_big_endian_size_field() {
        let file = ProcessedFile {
            original_size: 0x0102_0304,
            ..sample()
        };
        let packed = pack(&file);
        assert_eq!(&packed[24..28], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(unpack(&packed).unwrap().original_size, 0x0102_0304);
    }

    #[test]
    fn test_bad_magic() {
        let mut packed = pack(&sample());
        packed[0] = b'X';
        assert!(matches!(unpack(&packed), Err(StegoError::Format(_))));
    }

    #[test]
    fn test_bad_version() {
        let mut packed = pack(&sample());
        packed[4] = 2;
        assert!(matches!(unpack(&packed), Err(StegoError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_filename_length_past_end() {
        let mut packed = pack(&sample());
        packed[5] = 0xff;
        packed[6] = 0xff;
        assert!(matches!(unpack(&packed), Err(StegoError::Format(_))));
    }

    #[test]
    fn test_truncated_everywhere() {
        let packed = pack(&sample());
        // Every cut before the data section loses a header field
        for cut in 0..28 {
            assert!(
                matches!(unpack(&packed[..cut]), Err(StegoError::Format(_))),
                "cut at {} accepted",
                cut
            );
        }
        assert!(unpack(&packed[..28]).unwrap().data.is_empty());
    }

    #[test]
    fn test_long_filename_is_clamped_on_char_boundary() {
        let name = "é".repeat(40_000); // 80_000 bytes
        let file = ProcessedFile::new(name, "text/plain", vec![1]).unwrap();
        let out = unpack(&pack(&file)).unwrap();
        assert_eq!(out.filename.len(), 65_534);
        assert!(out.filename.chars().all(|c| c == 'é'));
        assert_eq!(out.data, vec![1]);
    }

    #[test]
    fn test_extension_and_description() {
        assert_eq!(file_extension("Archive.TAR.GZ"), "gz");
        assert_eq!(file_extension("README"), "");
        assert_eq!(mime_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(mime_type_for("blob.xyz"), DEFAULT_MIME_TYPE);
        assert_eq!(file_type_description("application/pdf", "x.pdf"), "PDF Document");
        assert_eq!(file_type_description(DEFAULT_MIME_TYPE, "data.bin"), "BIN File");
        assert_eq!(file_type_description(DEFAULT_MIME_TYPE, "noext"), "Unknown File");
    }

    #[tokio::test]
    async fn test_read_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"remember").unwrap();

        let file = read_file(&path).await.unwrap();
        assert_eq!(file.filename, "notes.txt");
        assert_eq!(file.mime_type, "text/plain");
        assert_eq!(file.data, b"remember");
        assert_eq!(file.original_size, 8);
        assert_eq!(file.type_description(), "Text File");
    }

    proptest! {
        /// unpack(pack(f)) == f for any names that fit the length prefix
        #[test]
        fn prop_pack_unpack_round_trip(
            filename in "\\PC{0,64}",
            mime_type in "[a-z]{1,12}/[a-z0-9.+-]{1,24}",
            data in proptest::collection::vec(any::<u8>(), 0..4096),
        ) {
            let file = ProcessedFile::new(filename, mime_type, data).unwrap();
            let packed = pack(&file);
            prop_assert_eq!(&packed[..4], &MAGIC_BYTES[..]);
            prop_assert_eq!(unpack(&packed).unwrap(), file);
        }

        /// Arbitrary bytes never panic the reader
        #[test]
        fn prop_unpack_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = unpack(&bytes);
        }
    }
}
