//! LSB steganography over RGBA pixel buffers.
//!
//! Payloads are framed as a 32-bit big-endian length header followed by the
//! payload bytes. The frame is split into 2-bit groups, most significant group
//! first, and each group replaces the two low bits of one colour channel.
//! Channels are visited R, G, B for every pixel in buffer order; alpha is
//! never touched.
//!
//! ## Capacity
//!
//! ```text
//! floor(width * height * 3 * 2 / 8) - 4   bytes
//! ```

use crate::error::StegoError;
use tracing::{debug, warn};

/// Bytes of the big-endian length header
pub const HEADER_LEN: usize = 4;

/// Low bits replaced in each channel
pub const BITS_PER_CHANNEL: usize = 2;

/// R, G and B carry data; alpha does not
pub const CHANNELS_PER_PIXEL: usize = 3;

const BYTES_PER_PIXEL: usize = 4;
const GROUPS_PER_BYTE: usize = 8 / BITS_PER_CHANNEL;
const GROUP_MASK: u8 = (1 << BITS_PER_CHANNEL) - 1;

/// Usage above this share of capacity is reported as a warning
const WARNING_THRESHOLD_PERCENT: f64 = 80.0;

/// An owned RGBA8 image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps raw RGBA bytes. `data` must hold exactly `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, StegoError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| StegoError::image("image dimensions overflow"))?;
        if data.len() != expected {
            return Err(StegoError::image(format!(
                "{}x{} RGBA image needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// A buffer with every channel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            data: rgba.repeat(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Payload bytes this image can hold.
    pub fn capacity(&self) -> usize {
        capacity(self.width, self.height)
    }
}

/// Result of a successful [`embed`].
#[derive(Debug, Clone)]
pub struct EmbedResult {
    pub image: PixelBuffer,
    /// Payload length
    pub original_size: usize,
    /// Payload length plus the length header
    pub embedded_size: usize,
}

/// Maximum payload bytes for a `width` x `height` carrier.
pub fn capacity(width: u32, height: u32) -> usize {
    let bits = width as u64 * height as u64 * CHANNELS_PER_PIXEL as u64 * BITS_PER_CHANNEL as u64;
    let bytes = usize::try_from(bits / 8).unwrap_or(usize::MAX);
    bytes.saturating_sub(HEADER_LEN)
}

pub fn can_fit(data_len: usize, width: u32, height: u32) -> bool {
    data_len <= capacity(width, height)
}

/// Hides `data` in a copy of `carrier`. The carrier itself is left untouched.
pub fn embed(carrier: &PixelBuffer, data: &[u8]) -> Result<EmbedResult, StegoError> {
    if data.is_empty() {
        return Err(StegoError::EmptyPayload);
    }

    let available = carrier.capacity();
    if data.len() > available {
        warn!(required = data.len(), available, "payload does not fit carrier");
        return Err(StegoError::Capacity {
            required: data.len(),
            available,
        });
    }

    // The length header is 32 bits wide regardless of carrier size
    let header = u32::try_from(data.len())
        .map_err(|_| StegoError::Capacity {
            required: data.len(),
            available: u32::MAX as usize,
        })?
        .to_be_bytes();

    let groups = header
        .iter()
        .chain(data)
        .flat_map(|&byte| {
            (0..GROUPS_PER_BYTE)
                .rev()
                .map(move |i| (byte >> (i * BITS_PER_CHANNEL)) & GROUP_MASK)
        });

    let mut image = carrier.clone();
    let channels = image
        .data
        .chunks_exact_mut(BYTES_PER_PIXEL)
        .flat_map(|px| px.into_iter().take(CHANNELS_PER_PIXEL));

    for (channel, group) in channels.zip(groups) {
        *channel = (*channel & !GROUP_MASK) | group;
    }

    let embedded_size = HEADER_LEN + data.len();
    debug!(
        width = carrier.width,
        height = carrier.height,
        payload = data.len(),
        capacity = available,
        "payload embedded"
    );

    Ok(EmbedResult {
        image,
        original_size: data.len(),
        embedded_size,
    })
}

/// Recovers a payload written by [`embed`].
pub fn extract(image: &PixelBuffer) -> Result<Vec<u8>, StegoError> {
    let mut groups = image
        .data
        .chunks_exact(BYTES_PER_PIXEL)
        .flat_map(|px| px.iter().take(CHANNELS_PER_PIXEL))
        .map(|&channel| channel & GROUP_MASK);

    let available_groups = image.data.len() / BYTES_PER_PIXEL * CHANNELS_PER_PIXEL;
    if available_groups < HEADER_LEN * GROUPS_PER_BYTE {
        return Err(StegoError::corrupt("image too small to hold a length header"));
    }

    let mut length: u64 = 0;
    for group in groups.by_ref().take(HEADER_LEN * GROUPS_PER_BYTE) {
        length = (length << BITS_PER_CHANNEL) | u64::from(group);
    }

    let max = image.capacity() as u64;
    if length == 0 || length > max {
        debug!(declared = length, capacity = max, "implausible payload length");
        return Err(StegoError::corrupt(
            "no valid embedded data found or data is corrupted",
        ));
    }
    let length = length as usize;

    let required_groups = (HEADER_LEN + length) * GROUPS_PER_BYTE;
    if available_groups < required_groups {
        return Err(StegoError::corrupt("image does not contain enough data"));
    }

    let mut out = Vec::with_capacity(length);
    for _ in 0..length {
        let byte = groups
            .by_ref()
            .take(GROUPS_PER_BYTE)
            .fold(0u8, |acc, group| (acc << BITS_PER_CHANNEL) | group);
        out.push(byte);
    }

    debug!(payload = length, "payload extracted");
    Ok(out)
}

/// How close a payload comes to filling a carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityStatus {
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapacityReport {
    pub capacity: usize,
    pub used: usize,
    pub remaining: i64,
    pub usage_percent: f64,
    pub status: CapacityStatus,
}

impl CapacityReport {
    pub fn new(width: u32, height: u32, data_size: usize) -> Self {
        let capacity = capacity(width, height);
        let usage_percent = if capacity > 0 {
            data_size as f64 / capacity as f64 * 100.0
        } else {
            0.0
        };
        let status = if data_size > capacity {
            CapacityStatus::Error
        } else if usage_percent > WARNING_THRESHOLD_PERCENT {
            CapacityStatus::Warning
        } else {
            CapacityStatus::Ok
        };

        Self {
            capacity,
            used: data_size,
            remaining: capacity as i64 - data_size as i64,
            usage_percent,
            status,
        }
    }
}

/// Formats a byte count as "1.5 KB", "0 Bytes", ...
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8, 200]);
            }
        }
        PixelBuffer::new(width, height, data).unwrap()
    }

    #[test]
    fn test_capacity_values() {
        assert_eq!(capacity(10, 10), 71);
        assert_eq!(capacity(1, 1), 0);
        assert_eq!(capacity(0, 100), 0);
        assert_eq!(capacity(3, 3), 2); // floor(54 / 8) - 4
    }

    #[test]
    fn test_can_fit_boundary() {
        for (w, h) in [(10, 10), (7, 3), (64, 48)] {
            let cap = capacity(w, h);
            assert!(can_fit(cap, w, h));
            assert!(!can_fit(cap + 1, w, h));
        }
    }

    #[test]
    fn test_round_trip() {
        let carrier = gradient(32, 32);
        let data: Vec<u8> = (0..200u16).map(|i| (i * 37) as u8).collect();
        let result = embed(&carrier, &data).unwrap();
        assert_eq!(result.original_size, 200);
        assert_eq!(result.embedded_size, 204);
        assert_eq!(extract(&result.image).unwrap(), data);
    }

    #[test]
    fn test_full_capacity_10x10() {
        let carrier = gradient(10, 10);
        let data = vec![0xa5u8; 71];
        let stego = embed(&carrier, &data).unwrap().image;
        assert_eq!(extract(&stego).unwrap(), data);
    }

    #[test]
    fn test_over_capacity_10x10() {
        let carrier = gradient(10, 10);
        let err = embed(&carrier, &[0u8; 72]).unwrap_err();
        assert!(matches!(
            err,
            StegoError::Capacity {
                required: 72,
                available: 71
            }
        ));
    }

    #[test]
    fn test_carrier_untouched_and_alpha_preserved() {
        let carrier = gradient(16, 16);
        let before = carrier.clone();
        let stego = embed(&carrier, &[0xffu8; 90]).unwrap().image;
        assert_eq!(carrier, before);
        for (new_px, old_px) in stego.as_bytes().chunks(4).zip(before.as_bytes().chunks(4)) {
            assert_eq!(new_px[3], old_px[3]);
            for c in 0..3 {
                assert_eq!(new_px[c] & !GROUP_MASK, old_px[c] & !GROUP_MASK);
            }
        }
    }

    #[test]
    fn test_header_bit_layout() {
        let carrier = PixelBuffer::filled(8, 8, [0, 0, 0, 255]);
        // Length 0x00000001, payload 0b11_10_01_00
        let stego = embed(&carrier, &[0xe4]).unwrap().image;
        let groups: Vec<u8> = stego
            .as_bytes()
            .chunks(4)
            .flat_map(|px| px[..3].to_vec())
            .take(20)
            .collect();
        let mut expected = vec![0u8; 15];
        expected.push(1);
        expected.extend_from_slice(&[3, 2, 1, 0]);
        assert_eq!(groups, expected);
        // Pixel 5 holds groups 15..18 in R, G, B
        assert_eq!(&stego.as_bytes()[20..24], &[1, 3, 2, 255]);
    }

    #[test]
    fn test_untouched_channels_after_payload() {
        let carrier = PixelBuffer::filled(8, 8, [0xff, 0xff, 0xff, 0xff]);
        let stego = embed(&carrier, &[0u8]).unwrap().image;
        // 20 groups span pixels 0..=6, the rest keeps its value
        assert!(stego.as_bytes()[28..].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn test_extract_blank_image_fails() {
        let blank = PixelBuffer::filled(10, 10, [0, 0, 0, 255]);
        assert!(matches!(extract(&blank), Err(StegoError::CorruptData(_))));
    }

    #[test]
    fn test_extract_implausible_length_fails() {
        // All-ones low bits decode to length 0xffffffff
        let noisy = PixelBuffer::filled(10, 10, [0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(extract(&noisy), Err(StegoError::CorruptData(_))));
    }

    #[test]
    fn test_extract_tiny_image_fails() {
        let tiny = PixelBuffer::filled(2, 2, [0, 0, 0, 0]);
        assert!(matches!(extract(&tiny), Err(StegoError::CorruptData(_))));
    }

    #[test]
    fn test_empty_payload_rejected() {
        let carrier = gradient(4, 4);
        assert!(matches!(embed(&carrier, &[]), Err(StegoError::EmptyPayload)));
    }

    #[test]
    fn test_pixel_buffer_validates_length() {
        assert!(PixelBuffer::new(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            PixelBuffer::new(2, 2, vec![0; 15]),
            Err(StegoError::Image(_))
        ));
    }

    #[test]
    fn test_capacity_report() {
        let ok = CapacityReport::new(10, 10, 10);
        assert_eq!(ok.status, CapacityStatus::Ok);
        assert_eq!(ok.remaining, 61);

        let warn = CapacityReport::new(10, 10, 60);
        assert_eq!(warn.status, CapacityStatus::Warning);

        let err = CapacityReport::new(10, 10, 80);
        assert_eq!(err.status, CapacityStatus::Error);
        assert_eq!(err.remaining, -9);

        let empty = CapacityReport::new(1, 1, 5);
        assert_eq!(empty.usage_percent, 0.0);
        assert_eq!(empty.status, CapacityStatus::Error);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_048_576), "1 MB");
        assert_eq!(format_bytes(1_234_567), "1.18 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5 GB");
    }

    proptest! {
        /// extract(embed(p, d)) == d whenever d fits p
        #[test]
        fn prop_embed_extract_round_trip(
            width in 1u32..48,
            height in 1u32..48,
            data in proptest::collection::vec(any::<u8>(), 1..1024),
        ) {
            let carrier = gradient(width, height);
            let embedded = embed(&carrier, &data);
            if data.len() > capacity(width, height) {
                let is_capacity_err = matches!(embedded, Err(StegoError::Capacity { .. }));
                prop_assert!(is_capacity_err);
            } else {
                let result = embedded.unwrap();
                prop_assert_eq!(result.embedded_size, data.len() + HEADER_LEN);
                prop_assert_eq!(extract(&result.image).unwrap(), data);
            }
        }

        /// Alpha and the high six bits of every channel are never changed
        #[test]
        fn prop_embed_touches_only_low_bits(
            side in 4u32..32,
            data in proptest::collection::vec(any::<u8>(), 1..32),
        ) {
            let carrier = gradient(side, side);
            let result = embed(&carrier, &data).unwrap();
            for (before, after) in carrier.as_bytes().chunks_exact(4).zip(result.image.as_bytes().chunks_exact(4)) {
                prop_assert_eq!(before[3], after[3]);
                for c in 0..3 {
                    prop_assert_eq!(before[c] & !GROUP_MASK, after[c] & !GROUP_MASK);
                }
            }
        }
    }
}
