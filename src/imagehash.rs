//! Perceptual image hashing for near-duplicate detection.
//!
//! Computes a 64-bit DCT mean hash: visually similar images produce
//! codes with small Hamming distance, dissimilar images produce codes
//! with large, roughly uniform distance. Codes are stored as base64
//! strings on the submission and issue records.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use img_hash::{HashAlg, HasherConfig};

/// Compute the perceptual hash of raw image bytes.
///
/// The bytes must decode as a supported image format (JPEG, PNG).
/// Returns the 64-bit hash as a base64 string.
pub fn hash_image_bytes(bytes: &[u8]) -> Result<String> {
    let img = img_hash::image::load_from_memory(bytes).context("Failed to decode image bytes")?;

    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::Mean)
        .hash_size(8, 8)
        .preproc_dct()
        .to_hasher();

    let hash = hasher.hash_image(&img);
    Ok(BASE64.encode(hash.as_bytes()))
}

/// Hamming distance between two base64 hash codes.
///
/// Returns `None` if either code fails to decode or the codes have
/// different lengths — callers skip such candidates rather than
/// treating them as matches or errors.
pub fn distance(a: &str, b: &str) -> Option<u32> {
    let a = BASE64.decode(a).ok()?;
    let b = BASE64.decode(b).ok()?;

    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    Some(
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x ^ y).count_ones())
            .sum(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_bits(bytes: [u8; 8]) -> String {
        BASE64.encode(bytes)
    }

    fn png_bytes(width: u32, height: u32, split_vertical: bool) -> Vec<u8> {
        // Half-black / half-white test card; strong structure survives
        // the hasher's internal resampling.
        let img = image::ImageBuffer::from_fn(width, height, |x, y| {
            let dark = if split_vertical {
                x < width / 2
            } else {
                y < height / 2
            };
            image::Luma([if dark { 0u8 } else { 255u8 }])
        });
        let mut bytes: Vec<u8> = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_distance_zero_for_equal_codes() {
        let code = encode_bits([0xAB; 8]);
        assert_eq!(distance(&code, &code), Some(0));
    }

    #[test]
    fn test_distance_counts_differing_bits() {
        let a = encode_bits([0u8; 8]);
        let b = encode_bits([0b0000_0001, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(distance(&a, &b), Some(1));

        let c = encode_bits([0b0001_1111, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(distance(&a, &c), Some(5));

        let d = encode_bits([0xFF; 8]);
        assert_eq!(distance(&a, &d), Some(64));
    }

    #[test]
    fn test_distance_rejects_bad_codes() {
        let code = encode_bits([0u8; 8]);
        assert_eq!(distance("not base64!!!", &code), None);
        assert_eq!(distance(&code, &BASE64.encode([0u8; 4])), None);
    }

    #[test]
    fn test_hash_identical_bytes() {
        let bytes = png_bytes(64, 64, true);
        let h1 = hash_image_bytes(&bytes).unwrap();
        let h2 = hash_image_bytes(&bytes).unwrap();
        assert_eq!(distance(&h1, &h2), Some(0));
    }

    #[test]
    fn test_hash_resolution_invariant() {
        // Same scene at two resolutions hashes nearly identically.
        let small = hash_image_bytes(&png_bytes(64, 64, true)).unwrap();
        let large = hash_image_bytes(&png_bytes(128, 128, true)).unwrap();
        assert!(distance(&small, &large).unwrap() <= 5);
    }

    #[test]
    fn test_hash_distinguishes_different_scenes() {
        let horizontal = hash_image_bytes(&png_bytes(64, 64, true)).unwrap();
        let vertical = hash_image_bytes(&png_bytes(64, 64, false)).unwrap();
        assert!(distance(&horizontal, &vertical).unwrap() > 0);
    }

    #[test]
    fn test_hash_rejects_garbage() {
        assert!(hash_image_bytes(b"definitely not an image").is_err());
    }
}
