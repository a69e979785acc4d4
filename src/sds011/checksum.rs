//! # SDS011 Checksum
//!
//! The sensor uses a plain additive checksum: the low byte of the sum of
//! the covered bytes.

/// Calculate the SDS011 checksum (sum of bytes, mod 256)
///
/// # Arguments
///
/// * `data` - Bytes covered by the checksum (payload only, no head/command/tail)
///
/// # Returns
///
/// * `u8` - Low byte of the sum
///
/// # Examples
///
/// ```
/// use sds011_logger::sds011::checksum::checksum;
///
/// assert_eq!(checksum(&[0x2C, 0x01, 0x48, 0x01, 0x00, 0x00]), 0x76);
/// ```
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &byte| acc.wrapping_add(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), 0x00);
    }

    #[test]
    fn test_checksum_reading_payload() {
        // 0x2C + 0x01 + 0x48 + 0x01 = 0x76
        assert_eq!(checksum(&[0x2C, 0x01, 0x48, 0x01, 0x00, 0x00]), 0x76);
    }

    #[test]
    fn test_checksum_wraps_at_256() {
        assert_eq!(checksum(&[0xFF, 0x01]), 0x00);
        assert_eq!(checksum(&[0xFF, 0xFF]), 0xFE);
    }

    #[test]
    fn test_checksum_matches_wide_sum() {
        let data: Vec<u8> = (0..=255u8).collect();
        let wide: u32 = data.iter().map(|&b| b as u32).sum();
        assert_eq!(checksum(&data), (wide % 256) as u8);
    }
}
