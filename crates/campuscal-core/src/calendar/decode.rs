//! Decoding of the portal's UTF-16LE export files.

use thiserror::Error;

/// Little-endian byte order mark.
const BOM_LE: [u8; 2] = [0xFF, 0xFE];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("odd number of bytes ({0}) in UTF-16 data")]
    OddLength(usize),

    #[error("invalid UTF-16 sequence: {0}")]
    InvalidUtf16(#[from] std::char::DecodeUtf16Error),
}

/// Decode UTF-16LE bytes into a UTF-8 string, skipping a leading BOM.
pub fn decode_utf16le(bytes: &[u8]) -> Result<String, DecodeError> {
    let bytes = bytes.strip_prefix(&BOM_LE[..]).unwrap_or(bytes);
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::OddLength(bytes.len()));
    }

    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));

    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(DecodeError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_plain() {
        let bytes = encode("BEGIN:VCALENDAR\r\nSUMMARY:Übung Analysis\r\n");
        assert_eq!(
            decode_utf16le(&bytes).as_deref(),
            Ok("BEGIN:VCALENDAR\r\nSUMMARY:Übung Analysis\r\n")
        );
    }

    #[test]
    fn test_bom_is_ignored() {
        let text = "BEGIN:VEVENT\nLOCATION:S1|01 A1\nEND:VEVENT\n";
        let without = encode(text);
        let mut with = BOM_LE.to_vec();
        with.extend_from_slice(&without);

        assert_eq!(decode_utf16le(&with), decode_utf16le(&without));
        assert_eq!(decode_utf16le(&with).as_deref(), Ok(text));
    }

    #[test]
    fn test_surrogate_pairs() {
        let bytes = encode("📅 Klausur");
        assert_eq!(decode_utf16le(&bytes).as_deref(), Ok("📅 Klausur"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode_utf16le(&[]).as_deref(), Ok(""));
        assert_eq!(decode_utf16le(&BOM_LE).as_deref(), Ok(""));
    }

    #[test]
    fn test_odd_length_is_an_error() {
        let mut bytes = encode("abc");
        bytes.push(0x41);
        assert_eq!(decode_utf16le(&bytes), Err(DecodeError::OddLength(7)));
    }

    #[test]
    fn test_unpaired_surrogate_is_an_error() {
        // A lone high surrogate followed by 'a'
        let bytes = [0x3D, 0xD8, 0x61, 0x00];
        assert!(matches!(
            decode_utf16le(&bytes),
            Err(DecodeError::InvalidUtf16(_))
        ));
    }
}
