//! Fixed-width reference codec.
//!
//! References are `bytes32` on-chain: text left-justified and null-padded.
//! Encoding truncates past 32 bytes; decoding never fails.

use alloy_primitives::B256;

/// Width of an on-chain reference.
pub const REFERENCE_LEN: usize = 32;

/// Encode `text` as a left-justified, null-padded 32-byte value.
/// Input longer than 32 bytes is truncated.
pub fn encode(text: &str) -> B256 {
    let mut out = [0u8; REFERENCE_LEN];
    let bytes = text.as_bytes();
    let n = bytes.len().min(REFERENCE_LEN);
    out[..n].copy_from_slice(&bytes[..n]);
    B256::from(out)
}

/// Decode a 32-byte reference into text, stripping trailing null bytes.
/// Returns an empty string when the bytes are not valid UTF-8.
pub fn decode(value: &B256) -> String {
    let bytes = value.as_slice();
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    match std::str::from_utf8(&bytes[..end]) {
        Ok(text) => text.to_owned(),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trip() {
        let full = "x".repeat(32);
        for s in ["", "J", "JOB-1", "invoice #2024/03 milestone two", full.as_str()] {
            assert_eq!(decode(&encode(s)), s, "round trip failed for {s:?}");
        }
    }

    #[test]
    fn encode_left_justifies_and_pads() {
        let v = encode("AB");
        assert_eq!(v[0], b'A');
        assert_eq!(v[1], b'B');
        assert!(v[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn long_input_is_truncated() {
        let long = "y".repeat(40);
        assert_eq!(decode(&encode(&long)), "y".repeat(32));
    }

    #[test]
    fn truncation_inside_a_multibyte_char_degrades_to_empty() {
        // 31 ASCII bytes + a 2-byte char: the cut leaves a dangling lead byte.
        let s = format!("{}é", "a".repeat(31));
        assert_eq!(decode(&encode(&s)), "");
    }

    #[test]
    fn non_utf8_decodes_to_empty() {
        let mut raw = [0u8; 32];
        raw[0] = 0xff;
        raw[1] = 0xfe;
        assert_eq!(decode(&B256::from(raw)), "");
    }

    #[test]
    fn zero_reference_is_empty() {
        assert_eq!(decode(&B256::ZERO), "");
    }
}
