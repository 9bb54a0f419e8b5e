use crate::config::Encoding;
use std::borrow::Cow;

/// Text decoded from raw file content, along with the encoding that decoded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: Encoding,
}

impl Encoding {
    /// Decode `bytes` strictly, returning `None` if they aren't valid in this encoding.
    ///
    /// Latin-1 refuses the C1 control range `0x80..0xA0` so that text written with a Windows code page
    /// isn't silently taken for control characters.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => encoding_rs::UTF_8
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned),
            Encoding::Latin1 => bytes
                .iter()
                .all(|b| !(0x80..0xa0).contains(b))
                .then(|| bytes.iter().copied().map(char::from).collect()),
            Encoding::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(Cow::into_owned),
        }
    }
}

/// Try each of `candidates` in order and return the result of the first one to decode `bytes`,
/// or `None` if none of them could.
pub fn decode(bytes: &[u8], candidates: &[Encoding]) -> Option<Decoded> {
    candidates.iter().find_map(|&encoding| {
        encoding.decode(bytes).map(|mut text| {
            if encoding == Encoding::Utf8 && text.starts_with('\u{feff}') {
                text.remove(0);
            }
            Decoded { text, encoding }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[Encoding] = &[Encoding::Utf8, Encoding::Latin1, Encoding::Windows1252];

    #[test]
    fn first_candidate_that_decodes_wins() {
        let utf8 = decode("Peña".as_bytes(), ALL).unwrap();
        assert_eq!(utf8.encoding, Encoding::Utf8);
        assert_eq!(utf8.text, "Peña");

        let latin1 = decode(b"Pe\xf1a", ALL).unwrap();
        assert_eq!(latin1.encoding, Encoding::Latin1);
        assert_eq!(latin1.text, "Peña");

        let windows = decode(b"\x80 100", ALL).unwrap();
        assert_eq!(windows.encoding, Encoding::Windows1252);
        assert_eq!(windows.text, "€ 100");
    }

    #[test]
    fn utf8_byte_order_mark_is_dropped() {
        let decoded = decode(b"\xef\xbb\xbfcod_emp;x", ALL).unwrap();
        assert_eq!(decoded.text, "cod_emp;x");
    }

    #[test]
    fn no_candidate_decodes() {
        assert_eq!(decode(b"Pe\xf1a", &[Encoding::Utf8]), None);
        assert_eq!(decode(b"Pe\xf1a", &[]), None);
    }
}
