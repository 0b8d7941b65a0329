//! Character set dictionary
//!
//! Maps MySQL charset names to an encoder. Not every MySQL charset has
//! one: a name missing from the table is unsupported, and a present name
//! with no encoder (utf8 flavors, ascii, binary) passes bytes through
//! untouched.

use encoding_rs::Encoding;

/// Look up the encoder for a MySQL charset name.
///
/// - `None`: the charset is not supported.
/// - `Some(None)`: supported with a trivial (pass-through) encoding.
/// - `Some(Some(encoding))`: supported via the returned encoder.
pub fn charset_encoding(name: &str) -> Option<Option<&'static Encoding>> {
    Some(match name {
        "koi8r" => Some(encoding_rs::KOI8_R),
        "latin1" => Some(encoding_rs::WINDOWS_1252),
        "latin2" => Some(encoding_rs::ISO_8859_2),
        "ascii" => None,
        "hebrew" => Some(encoding_rs::ISO_8859_8),
        "greek" => Some(encoding_rs::ISO_8859_7),
        "cp1250" => Some(encoding_rs::WINDOWS_1250),
        "gbk" => Some(encoding_rs::GBK),
        "latin5" => Some(encoding_rs::WINDOWS_1254),
        "utf8" | "utf8mb3" | "utf8mb4" | "binary" => None,
        "cp866" => Some(encoding_rs::IBM866),
        "latin7" => Some(encoding_rs::ISO_8859_13),
        "cp1251" => Some(encoding_rs::WINDOWS_1251),
        "cp1256" => Some(encoding_rs::WINDOWS_1256),
        "cp1257" => Some(encoding_rs::WINDOWS_1257),
        // cp850, cp852 and everything else have no encoder here.
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trivial_charsets() {
        for name in ["utf8", "utf8mb3", "utf8mb4", "binary", "ascii"] {
            assert_eq!(charset_encoding(name), Some(None), "{name}");
        }
    }

    #[test]
    fn test_mapped_charsets() {
        assert_eq!(
            charset_encoding("cp1250"),
            Some(Some(encoding_rs::WINDOWS_1250))
        );
        assert_eq!(charset_encoding("gbk"), Some(Some(encoding_rs::GBK)));
        assert_eq!(charset_encoding("latin1"), Some(Some(encoding_rs::WINDOWS_1252)));
    }

    #[test]
    fn test_unsupported_charsets() {
        assert_eq!(charset_encoding("cp850"), None);
        assert_eq!(charset_encoding("cp852"), None);
        assert_eq!(charset_encoding("not-a-charset"), None);
    }

    #[test]
    fn test_gbk_encodes() {
        let encoding = charset_encoding("gbk").unwrap().unwrap();
        let (encoded, _, had_errors) = encoding.encode("中");
        assert!(!had_errors);
        assert_eq!(encoded.as_ref(), &[0xd6, 0xd0]);
    }
}
