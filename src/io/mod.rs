pub mod output;
pub mod walker;

pub use output::{create_writer, OutputFormat, OutputWriter};
pub use walker::{find_source_files, FileWalker};

use crate::core::{Error, Result};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::fs;
use std::path::Path;

/// File contents as text, with the encoding it was converted from when it was
/// not UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSource {
    pub text: String,
    pub transcoded_from: Option<&'static str>,
}

pub fn read_source(path: &Path) -> Result<DecodedSource> {
    let bytes = fs::read(path).map_err(|e| Error::io_at(e, path))?;
    decode(&bytes).ok_or_else(|| Error::Encoding {
        path: path.to_path_buf(),
        message: "contains NUL bytes; treated as binary".into(),
    })
}

/// UTF-8 first, then a UTF-16 byte order mark, then Windows-1252. Returns
/// `None` for binary content.
pub fn decode(bytes: &[u8]) -> Option<DecodedSource> {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        if text.contains('\0') {
            return None;
        }
        return Some(DecodedSource {
            text: text.into_owned(),
            transcoded_from: (encoding != UTF_8).then(|| encoding.name()),
        });
    }

    if bytes.contains(&0) {
        return None;
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Some(DecodedSource {
            text: text.to_string(),
            transcoded_from: None,
        }),
        Err(_) => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            Some(DecodedSource {
                text: text.into_owned(),
                transcoded_from: Some(WINDOWS_1252.name()),
            })
        }
    }
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io_at(e, parent))?;
    }
    fs::write(path, content).map_err(|e| Error::io_at(e, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_passes_through() {
        let decoded = decode("<?php echo 'héllo';".as_bytes()).unwrap();
        assert_eq!(decoded.text, "<?php echo 'héllo';");
        assert_eq!(decoded.transcoded_from, None);
    }

    #[test]
    fn test_latin1_bytes_are_transcoded() {
        let decoded = decode(b"<?php echo 'caf\xe9';").unwrap();
        assert_eq!(decoded.text, "<?php echo 'café';");
        assert_eq!(decoded.transcoded_from, Some("windows-1252"));
    }

    #[test]
    fn test_utf16_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<?php".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.text, "<?php");
        assert_eq!(decoded.transcoded_from, Some("UTF-16LE"));
    }

    #[test]
    fn test_utf8_bom_is_stripped_without_warning() {
        let decoded = decode(b"\xEF\xBB\xBF<?php").unwrap();
        assert_eq!(decoded.text, "<?php");
        assert_eq!(decoded.transcoded_from, None);
    }

    #[test]
    fn test_nul_bytes_mean_binary() {
        assert!(decode(b"GIF89a\x00\x01").is_none());
    }

    #[test]
    fn test_read_source_reports_missing_file() {
        let err = read_source(Path::new("/definitely/not/here.php")).unwrap_err();
        assert!(matches!(err, Error::FileSystem { .. }));
    }
}
