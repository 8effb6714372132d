//! Raw DEFLATE (no zlib/gzip wrapper), and the no-compression extension gate.

use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress};
use std::io::Write;

use crate::error::IpfError;

/// Extensions that bypass both compression and encryption entirely
/// (case-insensitive match on the entry's `path`).
const NO_COMPRESSION_EXTENSIONS: &[&str] = &["jpg", "jpeg", "fsb", "mp3"];

pub fn skips_compression(path: &str) -> bool {
    match path.rsplit_once('.') {
        Some((_, ext)) => NO_COMPRESSION_EXTENSIONS
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

pub fn compress(data: &[u8]) -> Result<Vec<u8>, IpfError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

pub fn decompress(data: &[u8], size_hint: usize) -> Result<Vec<u8>, IpfError> {
    let mut out = Vec::with_capacity(size_hint);
    let mut decompressor = Decompress::new(false);
    decompressor
        .decompress_vec(data, &mut out, FlushDecompress::Finish)
        .map_err(|_| IpfError::EncryptionMismatch("raw DEFLATE decode failed".to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let data = b"hello hello hello world world world".to_vec();
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn empty_round_trips() {
        let compressed = compress(&[]).unwrap();
        let decompressed = decompress(&compressed, 0).unwrap();
        assert!(decompressed.is_empty());
    }

    #[test]
    fn no_compression_extensions_are_case_insensitive() {
        assert!(skips_compression("sound/effect.MP3"));
        assert!(skips_compression("textures/a.Jpg"));
        assert!(skips_compression("audio/track.fsb"));
        assert!(!skips_compression("data/table.ies"));
        assert!(!skips_compression("noext"));
    }

    #[test]
    fn garbage_input_fails_to_decompress() {
        let garbage = vec![0xFFu8; 16];
        assert!(decompress(&garbage, 16).is_err());
    }
}
