//! SPIR-V blob loading.
//!
//! Shaders are compiled out-of-band (see `shaders/`) and loaded here as
//! opaque byte blobs, validated just enough to keep garbage away from the
//! driver.

use std::path::Path;

use crate::error::RenderError;

/// First word of every SPIR-V module.
const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Load a SPIR-V blob from disk and convert it to little-endian words.
pub fn load_spirv(path: &Path) -> Result<Vec<u32>, RenderError> {
    let bytes = std::fs::read(path)
        .map_err(|e| RenderError::Shader(format!("failed to read {}: {}", path.display(), e)))?;
    words_from_bytes(&bytes)
        .map_err(|msg| RenderError::Shader(format!("{}: {}", path.display(), msg)))
}

/// Convert raw bytes to SPIR-V words, checking alignment and magic number.
pub fn words_from_bytes(bytes: &[u8]) -> Result<Vec<u32>, String> {
    if bytes.is_empty() {
        return Err("empty blob".to_string());
    }
    if bytes.len() % 4 != 0 {
        return Err(format!("length {} is not a multiple of 4", bytes.len()));
    }

    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    if words[0] != SPIRV_MAGIC {
        return Err(format!("bad magic number {:#010x}", words[0]));
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spirv_header() -> Vec<u8> {
        // Magic, version 1.0, generator 0, bound 1, schema 0.
        let words: [u32; 5] = [SPIRV_MAGIC, 0x0001_0000, 0, 1, 0];
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_valid_header_round_trips() {
        let bytes = spirv_header();
        let words = words_from_bytes(&bytes).unwrap();
        assert_eq!(words.len(), 5);
        assert_eq!(words[0], SPIRV_MAGIC);
    }

    #[test]
    fn test_rejects_empty_blob() {
        assert!(words_from_bytes(&[]).is_err());
    }

    #[test]
    fn test_rejects_misaligned_length() {
        let mut bytes = spirv_header();
        bytes.push(0);
        let err = words_from_bytes(&bytes).unwrap_err();
        assert!(err.contains("multiple of 4"), "got: {}", err);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = spirv_header();
        bytes[0] = 0xff;
        let err = words_from_bytes(&bytes).unwrap_err();
        assert!(err.contains("magic"), "got: {}", err);
    }

    #[test]
    fn test_load_spirv_missing_file() {
        let err = load_spirv(Path::new("definitely/not/here.spv")).unwrap_err();
        match err {
            RenderError::Shader(msg) => assert!(msg.contains("not/here.spv")),
            other => panic!("expected shader error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_spirv_from_disk() {
        let dir = std::env::temp_dir();
        let path = dir.join("orrery_shader_test.spv");
        std::fs::write(&path, spirv_header()).unwrap();
        let words = load_spirv(&path).unwrap();
        assert_eq!(words[0], SPIRV_MAGIC);
        let _ = std::fs::remove_file(&path);
    }
}
