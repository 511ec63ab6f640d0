//! Content-addressed upload protocol pieces.
//!
//! Pure building blocks of the upload transaction: part splitting, the
//! whole-file SHA-1 content hash, the proof code derived from the access
//! token, and classification of the create response. The network side
//! lives in [`crate::drive::client`].

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use md5::{Digest, Md5};
use sha1::Sha1;

use crate::drive::types::{CheckNameMode, CreateWithFoldersResponse, PartInfo};

/// Fixed part size used for multi-part uploads (10 MiB).
pub const PART_SIZE: u64 = 10 * 1024 * 1024;

/// One part's byte range within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpec {
    /// 1-based part number.
    pub number: u32,
    pub offset: u64,
    pub len: u64,
}

/// Split a file of `size` bytes into fixed-size parts.
///
/// Every file gets at least one part, so a zero-byte file still uploads
/// as a single empty part.
pub fn split_parts(size: u64) -> Vec<PartSpec> {
    let count = size.div_ceil(PART_SIZE).max(1);
    (0..count)
        .map(|i| {
            let offset = i * PART_SIZE;
            PartSpec {
                number: (i + 1) as u32,
                offset,
                len: (size - offset).min(PART_SIZE),
            }
        })
        .collect()
}

/// Whole-file SHA-1 content hash as uppercase hex.
pub fn file_sha1(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:X}", hasher.finalize()))
}

/// Proof code: 8 bytes read from a token-derived offset, base64-encoded.
///
/// The offset is the first 16 hex nibbles of `md5(access_token)` taken
/// modulo the file size, which lets the server verify possession of both
/// the token and the bytes without a transfer. Empty files have an empty
/// proof code.
pub fn proof_code(access_token: &str, path: &Path) -> std::io::Result<String> {
    let size = path.metadata()?.len();
    if size == 0 {
        return Ok(String::new());
    }

    let digest = Md5::digest(access_token.as_bytes());
    let hex = format!("{:x}", digest);
    // First 16 nibbles of a 32-nibble digest always parse as u64.
    let prefix = u64::from_str_radix(&hex[..16], 16).unwrap_or(0);
    let start = prefix % size;

    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let mut buf = [0u8; 8];
    let mut read = 0;
    while read < 8 {
        let n = file.read(&mut buf[read..])?;
        if n == 0 {
            break;
        }
        read += n;
    }

    Ok(BASE64.encode(&buf[..read]))
}

/// Outcome of classifying a create response for a file node.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatePhase {
    /// Same-name node exists and the policy was refuse; not an error.
    Refused,
    /// Server already holds the content; the transaction is complete.
    Rapid,
    /// Parts must be uploaded to these presigned URLs.
    Parts(Vec<PartInfo>),
    /// The response is missing an upload id it should have carried.
    Invalid,
}

/// Decide the next phase of a file-upload transaction from the create
/// response.
pub fn classify_create(res: &CreateWithFoldersResponse, mode: CheckNameMode) -> CreatePhase {
    match res.upload_id.as_deref() {
        None | Some("") => {
            if mode == CheckNameMode::Refuse {
                CreatePhase::Refused
            } else {
                CreatePhase::Invalid
            }
        }
        Some(_) if res.rapid_upload => CreatePhase::Rapid,
        Some(_) => CreatePhase::Parts(res.part_info_list.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn part_count_is_ceil_with_min_one() {
        assert_eq!(split_parts(0).len(), 1);
        assert_eq!(split_parts(1).len(), 1);
        assert_eq!(split_parts(PART_SIZE).len(), 1);
        assert_eq!(split_parts(PART_SIZE + 1).len(), 2);
        assert_eq!(split_parts(25 * MIB).len(), 3);
    }

    #[test]
    fn part_ranges_cover_file_exactly() {
        for size in [0, 1, PART_SIZE - 1, PART_SIZE, 25 * MIB, 30 * MIB] {
            let parts = split_parts(size);
            let total: u64 = parts.iter().map(|p| p.len).sum();
            assert_eq!(total, size, "size {}", size);
            for (i, p) in parts.iter().enumerate() {
                assert_eq!(p.number as usize, i + 1);
                assert_eq!(p.offset, i as u64 * PART_SIZE);
            }
        }
    }

    #[test]
    fn twenty_five_mib_splits_ten_ten_five() {
        let parts = split_parts(25 * MIB);
        assert_eq!(parts[0].len, 10 * MIB);
        assert_eq!(parts[1].len, 10 * MIB);
        assert_eq!(parts[2].len, 5 * MIB);
    }

    #[test]
    fn sha1_of_empty_file_is_known_constant() {
        let file = NamedTempFile::new().unwrap();
        assert_eq!(
            file_sha1(file.path()).unwrap(),
            "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709"
        );
    }

    #[test]
    fn proof_code_is_deterministic() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"some file content for proof").unwrap();

        let a = proof_code("token-123", file.path()).unwrap();
        let b = proof_code("token-123", file.path()).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn proof_code_of_empty_file_is_empty() {
        let file = NamedTempFile::new().unwrap();
        assert_eq!(proof_code("any-token", file.path()).unwrap(), "");
    }

    #[test]
    fn proof_code_of_single_byte_file_ignores_token() {
        // Any offset modulo 1 is 0, so the code is always base64 of the
        // one byte.
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"A").unwrap();

        assert_eq!(proof_code("tok-a", file.path()).unwrap(), "QQ==");
        assert_eq!(proof_code("tok-b", file.path()).unwrap(), "QQ==");
    }

    #[test]
    fn proof_code_reads_a_slice_of_the_file() {
        let content = b"0123456789abcdef0123456789abcdef";
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();

        let code = proof_code("another token", file.path()).unwrap();
        let decoded = BASE64.decode(code).unwrap();
        assert!(decoded.len() <= 8 && !decoded.is_empty());
        assert!(content
            .windows(decoded.len())
            .any(|w| w == decoded.as_slice()));
    }

    #[test]
    fn missing_upload_id_refuses_or_invalidates_by_mode() {
        let res = CreateWithFoldersResponse::default();
        assert_eq!(
            classify_create(&res, CheckNameMode::Refuse),
            CreatePhase::Refused
        );
        assert_eq!(
            classify_create(&res, CheckNameMode::Overwrite),
            CreatePhase::Invalid
        );
    }

    #[test]
    fn rapid_upload_short_circuits_before_parts() {
        let res = CreateWithFoldersResponse {
            upload_id: Some("up".into()),
            rapid_upload: true,
            part_info_list: vec![PartInfo {
                part_number: 1,
                upload_url: "https://part".into(),
            }],
            ..Default::default()
        };
        assert_eq!(
            classify_create(&res, CheckNameMode::Overwrite),
            CreatePhase::Rapid
        );
    }

    #[test]
    fn pending_parts_are_returned_in_order() {
        let res = CreateWithFoldersResponse {
            upload_id: Some("up".into()),
            part_info_list: vec![
                PartInfo {
                    part_number: 1,
                    upload_url: "https://p1".into(),
                },
                PartInfo {
                    part_number: 2,
                    upload_url: "https://p2".into(),
                },
            ],
            ..Default::default()
        };
        match classify_create(&res, CheckNameMode::Overwrite) {
            CreatePhase::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[1].part_number, 2);
            }
            other => panic!("expected parts, got {:?}", other),
        }
    }
}
