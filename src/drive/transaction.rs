//! The upload transaction state machine.
//!
//! Drives one create, part-PUT, complete round against an
//! [`UploadEndpoint`]. [`crate::drive::client::DriveClient`] is the
//! production endpoint; tests drive the machine through a synthetic
//! one, the same way the selector runs against a synthetic ranking
//! source.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

use crate::drive::types::{
    CompleteRequest, CreateWithFoldersRequest, CreateWithFoldersResponse, FileMeta, PartInfo,
};
use crate::drive::upload::{classify_create, CreatePhase, PartSpec};

/// Attempts per part PUT before the whole transaction fails.
const PART_PUT_TRIES: u32 = 3;

/// Minimum file size to show an upload progress bar (20 MiB).
const PROGRESS_THRESHOLD: u64 = 20 * 1024 * 1024;

/// How a finished upload transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Server-side dedup accepted the hash + proof code; no bytes moved.
    Rapid,
    /// All parts streamed and the completion call succeeded.
    Uploaded,
    /// Destination already existed under the refuse policy.
    Refused,
}

/// The three wire calls a transaction needs.
#[async_trait]
pub trait UploadEndpoint {
    /// Create a node; `None` unless the server answered HTTP 201 with a
    /// parseable body.
    async fn create(&self, req: &CreateWithFoldersRequest) -> Option<CreateWithFoldersResponse>;

    /// PUT one part's bytes to its presigned URL.
    async fn put_part(&self, url: &str, body: Vec<u8>) -> bool;

    /// Finalize the upload so the file becomes visible.
    async fn complete(&self, req: &CompleteRequest) -> Option<FileMeta>;
}

/// Run one upload transaction to the end.
///
/// The transaction either short-circuits via rapid upload, streams
/// every part and completes exactly once, or fails whole; no partial
/// state is kept for retry.
pub async fn run<E: UploadEndpoint + Sync>(
    endpoint: &E,
    req: CreateWithFoldersRequest,
    local: &Path,
    size: u64,
    parts: &[PartSpec],
) -> Option<UploadOutcome> {
    let dest = req.name.clone();
    let drive_id = req.drive_id.clone();
    let check_name_mode = req.check_name_mode;

    let create = endpoint.create(&req).await;
    let Some(create) = create else {
        tracing::error!("drive: create {} failed", dest);
        return None;
    };

    match classify_create(&create, check_name_mode) {
        CreatePhase::Refused => {
            tracing::warn!("drive: {} already exists, upload refused", dest);
            Some(UploadOutcome::Refused)
        }
        CreatePhase::Invalid => {
            tracing::error!("drive: no upload id for {}", dest);
            None
        }
        CreatePhase::Rapid => {
            tracing::info!("drive: rapid upload hit for {}", dest);
            Some(UploadOutcome::Rapid)
        }
        CreatePhase::Parts(remote_parts) => {
            upload_parts(endpoint, &dest, local, size, parts, &remote_parts).await?;

            let file_id = create.file_id?;
            let upload_id = create.upload_id?;
            endpoint
                .complete(&CompleteRequest {
                    drive_id,
                    file_id,
                    upload_id,
                })
                .await?;
            Some(UploadOutcome::Uploaded)
        }
    }
}

async fn upload_parts<E: UploadEndpoint + Sync>(
    endpoint: &E,
    dest: &str,
    local: &Path,
    size: u64,
    specs: &[PartSpec],
    remote_parts: &[PartInfo],
) -> Option<()> {
    let mut file = match std::fs::File::open(local) {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("drive: cannot open {}: {}", local.display(), e);
            return None;
        }
    };

    let progress = if size > PROGRESS_THRESHOLD {
        let pb = ProgressBar::new(size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    for remote in remote_parts {
        let Some(spec) = specs.iter().find(|s| s.number == remote.part_number) else {
            tracing::error!(
                "drive: server asked for unknown part {} of {}",
                remote.part_number,
                dest
            );
            return None;
        };
        if remote.upload_url.is_empty() {
            tracing::error!("drive: no upload url for part {} of {}", spec.number, dest);
            return None;
        }

        let chunk = match read_part(&mut file, spec.offset, spec.len as usize) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("drive: reading part {} of {}: {}", spec.number, dest, e);
                return None;
            }
        };

        let mut uploaded = false;
        for _ in 0..PART_PUT_TRIES {
            if endpoint.put_part(&remote.upload_url, chunk.clone()).await {
                uploaded = true;
                break;
            }
        }
        if !uploaded {
            tracing::error!("drive: part {} of {} upload failed", spec.number, dest);
            return None;
        }

        if let Some(ref pb) = progress {
            pb.inc(spec.len);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    Some(())
}

fn read_part(file: &mut std::fs::File, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::types::{CheckNameMode, NodeKind};
    use crate::drive::upload::split_parts;
    use std::sync::Mutex;

    const MIB: u64 = 1024 * 1024;

    /// Synthetic endpoint recording every wire call.
    struct MockEndpoint {
        create_response: CreateWithFoldersResponse,
        /// (url, body length) per PUT attempt.
        puts: Mutex<Vec<(String, usize)>>,
        completes: Mutex<Vec<CompleteRequest>>,
        /// URLs whose PUTs always fail.
        failing_urls: Vec<String>,
    }

    impl MockEndpoint {
        fn new(create_response: CreateWithFoldersResponse) -> Self {
            Self {
                create_response,
                puts: Mutex::new(Vec::new()),
                completes: Mutex::new(Vec::new()),
                failing_urls: Vec::new(),
            }
        }

        fn put_count(&self) -> usize {
            self.puts.lock().unwrap().len()
        }

        fn complete_count(&self) -> usize {
            self.completes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl UploadEndpoint for MockEndpoint {
        async fn create(
            &self,
            _req: &CreateWithFoldersRequest,
        ) -> Option<CreateWithFoldersResponse> {
            Some(self.create_response.clone())
        }

        async fn put_part(&self, url: &str, body: Vec<u8>) -> bool {
            self.puts.lock().unwrap().push((url.to_string(), body.len()));
            !self.failing_urls.iter().any(|u| u == url)
        }

        async fn complete(&self, req: &CompleteRequest) -> Option<FileMeta> {
            self.completes.lock().unwrap().push(req.clone());
            Some(FileMeta {
                file_id: Some(req.file_id.clone()),
                name: None,
                size: None,
            })
        }
    }

    fn request(size: u64, parts: &[PartSpec]) -> CreateWithFoldersRequest {
        CreateWithFoldersRequest {
            drive_id: "drive-1".into(),
            name: "pixiv/7/100_p0.png".into(),
            parent_file_id: "root".into(),
            kind: NodeKind::File,
            check_name_mode: CheckNameMode::Overwrite,
            size: Some(size),
            part_info_list: Some(
                parts
                    .iter()
                    .map(|p| crate::drive::types::PartNumber {
                        part_number: p.number,
                    })
                    .collect(),
            ),
            content_hash_name: None,
            content_hash: None,
            proof_version: None,
            proof_code: None,
        }
    }

    fn part_list(urls: &[&str]) -> Vec<PartInfo> {
        urls.iter()
            .enumerate()
            .map(|(i, url)| PartInfo {
                part_number: (i + 1) as u32,
                upload_url: (*url).to_string(),
            })
            .collect()
    }

    fn sized_file(size: u64) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(size).unwrap();
        file
    }

    #[tokio::test]
    async fn rapid_upload_issues_no_puts_and_no_completion() {
        let endpoint = MockEndpoint::new(CreateWithFoldersResponse {
            file_id: Some("f".into()),
            upload_id: Some("up".into()),
            rapid_upload: true,
            exist: false,
            part_info_list: part_list(&["https://p1"]),
        });
        let file = sized_file(MIB);
        let parts = split_parts(MIB);

        let outcome = run(&endpoint, request(MIB, &parts), file.path(), MIB, &parts).await;

        assert_eq!(outcome, Some(UploadOutcome::Rapid));
        assert_eq!(endpoint.put_count(), 0);
        assert_eq!(endpoint.complete_count(), 0);
    }

    #[tokio::test]
    async fn three_successful_puts_then_exactly_one_completion() {
        let size = 25 * MIB;
        let endpoint = MockEndpoint::new(CreateWithFoldersResponse {
            file_id: Some("f".into()),
            upload_id: Some("up".into()),
            rapid_upload: false,
            exist: false,
            part_info_list: part_list(&["https://p1", "https://p2", "https://p3"]),
        });
        let file = sized_file(size);
        let parts = split_parts(size);

        let outcome = run(&endpoint, request(size, &parts), file.path(), size, &parts).await;

        assert_eq!(outcome, Some(UploadOutcome::Uploaded));
        let puts = endpoint.puts.lock().unwrap();
        let lens: Vec<usize> = puts.iter().map(|(_, len)| *len).collect();
        assert_eq!(
            lens,
            vec![10 * MIB as usize, 10 * MIB as usize, 5 * MIB as usize]
        );
        drop(puts);
        assert_eq!(endpoint.complete_count(), 1);
        let completes = endpoint.completes.lock().unwrap();
        assert_eq!(completes[0].upload_id, "up");
        assert_eq!(completes[0].file_id, "f");
    }

    #[tokio::test]
    async fn failing_part_retries_then_aborts_without_completion() {
        let size = 2 * MIB;
        let mut endpoint = MockEndpoint::new(CreateWithFoldersResponse {
            file_id: Some("f".into()),
            upload_id: Some("up".into()),
            rapid_upload: false,
            exist: false,
            part_info_list: part_list(&["https://p1"]),
        });
        endpoint.failing_urls.push("https://p1".into());
        let file = sized_file(size);
        let parts = split_parts(size);

        let outcome = run(&endpoint, request(size, &parts), file.path(), size, &parts).await;

        assert!(outcome.is_none());
        assert_eq!(endpoint.put_count(), PART_PUT_TRIES as usize);
        assert_eq!(endpoint.complete_count(), 0);
    }

    #[tokio::test]
    async fn refused_create_ends_without_puts() {
        let endpoint = MockEndpoint::new(CreateWithFoldersResponse::default());
        let file = sized_file(MIB);
        let parts = split_parts(MIB);
        let mut req = request(MIB, &parts);
        req.check_name_mode = CheckNameMode::Refuse;

        let outcome = run(&endpoint, req, file.path(), MIB, &parts).await;

        assert_eq!(outcome, Some(UploadOutcome::Refused));
        assert_eq!(endpoint.put_count(), 0);
        assert_eq!(endpoint.complete_count(), 0);
    }

    #[test]
    fn read_part_returns_exact_range() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abcdefghij").unwrap();
        let mut f = std::fs::File::open(file.path()).unwrap();
        assert_eq!(read_part(&mut f, 3, 4).unwrap(), b"defg");
    }
}
