//! Fixtures shared by the unit tests.

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::sdk::downloader::{ArchiveSource, ProgressFn};

/// Stand-in `bin/flutter`: logs its arguments to `invocations.log` in the
/// current directory and fails with exit code 7 when the first argument is
/// `fail`.
pub const FAKE_FLUTTER_SCRIPT: &str = "#!/bin/sh\n\
echo \"$*\" >> invocations.log\n\
if [ \"$1\" = \"fail\" ]; then\n\
  exit 7\n\
fi\n\
exit 0\n";

/// Builds an in-memory `.tar.xz` from `(path, data, mode)` entries.
pub fn tar_xz(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    tar_xz_with_links(entries, &[])
}

/// Kind of link entry in a test tar archive.
#[derive(Debug, Clone, Copy)]
pub enum TarLink {
    Symbolic,
    Hard,
}

/// Builds an in-memory `.tar.xz`: files first, then `(kind, path, target)`
/// link entries.
pub fn tar_xz_with_links(
    files: &[(&str, &[u8], u32)],
    links: &[(TarLink, &str, &str)],
) -> Vec<u8> {
    let encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    let mut builder = tar::Builder::new(encoder);

    for (name, data, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder.append(&header, *data).unwrap();
    }

    for (kind, name, target) in links {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(match kind {
            TarLink::Symbolic => tar::EntryType::Symlink,
            TarLink::Hard => tar::EntryType::Link,
        });
        header.set_size(0);
        header.set_mode(0o777);
        builder.append_link(&mut header, name, target).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// Builds an in-memory `.zip` from `(path, data)` entries, all marked 0755.
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    zip_with_symlinks(entries, &[])
}

/// Builds an in-memory `.zip`: files first, then `(path, target)` symlinks.
pub fn zip_with_symlinks(files: &[(&str, &[u8])], symlinks: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o755);

    for (name, data) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }

    for (name, target) in symlinks {
        zip.add_symlink(*name, *target, options).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// A Linux-style SDK archive with a working fake executable.
pub fn flutter_tar_xz() -> Vec<u8> {
    tar_xz(&[
        ("flutter/version", b"1.7.8", 0o644),
        ("flutter/bin/flutter", FAKE_FLUTTER_SCRIPT.as_bytes(), 0o755),
    ])
}

/// A macOS-style SDK archive with a working fake executable.
pub fn flutter_zip() -> Vec<u8> {
    zip_archive(&[
        ("flutter/version", b"3.7.8"),
        ("flutter/bin/flutter", FAKE_FLUTTER_SCRIPT.as_bytes()),
    ])
}

/// Serves a fixed body (or a failure) and records every requested URL.
pub struct FakeSource {
    body: std::result::Result<Vec<u8>, String>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn serving(body: Vec<u8>) -> Self {
        Self {
            body: Ok(body),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Writes a few bytes, then fails like a dropped connection.
    pub fn failing(message: &str) -> Self {
        Self {
            body: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveSource for FakeSource {
    async fn fetch(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        _progress_cb: ProgressFn<'_>,
    ) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());

        match &self.body {
            Ok(body) => {
                sink.write_all(body).await?;
                sink.flush().await?;
                Ok(body.len() as u64)
            }
            Err(message) => {
                sink.write_all(b"partial").await?;
                anyhow::bail!("{}", message)
            }
        }
    }
}
