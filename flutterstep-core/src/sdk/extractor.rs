//! Archive extraction for downloaded SDK packages.
//!
//! Handles the two formats the SDK is published in (zip, tar.xz), from a file
//! on disk or from a buffer in memory. Unix executable bits are kept, and
//! links are restored as long as they stay inside the extraction root.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use super::types::ArchiveFormat;

// ============================================================================
// Archive Extraction
// ============================================================================

/// Extracts an archive file to a destination directory.
///
/// # Arguments
///
/// * `archive_path` - Path to the archive file.
/// * `dest_dir` - Directory to extract into.
/// * `format` - The archive format.
///
/// # Errors
///
/// Returns an error if extraction fails.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path, format: ArchiveFormat) -> Result<()> {
    info!(
        "Extracting {:?} archive {} to {}",
        format,
        archive_path.display(),
        dest_dir.display()
    );

    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;

    extract_reader(file, dest_dir, format)
}

/// Extracts an archive held in memory to a destination directory.
pub fn extract_archive_bytes(bytes: &[u8], dest_dir: &Path, format: ArchiveFormat) -> Result<()> {
    info!(
        "Extracting {:?} archive ({} bytes in memory) to {}",
        format,
        bytes.len(),
        dest_dir.display()
    );

    extract_reader(Cursor::new(bytes), dest_dir, format)
}

fn extract_reader<R: Read + Seek>(reader: R, dest_dir: &Path, format: ArchiveFormat) -> Result<()> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    match format {
        ArchiveFormat::Zip => extract_zip(reader, dest_dir).context("Failed to extract zip archive"),
        ArchiveFormat::TarXz => {
            let decoder = xz2::read::XzDecoder::new(BufReader::new(reader));
            extract_tar(decoder, dest_dir).context("Failed to extract tar.xz archive")
        }
    }
}

// ============================================================================
// ZIP Extraction
// ============================================================================

/// `S_IFMT` and `S_IFLNK` bits of a Unix mode.
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

fn extract_zip<R: Read + Seek>(reader: R, dest_dir: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(reader).context("Failed to read zip")?;
    let root = canonical_root(dest_dir)?;
    let mut skipped = 0usize;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            debug!("Skipping unsafe path in zip");
            skipped += 1;
            continue;
        };
        let Some(dest_path) = resolve_entry_path(&root, &relative)? else {
            warn!("Skipping unsafe path in zip: {:?}", relative);
            skipped += 1;
            continue;
        };

        let mode = entry.unix_mode();
        if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .with_context(|| format!("Failed to read link target of {:?}", relative))?;
            if !restore_symlink(&root, &dest_path, Path::new(&target))? {
                skipped += 1;
            }
        } else if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            remove_existing_link(&dest_path)?;
            let mut outfile = File::create(&dest_path)
                .with_context(|| format!("Failed to create: {}", dest_path.display()))?;

            io::copy(&mut entry, &mut outfile)?;

            #[cfg(unix)]
            set_unix_permissions(&dest_path, mode)?;
        }
    }

    if skipped > 0 {
        warn!("Skipped {} zip entries during extraction", skipped);
    }

    debug!("ZIP extraction complete");
    Ok(())
}

// ============================================================================
// TAR Extraction
// ============================================================================

fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    let root = canonical_root(dest_dir)?;
    let mut skipped = 0usize;

    for entry_result in archive.entries().context("Failed to read tar entries")? {
        let mut entry = entry_result.context("Failed to read tar entry")?;
        let entry_type = entry.header().entry_type();

        let relative = entry.path()?.into_owned();
        let Some(dest_path) = resolve_entry_path(&root, &relative)? else {
            warn!("Skipping unsafe path in tar: {:?}", relative);
            skipped += 1;
            continue;
        };

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            let Some(target) = entry.link_name()?.map(|t| t.into_owned()) else {
                warn!("Skipping link without target in tar: {:?}", relative);
                skipped += 1;
                continue;
            };

            let restored = if entry_type.is_symlink() {
                restore_symlink(&root, &dest_path, &target)?
            } else {
                restore_hard_link(&root, &dest_path, &target)?
            };
            if !restored {
                skipped += 1;
            }
        } else if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry_type.is_file() {
            remove_existing_link(&dest_path)?;
            let mut outfile = File::create(&dest_path)
                .with_context(|| format!("Failed to create: {}", dest_path.display()))?;
            io::copy(&mut entry, &mut outfile)?;
            outfile.flush()?;

            #[cfg(unix)]
            set_unix_permissions(&dest_path, entry.header().mode().ok())?;
        }
    }

    if skipped > 0 {
        warn!("Skipped {} tar entries during extraction", skipped);
    }

    debug!("TAR extraction complete");
    Ok(())
}

// ============================================================================
// Path Safety
// ============================================================================

fn canonical_root(dest_dir: &Path) -> Result<PathBuf> {
    dest_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", dest_dir.display()))
}

/// Maps an archive entry path onto the extraction root.
///
/// Returns `None` for absolute paths, `..` components, or anything whose
/// resolved parent lands outside `root`. Parent directories are created.
fn resolve_entry_path(root: &Path, relative: &Path) -> Result<Option<PathBuf>> {
    if relative.is_absolute() || relative.components().any(|c| c == Component::ParentDir) {
        return Ok(None);
    }

    let dest_path = root.join(relative);
    let Some(parent) = dest_path.parent() else {
        return Ok(None);
    };

    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let parent = parent.canonicalize()?;
    if !parent.starts_with(root) {
        return Ok(None);
    }

    match dest_path.file_name() {
        Some(name) => Ok(Some(parent.join(name))),
        None => Ok(None),
    }
}

/// Returns true if a symlink at `link_path` pointing to `target` resolves
/// inside `root`.
///
/// `link_path` must already have a canonical parent (see
/// [`resolve_entry_path`]). Absolute targets are never accepted.
fn link_stays_inside(root: &Path, link_path: &Path, target: &Path) -> bool {
    if target.is_absolute() {
        return false;
    }
    let Some(mut resolved) = link_path.parent().map(Path::to_path_buf) else {
        return false;
    };

    for component in target.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() || !resolved.starts_with(root) {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }

    resolved.starts_with(root)
}

/// Removes a symlink left at `path` by an earlier entry so that writing a
/// file there cannot follow it.
fn remove_existing_link(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(path)
            .with_context(|| format!("Failed to replace link: {}", path.display())),
        _ => Ok(()),
    }
}

/// Creates a symlink entry. Returns `false` if it was skipped.
fn restore_symlink(root: &Path, link_path: &Path, target: &Path) -> Result<bool> {
    if !link_stays_inside(root, link_path, target) {
        warn!(
            "Skipping link {} -> {}: target is outside the archive",
            link_path.display(),
            target.display()
        );
        return Ok(false);
    }

    remove_existing_link(link_path)?;
    create_symlink(target, link_path)
}

#[cfg(unix)]
fn create_symlink(target: &Path, link_path: &Path) -> Result<bool> {
    std::os::unix::fs::symlink(target, link_path).with_context(|| {
        format!(
            "Failed to create link {} -> {}",
            link_path.display(),
            target.display()
        )
    })?;
    Ok(true)
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, link_path: &Path) -> Result<bool> {
    warn!(
        "Skipping link {} -> {}: not supported on this platform",
        link_path.display(),
        target.display()
    );
    Ok(false)
}

/// Creates a hard link entry. Tar stores hard link targets relative to the
/// archive root. Returns `false` if it was skipped.
fn restore_hard_link(root: &Path, link_path: &Path, target: &Path) -> Result<bool> {
    let Some(source) = resolve_entry_path(root, target)? else {
        warn!("Skipping hard link to unsafe path: {:?}", target);
        return Ok(false);
    };

    let source_inside = source
        .canonicalize()
        .map(|real| real.starts_with(root))
        .unwrap_or(false);
    if !source_inside {
        warn!(
            "Skipping hard link {} -> {}: target is missing or outside the archive",
            link_path.display(),
            target.display()
        );
        return Ok(false);
    }

    remove_existing_link(link_path)?;
    fs::hard_link(&source, link_path).with_context(|| {
        format!(
            "Failed to create hard link {} -> {}",
            link_path.display(),
            source.display()
        )
    })?;
    Ok(true)
}

// ============================================================================
// Unix Permissions
// ============================================================================

#[cfg(unix)]
fn set_unix_permissions(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if mode & 0o111 != 0 {
            let permissions = fs::Permissions::from_mode(mode | 0o755);
            fs::set_permissions(path, permissions)
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }
    }

    Ok(())
}

/// Sets executable permission on a file (Unix only).
///
/// On Windows, this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to get metadata for {}", path.display()))?;

        let mut permissions = metadata.permissions();
        let current_mode = permissions.mode();
        permissions.set_mode(current_mode | 0o755);

        fs::set_permissions(path, permissions).with_context(|| {
            format!("Failed to set executable permission on {}", path.display())
        })?;

        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}
