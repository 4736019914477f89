use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Archive entry escapes the destination: {0}")]
    InvalidEntry(String),

    #[error("Archive extraction task failed: {0}")]
    TaskFailed(String),

    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported archive layouts, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Tar,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Result<Self, ArchiveError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".tar") {
            Ok(Self::Tar)
        } else {
            Err(ArchiveError::UnsupportedFormat(name))
        }
    }
}

/// Extract `archive` into `dest`, creating `dest` if needed.
pub async fn extract_archive(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let format = ArchiveFormat::from_path(archive)?;
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<(), ArchiveError> {
        fs::create_dir_all(&dest)?;
        let file = File::open(&archive)?;
        match format {
            ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(file), &dest),
            ArchiveFormat::Tar => unpack_tar(file, &dest),
        }
    })
    .await
    .map_err(|e| ArchiveError::TaskFailed(e.to_string()))?
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<(), ArchiveError> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative = sanitize_relative_path(&entry.path()?)?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let dest_path = dest.join(relative);
        if entry.header().entry_type().is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            entry.unpack(&dest_path)?;
        }
    }
    Ok(())
}

/// `path` with `.` components dropped. Absolute paths and `..` are rejected.
pub fn sanitize_relative_path(path: &Path) -> Result<PathBuf, ArchiveError> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(ArchiveError::InvalidEntry(path.display().to_string())),
        }
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn append(builder: &mut tar::Builder<impl std::io::Write>, path: &str, payload: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_size(payload.len() as u64);
        header.set_cksum();
        builder.append_data(&mut header, path, payload).unwrap();
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("zlib.tar.gz")).unwrap(),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("zlib.TGZ")).unwrap(),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("zlib.tar")).unwrap(),
            ArchiveFormat::Tar
        );
        assert!(matches!(
            ArchiveFormat::from_path(Path::new("zlib.7z")),
            Err(ArchiveError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_tar_gz() {
        let temp = TempDir::new().unwrap();
        let archive_path = temp.path().join("pkg.tar.gz");
        {
            let encoder = GzEncoder::new(File::create(&archive_path).unwrap(), Compression::default());
            let mut builder = tar::Builder::new(encoder);
            append(&mut builder, "include/zlib.h", b"#define ZLIB 1\n");
            append(&mut builder, "README", b"zlib\n");
            builder.into_inner().unwrap().finish().unwrap();
        }

        let dest = temp.path().join("out");
        extract_archive(&archive_path, &dest).await.unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("include").join("zlib.h")).unwrap(),
            "#define ZLIB 1\n"
        );
        assert!(dest.join("README").exists());
    }

    #[test]
    fn test_rejects_parent_components() {
        assert!(sanitize_relative_path(Path::new("../etc/passwd")).is_err());
        assert!(sanitize_relative_path(Path::new("/etc/passwd")).is_err());
        assert_eq!(
            sanitize_relative_path(Path::new("./a/b")).unwrap(),
            PathBuf::from("a/b")
        );
    }
}
