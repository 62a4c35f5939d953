use anyhow::{Result, bail};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

/// Extensions accepted for uploads, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "gif", "webp"];

/// Upper bound on `_N` suffixes tried for one name.
const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Manages on-disk storage for uploaded reports.
///
/// Files live flat in one directory under their sanitized client name.
/// Names never collide: a taken name gets a `_1`, `_2`, ... suffix before
/// the extension.
pub struct Storage {
    dir: PathBuf,
}

#[derive(Debug)]
pub struct StoredFile {
    /// The name actually used on disk, after collision avoidance.
    pub filename: String,
    pub size: u64,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Write `data` under `filename`, or under the first free suffixed
    /// variant of it.
    ///
    /// Each candidate is claimed with an exclusive create, so two concurrent
    /// uploads of the same name can never overwrite each other.
    pub async fn save_unique(&self, filename: &str, data: &[u8]) -> Result<StoredFile> {
        fs::create_dir_all(&self.dir).await?;
        let (base, ext) = split_extension(filename);

        for n in 0..=MAX_COLLISION_SUFFIX {
            let candidate = if n == 0 {
                filename.to_string()
            } else {
                format!("{}_{}{}", base, n, ext)
            };
            let path = self.file_path(&candidate);

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            let written = async {
                file.write_all(data).await?;
                file.flush().await
            }
            .await;

            if let Err(e) = written {
                drop(file);
                // Don't leave a truncated file holding the name.
                fs::remove_file(&path).await.ok();
                return Err(e.into());
            }

            if n > 0 {
                debug!("{} was taken, stored as {}", filename, candidate);
            }
            return Ok(StoredFile {
                filename: candidate,
                size: data.len() as u64,
            });
        }

        bail!(
            "No free name for {} after {} attempts",
            filename,
            MAX_COLLISION_SUFFIX
        )
    }

    /// Open a stored file for reading. `None` if it is not on disk.
    pub async fn open(&self, filename: &str) -> Result<Option<fs::File>> {
        match fs::File::open(self.file_path(filename)).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn delete_file(&self, filename: &str) -> Result<()> {
        let path = self.file_path(filename);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted stored file {}", filename);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Stored file {} already gone", filename);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// True if `filename` has an extension from [`ALLOWED_EXTENSIONS`].
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
}

/// Reduce a client-supplied filename to a safe flat name.
///
/// The name is NFKD-decomposed so accented letters keep their base letter.
/// Path separators become spaces, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped, and leading/trailing `.` and `_`
/// are stripped. The result may be empty.
pub fn sanitize_filename(raw: &str) -> String {
    let spaced: String = raw
        .nfkd()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Split at the last dot: `("report", ".pdf")`. A leading dot does not
/// start an extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
