// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload and result files under the static directory

use image::{ImageFormat, RgbImage};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::errors::PipelineError;

/// Subdirectory of the static root holding uploads and results
pub const TMP_SUBDIR: &str = "tmp";
pub const RESULT_SUFFIX: &str = "_result.jpg";
/// How often expired results are looked for
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Raw upload on disk, removed when dropped
#[derive(Debug)]
pub struct StoredUpload {
    file: NamedTempFile,
}

impl StoredUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Unique file stem, e.g. `jpg-a1B2c3`
    pub fn stem(&self) -> String {
        self.file
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResult {
    pub path: PathBuf,
    /// Path relative to the public base URL
    pub relative_url: String,
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    tmp_dir: PathBuf,
}

impl ResultStore {
    /// Use `static_dir` as the served root, creating `static_dir/tmp`
    pub fn new(static_dir: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let tmp_dir = static_dir.as_ref().join(TMP_SUBDIR);
        std::fs::create_dir_all(&tmp_dir)?;
        Ok(Self { tmp_dir })
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Write an upload under a name no concurrent request can collide with
    pub fn persist_upload(&self, bytes: &[u8]) -> Result<StoredUpload, PipelineError> {
        let mut file = tempfile::Builder::new()
            .prefix("jpg-")
            .suffix(".jpg")
            .tempfile_in(&self.tmp_dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        debug!("Stored upload at {}", file.path().display());
        Ok(StoredUpload { file })
    }

    /// Save the annotated image as `<upload stem>_result.jpg`
    pub fn save_result(
        &self,
        upload: &StoredUpload,
        image: &RgbImage,
    ) -> Result<StoredResult, PipelineError> {
        let file_name = format!("{}{}", upload.stem(), RESULT_SUFFIX);
        let path = self.tmp_dir.join(&file_name);
        image.save_with_format(&path, ImageFormat::Jpeg)?;
        debug!("Saved result image {}", path.display());
        Ok(StoredResult {
            path,
            relative_url: format!("static/{}/{}", TMP_SUBDIR, file_name),
        })
    }

    /// Delete result images last modified at least `max_age` ago
    ///
    /// Uploads are left alone. Returns the number of files removed.
    pub fn sweep_expired(&self, max_age: Duration) -> Result<usize, PipelineError> {
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in std::fs::read_dir(&self.tmp_dir)? {
            let entry = entry?;
            let is_result = entry
                .file_name()
                .to_str()
                .map(|name| name.ends_with(RESULT_SUFFIX))
                .unwrap_or(false);
            if !is_result {
                continue;
            }

            let modified = entry.metadata()?.modified()?;
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age < max_age {
                continue;
            }

            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
            }
        }

        if removed > 0 {
            info!("🧹 Removed {} expired result image(s)", removed);
        }
        Ok(removed)
    }

    /// Run `sweep_expired` every `interval` until the runtime shuts down
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        max_age: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = store.sweep_expired(max_age) {
                    warn!("Result sweep failed: {}", e);
                }
            }
        })
    }
}

/// Join a public base URL and a relative path
pub fn public_url(base_url: &str, relative_url: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        relative_url.trim_start_matches('/')
    )
}
