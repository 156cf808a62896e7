pub mod archive;

use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
};

use futures_util::future::LocalBoxFuture;
use log::info;
use tokio::fs;

use crate::{
    blob::{Blob, BlobStore, BlobUrl},
    config::{Config, DEFAULT_ARCHIVE_NAME},
    job::{JobId, JobView},
};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("job not converted: {0}")]
    NotConverted(JobId),
    #[error("blob no longer available: {0}")]
    BlobMissing(BlobUrl),
    #[error("failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("failed to save download: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Single(String),
    Archive { name: String, entries: Vec<String> },
    /// Neither more than one converted job nor a single-job worklist.
    Nothing,
}

/// Where downloads end up: the browser's save flow, a directory, a test buffer.
pub trait DownloadSink {
    fn save<'a>(&'a self, name: &'a str, blob: &'a Blob) -> LocalBoxFuture<'a, io::Result<()>>;
}

/// Saves downloads as files in one directory, created on first use.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save<'a>(&'a self, name: &'a str, blob: &'a Blob) -> LocalBoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let file_name = Path::new(name).file_name().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid download name: {}", name),
                )
            })?;
            fs::create_dir_all(&self.dir).await?;
            let path = self.dir.join(file_name);
            fs::write(&path, &blob.bytes[..]).await?;
            info!("saved {} ({} bytes)", path.display(), blob.bytes.len());
            Ok(())
        })
    }
}

pub struct Exporter<S> {
    blobs: BlobStore,
    sink: S,
    archive_name: String,
}

impl Exporter<DirectorySink> {
    pub fn from_config(config: &Config, blobs: BlobStore) -> Self {
        Exporter::new(blobs, DirectorySink::new(&config.download_dir))
            .with_archive_name(config.archive_name.clone())
    }
}

impl<S: DownloadSink> Exporter<S> {
    pub fn new(blobs: BlobStore, sink: S) -> Self {
        Self {
            blobs,
            sink,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }

    pub fn with_archive_name(mut self, archive_name: impl Into<String>) -> Self {
        self.archive_name = archive_name.into();
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Saves one converted job under its result name. The result URL is left
    /// alive so a later bundle can still read it.
    pub async fn download_one(&self, job: &JobView) -> Result<String, ExportError> {
        let (Some(url), Some(name)) = (job.result_url, job.result_name.as_deref()) else {
            return Err(ExportError::NotConverted(job.id));
        };
        if !job.is_converted() {
            return Err(ExportError::NotConverted(job.id));
        }

        let blob = self.blobs.fetch(&url).ok_or(ExportError::BlobMissing(url))?;
        self.sink.save(name, &blob).await?;
        info!("downloaded {}", name);
        Ok(name.to_string())
    }

    /// Bundles every converted job when there is more than one; falls back to
    /// a single download when the worklist holds exactly one job.
    pub async fn download_all(&self, jobs: &[JobView]) -> Result<ExportOutcome, ExportError> {
        let converted: Vec<&JobView> = jobs.iter().filter(|job| job.is_converted()).collect();

        if converted.len() > 1 {
            return self.download_archive(&converted).await;
        }
        if let [only] = jobs {
            return self.download_one(only).await.map(ExportOutcome::Single);
        }

        info!(
            "nothing to export: {} converted out of {} job(s)",
            converted.len(),
            jobs.len()
        );
        Ok(ExportOutcome::Nothing)
    }

    async fn download_archive(&self, jobs: &[&JobView]) -> Result<ExportOutcome, ExportError> {
        let mut taken = HashSet::new();
        let mut entries = Vec::with_capacity(jobs.len());

        for job in jobs {
            let url = job.result_url.ok_or(ExportError::NotConverted(job.id))?;
            let blob = self.blobs.fetch(&url).ok_or(ExportError::BlobMissing(url))?;
            let name = archive::unique_entry_name(
                &taken,
                job.result_name.as_deref().unwrap_or(&job.file_name),
            );
            taken.insert(name.clone());
            entries.push((name, blob.bytes));
        }

        let bytes = archive::bundle(&entries)?;
        let url = self.blobs.create(bytes, "application/zip");
        let saved = match self.blobs.fetch(&url) {
            Some(blob) => self.sink.save(&self.archive_name, &blob).await,
            None => Ok(()),
        };
        self.blobs.revoke(&url);
        saved?;

        info!("downloaded {} with {} file(s)", self.archive_name, entries.len());
        Ok(ExportOutcome::Archive {
            name: self.archive_name.clone(),
            entries: entries.into_iter().map(|(name, _)| name).collect(),
        })
    }
}
