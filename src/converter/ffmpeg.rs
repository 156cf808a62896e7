use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use futures_util::future::LocalBoxFuture;
use log::{debug, error, info};
use tokio::{fs, process::Command};

use super::{
    engine::{ConversionEngine, ConversionOutput, ConversionRequest, EngineError},
    format::{output_file_name, Category},
};
use crate::{blob::BlobStore, config::Config};

pub async fn ffmpeg_version(program: &Path) -> anyhow::Result<String> {
    let output = Command::new(program)
        .arg("-version")
        .output()
        .await
        .with_context(|| format!("failed to run {}", program.display()))?;
    let version = String::from_utf8(output.stdout)?;
    // from "ffmpeg version 7.1 .... .. .. . ." get "7.1"
    let version = version
        .split_whitespace()
        .nth(2)
        .ok_or_else(|| anyhow!("failed to get version from {} output", program.display()))?;

    Ok(version.to_string())
}

/// Engine backed by an external `ffmpeg` binary. Image and audio only.
pub struct FfmpegEngine {
    program: PathBuf,
    work_dir: PathBuf,
    version: String,
    blobs: BlobStore,
}

impl FfmpegEngine {
    pub async fn load(config: &Config, blobs: BlobStore) -> anyhow::Result<Self> {
        let version = match ffmpeg_version(&config.ffmpeg_path).await {
            Ok(version) => version,
            Err(e) => {
                error!(
                    "failed to get ffmpeg version -- conversions require ffmpeg on the path or at DROPCONV_FFMPEG ({})",
                    e
                );
                return Err(e);
            }
        };

        fs::create_dir_all(&config.work_dir)
            .await
            .with_context(|| format!("failed to create {}", config.work_dir.display()))?;

        info!("conversion engine ready: ffmpeg {}", version);
        Ok(Self {
            program: config.ffmpeg_path.clone(),
            work_dir: config.work_dir.clone(),
            version,
            blobs,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn check_supported(request: &ConversionRequest<'_>) -> Result<(), EngineError> {
        let is_doc = |ext: &str| Category::from_extension(ext) == Some(Category::Doc);
        if is_doc(request.from) || is_doc(request.to) {
            return Err(EngineError::Unsupported {
                from: request.from.to_string(),
                to: request.to.to_string(),
            });
        }
        Ok(())
    }

    fn scratch_path(&self, request: &ConversionRequest<'_>, suffix: &str, ext: &str) -> PathBuf {
        let name = if ext.is_empty() {
            format!("{}{}", request.job_id, suffix)
        } else {
            format!("{}{}.{}", request.job_id, suffix, ext)
        };
        self.work_dir.join(name)
    }

    async fn run(&self, request: ConversionRequest<'_>) -> Result<ConversionOutput, EngineError> {
        Self::check_supported(&request)?;

        let input = self.scratch_path(&request, "", request.from);
        let output = self.scratch_path(&request, "-out", request.to);
        fs::write(&input, request.payload).await?;

        let result = self.transcode(&input, &output).await;

        for path in [&input, &output] {
            if let Err(e) = fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    error!("failed to remove scratch file {}: {}", path.display(), e);
                }
            }
        }

        let bytes = result?;
        let output_name = output_file_name(request.file_name, request.to);
        let mime = mime_guess::from_path(&output_name)
            .first_or_octet_stream()
            .to_string();
        let url = self.blobs.create(bytes, mime);

        Ok(ConversionOutput {
            url,
            output: output_name,
        })
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<Vec<u8>, EngineError> {
        let args = [
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-y"),
            OsStr::new("-i"),
            input.as_os_str(),
            output.as_os_str(),
        ];
        debug!("running '{} {:?}'", self.program.display(), args);

        let result = Command::new(&self.program)
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            for line in stderr.lines() {
                error!("{}", line);
            }
            let reason = stderr
                .lines()
                .last()
                .map(str::to_string)
                .unwrap_or_else(|| format!("ffmpeg exited with {}", result.status));
            return Err(EngineError::Failed(reason));
        }

        let bytes = fs::read(output).await?;
        if bytes.is_empty() {
            return Err(EngineError::EmptyOutput);
        }
        Ok(bytes)
    }
}

impl ConversionEngine for FfmpegEngine {
    fn convert<'a>(
        &'a self,
        request: ConversionRequest<'a>,
    ) -> LocalBoxFuture<'a, Result<ConversionOutput, EngineError>> {
        Box::pin(self.run(request))
    }
}
