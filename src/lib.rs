//! Client-side conversion core: a worklist of dropped files driven one at a
//! time through a shared conversion engine, with single-file and zip exports.

pub mod blob;
pub mod config;
pub mod converter;
pub mod display;
pub mod export;
pub mod job;
pub mod worklist;

#[cfg(test)]
mod testing;

use std::rc::Rc;

use env_logger::Env;
use log::{error, info};

pub use blob::{BlobStore, BlobUrl};
pub use config::Config;
pub use converter::{Category, ConversionEngine, EngineError, FfmpegEngine};
pub use export::{DirectorySink, DownloadSink, ExportError, ExportOutcome, Exporter};
pub use job::{FileHandle, JobId, JobState, JobView};
pub use worklist::{BatchOutcome, BatchReport, Worklist, WorklistError, WorklistEvent};

/// Installs the `env_logger` backend. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("dropconv")).try_init();
}

/// Builds a worklist and loads the ffmpeg engine into it. A failed load is
/// logged and leaves the worklist without an engine, so every conversion
/// fails instead of the caller crashing.
pub async fn mount(config: &Config) -> Worklist {
    let blobs = BlobStore::new();
    let worklist = Worklist::new(blobs.clone());

    match FfmpegEngine::load(config, blobs).await {
        Ok(engine) => {
            if let Err(e) = worklist.attach_engine(Rc::new(engine)) {
                error!("failed to attach conversion engine: {}", e);
            }
        }
        Err(e) => error!("conversion engine unavailable: {:#}", e),
    }

    info!("worklist ready (engine loaded: {})", worklist.engine_loaded());
    worklist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::file;

    #[tokio::test]
    async fn test_mount_without_ffmpeg_fails_jobs() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            ffmpeg_path: dir.path().join("no-such-ffmpeg"),
            work_dir: dir.path().join("work"),
            download_dir: dir.path().join("downloads"),
            archive_name: "converted_files.zip".to_string(),
        };

        let worklist = mount(&config).await;
        assert!(!worklist.flags().engine_loaded);

        let ids = worklist.admit([file("a.wav", "audio/wav")]);
        worklist.set_target(ids[0], "mp3").unwrap();
        worklist.convert_all().await;
        assert_eq!(worklist.get(ids[0]).unwrap().state, JobState::Failed);
    }
}
