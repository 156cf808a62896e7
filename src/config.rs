use std::path::PathBuf;

use anyhow::bail;

pub const DEFAULT_ARCHIVE_NAME: &str = "converted_files.zip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub ffmpeg_path: PathBuf,
    pub work_dir: PathBuf,
    pub download_dir: PathBuf,
    pub archive_name: String,
}

impl Config {
    /// Reads `DROPCONV_*` variables, loading `.env` first if there is one.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ffmpeg_path = lookup("DROPCONV_FFMPEG").unwrap_or_else(|| "ffmpeg".to_string());
        let work_dir = lookup("DROPCONV_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("dropconv"));
        let download_dir =
            lookup("DROPCONV_DOWNLOAD_DIR").unwrap_or_else(|| "downloads".to_string());
        let archive_name = lookup("DROPCONV_ARCHIVE_NAME")
            .unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_string());

        if ffmpeg_path.trim().is_empty() {
            bail!("DROPCONV_FFMPEG must not be empty");
        }
        if work_dir.as_os_str().is_empty() {
            bail!("DROPCONV_WORK_DIR must not be empty");
        }
        if download_dir.trim().is_empty() {
            bail!("DROPCONV_DOWNLOAD_DIR must not be empty");
        }
        if !archive_name.ends_with(".zip") || archive_name.len() <= ".zip".len() {
            bail!("DROPCONV_ARCHIVE_NAME must be a .zip file name");
        }

        Ok(Self {
            ffmpeg_path: PathBuf::from(ffmpeg_path),
            work_dir,
            download_dir: PathBuf::from(download_dir),
            archive_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.download_dir, PathBuf::from("downloads"));
        assert_eq!(config.archive_name, "converted_files.zip");
        assert!(config.work_dir.ends_with("dropconv"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DROPCONV_FFMPEG", "/opt/ffmpeg/bin/ffmpeg"),
            ("DROPCONV_WORK_DIR", "/var/tmp/conv"),
            ("DROPCONV_DOWNLOAD_DIR", "/home/me/Downloads"),
            ("DROPCONV_ARCHIVE_NAME", "bundle.zip"),
        ]))
        .unwrap();
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.work_dir, PathBuf::from("/var/tmp/conv"));
        assert_eq!(config.download_dir, PathBuf::from("/home/me/Downloads"));
        assert_eq!(config.archive_name, "bundle.zip");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("DROPCONV_ARCHIVE_NAME", "bundle.tar")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DROPCONV_ARCHIVE_NAME", ".zip")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DROPCONV_FFMPEG", "  ")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DROPCONV_WORK_DIR", "")])).is_err());
    }
}
