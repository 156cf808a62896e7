use std::{
    fmt::{self, Display, Formatter},
    path::Path,
    rc::Rc,
};

use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

use crate::{
    blob::BlobUrl,
    converter::format::{source_extension, Category},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    Pending,
    Converting,
    Converted,
    Failed,
}

/// A file handed over by the shell: name, size, reported content type and bytes.
#[derive(Clone, Debug)]
pub struct FileHandle {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        Ok(Self::new(name, mime, bytes))
    }
}

/// Why a target format was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetRejection {
    Empty,
    SourceFormat,
    NotOffered,
}

/// Download handle and file name, always set together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionResult {
    pub url: BlobUrl,
    pub name: String,
}

/// One file's conversion lifecycle.
#[derive(Debug)]
pub struct JobRecord {
    id: JobId,
    file_name: String,
    file_size: u64,
    source_extension: String,
    target_format: Option<String>,
    mime_category: String,
    payload: Rc<[u8]>,
    state: JobState,
    result: Option<ConversionResult>,
    error: Option<String>,
}

impl JobRecord {
    pub fn admit(file: FileHandle) -> Self {
        let source_extension = source_extension(&file.name).to_string();
        Self {
            id: JobId::new(),
            file_name: file.name,
            file_size: file.size,
            source_extension,
            target_format: None,
            mime_category: file.mime_type,
            payload: file.bytes.into(),
            state: JobState::Pending,
            result: None,
            error: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source_extension(&self) -> &str {
        &self.source_extension
    }

    pub fn target_format(&self) -> Option<&str> {
        self.target_format.as_deref()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn result(&self) -> Option<&ConversionResult> {
        self.result.as_ref()
    }

    pub fn category(&self) -> Option<Category> {
        Category::resolve(&self.mime_category, &self.source_extension)
    }

    /// Shared view of the source bytes; the record keeps its own reference
    /// so the job can be converted again.
    pub fn payload(&self) -> Rc<[u8]> {
        Rc::clone(&self.payload)
    }

    /// Checks `format` against this job's menu and returns the menu's spelling
    /// of it. Blank formats, the source extension, and anything outside the
    /// category's list are refused; a job with no category has no menu.
    pub fn check_target(&self, format: &str) -> Result<&'static str, TargetRejection> {
        let format = format.trim();
        if format.is_empty() {
            return Err(TargetRejection::Empty);
        }
        if format.eq_ignore_ascii_case(&self.source_extension) {
            return Err(TargetRejection::SourceFormat);
        }
        self.category()
            .and_then(|category| {
                category
                    .targets_for(&self.source_extension)
                    .into_iter()
                    .find(|target| target.eq_ignore_ascii_case(format))
            })
            .ok_or(TargetRejection::NotOffered)
    }

    /// Leaves the record untouched when the format is refused.
    pub fn set_target(&mut self, format: &str) -> Result<&'static str, TargetRejection> {
        let format = self.check_target(format)?;
        self.target_format = Some(format.to_string());
        Ok(format)
    }

    pub fn begin_conversion(&mut self) {
        self.state = JobState::Converting;
        self.error = None;
    }

    pub fn complete(&mut self, result: ConversionResult) {
        self.state = JobState::Converted;
        self.result = Some(result);
        self.error = None;
    }

    pub fn fail(&mut self, reason: String) {
        self.state = JobState::Failed;
        self.error = Some(reason);
    }

    /// Hands the result handle back so the caller can revoke it.
    pub fn take_result(&mut self) -> Option<ConversionResult> {
        self.result.take()
    }

    pub fn view(&self) -> JobView {
        JobView {
            id: self.id,
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            source_extension: self.source_extension.clone(),
            target_format: self.target_format.clone(),
            mime_category: self.mime_category.clone(),
            category: self.category(),
            state: self.state,
            result_url: self.result.as_ref().map(|r| r.url),
            result_name: self.result.as_ref().map(|r| r.name.clone()),
            error: self.error.clone(),
        }
    }
}

/// Read-only copy of a [`JobRecord`] handed to renderers and exporters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: JobId,
    pub file_name: String,
    pub file_size: u64,
    pub source_extension: String,
    pub target_format: Option<String>,
    pub mime_category: String,
    pub category: Option<Category>,
    pub state: JobState,
    pub result_url: Option<BlobUrl>,
    pub result_name: Option<String>,
    pub error: Option<String>,
}

impl JobView {
    pub fn is_converted(&self) -> bool {
        self.state == JobState::Converted
    }
}
