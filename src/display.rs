//! Small formatting helpers for rendering job rows.

use serde::Serialize;
use strum_macros::{Display, EnumIter};

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
const MAX_NAME_CHARS: usize = 18;

/// 1024-based size with two decimals, e.g. `1.50 KB`.
pub fn bytes_to_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, SIZE_UNITS[unit])
}

/// Shortens long names to `head...ext` so they fit a row.
pub fn compress_file_name(file_name: &str) -> String {
    let file_name = file_name.trim();
    if file_name.chars().count() <= MAX_NAME_CHARS {
        return file_name.to_string();
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (file_name, ""),
    };
    let keep = MAX_NAME_CHARS.saturating_sub(3 + ext.chars().count());
    if keep == 0 {
        let head: String = file_name.chars().take(MAX_NAME_CHARS - 3).collect();
        return format!("{}...", head);
    }

    let head: String = stem.chars().take(keep).collect();
    format!("{}...{}", head, ext)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumIter)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "lowercase")]
pub enum FileKind {
    Video,
    Audio,
    Text,
    Image,
    Other,
}

/// Icon class for a reported content type.
pub fn file_kind(mime: &str) -> FileKind {
    use strum::IntoEnumIterator;

    FileKind::iter()
        .filter(|kind| *kind != FileKind::Other)
        .find(|kind| mime.contains(kind.to_string().as_str()))
        .unwrap_or(FileKind::Other)
}
