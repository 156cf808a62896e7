use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

lazy_static! {
    pub static ref FORMATS: HashMap<Category, &'static [&'static str]> = {
        let mut map: HashMap<Category, &'static [&'static str]> = HashMap::new();
        map.insert(
            Category::Image,
            &["jpg", "jpeg", "png", "gif", "bmp", "webp", "ico", "tif", "tiff", "tga"],
        );
        map.insert(
            Category::Audio,
            &["mp3", "wav", "ogg", "aac", "wma", "flac", "m4a"],
        );
        map.insert(
            Category::Doc,
            &["pdf", "word", "txt", "docx", "xlsx", "pptx"],
        );
        map
    };
}

/// Format menu a file falls under.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Image,
    Audio,
    Doc,
}

impl Category {
    pub fn extensions(&self) -> &'static [&'static str] {
        FORMATS.get(self).copied().unwrap_or(&[])
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        let ext = source_extension(file_name).to_ascii_lowercase();
        self.extensions().contains(&ext.as_str())
    }

    /// Resolves the menu from a reported content type: the first category
    /// whose name is a substring of the MIME type wins.
    pub fn from_mime(mime: &str) -> Option<Self> {
        Category::iter().find(|category| mime.contains(category.to_string().as_str()))
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Category::iter().find(|category| category.extensions().contains(&ext.as_str()))
    }

    /// MIME first, extension as fallback.
    pub fn resolve(mime: &str, ext: &str) -> Option<Self> {
        Self::from_mime(mime).or_else(|| Self::from_extension(ext))
    }

    /// Targets offered for a file of this category, never including its own extension.
    pub fn targets_for(&self, source_ext: &str) -> Vec<&'static str> {
        self.extensions()
            .iter()
            .copied()
            .filter(|format| !format.eq_ignore_ascii_case(source_ext))
            .collect()
    }
}

/// Everything after the last `.`, or an empty string when there is none.
pub fn source_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    }
}

/// `<stem>.<target>`, where stem is the name before its last `.`.
pub fn output_file_name(file_name: &str, target: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    };
    format!("{}.{}", stem, target)
}
