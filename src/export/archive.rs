use std::{
    collections::HashSet,
    io::{Cursor, Write},
};

use zip::{result::ZipResult, write::SimpleFileOptions, ZipWriter};

/// Packs named byte blobs into one zip archive, in the given order.
pub fn bundle<B: AsRef<[u8]>>(entries: &[(String, B)]) -> ZipResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, bytes) in entries {
        zip.start_file(name.as_str(), SimpleFileOptions::default())?;
        zip.write_all(bytes.as_ref())?;
    }

    let writer = zip.finish()?;
    Ok(writer.into_inner())
}

/// `name` if it is free, otherwise `stem (n).ext` with the smallest free `n`.
pub fn unique_entry_name(taken: &HashSet<String>, name: &str) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }

    (1..)
        .map(|n| match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
            _ => format!("{} ({})", name, n),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}
