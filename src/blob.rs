use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{self, Display, Formatter},
    rc::Rc,
};

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle to a blob registered in a [`BlobStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobUrl(Uuid);

impl Display for BlobUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "blob:{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Blob {
    pub mime: String,
    pub bytes: Rc<[u8]>,
}

/// Registry of live blobs, shared by the engine, the worklist and the exporter.
///
/// Every handle returned by [`BlobStore::create`] stays alive until it is
/// passed to [`BlobStore::revoke`]. Cloning the store clones the handle, not
/// the contents.
#[derive(Clone, Default)]
pub struct BlobStore {
    blobs: Rc<RefCell<HashMap<BlobUrl, Blob>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Vec<u8>, mime: impl Into<String>) -> BlobUrl {
        let url = BlobUrl(Uuid::new_v4());
        let blob = Blob {
            mime: mime.into(),
            bytes: bytes.into(),
        };
        debug!("created {} ({} bytes, {})", url, blob.bytes.len(), blob.mime);
        self.blobs.borrow_mut().insert(url, blob);
        url
    }

    pub fn fetch(&self, url: &BlobUrl) -> Option<Blob> {
        self.blobs.borrow().get(url).cloned()
    }

    pub fn contains(&self, url: &BlobUrl) -> bool {
        self.blobs.borrow().contains_key(url)
    }

    /// Releases a blob. Returns `false` if it was already gone.
    pub fn revoke(&self, url: &BlobUrl) -> bool {
        let removed = self.blobs.borrow_mut().remove(url).is_some();
        if removed {
            debug!("revoked {}", url);
        }
        removed
    }

    pub fn live_count(&self) -> usize {
        self.blobs.borrow().len()
    }
}
