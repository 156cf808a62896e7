//! Test doubles for the engine and the download sink.

use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    rc::Rc,
};

use futures_util::future::LocalBoxFuture;
use tokio::sync::Notify;

use crate::{
    blob::{Blob, BlobStore},
    converter::{
        format::output_file_name, ConversionEngine, ConversionOutput, ConversionRequest,
        EngineError,
    },
    export::DownloadSink,
    job::FileHandle,
};

pub(crate) fn file(name: &str, mime: &str) -> FileHandle {
    FileHandle::new(name, mime, format!("bytes of {}", name).into_bytes())
}

/// Succeeds unless the file name was registered with [`ScriptedEngine::fail_on`].
/// Yields once per call so interleavings would show up.
pub(crate) struct ScriptedEngine {
    blobs: BlobStore,
    failing: RefCell<HashSet<String>>,
    in_flight: Cell<usize>,
    max_in_flight: Cell<usize>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedEngine {
    pub(crate) fn new(blobs: BlobStore) -> Rc<Self> {
        Rc::new(Self {
            blobs,
            failing: RefCell::new(HashSet::new()),
            in_flight: Cell::new(0),
            max_in_flight: Cell::new(0),
            calls: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn fail_on(&self, file_name: &str) {
        self.failing.borrow_mut().insert(file_name.to_string());
    }

    pub(crate) fn heal(&self) {
        self.failing.borrow_mut().clear();
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.get()
    }
}

impl ConversionEngine for ScriptedEngine {
    fn convert<'a>(
        &'a self,
        request: ConversionRequest<'a>,
    ) -> LocalBoxFuture<'a, Result<ConversionOutput, EngineError>> {
        Box::pin(async move {
            self.in_flight.set(self.in_flight.get() + 1);
            self.max_in_flight
                .set(self.max_in_flight.get().max(self.in_flight.get()));
            tokio::task::yield_now().await;
            self.in_flight.set(self.in_flight.get() - 1);

            self.calls.borrow_mut().push(request.file_name.to_string());
            if self.failing.borrow().contains(request.file_name) {
                return Err(EngineError::Failed(format!(
                    "cannot decode {}",
                    request.file_name
                )));
            }

            let mut bytes = request.payload.to_vec();
            bytes.extend_from_slice(format!(" as {}", request.to).as_bytes());
            let url = self.blobs.create(bytes, "application/octet-stream");
            Ok(ConversionOutput {
                url,
                output: output_file_name(request.file_name, request.to),
            })
        })
    }
}

/// Signals `started` when a call begins and holds it until `release` fires.
pub(crate) struct GatedEngine {
    blobs: BlobStore,
    calls: RefCell<Vec<String>>,
    pub(crate) started: Notify,
    pub(crate) release: Notify,
}

impl GatedEngine {
    pub(crate) fn new(blobs: BlobStore) -> Rc<Self> {
        Rc::new(Self {
            blobs,
            calls: RefCell::new(Vec::new()),
            started: Notify::new(),
            release: Notify::new(),
        })
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ConversionEngine for GatedEngine {
    fn convert<'a>(
        &'a self,
        request: ConversionRequest<'a>,
    ) -> LocalBoxFuture<'a, Result<ConversionOutput, EngineError>> {
        Box::pin(async move {
            self.calls.borrow_mut().push(request.file_name.to_string());
            self.started.notify_one();
            self.release.notified().await;
            let url = self.blobs.create(request.payload.to_vec(), "audio/wav");
            Ok(ConversionOutput {
                url,
                output: output_file_name(request.file_name, request.to),
            })
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SavedFile {
    pub(crate) name: String,
    pub(crate) mime: String,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct MemorySink {
    saved: RefCell<Vec<SavedFile>>,
}

impl MemorySink {
    pub(crate) fn saved(&self) -> Vec<SavedFile> {
        self.saved.borrow().clone()
    }
}

impl DownloadSink for MemorySink {
    fn save<'a>(&'a self, name: &'a str, blob: &'a Blob) -> LocalBoxFuture<'a, std::io::Result<()>> {
        Box::pin(async move {
            self.saved.borrow_mut().push(SavedFile {
                name: name.to_string(),
                mime: blob.mime.clone(),
                bytes: blob.bytes.to_vec(),
            });
            Ok(())
        })
    }
}
