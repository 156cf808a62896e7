//! The worklist manager: the ordered set of jobs a user has dropped, and the
//! sequential driver that pushes them through the conversion engine.
//!
//! Everything here runs on one thread. [`Worklist`] is a cheap handle; clones
//! share the same jobs, so a renderer can keep one while a batch is running.
//! State is never borrowed across an engine call, which lets the shell delete
//! jobs mid-batch.

pub mod events;

use std::{
    cell::{OnceCell, RefCell},
    rc::Rc,
};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    blob::BlobStore,
    converter::{ConversionEngine, ConversionRequest, EngineError},
    job::{ConversionResult, FileHandle, JobId, JobRecord, JobState, JobView, TargetRejection},
};
pub use events::{BatchReport, WorklistEvent};

#[derive(Debug, thiserror::Error)]
pub enum WorklistError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("target format is empty")]
    EmptyTarget,
    #[error("target format {0} is the source format")]
    TargetMatchesSource(String),
    #[error("target format {0} is not offered for this file")]
    TargetNotOffered(String),
    #[error("a conversion is already running")]
    AlreadyConverting,
    #[error("job already converted: {0}")]
    AlreadyConverted(JobId),
    #[error("a conversion engine is already attached")]
    EngineAlreadyAttached,
}

impl WorklistError {
    fn rejected(format: &str, rejection: TargetRejection) -> Self {
        match rejection {
            TargetRejection::Empty => Self::EmptyTarget,
            TargetRejection::SourceFormat => Self::TargetMatchesSource(format.to_string()),
            TargetRejection::NotOffered => Self::TargetNotOffered(format.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// No job has a target; nothing was converted.
    SelectionRequired,
    AlreadyRunning,
    Finished(BatchReport),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklistFlags {
    pub selection_required: bool,
    pub converting: bool,
    pub batch_done: bool,
    pub engine_loaded: bool,
}

struct WorklistState {
    jobs: Vec<JobRecord>,
    selection_required: bool,
    converting: bool,
    batch_done: bool,
    blobs: BlobStore,
    subscribers: Vec<mpsc::UnboundedSender<WorklistEvent>>,
}

impl WorklistState {
    fn position(&self, id: JobId) -> Option<usize> {
        self.jobs.iter().position(|job| job.id() == id)
    }

    fn emit(&mut self, event: WorklistEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Drop for WorklistState {
    fn drop(&mut self) {
        for job in &mut self.jobs {
            if let Some(result) = job.take_result() {
                self.blobs.revoke(&result.url);
            }
        }
    }
}

/// Held for the length of a conversion run. Dropping it clears the running
/// flag even when the run's future is abandoned mid-await, and fails any of
/// its jobs still marked converting so they can be retried.
struct RunGuard {
    inner: Rc<Inner>,
    queue: Vec<JobId>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let Ok(mut state) = self.inner.state.try_borrow_mut() else {
            warn!("worklist busy while ending a conversion run");
            return;
        };
        state.converting = false;

        let mut interrupted = Vec::new();
        for job in state.jobs.iter_mut() {
            if job.state() == JobState::Converting && self.queue.contains(&job.id()) {
                job.fail("conversion interrupted".to_string());
                interrupted.push(job.view());
            }
        }
        if !interrupted.is_empty() {
            warn!("conversion abandoned with {} job(s) unfinished", interrupted.len());
        }
        for view in interrupted {
            state.emit(WorklistEvent::JobUpdated(view));
        }
    }
}

struct Inner {
    state: RefCell<WorklistState>,
    engine: OnceCell<Rc<dyn ConversionEngine>>,
}

#[derive(Clone)]
pub struct Worklist {
    inner: Rc<Inner>,
}

impl Worklist {
    pub fn new(blobs: BlobStore) -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(WorklistState {
                    jobs: Vec::new(),
                    selection_required: false,
                    converting: false,
                    batch_done: false,
                    blobs,
                    subscribers: Vec::new(),
                }),
                engine: OnceCell::new(),
            }),
        }
    }

    pub fn blobs(&self) -> BlobStore {
        self.inner.state.borrow().blobs.clone()
    }

    /// One-time installation of the engine. Until this happens every
    /// conversion fails with [`EngineError::Unavailable`].
    pub fn attach_engine(&self, engine: Rc<dyn ConversionEngine>) -> Result<(), WorklistError> {
        self.inner
            .engine
            .set(engine)
            .map_err(|_| WorklistError::EngineAlreadyAttached)?;
        info!("conversion engine attached");
        Ok(())
    }

    pub fn engine_loaded(&self) -> bool {
        self.inner.engine.get().is_some()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<WorklistEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.state.borrow_mut().subscribers.push(tx);
        rx
    }

    pub fn admit(&self, files: impl IntoIterator<Item = FileHandle>) -> Vec<JobId> {
        let mut state = self.inner.state.borrow_mut();
        let ids: Vec<JobId> = files
            .into_iter()
            .map(|file| {
                let job = JobRecord::admit(file);
                let id = job.id();
                debug!("admitted {} as {}", job.file_name(), id);
                state.jobs.push(job);
                id
            })
            .collect();

        info!("admitted {} file(s)", ids.len());
        state.emit(WorklistEvent::Admitted { jobs: ids.clone() });
        ids
    }

    pub fn set_target(&self, id: JobId, format: &str) -> Result<(), WorklistError> {
        let mut state = self.inner.state.borrow_mut();
        let index = state.position(id).ok_or(WorklistError::JobNotFound(id))?;
        let format = state.jobs[index]
            .set_target(format)
            .map_err(|rejection| WorklistError::rejected(format, rejection))?;

        debug!("{} -> {}", state.jobs[index].file_name(), format);
        state.selection_required = false;
        state.emit(WorklistEvent::TargetSet {
            job_id: id,
            format: format.to_string(),
        });
        Ok(())
    }

    /// Sets the target on every job named `file_name` and returns how many
    /// were updated. Nothing changes if any of them refuses `format`.
    pub fn set_target_by_name(&self, file_name: &str, format: &str) -> Result<usize, WorklistError> {
        let mut state = self.inner.state.borrow_mut();
        let matching: Vec<usize> = state
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| job.file_name() == file_name)
            .map(|(index, _)| index)
            .collect();

        for &index in &matching {
            state.jobs[index]
                .check_target(format)
                .map_err(|rejection| WorklistError::rejected(format, rejection))?;
        }

        for &index in &matching {
            let Ok(format) = state.jobs[index].set_target(format) else {
                continue;
            };
            let job_id = state.jobs[index].id();
            state.emit(WorklistEvent::TargetSet {
                job_id,
                format: format.to_string(),
            });
        }
        state.selection_required = false;
        Ok(matching.len())
    }

    /// Removes a job and revokes its result. Returns `false` if it was not there.
    pub fn delete(&self, id: JobId) -> bool {
        let mut state = self.inner.state.borrow_mut();
        let Some(index) = state.position(id) else {
            debug!("delete: {} not in worklist", id);
            return false;
        };

        let mut job = state.jobs.remove(index);
        if let Some(result) = job.take_result() {
            state.blobs.revoke(&result.url);
        }
        info!("removed {}", job.file_name());
        state.emit(WorklistEvent::Deleted { job_id: id });
        true
    }

    pub fn snapshot(&self) -> Vec<JobView> {
        self.inner
            .state
            .borrow()
            .jobs
            .iter()
            .map(JobRecord::view)
            .collect()
    }

    pub fn get(&self, id: JobId) -> Option<JobView> {
        let state = self.inner.state.borrow();
        state.position(id).map(|index| state.jobs[index].view())
    }

    /// Formats the shell may offer for a job. Empty when its category is unknown.
    pub fn target_options(&self, id: JobId) -> Option<Vec<&'static str>> {
        let state = self.inner.state.borrow();
        let job = &state.jobs[state.position(id)?];
        Some(
            job.category()
                .map(|category| category.targets_for(job.source_extension()))
                .unwrap_or_default(),
        )
    }

    pub fn flags(&self) -> WorklistFlags {
        let state = self.inner.state.borrow();
        WorklistFlags {
            selection_required: state.selection_required,
            converting: state.converting,
            batch_done: state.batch_done,
            engine_loaded: self.engine_loaded(),
        }
    }

    pub fn has_unconverted(&self) -> bool {
        self.inner
            .state
            .borrow()
            .jobs
            .iter()
            .any(|job| job.state() != JobState::Converted)
    }

    pub fn converted_count(&self) -> usize {
        self.inner
            .state
            .borrow()
            .jobs
            .iter()
            .filter(|job| job.state() == JobState::Converted)
            .count()
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts every job that is not yet converted, one at a time, in
    /// worklist order. Failures are recorded on the job and never stop the batch.
    pub async fn convert_all(&self) -> BatchOutcome {
        let (queue, guard) = {
            let mut state = self.inner.state.borrow_mut();
            if state.converting {
                warn!("conversion requested while a batch is running");
                return BatchOutcome::AlreadyRunning;
            }
            if !state
                .jobs
                .iter()
                .any(|job| job.target_format().is_some_and(|format| !format.is_empty()))
            {
                info!("no target format selected, nothing to convert");
                state.selection_required = true;
                state.emit(WorklistEvent::SelectionRequired);
                return BatchOutcome::SelectionRequired;
            }

            state.converting = true;
            state.batch_done = false;
            let queue: Vec<JobId> = state
                .jobs
                .iter_mut()
                .filter(|job| job.state() != JobState::Converted)
                .map(|job| {
                    job.begin_conversion();
                    job.id()
                })
                .collect();

            info!("converting {} file(s)", queue.len());
            state.emit(WorklistEvent::BatchStarted {
                jobs: queue.clone(),
            });
            let guard = RunGuard {
                inner: Rc::clone(&self.inner),
                queue: queue.clone(),
            };
            (queue, guard)
        };

        let mut report = BatchReport::default();
        for id in queue {
            match self.run_job(id).await {
                Some(JobState::Converted) => report.converted += 1,
                Some(_) => report.failed += 1,
                None => report.dropped += 1,
            }
        }

        drop(guard);
        let mut state = self.inner.state.borrow_mut();
        state.batch_done = true;
        info!(
            "batch finished: {} converted, {} failed, {} dropped",
            report.converted, report.failed, report.dropped
        );
        state.emit(WorklistEvent::BatchFinished(report));
        BatchOutcome::Finished(report)
    }

    /// Converts (or retries) a single job. Leaves the batch flags alone and
    /// emits no batch events.
    pub async fn convert_one(&self, id: JobId) -> Result<JobState, WorklistError> {
        let guard = {
            let mut state = self.inner.state.borrow_mut();
            if state.converting {
                return Err(WorklistError::AlreadyConverting);
            }
            let index = state.position(id).ok_or(WorklistError::JobNotFound(id))?;
            if state.jobs[index].state() == JobState::Converted {
                return Err(WorklistError::AlreadyConverted(id));
            }
            state.converting = true;
            state.jobs[index].begin_conversion();
            let view = state.jobs[index].view();
            state.emit(WorklistEvent::JobUpdated(view));
            RunGuard {
                inner: Rc::clone(&self.inner),
                queue: vec![id],
            }
        };

        let outcome = self.run_job(id).await;
        drop(guard);
        outcome.ok_or(WorklistError::JobNotFound(id))
    }

    /// Runs the engine for one job and folds the result back in. `None` means
    /// the job was deleted, either before its turn or while the engine ran.
    async fn run_job(&self, id: JobId) -> Option<JobState> {
        let (file_name, from, to, payload) = {
            let state = self.inner.state.borrow();
            let job = &state.jobs[state.position(id)?];
            (
                job.file_name().to_string(),
                job.source_extension().to_string(),
                job.target_format().map(str::to_string),
                job.payload(),
            )
        };
        let engine = self.inner.engine.get().cloned();

        let result = match (engine.as_ref(), to.as_deref()) {
            (_, None) => Err(EngineError::MissingTarget),
            (None, Some(_)) => Err(EngineError::Unavailable),
            (Some(engine), Some(to)) => {
                engine
                    .convert(ConversionRequest {
                        job_id: id,
                        file_name: &file_name,
                        from: &from,
                        to,
                        payload: &payload,
                    })
                    .await
            }
        };

        let mut state = self.inner.state.borrow_mut();
        let Some(index) = state.position(id) else {
            debug!("{} was removed during conversion, discarding result", file_name);
            if let Ok(output) = result {
                state.blobs.revoke(&output.url);
            }
            return None;
        };

        let job = &mut state.jobs[index];
        match result {
            Ok(output) => {
                debug!("converted {} -> {}", file_name, output.output);
                job.complete(ConversionResult {
                    url: output.url,
                    name: output.output,
                });
            }
            Err(e) => {
                warn!("failed to convert {}: {}", file_name, e);
                job.fail(e.to_string());
            }
        }
        let new_state = job.state();
        let view = job.view();
        state.emit(WorklistEvent::JobUpdated(view));
        Some(new_state)
    }
}
