//! In-flight task bookkeeping for [`DefaultHttpClient`](super::DefaultHttpClient).
//!
//! Each progressive download owns one [`Task`] registered in the client's
//! [`TaskTable`]. The transport loop never touches a task directly: it
//! reports [`TransportEvent`]s tagged with the task identifier, and the table
//! routes them to the matching task, whose state machine decides what to do.
//!
//! ```text
//! Loading ──▶ Download(response, read_bytes) ──▶ Finished
//!    └──────▶ Error(kind, response, body) ─────▶ Finished
//! ```

use std::ops::Range;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use tracing::{debug, warn};

use super::error::{HttpError, HttpErrorKind};
use super::request::HttpRequest;
use super::response::HttpResponse;
use crate::cancellable::Cancellable;

/// Identifier of a task in the table.
pub(crate) type TaskId = u64;

/// Called once with the response headers of a successful download.
pub type ResponseCallback = Box<dyn FnOnce(&HttpResponse) + Send>;

/// Called with each received chunk and the download progress between 0.0 and
/// 1.0, or `None` when the expected length is unknown.
pub type ChunkCallback = Box<dyn FnMut(Bytes, Option<f64>) + Send>;

/// Events reported by the transport loop.
pub(super) enum TransportEvent {
    ResponseReceived(HttpResponse),
    DataReceived(Bytes),
    Completed(Option<HttpError>),
}

/// Outcome of routing an event to a task.
pub(super) enum Step {
    /// Keep transferring.
    Continue,
    /// The task reached its terminal state with this result.
    Finished(Result<HttpResponse, HttpError>),
    /// The task was already finished; the event was dropped.
    Ignored,
}

enum TaskState {
    Loading,
    Download {
        response: HttpResponse,
        read_bytes: u64,
    },
    Error {
        kind: HttpErrorKind,
        response: HttpResponse,
        body: BytesMut,
    },
    Finished,
}

/// State of one progressive download.
pub(super) struct Task {
    request: HttpRequest,
    range: Option<Range<u64>>,
    state: TaskState,
    on_response: Option<ResponseCallback>,
    on_chunk: ChunkCallback,
    delivered_data: bool,
    cancellable: Cancellable,
}

impl Task {
    pub(super) fn new(
        request: HttpRequest,
        range: Option<Range<u64>>,
        on_response: Option<ResponseCallback>,
        on_chunk: ChunkCallback,
        cancellable: Cancellable,
    ) -> Self {
        Self {
            request,
            range,
            state: TaskState::Loading,
            on_response,
            on_chunk,
            delivered_data: false,
            cancellable,
        }
    }

    /// Starts a new attempt with `request`, after a recovery.
    fn restart(&mut self, request: HttpRequest) {
        self.request = request;
        self.state = TaskState::Loading;
    }

    fn handle(&mut self, event: TransportEvent) -> Step {
        let state = std::mem::replace(&mut self.state, TaskState::Loading);
        match (state, event) {
            (TaskState::Finished, _) => {
                self.state = TaskState::Finished;
                Step::Ignored
            }

            (TaskState::Loading, TransportEvent::ResponseReceived(response)) => {
                if let Some(kind) = HttpErrorKind::from_status(response.status) {
                    debug!(
                        url = %self.request.url(),
                        status = response.status,
                        %kind,
                        "request failed, collecting error body"
                    );
                    self.state = TaskState::Error {
                        kind,
                        response,
                        body: BytesMut::new(),
                    };
                    return Step::Continue;
                }

                if self.range.is_some() && !response.accepts_byte_ranges() {
                    return self.finish(Err(HttpError::byte_ranges_not_supported()));
                }

                if let Some(on_response) = self.on_response.take() {
                    on_response(&response);
                }
                self.state = TaskState::Download {
                    response,
                    read_bytes: 0,
                };
                Step::Continue
            }

            (
                TaskState::Download {
                    response,
                    read_bytes,
                },
                TransportEvent::DataReceived(data),
            ) => {
                let read_bytes = read_bytes + data.len() as u64;
                let progress = progress(read_bytes, response.content_length());
                self.delivered_data = true;
                (self.on_chunk)(data, progress);
                self.state = TaskState::Download {
                    response,
                    read_bytes,
                };
                Step::Continue
            }

            (
                TaskState::Error {
                    kind,
                    response,
                    mut body,
                },
                TransportEvent::DataReceived(data),
            ) => {
                body.extend_from_slice(&data);
                self.state = TaskState::Error {
                    kind,
                    response,
                    body,
                };
                Step::Continue
            }

            (_, TransportEvent::Completed(Some(error))) => self.finish(Err(error)),

            (TaskState::Download { response, .. }, TransportEvent::Completed(None)) => {
                self.finish(Ok(response))
            }

            (
                TaskState::Error {
                    kind,
                    response,
                    body,
                },
                TransportEvent::Completed(None),
            ) => {
                let error =
                    HttpError::from_response(kind, response.media_type, Some(body.freeze()))
                        .with_status(response.status);
                self.finish(Err(error))
            }

            (TaskState::Loading, TransportEvent::Completed(None)) => self.finish(Err(
                HttpError::with_message(HttpErrorKind::MalformedResponse, "no response received"),
            )),

            (state, TransportEvent::DataReceived(_)) => {
                warn!(url = %self.request.url(), "dropping data received before the response");
                self.state = state;
                Step::Continue
            }

            (state, TransportEvent::ResponseReceived(_)) => {
                warn!(url = %self.request.url(), "dropping unexpected second response");
                self.state = state;
                Step::Continue
            }
        }
    }

    fn finish(&mut self, result: Result<HttpResponse, HttpError>) -> Step {
        self.state = TaskState::Finished;
        Step::Finished(result)
    }
}

#[allow(clippy::cast_precision_loss)]
fn progress(read_bytes: u64, expected: Option<u64>) -> Option<f64> {
    match expected {
        Some(0) => Some(1.0),
        Some(expected) => Some((read_bytes as f64 / expected as f64).clamp(0.0, 1.0)),
        None => None,
    }
}

/// Table of the in-flight tasks of a client, keyed by task identity.
#[derive(Default)]
pub(super) struct TaskTable {
    tasks: DashMap<TaskId, Arc<Mutex<Task>>>,
}

impl TaskTable {
    pub(super) fn insert(&self, id: TaskId, task: Task) {
        self.tasks.insert(id, Arc::new(Mutex::new(task)));
    }

    pub(super) fn remove(&self, id: TaskId) {
        self.tasks.remove(&id);
    }

    /// Returns the number of tracked tasks.
    pub(super) fn len(&self) -> usize {
        self.tasks.len()
    }

    fn get(&self, id: TaskId) -> Option<Arc<Mutex<Task>>> {
        // Clone out of the map so callbacks never run under a shard lock.
        let task = self.tasks.get(&id).map(|entry| Arc::clone(entry.value()));
        if task.is_none() {
            warn!(task = id, "no task found for transport event");
        }
        task
    }

    /// Routes a transport event to the task `id`.
    ///
    /// Returns `None` when the task is unknown; the event is then dropped.
    pub(super) fn route(&self, id: TaskId, event: TransportEvent) -> Option<Step> {
        let task = self.get(id)?;
        let mut task = task.lock().unwrap_or_else(PoisonError::into_inner);
        Some(task.handle(event))
    }

    /// Resets the task `id` for a new attempt with `request`.
    pub(super) fn restart(&self, id: TaskId, request: HttpRequest) {
        if let Some(task) = self.get(id) {
            task.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .restart(request);
        }
    }

    /// Returns true once the task delivered body bytes to its consumer.
    pub(super) fn delivered_data(&self, id: TaskId) -> bool {
        self.get(id).is_some_and(|task| {
            task.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .delivered_data
        })
    }

    /// Cancels every tracked task.
    pub(super) fn cancel_all(&self) {
        for entry in &self.tasks {
            entry
                .value()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .cancellable
                .cancel();
        }
    }
}
