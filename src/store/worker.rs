use crate::Result;
use ohno::IntoAppError;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Log target for the write worker
const LOG_TARGET: &str = "    worker";

/// A positioned write waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub offset: u64,
    pub payload: Vec<u8>,
}

/// Sent after every physical write: how many writes have landed out of how many were submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteProgress {
    pub completed: u64,
    pub total: u64,
}

#[derive(Debug, Default)]
struct Queue {
    requests: VecDeque<WriteRequest>,
    in_flight: bool,
    stopping: bool,
    stopped: bool,
    submitted: u64,
    completed: u64,
    failed: u64,
}

impl Queue {
    fn is_idle(&self) -> bool {
        self.requests.is_empty() && !self.in_flight
    }
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<Queue>,
    work_ready: Condvar,
    drained: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Serializes every write to one store file on a dedicated thread.
///
/// Writes are applied strictly in submission order. Submitting never blocks; callers that need
/// to read back what they wrote must [`drain`](Self::drain) first.
#[derive(Debug)]
pub struct WriteWorker {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
    progress: Receiver<WriteProgress>,
}

impl WriteWorker {
    /// Starts the worker thread, which takes ownership of `file` for writing.
    ///
    /// # Errors
    ///
    /// Fails if the thread cannot be spawned.
    pub fn spawn(file: File, name: &str) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let (sender, progress) = mpsc::channel();

        let thread_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name(format!("store-writer {name}"))
            .spawn(move || run(file, &thread_shared, &sender))
            .into_app_err("spawning the store write worker")?;

        Ok(Self {
            shared,
            thread: Some(thread),
            progress,
        })
    }

    /// Queues a write and returns immediately.
    pub fn submit(&self, offset: u64, payload: Vec<u8>) {
        let mut queue = self.shared.lock();
        if queue.stopping {
            log::warn!(target: LOG_TARGET, "Dropping write of {} bytes at {offset}: worker is shut down", payload.len());
            return;
        }

        queue.requests.push_back(WriteRequest { offset, payload });
        queue.submitted += 1;
        drop(queue);
        self.shared.work_ready.notify_one();
    }

    /// Blocks until every submitted write has been applied.
    pub fn drain(&self) {
        let mut queue = self.shared.lock();
        while !queue.is_idle() && !queue.stopped {
            queue = self.shared.drained.wait(queue).unwrap_or_else(PoisonError::into_inner);
        }
    }

    #[must_use]
    pub fn failed_writes(&self) -> u64 {
        self.shared.lock().failed
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.lock().requests.len()
    }

    /// Progress notifications received since the last call.
    pub fn progress(&self) -> impl Iterator<Item = WriteProgress> + '_ {
        self.progress.try_iter()
    }

    /// Stops the worker once its in-flight write finishes, abandoning anything still queued.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        let abandoned = {
            let mut queue = self.shared.lock();
            queue.stopping = true;
            queue.requests.len()
        };
        self.shared.work_ready.notify_all();

        if abandoned > 0 {
            log::debug!(target: LOG_TARGET, "Abandoning {abandoned} queued writes on shutdown");
        }

        if thread.join().is_err() {
            log::error!(target: LOG_TARGET, "Store write worker panicked");
        }
    }
}

impl Drop for WriteWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(mut file: File, shared: &Shared, sender: &Sender<WriteProgress>) {
    loop {
        let request = {
            let mut queue = shared.lock();
            loop {
                if queue.stopping {
                    queue.requests.clear();
                    queue.stopped = true;
                    drop(queue);
                    shared.drained.notify_all();
                    return;
                }

                if let Some(request) = queue.requests.pop_front() {
                    queue.in_flight = true;
                    break request;
                }

                queue = shared.work_ready.wait(queue).unwrap_or_else(PoisonError::into_inner);
            }
        };

        let outcome = write_at(&mut file, &request);

        let progress = {
            let mut queue = shared.lock();
            queue.in_flight = false;
            queue.completed += 1;
            if let Err(e) = outcome {
                queue.failed += 1;
                log::error!(target: LOG_TARGET, "Could not write {} bytes at offset {}: {e:#}", request.payload.len(), request.offset);
            }

            if queue.requests.is_empty() {
                shared.drained.notify_all();
            }

            WriteProgress {
                completed: queue.completed,
                total: queue.submitted,
            }
        };

        // The receiving side may already be gone during teardown
        let _ = sender.send(progress);
    }
}

fn write_at(file: &mut File, request: &WriteRequest) -> std::io::Result<()> {
    let _ = file.seek(SeekFrom::Start(request.offset))?;
    file.write_all(&request.payload)
}
