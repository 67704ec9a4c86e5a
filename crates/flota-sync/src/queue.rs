// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use flota_app::Document;

use crate::{Client, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    PushSucceeded { url: String },
    PushFailed { url: String, error: SyncError },
}

#[derive(Debug)]
struct PushJob {
    url: String,
    document: Document,
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<PushJob>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    slot: Mutex<Slot>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Background pusher with a single pending slot. Enqueueing while a push is waiting
/// replaces it, so at most one push is in flight and the newest document always wins.
/// Failures are logged and reported as events; nothing is retried.
pub struct PushQueue {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl PushQueue {
    pub fn spawn(client: Client, events: Option<Sender<SyncEvent>>) -> Self {
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || run_worker(&worker_shared, &client, events.as_ref()));
        Self {
            shared,
            worker: Some(worker),
        }
    }

    pub fn enqueue(&self, url: &str, document: &Document) {
        let mut slot = self.shared.lock();
        if slot.closed {
            return;
        }
        if slot.pending.is_some() {
            log::debug!("replacing queued push with newer document");
        }
        slot.pending = Some(PushJob {
            url: url.to_owned(),
            document: document.clone(),
        });
        self.shared.ready.notify_one();
    }

    /// Finish any queued push and stop the worker.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.shared.lock().closed = true;
        self.shared.ready.notify_one();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("push worker panicked");
        }
    }
}

impl Drop for PushQueue {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(shared: &Shared, client: &Client, events: Option<&Sender<SyncEvent>>) {
    loop {
        let job = {
            let mut slot = shared.lock();
            loop {
                if let Some(job) = slot.pending.take() {
                    break job;
                }
                if slot.closed {
                    return;
                }
                slot = match shared.ready.wait(slot) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
            }
        };

        let event = match client.post_document(&job.url, &job.document) {
            Ok(()) => {
                log::info!("pushed document to sync endpoint");
                SyncEvent::PushSucceeded { url: job.url }
            }
            Err(error) => {
                log::warn!("background push failed: {error}");
                SyncEvent::PushFailed { url: job.url, error }
            }
        };
        if let Some(events) = events {
            let _ = events.send(event);
        }
    }
}
