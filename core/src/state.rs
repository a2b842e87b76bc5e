//! Observable service state.
//!
//! Each service keeps its state in a `StateCell`, a thin wrapper over a
//! `tokio::sync::watch` channel. Consumers either take a `snapshot()` or
//! `subscribe()` and await changes; the services never know who is
//! listening. Every mutation is a single `send_modify`, so an observer never
//! sees loading cleared without the matching result applied.

use tokio::sync::watch;

use crate::error::ApiError;

/// Loading flag and last error shared by every service state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestStatus {
    pub is_loading: bool,
    pub error_message: Option<String>,
}

/// State types that embed a `RequestStatus`.
pub trait Tracked: Clone + Send + Sync + 'static {
    fn status(&self) -> &RequestStatus;
    fn status_mut(&mut self) -> &mut RequestStatus;
}

#[derive(Debug)]
pub struct StateCell<S> {
    tx: watch::Sender<S>,
}

impl<S: Tracked> StateCell<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn snapshot(&self) -> S {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    /// Read without cloning.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn update(&self, f: impl FnOnce(&mut S)) {
        self.tx.send_modify(f);
    }

    /// Mark a tracked operation as started: loading on, last error cleared.
    pub fn begin(&self) {
        self.update(|s| {
            let status = s.status_mut();
            status.is_loading = true;
            status.error_message = None;
        });
    }

    /// Apply `on_success` and clear loading in one update.
    pub fn succeed(&self, on_success: impl FnOnce(&mut S)) {
        self.update(|s| {
            on_success(s);
            s.status_mut().is_loading = false;
        });
    }

    /// Record `err` for display and clear loading.
    pub fn fail(&self, err: &ApiError) {
        self.fail_with(err.user_message());
    }

    pub fn fail_with(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|s| {
            let status = s.status_mut();
            status.is_loading = false;
            status.error_message = Some(message);
        });
    }

    pub fn is_loading(&self) -> bool {
        self.read(|s| s.status().is_loading)
    }

    pub fn error_message(&self) -> Option<String> {
        self.read(|s| s.status().error_message.clone())
    }
}
