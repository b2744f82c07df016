//! Asynchronous confirmation gate for irreversible operations
//!
//! A caller awaits `request_confirm`; the operator answers through
//! `confirm`/`cancel`/`dismiss`. Only one prompt is shown at a time.
//! Requests arriving while a prompt is open wait in FIFO order and are shown
//! once the current one resolves.

use crate::errors::ClientResult;
use crate::logger::{self, LogTag};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{oneshot, watch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOptions {
    pub title: String,
    pub message: String,
    pub confirm_text: String,
    pub cancel_text: String,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            title: "Confirm".to_string(),
            message: String::new(),
            confirm_text: "Confirm".to_string(),
            cancel_text: "Cancel".to_string(),
        }
    }
}

impl ConfirmOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn confirm_text(mut self, text: impl Into<String>) -> Self {
        self.confirm_text = text.into();
        self
    }

    pub fn cancel_text(mut self, text: impl Into<String>) -> Self {
        self.cancel_text = text.into();
        self
    }
}

/// The prompt currently shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub confirm_text: String,
    pub cancel_text: String,
}

struct ConfirmRequest {
    prompt: ConfirmPrompt,
    responder: oneshot::Sender<bool>,
}

#[derive(Default)]
struct GateState {
    active: Option<ConfirmRequest>,
    waiting: VecDeque<ConfirmRequest>,
}

pub struct ConfirmationGate {
    state: Mutex<GateState>,
    updates: watch::Sender<Option<ConfirmPrompt>>,
    next_id: AtomicU64,
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationGate {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            state: Mutex::new(GateState::default()),
            updates,
            next_id: AtomicU64::new(1),
        }
    }

    /// Ask the operator; resolves to `true` only on an explicit confirm
    ///
    /// The request is queued immediately, not when the future is first
    /// polled. If the gate is dropped first the answer is `false`.
    pub fn request_confirm(&self, options: ConfirmOptions) -> impl Future<Output = bool> + Send + 'static {
        let (responder, answer) = oneshot::channel();
        let prompt = ConfirmPrompt {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            title: options.title,
            message: options.message,
            confirm_text: options.confirm_text,
            cancel_text: options.cancel_text,
        };
        logger::debug(LogTag::Confirm, &format!("Requested #{}: {}", prompt.id, prompt.title));

        let mut state = self.state.lock();
        let request = ConfirmRequest { prompt, responder };
        if state.active.is_none() {
            state.active = Some(request);
            self.publish(&state);
        } else {
            state.waiting.push_back(request);
        }
        drop(state);

        async move { answer.await.unwrap_or(false) }
    }

    /// Run `action` only if the operator confirms; `Ok(None)` when declined
    pub async fn run_confirmed<T, F, Fut>(&self, options: ConfirmOptions, action: F) -> ClientResult<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        if !self.request_confirm(options).await {
            return Ok(None);
        }
        action().await.map(Some)
    }

    pub fn confirm(&self) -> bool {
        self.resolve(true, "confirmed")
    }

    pub fn cancel(&self) -> bool {
        self.resolve(false, "cancelled")
    }

    /// Close without a choice (escape, click-away)
    pub fn dismiss(&self) -> bool {
        self.resolve(false, "dismissed")
    }

    pub fn current(&self) -> Option<ConfirmPrompt> {
        self.state.lock().active.as_ref().map(|request| request.prompt.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ConfirmPrompt>> {
        self.updates.subscribe()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Requests waiting behind the open prompt
    pub fn queued(&self) -> usize {
        self.state.lock().waiting.len()
    }

    /// Answer the open prompt and show the next live one; false if none was open
    fn resolve(&self, answer: bool, verb: &str) -> bool {
        let mut state = self.state.lock();
        let Some(request) = state.active.take() else {
            return false;
        };

        logger::debug(
            LogTag::Confirm,
            &format!("#{} {}: {}", request.prompt.id, verb, request.prompt.title),
        );
        // The requester may have stopped waiting
        let _ = request.responder.send(answer);

        while let Some(next) = state.waiting.pop_front() {
            if next.responder.is_closed() {
                continue;
            }
            state.active = Some(next);
            break;
        }
        self.publish(&state);
        true
    }

    fn publish(&self, state: &GateState) {
        self.updates
            .send_replace(state.active.as_ref().map(|request| request.prompt.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClientError;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_confirm_resolves_true_and_closes() {
        let gate = ConfirmationGate::new();
        let answer = gate.request_confirm(ConfirmOptions::titled("Remove Signal"));

        let shown = gate.current().unwrap();
        assert_eq!(shown.title, "Remove Signal");
        assert_eq!(shown.confirm_text, "Confirm");
        assert_eq!(shown.cancel_text, "Cancel");

        assert!(gate.confirm());
        assert!(answer.await);
        assert_eq!(gate.current(), None);
    }

    #[tokio::test]
    async fn test_cancel_and_dismiss_resolve_false() {
        let gate = ConfirmationGate::new();

        let cancelled = gate.request_confirm(ConfirmOptions::titled("Remove Signal"));
        gate.cancel();
        assert!(!cancelled.await);

        let dismissed = gate.request_confirm(ConfirmOptions::titled("Close Position"));
        gate.dismiss();
        assert!(!dismissed.await);
        assert!(!gate.is_open());
    }

    #[tokio::test]
    async fn test_resolving_with_nothing_open_is_noop() {
        let gate = ConfirmationGate::new();
        assert!(!gate.confirm());
        assert!(!gate.dismiss());
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_queued() {
        let gate = ConfirmationGate::new();
        let mut prompts = gate.subscribe();

        let first = gate.request_confirm(ConfirmOptions::titled("Promote Signal"));
        let second = gate.request_confirm(ConfirmOptions::titled("Force Stop"));

        assert_eq!(gate.queued(), 1);
        assert_eq!(prompts.borrow_and_update().as_ref().map(|p| p.title.clone()).as_deref(), Some("Promote Signal"));

        gate.confirm();
        assert!(first.await);
        assert_eq!(gate.current().map(|p| p.title).as_deref(), Some("Force Stop"));
        assert!(prompts.has_changed().unwrap());

        gate.cancel();
        assert!(!second.await);
        assert_eq!(*prompts.borrow(), None);
    }

    #[tokio::test]
    async fn test_abandoned_waiting_request_is_skipped() {
        let gate = ConfirmationGate::new();
        let first = gate.request_confirm(ConfirmOptions::titled("First"));
        drop(gate.request_confirm(ConfirmOptions::titled("Abandoned")));
        let third = gate.request_confirm(ConfirmOptions::titled("Third"));

        gate.confirm();
        assert!(first.await);
        assert_eq!(gate.current().map(|p| p.title).as_deref(), Some("Third"));
        gate.confirm();
        assert!(third.await);
    }

    #[tokio::test]
    async fn test_dropped_gate_rejects() {
        let gate = ConfirmationGate::new();
        let answer = gate.request_confirm(ConfirmOptions::default());
        drop(gate);
        assert!(!answer.await);
    }

    #[tokio::test]
    async fn test_run_confirmed_skips_action_on_cancel() {
        let gate = Arc::new(ConfirmationGate::new());
        let ran = Arc::new(AtomicBool::new(false));

        let task = {
            let gate = gate.clone();
            let ran = ran.clone();
            tokio::spawn(async move {
                gate.run_confirmed(ConfirmOptions::titled("Force Close"), || async move {
                    ran.store(true, Ordering::SeqCst);
                    Ok::<_, ClientError>(42)
                })
                .await
            })
        };

        while !gate.is_open() {
            tokio::task::yield_now().await;
        }
        gate.cancel();

        assert_eq!(task.await.unwrap(), Ok(None));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_run_confirmed_runs_action_on_confirm() {
        let gate = Arc::new(ConfirmationGate::new());
        let task = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.run_confirmed(ConfirmOptions::titled("Promote Signal"), || async {
                    Ok::<_, ClientError>("done")
                })
                .await
            })
        };

        while !gate.is_open() {
            tokio::task::yield_now().await;
        }
        gate.confirm();

        assert_eq!(task.await.unwrap(), Ok(Some("done")));
    }
}
