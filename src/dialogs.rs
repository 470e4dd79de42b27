//! Awaitable confirm/alert/prompt dialogs for the admin console.
//!
//! Calling code awaits the answer while the UI renders the dialog at the head of
//! each queue and reports the user's action back through the `answer_*` methods.
//! Each kind keeps its own FIFO queue, so a second `confirm` while one is open
//! waits its turn instead of replacing the first.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDialog {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDialog {
    pub title: String,
    pub message: String,
    pub kind: AlertKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptDialog {
    pub title: String,
    pub message: String,
    pub placeholder: Option<String>,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Idle,
    AwaitingUserResponse,
}

struct Pending<D, T> {
    dialog: D,
    // None for fire-and-forget notices
    reply: Option<oneshot::Sender<T>>,
}

impl<D, T> Pending<D, T> {
    fn resolve(self, value: T) {
        if let Some(reply) = self.reply {
            // The caller may have stopped waiting; that is fine
            let _ = reply.send(value);
        }
    }
}

#[derive(Default)]
struct Queues {
    confirms: VecDeque<Pending<ConfirmDialog, bool>>,
    alerts: VecDeque<Pending<AlertDialog, ()>>,
    prompts: VecDeque<Pending<PromptDialog, Option<String>>>,
}

#[derive(Default)]
pub struct Dialogs {
    queues: Mutex<Queues>,
}

impl Dialogs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Queues> {
        self.queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ----------------- Caller side -----------------

    /// Resolves to `true` when the user confirms and `false` on cancel.
    pub fn confirm(
        &self,
        message: impl Into<String>,
        title: impl Into<String>,
    ) -> impl Future<Output = bool> {
        let (tx, rx) = oneshot::channel();
        self.lock().confirms.push_back(Pending {
            dialog: ConfirmDialog {
                title: title.into(),
                message: message.into(),
            },
            reply: Some(tx),
        });
        async move { rx.await.unwrap_or(false) }
    }

    /// Resolves once the alert is dismissed.
    pub fn alert(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: AlertKind,
    ) -> impl Future<Output = ()> {
        let (tx, rx) = oneshot::channel();
        self.push_alert(title.into(), message.into(), kind, Some(tx));
        async move {
            let _ = rx.await;
        }
    }

    /// Shows an alert without waiting for it to be dismissed.
    pub fn notify(&self, title: impl Into<String>, message: impl Into<String>, kind: AlertKind) {
        self.push_alert(title.into(), message.into(), kind, None);
    }

    fn push_alert(
        &self,
        title: String,
        message: String,
        kind: AlertKind,
        reply: Option<oneshot::Sender<()>>,
    ) {
        match kind {
            AlertKind::Error => tracing::warn!(%title, %message, "showing error alert"),
            _ => tracing::debug!(%title, %message, "showing alert"),
        }
        self.lock().alerts.push_back(Pending {
            dialog: AlertDialog {
                title,
                message,
                kind,
            },
            reply,
        });
    }

    /// Resolves to the entered text, or `None` when the prompt is cancelled.
    pub fn prompt(
        &self,
        message: impl Into<String>,
        title: impl Into<String>,
        placeholder: Option<String>,
        default_value: Option<String>,
    ) -> impl Future<Output = Option<String>> {
        let (tx, rx) = oneshot::channel();
        self.lock().prompts.push_back(Pending {
            dialog: PromptDialog {
                title: title.into(),
                message: message.into(),
                placeholder,
                default_value,
            },
            reply: Some(tx),
        });
        async move { rx.await.unwrap_or(None) }
    }

    // ----------------- UI side -----------------

    pub fn state(&self) -> DialogState {
        let queues = self.lock();
        if queues.confirms.is_empty() && queues.alerts.is_empty() && queues.prompts.is_empty() {
            DialogState::Idle
        } else {
            DialogState::AwaitingUserResponse
        }
    }

    pub fn visible_confirm(&self) -> Option<ConfirmDialog> {
        self.lock().confirms.front().map(|p| p.dialog.clone())
    }

    pub fn visible_alert(&self) -> Option<AlertDialog> {
        self.lock().alerts.front().map(|p| p.dialog.clone())
    }

    pub fn visible_prompt(&self) -> Option<PromptDialog> {
        self.lock().prompts.front().map(|p| p.dialog.clone())
    }

    /// Number of dialogs waiting behind the visible ones, all kinds together.
    pub fn queued(&self) -> usize {
        let queues = self.lock();
        let waiting = |len: usize| len.saturating_sub(1);
        waiting(queues.confirms.len()) + waiting(queues.alerts.len()) + waiting(queues.prompts.len())
    }

    /// Returns false when no confirm dialog was open.
    pub fn answer_confirm(&self, accepted: bool) -> bool {
        let pending = self.lock().confirms.pop_front();
        match pending {
            Some(pending) => {
                pending.resolve(accepted);
                true
            }
            None => false,
        }
    }

    pub fn dismiss_alert(&self) -> bool {
        let pending = self.lock().alerts.pop_front();
        match pending {
            Some(pending) => {
                pending.resolve(());
                true
            }
            None => false,
        }
    }

    pub fn answer_prompt(&self, value: Option<String>) -> bool {
        let pending = self.lock().prompts.pop_front();
        match pending {
            Some(pending) => {
                pending.resolve(value);
                true
            }
            None => false,
        }
    }

    /// Cancels everything, as if the user pressed escape on every dialog.
    pub fn cancel_all(&self) {
        let Queues {
            confirms,
            alerts,
            prompts,
        } = std::mem::take(&mut *self.lock());
        confirms.into_iter().for_each(|p| p.resolve(false));
        alerts.into_iter().for_each(|p| p.resolve(()));
        prompts.into_iter().for_each(|p| p.resolve(None));
    }
}
