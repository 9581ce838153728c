//! Asking the user for a label or a yes/no answer.
//!
//! The controller only sees [`Prompt`]. [`BlockingPrompt`] answers on the
//! spot (a native dialog); [`ModalPrompt`] parks the request until the UI
//! answers it through a [`ModalHandle`].

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;

#[async_trait(?Send)]
pub trait Prompt {
    /// `None` means the user cancelled.
    async fn request_text(&mut self, message: &str, default: &str) -> Option<String>;

    async fn confirm(&mut self, message: &str) -> bool;
}

type AskFn = Box<dyn FnMut(&str, &str) -> Option<String>>;
type ConfirmFn = Box<dyn FnMut(&str) -> bool>;

/// Synchronous dialog wrapped in an already-resolved future.
pub struct BlockingPrompt {
    ask: AskFn,
    confirm: ConfirmFn,
}

impl BlockingPrompt {
    pub fn new(
        ask: impl FnMut(&str, &str) -> Option<String> + 'static,
        confirm: impl FnMut(&str) -> bool + 'static,
    ) -> Self {
        Self {
            ask: Box::new(ask),
            confirm: Box::new(confirm),
        }
    }

    /// Cancels every text request and declines every confirmation.
    pub fn declining() -> Self {
        Self::new(|_, _| None, |_| false)
    }

    /// Accepts every default and every confirmation.
    pub fn accepting() -> Self {
        Self::new(|_, default| Some(default.to_string()), |_| true)
    }
}

#[async_trait(?Send)]
impl Prompt for BlockingPrompt {
    async fn request_text(&mut self, message: &str, default: &str) -> Option<String> {
        (self.ask)(message, default)
    }

    async fn confirm(&mut self, message: &str) -> bool {
        (self.confirm)(message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModalKind {
    Text { default: String },
    Confirm,
}

#[derive(Debug)]
enum ModalReply {
    Submit(String),
    Accept,
}

struct PendingModal {
    message: String,
    kind: ModalKind,
    reply: oneshot::Sender<ModalReply>,
}

type Slot = Rc<RefCell<Option<PendingModal>>>;

/// Non-blocking modal: the request stays open until answered. Opening a new
/// modal discards the previous one, which resolves as cancelled.
pub struct ModalPrompt {
    slot: Slot,
}

/// UI side of a [`ModalPrompt`].
#[derive(Clone)]
pub struct ModalHandle {
    slot: Slot,
}

impl ModalPrompt {
    pub fn new() -> (Self, ModalHandle) {
        let slot: Slot = Rc::new(RefCell::new(None));
        (Self { slot: slot.clone() }, ModalHandle { slot })
    }

    fn open(&self, message: &str, kind: ModalKind) -> oneshot::Receiver<ModalReply> {
        let (reply, rx) = oneshot::channel();
        let previous = self.slot.borrow_mut().replace(PendingModal {
            message: message.to_string(),
            kind,
            reply,
        });
        if previous.is_some() {
            tracing::debug!("replacing open modal");
        }
        rx
    }
}

#[async_trait(?Send)]
impl Prompt for ModalPrompt {
    async fn request_text(&mut self, message: &str, default: &str) -> Option<String> {
        let rx = self.open(
            message,
            ModalKind::Text {
                default: default.to_string(),
            },
        );
        match rx.await {
            Ok(ModalReply::Submit(value)) => Some(value),
            Ok(ModalReply::Accept) => Some(default.to_string()),
            Err(_) => None,
        }
    }

    async fn confirm(&mut self, message: &str) -> bool {
        let rx = self.open(message, ModalKind::Confirm);
        matches!(rx.await, Ok(ModalReply::Accept))
    }
}

impl ModalHandle {
    pub fn is_open(&self) -> bool {
        self.slot.borrow().is_some()
    }

    pub fn message(&self) -> Option<String> {
        self.slot.borrow().as_ref().map(|p| p.message.clone())
    }

    pub fn kind(&self) -> Option<ModalKind> {
        self.slot.borrow().as_ref().map(|p| p.kind.clone())
    }

    /// Confirm with the typed value. Returns false if nothing is open.
    pub fn submit(&self, value: &str) -> bool {
        self.answer(ModalReply::Submit(value.to_string()))
    }

    /// Confirm with the default value (Enter on an untouched input).
    pub fn accept(&self) -> bool {
        self.answer(ModalReply::Accept)
    }

    /// Close without answering (Escape, overlay click, cancel button).
    pub fn cancel(&self) -> bool {
        self.slot.borrow_mut().take().is_some()
    }

    fn answer(&self, reply: ModalReply) -> bool {
        match self.slot.borrow_mut().take() {
            Some(pending) => pending.reply.send(reply).is_ok(),
            None => false,
        }
    }
}
