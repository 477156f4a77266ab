//! Suspend/resume boundary between a waiting tool call and the UI.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::{ConfirmationOutcome, ConfirmationRequest};

/// Create a single-shot confirmation exchange.
///
/// The caller awaits the [`PendingConfirmation`]; the UI answers through the
/// [`Responder`]. Dropping the responder resolves the wait as cancelled.
pub fn channel(request: ConfirmationRequest) -> (PendingConfirmation, Responder) {
    let (tx, rx) = oneshot::channel();
    (
        PendingConfirmation {
            rx,
            cancel: CancellationToken::new(),
        },
        Responder { request, tx },
    )
}

#[derive(Debug)]
pub struct PendingConfirmation {
    rx: oneshot::Receiver<ConfirmationOutcome>,
    cancel: CancellationToken,
}

impl PendingConfirmation {
    /// Resolve as cancelled when `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn wait(self) -> ConfirmationOutcome {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::debug!("Confirmation cancelled");
                ConfirmationOutcome::Cancelled
            }
            outcome = self.rx => outcome.unwrap_or_else(|_| {
                tracing::debug!("Confirmation responder dropped");
                ConfirmationOutcome::Cancelled
            }),
        }
    }
}

/// The UI side of a pending confirmation.
#[derive(Debug)]
pub struct Responder {
    request: ConfirmationRequest,
    tx: oneshot::Sender<ConfirmationOutcome>,
}

impl Responder {
    pub fn request(&self) -> &ConfirmationRequest {
        &self.request
    }

    /// Returns false when the waiting side is gone.
    pub fn respond(self, outcome: ConfirmationOutcome) -> bool {
        self.tx.send(outcome).is_ok()
    }

    pub fn cancel(self) -> bool {
        self.respond(ConfirmationOutcome::Cancelled)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Anything able to answer a confirmation request.
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    async fn confirm(&self, request: ConfirmationRequest) -> ConfirmationOutcome;
}

/// Forwards requests to a UI task as [`Responder`]s.
#[derive(Debug, Clone)]
pub struct ChannelConfirmationHandler {
    tx: mpsc::Sender<Responder>,
}

impl ChannelConfirmationHandler {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Responder>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ConfirmationHandler for ChannelConfirmationHandler {
    async fn confirm(&self, request: ConfirmationRequest) -> ConfirmationOutcome {
        let (pending, responder) = channel(request);
        if self.tx.send(responder).await.is_err() {
            tracing::warn!("Confirmation UI is gone; treating request as cancelled");
            return ConfirmationOutcome::Cancelled;
        }
        pending.wait().await
    }
}

/// Wait for `handler`, resolving as cancelled if `cancel` fires first.
pub async fn confirm_with_cancel<H>(
    handler: &H,
    request: ConfirmationRequest,
    cancel: &CancellationToken,
) -> ConfirmationOutcome
where
    H: ConfirmationHandler + ?Sized,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => ConfirmationOutcome::Cancelled,
        outcome = handler.confirm(request) => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation::{Answer, Prompt};
    use std::time::Duration;

    fn request() -> ConfirmationRequest {
        ConfirmationRequest::new("Run command")
            .prompt(Prompt::new("Proceed?", "Bash").option("Yes").option("No"))
    }

    #[tokio::test]
    async fn test_respond_resumes_waiter() {
        let (pending, responder) = channel(request());
        assert_eq!(responder.request().title, "Run command");

        let waiter = tokio::spawn(pending.wait());
        assert!(responder.respond(ConfirmationOutcome::single("Proceed?", Answer::selected("Yes"))));

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome.answer("Proceed?"), Some(&Answer::selected("Yes")));
    }

    #[tokio::test]
    async fn test_dropped_responder_cancels() {
        let (pending, responder) = channel(request());
        drop(responder);
        assert!(pending.wait().await.is_cancelled());
    }

    #[tokio::test]
    async fn test_token_cancels_pending() {
        let token = CancellationToken::new();
        let (pending, responder) = channel(request());
        let pending = pending.with_cancellation(token.clone());

        let waiter = tokio::spawn(pending.wait());
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        assert!(waiter.await.unwrap().is_cancelled());
        assert!(responder.is_closed());
        assert!(!responder.respond(ConfirmationOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_channel_handler_round_trip() {
        let (handler, mut rx) = ChannelConfirmationHandler::new(4);
        let ui = tokio::spawn(async move {
            let responder = rx.recv().await.unwrap();
            let question = responder.request().prompts[0].question.clone();
            responder.respond(ConfirmationOutcome::single(question, Answer::selected("No")));
        });

        let outcome = handler.confirm(request()).await;
        ui.await.unwrap();
        assert_eq!(outcome.answer("Proceed?"), Some(&Answer::selected("No")));
    }

    #[tokio::test]
    async fn test_channel_handler_without_ui() {
        let (handler, rx) = ChannelConfirmationHandler::new(1);
        drop(rx);
        assert!(handler.confirm(request()).await.is_cancelled());
    }

    #[tokio::test]
    async fn test_confirm_with_cancel() {
        let (handler, _rx) = ChannelConfirmationHandler::new(1);
        let token = CancellationToken::new();
        token.cancel();
        let outcome = confirm_with_cancel(&handler, request(), &token).await;
        assert!(outcome.is_cancelled());
    }
}
