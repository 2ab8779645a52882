//! Per-handler execution supervision.
//!
//! Every matched handler runs as its own tokio task so the dispatcher never
//! waits on plugin I/O. The supervisor wraps the handler future: a panic is
//! caught instead of taking the process down, and both panics and returned
//! errors get a correlation id that appears in the log entry and — where a
//! reply is possible — in a generic failure message to the chat. The raw
//! error never reaches the user.
//!
//! There is deliberately no join and no timeout: a hung handler runs until
//! it finishes or the process exits.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::error;
use uuid::Uuid;

use super::api::BotApi;
use crate::utils::embed_correlation_id;

/// Where the handled event came from, which decides who gets told about a
/// failure.
#[derive(Debug, Clone, Copy)]
pub enum Origin {
    Command { chat_id: i64 },
    Callback { chat_id: Option<i64> },
    Inline { user_id: i64 },
}

/// Launch a handler future as a supervised, fire-and-forget task.
pub fn spawn(
    api: Arc<dyn BotApi>,
    plugin: &'static str,
    origin: Origin,
    fut: BoxFuture<'static, anyhow::Result<()>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let correlation_id = Uuid::new_v4().to_string();
                error!(
                    correlation_id = %correlation_id,
                    component = plugin,
                    error = %err,
                    "Handler failed"
                );

                // Recoverable errors are only reported back for command
                // events; for callbacks and inline queries the platform
                // interaction is already complete.
                if let Origin::Command { chat_id } = origin {
                    notify(&api, chat_id, &correlation_id).await;
                }
            }
            Err(panic) => {
                let correlation_id = Uuid::new_v4().to_string();
                let reason = panic_message(&panic);
                error!(
                    correlation_id = %correlation_id,
                    component = plugin,
                    panic = %reason,
                    "Handler panicked"
                );

                match origin {
                    Origin::Command { chat_id } => notify(&api, chat_id, &correlation_id).await,
                    Origin::Callback {
                        chat_id: Some(chat_id),
                    } => notify(&api, chat_id, &correlation_id).await,
                    _ => {}
                }
            }
        }
    })
}

async fn notify(api: &Arc<dyn BotApi>, chat_id: i64, correlation_id: &str) {
    let text = format!(
        "❌ An error occurred.{}",
        embed_correlation_id(correlation_id)
    );
    // Best effort; a failing failure report is only worth a log line.
    if let Err(err) = api.send_message(chat_id, &text).await {
        error!(error = %err, chat_id, "Failed to deliver failure notice");
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::{ApiCall, MockApi};

    #[tokio::test]
    async fn panic_is_caught_and_reported_for_commands() {
        let api = Arc::new(MockApi::default());

        let handle = spawn(
            api.clone(),
            "test",
            Origin::Command { chat_id: 10 },
            Box::pin(async { panic!("boom") }),
        );
        handle.await.unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            ApiCall::SendMessage { chat_id, text } => {
                assert_eq!(*chat_id, 10);
                assert!(text.contains("An error occurred"));
                assert!(!text.contains("boom"));
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn panic_is_reported_for_callbacks_with_chat() {
        let api = Arc::new(MockApi::default());

        let handle = spawn(
            api.clone(),
            "test",
            Origin::Callback { chat_id: Some(-3) },
            Box::pin(async { panic!("kaboom") }),
        );
        handle.await.unwrap();

        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn recoverable_error_is_silent_for_callbacks() {
        let api = Arc::new(MockApi::default());

        let handle = spawn(
            api.clone(),
            "test",
            Origin::Callback { chat_id: Some(-3) },
            Box::pin(async { Err(anyhow::anyhow!("nope")) }),
        );
        handle.await.unwrap();

        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn recoverable_error_is_reported_for_commands() {
        let api = Arc::new(MockApi::default());

        let handle = spawn(
            api.clone(),
            "test",
            Origin::Command { chat_id: 4 },
            Box::pin(async { Err(anyhow::anyhow!("nope")) }),
        );
        handle.await.unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            ApiCall::SendMessage { text, .. } => assert!(!text.contains("nope")),
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_produces_no_output() {
        let api = Arc::new(MockApi::default());

        let handle = spawn(
            api.clone(),
            "test",
            Origin::Inline { user_id: 1 },
            Box::pin(async { Ok(()) }),
        );
        handle.await.unwrap();

        assert!(api.calls().is_empty());
    }
}
