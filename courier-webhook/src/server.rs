//! Webhook HTTP server

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use courier_bus::{DomainEvent, EventBus};
use courier_common::{EmailId, Signal};
use courier_store::SendStore;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::warn;

use crate::{WebhookConfig, WebhookError};

/// Shared state for the webhook handlers
#[derive(Debug, Clone)]
pub struct WebhookState {
    pub store: Arc<dyn SendStore>,
    pub bus: EventBus,
}

/// Webhook HTTP server
///
/// Exposes `POST /webhooks/open` and `POST /webhooks/reply`.
pub struct WebhookServer {
    listener: TcpListener,
    router: Router,
}

impl WebhookServer {
    /// Create a new webhook server
    ///
    /// # Errors
    /// Returns an error if binding to the configured address fails.
    pub async fn new(config: WebhookConfig, state: WebhookState) -> Result<Self, WebhookError> {
        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|e| WebhookError::BindError {
                address: config.listen_address.clone(),
                source: e,
            })?;

        tracing::info!(
            address = %config.listen_address,
            "Webhook server bound successfully"
        );

        let router = router(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.request_timeout_secs,
            )));

        Ok(Self { listener, router })
    }

    /// The local address the server is bound to
    ///
    /// # Errors
    /// Returns an error if the listener's address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the webhook server until a shutdown signal is received
    ///
    /// # Errors
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), WebhookError> {
        tracing::info!("Webhook server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Webhook server received shutdown signal");
            })
            .await
            .map_err(|e| WebhookError::ServerError(e.to_string()))?;

        tracing::info!("Webhook server stopped");
        Ok(())
    }
}

/// Build the webhook router over the given state
///
/// Exposed separately so handler behavior can be tested without binding a
/// socket.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhooks/open", post(open_handler))
        .route("/webhooks/reply", post(reply_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct OpenWebhook {
    email_id: String,
}

#[derive(Debug, Deserialize)]
struct ReplyWebhook {
    email_id: String,
    reply_subject: Option<String>,
    reply_body: Option<String>,
}

/// Resolve the referenced send record, or produce the 404 response
async fn resolve_email(state: &WebhookState, raw_id: &str) -> Result<EmailId, Response> {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown email" })),
        )
            .into_response()
    };

    let Some(id) = EmailId::parse(raw_id) else {
        return Err(not_found());
    };

    match state.store.find(&id).await {
        Ok(Some(_)) => Ok(id),
        Ok(None) => Err(not_found()),
        Err(e) => {
            warn!(email_id = %id, error = %e, "Store lookup failed for webhook");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "store unavailable" })),
            )
                .into_response())
        }
    }
}

fn accepted() -> Response {
    (
        StatusCode::ACCEPTED,
        Json(json!({ "accepted": true, "timestamp": Utc::now() })),
    )
        .into_response()
}

/// Open-tracking pixel hit
///
/// Publishes `EMAIL_OPENED` and returns immediately; consumers do their
/// work asynchronously.
async fn open_handler(
    State(state): State<WebhookState>,
    Json(payload): Json<OpenWebhook>,
) -> Response {
    let email_id = match resolve_email(&state, &payload.email_id).await {
        Ok(id) => id,
        Err(response) => return response,
    };

    state.bus.publish(DomainEvent::EmailOpened {
        email_id,
        opened_at: Utc::now(),
    });

    accepted()
}

/// Inbound-reply notification
async fn reply_handler(
    State(state): State<WebhookState>,
    Json(payload): Json<ReplyWebhook>,
) -> Response {
    let email_id = match resolve_email(&state, &payload.email_id).await {
        Ok(id) => id,
        Err(response) => return response,
    };

    state.bus.publish(DomainEvent::EmailReplied {
        email_id,
        reply_subject: payload.reply_subject,
        reply_body: payload.reply_body,
        replied_at: Utc::now(),
    });

    accepted()
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use courier_bus::{EventFilter, EventKind};
    use courier_store::{Email, MemoryStore, SendPayload};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    async fn state_with_email() -> (WebhookState, EmailId) {
        let store = Arc::new(MemoryStore::new());
        let email = Email::pending(
            "k1",
            SendPayload {
                user_id: "u1".into(),
                prospect_id: "p1".into(),
                draft_id: "d1".into(),
                campaign_id: None,
                from_email: "rep@corp.example".into(),
                to_email: "lead@acme.example".into(),
                subject: "Hello".into(),
                body_html: "<p>Hello</p>".into(),
                body_text: "Hello".into(),
            },
        );
        store.insert(&email).await.unwrap();

        (
            WebhookState {
                store,
                bus: EventBus::new(16),
            },
            email.id,
        )
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_publishes_and_returns_202() {
        let (state, id) = state_with_email().await;
        let mut subscription = state
            .bus
            .subscribe(EventFilter::only(&[EventKind::EmailOpened]));

        let response = router(state)
            .oneshot(post_json(
                "/webhooks/open",
                json!({ "email_id": id.to_string() }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["accepted"], true);
        assert!(value["timestamp"].is_string());

        let event = subscription.recv().await.unwrap();
        assert_eq!(event.email_id(), id);
    }

    #[tokio::test]
    async fn test_reply_carries_payload() {
        let (state, id) = state_with_email().await;
        let mut subscription = state
            .bus
            .subscribe(EventFilter::only(&[EventKind::EmailReplied]));

        let response = router(state)
            .oneshot(post_json(
                "/webhooks/reply",
                json!({
                    "email_id": id.to_string(),
                    "reply_subject": "Re: Hello",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);

        match subscription.recv().await.unwrap() {
            DomainEvent::EmailReplied {
                email_id,
                reply_subject,
                reply_body,
                ..
            } => {
                assert_eq!(email_id, id);
                assert_eq!(reply_subject.as_deref(), Some("Re: Hello"));
                assert!(reply_body.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_email_is_404_and_publishes_nothing() {
        let (state, _) = state_with_email().await;
        let mut subscription = state.bus.subscribe(EventFilter::all());
        let bus = state.bus.clone();

        let response = router(state)
            .oneshot(post_json(
                "/webhooks/open",
                json!({ "email_id": EmailId::generate().to_string() }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Publishing a sentinel proves nothing else was published before it
        bus.publish(DomainEvent::EmailQueued {
            email_id: EmailId::generate(),
        });
        let event = subscription.recv().await.unwrap();
        assert_eq!(event.kind(), EventKind::EmailQueued);
    }

    #[tokio::test]
    async fn test_garbage_email_id_is_404() {
        let (state, _) = state_with_email().await;

        let response = router(state)
            .oneshot(post_json(
                "/webhooks/open",
                json!({ "email_id": "not-a-ulid" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
