//! Session bookkeeping service
//!
//! The local session lifecycle is authoritative; these calls are
//! notifications whose failures the controller logs and swallows.

use futures::future::BoxFuture;
use serde::Serialize;
use std::time::Duration;

use crate::config::SessionServiceConfig;
use crate::error::{FormcoachError, SessionError};

/// Remote session start/end notifications
pub trait SessionService: Send + Sync {
    fn start(&self, target_reps: u32) -> BoxFuture<'static, Result<(), SessionError>>;
    fn end(&self) -> BoxFuture<'static, Result<(), SessionError>>;
}

#[derive(Debug, Serialize)]
struct StartRequest {
    target_reps: u32,
}

/// POSTs to `<base_url>/session/start` and `<base_url>/session/end`
#[derive(Debug, Clone)]
pub struct HttpSessionService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionService {
    pub fn new(config: &SessionServiceConfig) -> Result<Self, FormcoachError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SessionError::Service(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn post<T: Serialize + Send + 'static>(
        &self,
        path: &'static str,
        body: Option<T>,
    ) -> BoxFuture<'static, Result<(), SessionError>> {
        let client = self.client.clone();
        let url = format!("{}{}", self.base_url, path);

        Box::pin(async move {
            let mut request = client.post(&url);
            if let Some(ref body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| SessionError::Service(format!("{}: {}", url, e)))?;

            if !response.status().is_success() {
                return Err(SessionError::Service(format!(
                    "{} returned {}",
                    url,
                    response.status()
                )));
            }
            Ok(())
        })
    }
}

impl SessionService for HttpSessionService {
    fn start(&self, target_reps: u32) -> BoxFuture<'static, Result<(), SessionError>> {
        self.post("/session/start", Some(StartRequest { target_reps }))
    }

    fn end(&self) -> BoxFuture<'static, Result<(), SessionError>> {
        self.post::<()>("/session/end", None)
    }
}

/// Used when remote bookkeeping is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionService;

impl SessionService for NoopSessionService {
    fn start(&self, _target_reps: u32) -> BoxFuture<'static, Result<(), SessionError>> {
        Box::pin(async { Ok(()) })
    }

    fn end(&self) -> BoxFuture<'static, Result<(), SessionError>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<String>>>;

    async fn spawn_server(seen: Seen) -> String {
        let router = Router::new()
            .route(
                "/session/start",
                post(
                    |State(seen): State<Seen>, Json(body): Json<serde_json::Value>| async move {
                        seen.lock().unwrap().push(format!("start:{}", body["target_reps"]));
                        StatusCode::OK
                    },
                ),
            )
            .route(
                "/session/end",
                post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .with_state(seen);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_start_and_failing_end() {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let base_url = spawn_server(Arc::clone(&seen)).await;

        let service = HttpSessionService::new(&SessionServiceConfig {
            enabled: true,
            base_url,
            timeout_ms: 2000,
        })
        .unwrap();

        service.start(10).await.unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), ["start:10"]);

        let err = service.end().await.unwrap_err();
        assert!(matches!(err, SessionError::Service(_)));
    }
}
