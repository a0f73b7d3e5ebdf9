//! HTTP endpoint for ID verification.
//!
//! `POST {verify_path}` with a JSON body `{ file, fullName, birthdate }`.
//! A well-formed request always gets 200 with a verdict; only a wrong
//! method or a malformed request gets a 4xx.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::domain::model::{ImageData, VerificationRequest};
use crate::domain::ports::IdentityVerifier;
use crate::domain::settings::ServerSettings;
use crate::utils::error::{Result, VerifyError};
use crate::utils::race::within;
use crate::utils::validation::validate_socket_addr;

pub type ResponseBody = Full<Bytes>;
pub type HttpResponse = Response<ResponseBody>;

pub const REASON_METHOD_NOT_ALLOWED: &str = "Method not allowed";
pub const REASON_NO_FILE: &str = "No image file uploaded.";
pub const REASON_INVALID_BODY: &str = "Invalid request body.";
pub const REASON_TOO_LARGE: &str = "Request body too large.";
pub const REASON_NOT_FOUND: &str = "Not found";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UploadBody {
    file: Option<String>,
    #[serde(rename = "fullName")]
    full_name: Option<String>,
    birthdate: Option<String>,
}

#[derive(Debug, Serialize)]
struct Failure<'a> {
    status: &'static str,
    reason: &'a str,
}

pub struct VerifyServer {
    verifier: Arc<dyn IdentityVerifier>,
    settings: ServerSettings,
}

impl VerifyServer {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, settings: ServerSettings) -> Self {
        Self { verifier, settings }
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = validate_socket_addr("server.bind_address", &self.settings.bind_address)?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("🌐 Listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Serves until `shutdown` resolves, then drains in-flight connections
    /// for at most `shutdown_timeout_seconds`.
    pub async fn run_until<S>(self, listener: TcpListener, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send,
    {
        let server = Arc::new(self);
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let stop = stop_rx.clone();
                        connections.spawn(async move {
                            if let Err(e) = server.serve_connection(stream, remote_addr, stop).await {
                                tracing::debug!("Connection error from {}: {}", remote_addr, e);
                            }
                        });
                    }
                    Err(e) => tracing::error!("Failed to accept connection: {}", e),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = &mut shutdown => {
                    tracing::info!("🛑 Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let _ = stop_tx.send(true);
        let limit = server.settings.shutdown_timeout();
        tracing::info!(
            "Waiting up to {:?} for {} connections to close",
            limit,
            connections.len()
        );

        let drained = within(limit, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        if drained.is_none() {
            tracing::warn!(
                "Shutdown timeout reached, aborting {} connections",
                connections.len()
            );
            connections.abort_all();
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn serve_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        mut stop: watch::Receiver<bool>,
    ) -> std::result::Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(&self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            _ = stop.changed() => {
                tracing::debug!("Closing connection from {} for shutdown", remote_addr);
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = if path == "/health" && method == Method::GET {
            json_response(StatusCode::OK, &serde_json::json!({ "status": "ok" }))
        } else if path != self.settings.verify_path {
            failure(StatusCode::NOT_FOUND, REASON_NOT_FOUND)
        } else if method != Method::POST {
            let mut response = failure(StatusCode::METHOD_NOT_ALLOWED, REASON_METHOD_NOT_ALLOWED);
            response
                .headers_mut()
                .insert(ALLOW, http::HeaderValue::from_static("POST"));
            response
        } else {
            match self.read_request(req).await {
                Ok(request) => {
                    let verdict = self.verifier.verify(request).await;
                    json_response(StatusCode::OK, &verdict)
                }
                Err(VerifyError::RequestShapeError { status, reason }) => failure(
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST),
                    &reason,
                ),
                Err(e) => {
                    tracing::error!("Unexpected error reading request: {}", e);
                    failure(StatusCode::BAD_REQUEST, REASON_INVALID_BODY)
                }
            }
        };

        tracing::debug!("{} {} -> {}", method, path, response.status());
        response
    }

    async fn read_request<B>(&self, req: Request<B>) -> Result<VerificationRequest>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let limit = self.settings.max_body_bytes;

        let declared = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > limit) {
            return Err(VerifyError::request_shape(413, REASON_TOO_LARGE));
        }

        let bytes = match Limited::new(req.into_body(), limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                return Err(VerifyError::request_shape(413, REASON_TOO_LARGE));
            }
            Err(e) => {
                tracing::warn!("Failed to read request body: {}", e);
                return Err(VerifyError::request_shape(400, REASON_INVALID_BODY));
            }
        };

        let body: UploadBody = serde_json::from_slice(&bytes)
            .map_err(|_| VerifyError::request_shape(400, REASON_INVALID_BODY))?;

        let file = body
            .file
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| VerifyError::request_shape(400, REASON_NO_FILE))?;

        Ok(VerificationRequest {
            image_data: ImageData::Base64(file),
            claimed_full_name: body.full_name.unwrap_or_default(),
            claimed_birthdate: body.birthdate.unwrap_or_default(),
        })
    }
}

fn failure(status: StatusCode, reason: &str) -> HttpResponse {
    json_response(
        status,
        &Failure {
            status: "failed",
            reason,
        },
    )
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    let payload = serde_json::to_vec(body)
        .unwrap_or_else(|_| br#"{"status":"failed","reason":"serialization error"}"#.to_vec());

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(payload)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ExtractedFields, VerificationVerdict};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records what reached the pipeline and answers with a fixed verdict.
    #[derive(Default)]
    struct RecordingVerifier {
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl IdentityVerifier for RecordingVerifier {
        async fn verify(&self, request: VerificationRequest) -> VerificationVerdict {
            self.seen
                .lock()
                .unwrap()
                .push((request.claimed_full_name, request.claimed_birthdate));
            VerificationVerdict::verified(ExtractedFields::default())
        }
    }

    fn server(settings: ServerSettings) -> (VerifyServer, Arc<RecordingVerifier>) {
        let verifier = Arc::new(RecordingVerifier::default());
        (VerifyServer::new(verifier.clone(), settings), verifier)
    }

    fn post(body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/verify-id")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn body_json(response: HttpResponse) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_non_post_is_405() {
        let (server, verifier) = server(ServerSettings::default());
        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/verify-id")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = server.handle(req).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "POST");
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "status": "failed", "reason": "Method not allowed" })
        );
        assert!(verifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_400() {
        let (server, _) = server(ServerSettings::default());
        let response = server.handle(post(r#"{"fullName":"Juan Dela Cruz"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["reason"], REASON_NO_FILE);
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let (server, _) = server(ServerSettings::default());
        let response = server.handle(post("{not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["reason"], REASON_INVALID_BODY);
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let settings = ServerSettings {
            max_body_bytes: 64,
            ..ServerSettings::default()
        };
        let (server, verifier) = server(settings);
        let big = format!(r#"{{"file":"{}"}}"#, "A".repeat(256));

        let response = server.handle(post(&big)).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(verifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_claims_default_to_empty() {
        let (server, verifier) = server(ServerSettings::default());
        let response = server.handle(post(r#"{"file":"data:image/png;base64,AAAA"}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            verifier.seen.lock().unwrap().as_slice(),
            &[(String::new(), String::new())]
        );
    }

    #[tokio::test]
    async fn test_health_and_unknown_path() {
        let (server, _) = server(ServerSettings::default());

        let health = Request::get("/health").body(Full::new(Bytes::new())).unwrap();
        assert_eq!(server.handle(health).await.status(), StatusCode::OK);

        let unknown = Request::post("/nope").body(Full::new(Bytes::new())).unwrap();
        assert_eq!(server.handle(unknown).await.status(), StatusCode::NOT_FOUND);
    }
}
