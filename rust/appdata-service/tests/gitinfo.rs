use std::sync::Arc;

use anyhow::Result;
use appdata_access::{Identity, Level};
use appdata_service::{
    AppData, AppDataConfig, AppDataError, ErrorKind, GitHubConfig, Method, ORGANIZATION_QUERY,
    Request,
};
use appdata_storage::MemoryDocumentBackend;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// What the local endpoint saw: the authorization header and JSON payload
type Received = Arc<Mutex<Vec<(Option<String>, Value)>>>;

/// A local stand-in for the GraphQL endpoint that answers every request with
/// one canned status and body
struct LocalGraphQl {
    endpoint: String,
    received: Received,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl LocalGraphQl {
    async fn start(status: u16, reply: Value) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let endpoint = format!("http://{}/graphql", listener.local_addr()?);
        let received = Received::default();
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let captured = received.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { continue };
                        let captured = captured.clone();
                        let reply = reply.clone();
                        let service = service_fn(move |request: hyper::Request<Incoming>| {
                            let captured = captured.clone();
                            let reply = reply.clone();
                            async move {
                                let authorization = request
                                    .headers()
                                    .get(hyper::header::AUTHORIZATION)
                                    .and_then(|value| value.to_str().ok())
                                    .map(str::to_owned);
                                let body = request.into_body().collect().await?.to_bytes();
                                let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                                captured.lock().push((authorization, payload));

                                let response = hyper::Response::builder()
                                    .status(status)
                                    .header(hyper::header::CONTENT_TYPE, "application/json")
                                    .body(Full::new(Bytes::from(reply.to_string())))?;
                                Ok::<_, anyhow::Error>(response)
                            }
                        });
                        tokio::spawn(async move {
                            let _ = http1::Builder::new()
                                .serve_connection(TokioIo::new(stream), service)
                                .await;
                        });
                    }
                }
            }
        });

        Ok(Self {
            endpoint,
            received,
            shutdown_tx,
        })
    }

    fn received(&self) -> Vec<(Option<String>, Value)> {
        self.received.lock().clone()
    }

    fn stop(self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn make_app(endpoint: &str, token: Option<&str>) -> Result<AppData<MemoryDocumentBackend>> {
    let config = AppDataConfig::new("acme").with_github(GitHubConfig {
        endpoint: endpoint.to_owned(),
        token: token.map(str::to_owned),
        timeout_seconds: Some(5),
    });
    Ok(AppData::new(config, MemoryDocumentBackend::default())?)
}

fn reader() -> Identity {
    Identity::new("alice@example.com", Level::ReadOnly)
}

#[test_log::test(tokio::test)]
async fn it_passes_the_upstream_reply_through() -> Result<()> {
    let reply = json!({
        "data": {
            "organization": {
                "login": "rust-lang",
                "repositories": { "nodes": [{ "name": "rust", "issues": { "totalCount": 1 } }] }
            }
        }
    });
    let server = LocalGraphQl::start(200, reply.clone()).await?;
    let app = make_app(&server.endpoint, Some("ghp_secret"))?;

    let response = app
        .handle(Request::new(Method::Get, "gitinfo/rust-lang", reader()))
        .await?;

    assert_eq!(response.body, Some(reply));

    let received = server.received();
    assert_eq!(received.len(), 1);
    let (authorization, payload) = &received[0];
    assert_eq!(authorization.as_deref(), Some("Bearer ghp_secret"));
    assert_eq!(payload["query"], json!(ORGANIZATION_QUERY));
    assert_eq!(payload["variables"], json!({ "organization": "rust-lang" }));

    server.stop();
    Ok(())
}

#[test_log::test(tokio::test)]
async fn it_propagates_the_upstream_status() -> Result<()> {
    let server = LocalGraphQl::start(403, json!({ "message": "rate limited" })).await?;
    let app = make_app(&server.endpoint, None)?;

    let error = app
        .handle(Request::new(Method::Get, "gitinfo/rust-lang", reader()))
        .await
        .err();

    assert_eq!(error.as_ref().map(AppDataError::kind), Some(ErrorKind::Upstream));
    assert_eq!(error.map(|error| error.status()), Some(403));
    assert_eq!(server.received()[0].0, None);

    server.stop();
    Ok(())
}

#[tokio::test]
async fn it_reports_an_unreachable_tracker_as_bad_gateway() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = format!("http://{}/graphql", listener.local_addr()?);
    drop(listener);

    let app = make_app(&endpoint, None)?;
    let error = app
        .handle(Request::new(Method::Get, "gitinfo/rust-lang", reader()))
        .await
        .err();

    assert_eq!(error.map(|error| error.status()), Some(502));
    Ok(())
}

#[tokio::test]
async fn it_only_reads_from_the_tracker() -> Result<()> {
    let server = LocalGraphQl::start(200, json!({})).await?;
    let app = make_app(&server.endpoint, None)?;

    let error = app
        .handle(
            Request::new(Method::Post, "gitinfo/rust-lang", reader()).with_body(json!({})),
        )
        .await
        .err();

    assert_eq!(error.map(|error| error.kind()), Some(ErrorKind::MethodNotAllowed));
    assert!(server.received().is_empty());

    server.stop();
    Ok(())
}

#[tokio::test]
async fn it_rejects_an_invalid_endpoint_at_start_up() {
    let result = make_app("not a url", None);

    assert!(result.is_err());
}
