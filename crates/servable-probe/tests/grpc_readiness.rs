//! End-to-end polling against an in-process `PredictionService`.

use servable_probe::{
    GrpcProbe, NoSleep, PollerConfig, Readiness, ReadinessPoller, ReadySignal,
    UnexpectedSuccessPolicy, wait_for_server_ready,
};
use servable_probe_core::{
    Error,
    proto::{
        PredictRequest, PredictResponse,
        prediction_service_server::{PredictionService, PredictionServiceServer},
    },
};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status, transport::Server};

/// Mimics a model server that finishes loading after `ready_from - 1` calls.
#[derive(Clone)]
struct MockServing {
    calls: Arc<AtomicU32>,
    models: Arc<Mutex<Vec<String>>>,
    ready_from: u32,
    answer_ok: bool,
}

impl MockServing {
    fn ready_from(ready_from: u32) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            models: Arc::new(Mutex::new(Vec::new())),
            ready_from,
            answer_ok: false,
        }
    }

    fn answering() -> Self {
        Self {
            answer_ok: true,
            ..Self::ready_from(1)
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[tonic::async_trait]
impl PredictionService for MockServing {
    async fn predict(
        &self,
        request: Request<PredictRequest>,
    ) -> Result<Response<PredictResponse>, Status> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let spec = request.into_inner().model_spec.unwrap_or_default();
        self.models.lock().unwrap().push(spec.name.clone());

        if call < self.ready_from {
            return Err(Status::unavailable("Model manager is still loading"));
        }
        if self.answer_ok {
            return Ok(Response::new(PredictResponse {
                model_spec: Some(spec),
            }));
        }
        Err(Status::not_found(format!(
            "Servable not found for request: Latest({})",
            spec.name
        )))
    }
}

async fn spawn_server(mock: MockServing) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let incoming = TcpListenerStream::new(listener);

    let handle = tokio::spawn(async move {
        Server::builder()
            .add_service(PredictionServiceServer::new(mock))
            .serve_with_incoming(incoming)
            .await
            .unwrap();
    });
    (port, handle)
}

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn poller(port: u16, config: PollerConfig) -> ReadinessPoller<GrpcProbe, NoSleep> {
    let probe = GrpcProbe::new("127.0.0.1", port)
        .with_connect_timeout(Duration::from_secs(2))
        .with_rpc_timeout(Duration::from_secs(5));
    ReadinessPoller::new(probe, NoSleep, config)
}

#[tokio::test]
async fn ready_server_is_detected_on_first_attempt() {
    let mock = MockServing::ready_from(1);
    let (port, server) = spawn_server(mock.clone()).await;

    let readiness = poller(port, PollerConfig::default()).wait_for_ready().await;

    assert!(matches!(
        readiness,
        Readiness::Ready {
            attempts: 1,
            signal: ReadySignal::Marker
        }
    ));
    assert_eq!(mock.calls(), 1);
    assert_eq!(
        mock.models.lock().unwrap().as_slice(),
        &["intentionally_missing_model".to_string()]
    );
    server.abort();
}

#[tokio::test]
async fn loading_server_is_ready_on_tenth_attempt() {
    let mock = MockServing::ready_from(10);
    let (port, server) = spawn_server(mock.clone()).await;

    let readiness = poller(port, PollerConfig::default()).wait_for_ready().await;

    assert!(readiness.is_ready());
    assert_eq!(readiness.attempts(), 10);
    assert_eq!(mock.calls(), 10);
    server.abort();
}

#[tokio::test]
async fn absent_server_exhausts_the_budget() {
    let port = closed_port().await;

    let readiness = poller(port, PollerConfig::default()).wait_for_ready().await;

    match readiness {
        Readiness::Exhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 60);
            assert!(matches!(last_error, Some(Error::Connect { .. })));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn still_loading_server_exhausts_a_short_budget() {
    let mock = MockServing::ready_from(100);
    let (port, server) = spawn_server(mock.clone()).await;

    let config = PollerConfig::default().with_max_attempts(4);
    let readiness = poller(port, config).wait_for_ready().await;

    match readiness {
        Readiness::Exhausted {
            attempts,
            last_error: Some(Error::Rpc(status)),
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(status.code(), tonic::Code::Unavailable);
        }
        other => panic!("expected exhaustion with an RPC error, got {other:?}"),
    }
    assert_eq!(mock.calls(), 4);
    server.abort();
}

#[tokio::test]
async fn polling_twice_succeeds_twice() {
    let mock = MockServing::ready_from(1);
    let (port, server) = spawn_server(mock.clone()).await;
    let poller = poller(port, PollerConfig::default());

    let first = poller.wait_for_ready().await;
    let second = poller.wait_for_ready().await;

    assert_eq!(first.attempts(), 1);
    assert_eq!(second.attempts(), 1);
    assert!(first.is_ready() && second.is_ready());
    assert_eq!(mock.calls(), 2);
    server.abort();
}

#[tokio::test]
async fn existing_sentinel_model_counts_as_ready() {
    let mock = MockServing::answering();
    let (port, server) = spawn_server(mock.clone()).await;

    let readiness = poller(port, PollerConfig::default()).wait_for_ready().await;

    assert!(matches!(
        readiness,
        Readiness::Ready {
            attempts: 1,
            signal: ReadySignal::UnexpectedSuccess
        }
    ));

    let config = PollerConfig::default()
        .with_max_attempts(3)
        .with_unexpected_success(UnexpectedSuccessPolicy::Ignore);
    let readiness = poller(port, config).wait_for_ready().await;
    assert!(!readiness.is_ready());
    assert_eq!(mock.calls(), 4);
    server.abort();
}

#[tokio::test]
async fn default_entry_point_probes_localhost() {
    let mock = MockServing::ready_from(1);
    let (port, server) = spawn_server(mock.clone()).await;

    let readiness = wait_for_server_ready(port).await;

    assert!(readiness.is_ready());
    assert_eq!(readiness.attempts(), 1);
    server.abort();
}
