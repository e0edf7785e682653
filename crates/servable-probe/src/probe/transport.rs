//! The network side of a probe attempt.
//!
//! [`PredictProbe`] is the seam between the poller and the serving endpoint.
//! [`GrpcProbe`] talks to a real server; tests substitute scripted
//! implementations.

use core::time::Duration;
use servable_probe_core::{
    Error, Result,
    proto::{PredictRequest, PredictResponse, prediction_service_client::PredictionServiceClient},
    types::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_RPC_TIMEOUT},
};
use tonic::{
    Request,
    transport::{Channel, Endpoint},
};

/// Issues a single `Predict` call.
pub trait PredictProbe {
    fn predict(
        &self,
        request: PredictRequest,
    ) -> impl Future<Output = Result<PredictResponse>> + Send;
}

impl<P: PredictProbe + ?Sized> PredictProbe for &P {
    fn predict(
        &self,
        request: PredictRequest,
    ) -> impl Future<Output = Result<PredictResponse>> + Send {
        (**self).predict(request)
    }
}

/// `Predict` over an insecure gRPC channel.
///
/// Every call opens its own channel and drops it afterwards. There is no
/// pooling: a probe must observe the server as a fresh client would.
#[derive(Clone, Debug)]
pub struct GrpcProbe {
    endpoint: String,
    rpc_timeout: Duration,
    connect_timeout: Duration,
}

impl GrpcProbe {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            endpoint: format!("http://{}:{}", host, port),
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_rpc_timeout(mut self, rpc_timeout: Duration) -> Self {
        self.rpc_timeout = rpc_timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Parses the endpoint URI without connecting.
    pub fn build_endpoint(&self) -> Result<Endpoint> {
        Endpoint::from_shared(self.endpoint.clone()).map_err(|e| Error::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: error_chain(&e),
        })
    }

    async fn connect(&self) -> Result<PredictionServiceClient<Channel>> {
        let endpoint = self
            .build_endpoint()?
            .connect_timeout(self.connect_timeout)
            .timeout(self.rpc_timeout);

        let channel = endpoint.connect().await.map_err(|e| Error::Connect {
            endpoint: self.endpoint.clone(),
            reason: error_chain(&e),
        })?;

        Ok(PredictionServiceClient::new(channel))
    }
}

impl PredictProbe for GrpcProbe {
    async fn predict(&self, request: PredictRequest) -> Result<PredictResponse> {
        let mut client = self.connect().await?;

        let mut request = Request::new(request);
        request.set_timeout(self.rpc_timeout);

        let response = client.predict(request).await?;
        Ok(response.into_inner())
    }
}

// `tonic::transport::Error` displays as a bare "transport error"; the cause is
// only reachable through `source()`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
