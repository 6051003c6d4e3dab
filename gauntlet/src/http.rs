//! JSON-over-HTTP service stub (requires the `http` feature)
//!
//! Each call is a `POST {base}/classify` carrying `{"input": ...}`. The service answers with
//! `{"scores": [...]}`, one score per class.
use crate::service::{ClassScores, ResponseFuture, ServiceStub};
use gauntlet_core::CallError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
pub struct ClassifyRequest<I> {
    pub input: I,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyResponse {
    pub scores: ClassScores,
}

#[derive(Debug, Clone)]
pub struct HttpStub<I> {
    client: Client,
    endpoint: Url,
    _input: PhantomData<fn(I)>,
}

impl<I> HttpStub<I> {
    /// `base` is the service root, e.g. `http://localhost:9000` or `http://host/v1`.
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: &str) -> Result<Self, url::ParseError> {
        let mut root = Url::parse(base)?;
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let endpoint = root.join("classify")?;
        Ok(Self {
            client,
            endpoint,
            _input: PhantomData,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl<I> ServiceStub for HttpStub<I>
where
    I: Serialize + Send + 'static,
{
    type Request = I;
    type Response = ClassScores;

    fn call_async(
        &self,
        input: I,
        timeout: Duration,
    ) -> Result<ResponseFuture<ClassScores>, CallError> {
        let request = self
            .client
            .post(self.endpoint.clone())
            .timeout(timeout)
            .json(&ClassifyRequest { input })
            .build()
            .map_err(|e| CallError::Submission(e.to_string()))?;

        let client = self.client.clone();
        Ok(Box::pin(async move {
            let res = client
                .execute(request)
                .await
                .map_err(|e| call_error(e, timeout))?;

            let status = res.status();
            if !status.is_success() {
                return Err(CallError::Service(format!("HTTP {status}")));
            }

            let body: ClassifyResponse = res.json().await.map_err(|e| call_error(e, timeout))?;
            Ok(body.scores)
        }))
    }
}

fn call_error(err: reqwest::Error, timeout: Duration) -> CallError {
    if err.is_timeout() {
        CallError::Timeout(timeout)
    } else {
        CallError::Service(err.to_string())
    }
}
