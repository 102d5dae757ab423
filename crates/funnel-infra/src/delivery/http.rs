//! Outbound HTTP for `webhook` and `api_call` nodes.

use funnel_core::delivery::{BoxFuture, DeliveryError, HttpCall, HttpDispatcher, HttpReply};
use reqwest::Method;

use super::{read_body, transport_error};

/// reqwest-backed dispatcher. Non-2xx replies are returned to the executor,
/// which decides whether they count as failure.
pub struct ReqwestDispatcher {
    client: reqwest::Client,
}

impl ReqwestDispatcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn call(&self, call: &HttpCall) -> Result<HttpReply, DeliveryError> {
        let method = Method::from_bytes(call.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| DeliveryError::Transport(format!("invalid HTTP method '{}'", call.method)))?;

        let mut request = self.client.request(method.clone(), &call.url);
        for (name, value) in &call.headers {
            request = request.header(name, value);
        }
        if let Some(timeout) = call.timeout {
            request = request.timeout(timeout);
        }
        if let Some(body) = &call.body {
            if method != Method::GET && method != Method::HEAD {
                request = request.json(body);
            }
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = read_body(response).await?;

        tracing::debug!(url = call.url.as_str(), method = %method, status, "http call completed");
        Ok(HttpReply { status, body })
    }
}

impl HttpDispatcher for ReqwestDispatcher {
    fn dispatch<'a>(&'a self, call: &'a HttpCall) -> BoxFuture<'a, Result<HttpReply, DeliveryError>> {
        Box::pin(self.call(call))
    }
}
