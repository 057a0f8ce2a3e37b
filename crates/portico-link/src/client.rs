//! Gateway client with builder pattern.

use std::collections::HashMap;
use std::time::Duration;

use portico_commons::ConnectionId;
use portico_protocol::{
    BinaryTranslator, JsonTranslator, OpenConnectionRequest, Request, Response, Translator,
};

use crate::connection::RemoteConnection;
use crate::error::{LinkError, Result};

/// Which wire serialization the client speaks. The choice must match on
/// every request of a session; the server negotiates per request from the
/// content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serialization {
    Json,
    Binary,
}

impl Serialization {
    pub(crate) fn translator(self) -> &'static dyn Translator {
        match self {
            Serialization::Json => &JsonTranslator,
            Serialization::Binary => &BinaryTranslator,
        }
    }
}

/// Gateway client. Cheap to clone; connections borrow it.
///
/// Use [`GatewayClientBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    http_client: reqwest::Client,
    serialization: Serialization,
}

impl GatewayClient {
    pub fn builder() -> GatewayClientBuilder {
        GatewayClientBuilder::new()
    }

    pub fn serialization(&self) -> Serialization {
        self.serialization
    }

    /// Opens a connection under a freshly minted UUID.
    pub async fn connect(&self) -> Result<RemoteConnection> {
        self.connect_with_id(uuid::Uuid::new_v4().to_string(), HashMap::new())
            .await
    }

    /// Opens a connection under a caller-chosen id with driver properties.
    pub async fn connect_with_id(
        &self,
        id: impl Into<String>,
        info: HashMap<String, String>,
    ) -> Result<RemoteConnection> {
        let connection_id = ConnectionId::new(id);
        let response = self
            .call(&Request::OpenConnection(OpenConnectionRequest {
                connection_id: connection_id.clone(),
                info,
            }))
            .await?;
        match response {
            Response::OpenConnection(r) => Ok(RemoteConnection::new(
                self.clone(),
                connection_id,
                r.rpc_metadata.server_address,
            )),
            other => Err(unexpected(&other)),
        }
    }

    /// One request, one response. Error envelopes become
    /// [`LinkError::Remote`]; the HTTP status is advisory, the body is
    /// authoritative.
    pub(crate) async fn call(&self, request: &Request) -> Result<Response> {
        let translator = self.serialization.translator();
        let body = translator
            .serialize_request(request)
            .map_err(|e| LinkError::SerializationError(e.to_string()))?;
        log::trace!("POST {} ({} bytes)", self.base_url, body.len());
        let http_response = self
            .http_client
            .post(&self.base_url)
            .header(reqwest::header::CONTENT_TYPE, translator.content_type())
            .body(body)
            .send()
            .await?;
        let bytes = http_response.bytes().await?;
        let response = translator
            .parse_response(&bytes)
            .map_err(|e| LinkError::SerializationError(e.to_string()))?;
        match response {
            Response::Error(e) => Err(LinkError::from_error_response(e)),
            other => Ok(other),
        }
    }
}

pub(crate) fn unexpected(response: &Response) -> LinkError {
    LinkError::UnexpectedResponse(format!("{:?}", response))
}

/// Builder for configuring [`GatewayClient`] instances.
pub struct GatewayClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    serialization: Serialization,
}

impl Default for GatewayClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            // The protocol itself never times out; this is the client-side
            // response read timeout.
            timeout: Duration::from_secs(180),
            serialization: Serialization::Json,
        }
    }

    /// Set the base URL of the gateway server
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the per-request response timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Choose the wire serialization
    pub fn serialization(mut self, serialization: Serialization) -> Self {
        self.serialization = serialization;
        self
    }

    pub fn build(self) -> Result<GatewayClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| LinkError::ConfigurationError("base_url is required".to_string()))?;
        let http_client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| LinkError::ConfigurationError(e.to_string()))?;
        Ok(GatewayClient {
            base_url,
            http_client,
            serialization: self.serialization,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_base_url() {
        let err = GatewayClient::builder().build().unwrap_err();
        assert!(matches!(err, LinkError::ConfigurationError(_)));
    }

    #[test]
    fn builder_defaults_to_json() {
        let client = GatewayClient::builder()
            .base_url("http://localhost:8765")
            .build()
            .unwrap();
        assert_eq!(client.serialization(), Serialization::Json);
    }
}
