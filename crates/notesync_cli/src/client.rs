//! `reqwest` implementation of the engine's HTTP client.

use notesync_engine::HttpClient;
use notesync_protocol::{HttpRequest, HttpResponse, Method};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};

/// Sends gateway requests over real HTTP.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Builds a client. Timeouts are enforced by the gateway.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("notesync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl HttpClient for ReqwestClient {
    async fn send(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, String> {
        let mut builder = self
            .client
            .request(method(request.method), url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body);
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
