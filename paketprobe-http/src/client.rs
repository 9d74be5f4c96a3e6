use bytes::Bytes;
use http::HeaderMap;
use http::header::{CONTENT_LENGTH, HOST, HeaderName, HeaderValue};
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use super::util::{has_header, host_header_value};
use super::{Error, HttpRequest, HttpResponse, Result};

/// Connect timeout of [`HttpClient::default`].
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Pooled HTTP/1.1 client for plain and TLS targets.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    hyper: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(Some(DEFAULT_CONNECT_TIMEOUT))
    }
}

impl HttpClient {
    #[must_use]
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        let mut connector = HttpConnector::new();
        connector.enforce_http(false);
        connector.set_connect_timeout(connect_timeout);

        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector);

        Self {
            hyper: Client::builder(TokioExecutor::new()).build(connector),
        }
    }

    /// Sends `req` and reads the full body. `req.timeout` bounds the whole exchange.
    pub async fn request(&self, req: HttpRequest) -> Result<HttpResponse> {
        let Some(limit) = req.timeout else {
            return self.exchange(req).await;
        };
        tokio::time::timeout(limit, self.exchange(req))
            .await
            .unwrap_or(Err(Error::Timeout(limit)))
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::get(url)).await
    }

    async fn exchange(&self, req: HttpRequest) -> Result<HttpResponse> {
        let url = req.url.clone();
        let hyper_req = build_request(req)?;

        tracing::debug!(method = %hyper_req.method(), url = %url, "sending request");
        let res = self
            .hyper
            .request(hyper_req)
            .await
            .map_err(|err| Error::from_client(&url, err))?;

        let (parts, body) = res.into_parts();
        let status = parts.status.as_u16();
        let headers = capture_headers(&parts.headers);
        let body = body.collect().await?.to_bytes();

        tracing::debug!(status, body_len = body.len(), url = %url, "response received");
        Ok(HttpResponse {
            status,
            body,
            headers,
        })
    }
}

fn build_request(req: HttpRequest) -> Result<Request<Full<Bytes>>> {
    let parsed = url::Url::parse(&req.url).map_err(|_| Error::InvalidUrl(req.url.clone()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::UnsupportedScheme(req.url));
    }
    let uri: hyper::Uri = req
        .url
        .parse()
        .map_err(|_| Error::InvalidUrl(req.url.clone()))?;

    let mut builder = Request::builder().method(req.method).uri(uri);
    if !has_header(&req.headers, "host")
        && let Some(host) = host_header_value(&parsed)
    {
        builder = builder.header(HOST, host);
    }
    if !req.body.is_empty() && !has_header(&req.headers, "content-length") {
        builder = builder.header(CONTENT_LENGTH, req.body.len());
    }
    for (name, value) in &req.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidRequest(format!("invalid header name `{name}`")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::InvalidRequest(format!("invalid value for header `{name}`")))?;
        builder = builder.header(name, value);
    }

    Ok(builder.body(Full::new(req.body))?)
}

/// Lowercased names in first-seen order; repeated headers are joined with ", ".
fn capture_headers(map: &HeaderMap) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::with_capacity(map.keys_len());
    for name in map.keys() {
        let joined = map
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        headers.push((name.as_str().to_string(), joined));
    }
    headers
}
