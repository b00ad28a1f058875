//! fetch tool implementation.
//!
//! Issues a request from the server's page and reports how the worker answered it.

use eggcache_client::resolve;
use eggcache_core::{Error, Method, Request, RequestMode, Response};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::app::App;

/// Input parameters for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Load the URL as a top-level document (navigation request).
    #[serde(default)]
    pub navigate: bool,

    /// Optional request body, sent as-is.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_len: usize,
}

impl From<Response> for ResponseView {
    fn from(response: Response) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body: String::from_utf8_lossy(&response.body).into_owned(),
            body_len: response.body.len(),
        }
    }
}

/// Output structure for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    /// How the request resolved, or `uncontrolled` when no worker saw it.
    pub outcome: String,
    /// `null` when the request resolved without a response.
    pub response: Option<ResponseView>,
}

/// Implementation of the fetch tool.
pub async fn fetch_impl(app: &App, params: FetchParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&app.origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method: Method = params.method.parse()?;

    let mut request = Request::new(method, url);
    if params.navigate {
        request = request.with_mode(RequestMode::Navigate);
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    tracing::debug!(method = %request.method, url = %request.url, navigate = params.navigate, "dispatching fetch");
    let dispatched = app.host.dispatch_fetch(Some(&app.client_id), request).await?;

    let output = FetchOutput {
        outcome: dispatched.resolution.map_or("uncontrolled", |r| r.as_str()).to_string(),
        response: dispatched.response.map(ResponseView::from),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StaticNetwork, app};

    fn params(url: &str) -> FetchParams {
        FetchParams { url: url.into(), method: default_method(), navigate: false, body: None }
    }

    async fn call(app: &App, params: FetchParams) -> FetchOutput {
        let result = fetch_impl(app, params).await.unwrap();
        let text = result.content[0].as_text().unwrap().text.clone();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_core_asset_served_from_cache() {
        let network = StaticNetwork::new();
        let app = app(&network).await;
        let before = network.calls();

        let output = call(&app, params("/static/main_icon.webp")).await;
        assert_eq!(output.outcome, "cache_hit");
        assert_eq!(output.response.unwrap().body, "GET /static/main_icon.webp");
        assert_eq!(network.calls(), before);
    }

    #[tokio::test]
    async fn test_miss_then_offline_hit() {
        let network = StaticNetwork::new();
        let app = app(&network).await;

        let first = call(&app, params("/api/eggs")).await;
        assert_eq!(first.outcome, "cache_miss_network_ok");
        app.host.idle().await;

        network.set_offline(true);
        let second = call(&app, params("http://127.0.0.1:5000/api/eggs#top")).await;
        assert_eq!(second.outcome, "cache_hit");
        assert_eq!(second.response.unwrap().status, 200);
    }

    #[tokio::test]
    async fn test_offline_miss_has_no_response() {
        let network = StaticNetwork::new();
        let app = app(&network).await;
        network.set_offline(true);

        let output = call(&app, params("/never-seen")).await;
        assert_eq!(output.outcome, "cache_miss_network_fail");
        assert!(output.response.is_none());
    }

    #[tokio::test]
    async fn test_post_passes_through() {
        let network = StaticNetwork::new();
        let app = app(&network).await;

        let output = call(
            &app,
            FetchParams { url: "/api/eggs".into(), method: "post".into(), navigate: false, body: Some("{}".into()) },
        )
        .await;
        assert_eq!(output.outcome, "pass_through");
        assert_eq!(output.response.unwrap().body, "POST /api/eggs");
    }

    #[tokio::test]
    async fn test_navigation_is_network_only() {
        let network = StaticNetwork::new();
        let app = app(&network).await;

        let output = call(&app, FetchParams { navigate: true, ..params("/") }).await;
        assert_eq!(output.outcome, "network_only");
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let network = StaticNetwork::new();
        let app = app(&network).await;

        assert!(fetch_impl(&app, params("ftp://example.com/file")).await.is_err());
        assert!(fetch_impl(&app, params("  ")).await.is_err());
        assert!(fetch_impl(&app, FetchParams { method: "BAD METHOD".into(), ..params("/") }).await.is_err());
    }
}
