//! Thin HTTP client over the orders API: one method per endpoint, with a
//! keyed response cache (list/detail/track namespaces) invalidated on every
//! successful mutation. Mutations are never retried.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::order::OrderFilter;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error {code}: {message}")]
    Api { code: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    List(String),
    Detail(Uuid),
    Track(String),
}

pub struct OrdersClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    cache: RwLock<HashMap<CacheKey, Value>>,
}

/// Canonical cache key for a listing filter. Only a key: the request
/// itself carries the parameters through reqwest's query encoder, so
/// reserved characters in the search needle survive intact.
fn list_cache_key(filter: &OrderFilter) -> String {
    let mut key = format!("page={}&limit={}", filter.page, filter.limit);
    if let Some(status) = filter.status {
        key.push_str(&format!("&status={}", status.as_str()));
    }
    if let Some(search) = &filter.search {
        key.push_str(&format!("&search={search}"));
    }
    key
}

fn list_params(filter: &OrderFilter) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", filter.page.to_string()),
        ("limit", filter.limit.to_string()),
    ];
    if let Some(status) = filter.status {
        params.push(("status", status.as_str().to_string()));
    }
    if let Some(search) = &filter.search {
        params.push(("search", search.clone()));
    }
    params
}

impl OrdersClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Bearer token for the admin endpoints.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Unwrap the response envelope, turning `success: false` into a typed
    /// error carrying the server's code/message.
    async fn unwrap_envelope(res: reqwest::Response) -> Result<Value, ClientError> {
        let status = res.status();
        let body: Value = res.json().await?;
        if body.get("success").and_then(Value::as_bool) == Some(true) {
            return Ok(body.get("data").cloned().unwrap_or(Value::Null));
        }
        let error = body.get("error");
        Err(ClientError::Api {
            code: error
                .and_then(|e| e.get("code"))
                .and_then(Value::as_str)
                .unwrap_or(status.as_str())
                .to_string(),
            message: error
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unexpected response")
                .to_string(),
        })
    }

    async fn cached_get(
        &self,
        key: CacheKey,
        req: reqwest::RequestBuilder,
    ) -> Result<Value, ClientError> {
        if let Some(hit) = self.cache.read().await.get(&key) {
            return Ok(hit.clone());
        }
        let res = self.authorize(req).send().await?;
        let data = Self::unwrap_envelope(res).await?;
        self.cache.write().await.insert(key, data.clone());
        Ok(data)
    }

    async fn invalidate(&self) {
        self.cache.write().await.clear();
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Value, ClientError> {
        let url = format!("{}/api/v1/orders/admin/orders", self.base_url);
        let req = self.http.get(url).query(&list_params(filter));
        self.cached_get(CacheKey::List(list_cache_key(filter)), req).await
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Value, ClientError> {
        let url = format!("{}/api/v1/orders/admin/orders/{id}", self.base_url);
        self.cached_get(CacheKey::Detail(id), self.http.get(url)).await
    }

    pub async fn track_order(&self, code: &str) -> Result<Value, ClientError> {
        let url = format!("{}/api/v1/orders/track/{code}", self.base_url);
        self.cached_get(CacheKey::Track(code.to_string()), self.http.get(url))
            .await
    }

    pub async fn create_order(&self, body: &Value) -> Result<Value, ClientError> {
        let url = format!("{}/api/v1/orders/admin/orders", self.base_url);
        let res = self.authorize(self.http.post(url)).json(body).send().await?;
        let data = Self::unwrap_envelope(res).await?;
        self.invalidate().await;
        Ok(data)
    }

    pub async fn update_order_status(&self, id: Uuid, body: &Value) -> Result<Value, ClientError> {
        let url = format!("{}/api/v1/orders/admin/orders/{id}/status", self.base_url);
        let res = self
            .authorize(self.http.patch(url))
            .json(body)
            .send()
            .await?;
        let data = Self::unwrap_envelope(res).await?;
        self.invalidate().await;
        Ok(data)
    }
}
