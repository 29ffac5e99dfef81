use async_trait::async_trait;
use bn_core::{Error, InferenceService, Result, SelectQuery};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};
use url::Url;

use crate::Config;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SqlRequest {
    query: String,
}

#[derive(Deserialize)]
struct SqlResponse {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    column_names: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
    #[serde(default)]
    error_message: Option<String>,
}

/// MindsDB over its HTTP SQL API. The session cookie from [`login`](Self::login)
/// is kept in the client's cookie store.
pub struct MindsDbService {
    client: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl MindsDbService {
    pub fn new(config: Config) -> Result<Self> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid MindsDB URL '{}': {}", config.base_url, e)))?;
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            username: config.username,
            password: config.password,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid MindsDB endpoint '{}': {}", path, e)))
    }

    /// Opens a session. Without credentials this is a no-op, which suits a
    /// self-hosted instance.
    pub async fn login(&self) -> Result<()> {
        let (Some(email), Some(password)) = (self.username.as_deref(), self.password.as_deref()) else {
            return Ok(());
        };

        let response = self
            .client
            .post(self.endpoint("cloud/login")?)
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Inference(format!("MindsDB login failed with status {}", status)));
        }
        info!("🧠 Connected to MindsDB at {}", self.base_url);
        Ok(())
    }
}

impl fmt::Debug for MindsDbService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MindsDbService")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl InferenceService for MindsDbService {
    fn name(&self) -> &str {
        "MindsDB"
    }

    async fn select(&self, query: &SelectQuery) -> Result<String> {
        let sql = query.to_sql();
        debug!("MindsDB query against {}", query.model());

        let response = self
            .client
            .post(self.endpoint("api/sql/query")?)
            .json(&SqlRequest { query: sql })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Inference(format!(
                "{} returned status {}",
                query.model(),
                status
            )));
        }

        let body = response.json::<SqlResponse>().await?;
        first_value(body, query.field())
    }
}

fn first_value(body: SqlResponse, field: &str) -> Result<String> {
    if body.kind == "error" {
        return Err(Error::Inference(
            body.error_message
                .unwrap_or_else(|| "MindsDB reported an error".to_string()),
        ));
    }

    let column = body
        .column_names
        .iter()
        .position(|c| c.eq_ignore_ascii_case(field))
        .ok_or_else(|| Error::Inference(format!("column '{}' missing from result", field)))?;

    let value = body
        .data
        .into_iter()
        .next()
        .and_then(|mut row| (column < row.len()).then(|| row.swap_remove(column)))
        .ok_or_else(|| Error::Inference(format!("no result row for '{}'", field)))?;

    match value {
        Value::String(s) => Ok(s),
        Value::Null => Err(Error::Inference(format!("'{}' was null", field))),
        other => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_for(server: &MockServer) -> MindsDbService {
        MindsDbService::new(Config {
            base_url: server.uri(),
            username: Some("me@example.com".to_string()),
            password: Some("secret".to_string()),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_select_returns_requested_column() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sql/query"))
            .and(body_partial_json(json!({
                "query": "SELECT sentiment FROM mindsdb.hf_sentiment WHERE text=\"It's 'fine'.\";"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "table",
                "column_names": ["text", "sentiment"],
                "data": [["It's 'fine'.", "positive"]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = SelectQuery::new("sentiment", "mindsdb.hf_sentiment", "text", "It's \"fine\".");
        let value = service_for(&server).select(&query).await.unwrap();
        assert_eq!(value, "positive");
    }

    #[tokio::test]
    async fn test_select_without_rows_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sql/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "table",
                "column_names": ["emotion"],
                "data": []
            })))
            .mount(&server)
            .await;

        let query = SelectQuery::new("emotion", "mindsdb.hf_emotions_6", "text", "Sad.");
        let err = service_for(&server).select(&query).await.unwrap_err();
        assert!(matches!(err, Error::Inference(ref m) if m.contains("no result row")));
    }

    #[tokio::test]
    async fn test_select_surfaces_error_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sql/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "error",
                "error_code": 0,
                "error_message": "model not found"
            })))
            .mount(&server)
            .await;

        let query = SelectQuery::new("emotion", "mindsdb.missing", "text", "Sad.");
        let err = service_for(&server).select(&query).await.unwrap_err();
        assert_eq!(err.to_string(), "Inference error: model not found");
    }

    #[tokio::test]
    async fn test_select_rejects_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let query = SelectQuery::new("sentiment", "mindsdb.hf_sentiment", "text", "Ok.");
        assert!(service_for(&server).select(&query).await.is_err());
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cloud/login"))
            .and(body_partial_json(json!({"email": "me@example.com", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        service_for(&server).login().await.unwrap();
    }

    #[tokio::test]
    async fn test_login_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cloud/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        assert!(service_for(&server).login().await.is_err());
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = MindsDbService::new(Config {
            base_url: "not a url".to_string(),
            ..Config::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
