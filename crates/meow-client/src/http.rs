use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use meow_types::api::{CreateUserRequest, ErrorBody, InsertMoodRequest, UpsertAnswerRequest};
use meow_types::models::{Answer, AnswerEntry, Mood, MoodEntry, Question, Space, User};

use crate::backend::{Backend, parse_space_code};
use crate::error::{ClientError, Result};

/// [`Backend`] over the REST API. Every request fails closed after the
/// configured timeout.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ClientError::Unknown(format!("cannot build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Transport failures: refused connections, resets and timeouts are all
/// "backend unreachable".
fn transport_error(err: reqwest::Error) -> ClientError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        ClientError::NetworkUnavailable(err.to_string())
    } else if err.is_decode() {
        ClientError::Unknown(format!("malformed response: {err}"))
    } else {
        ClientError::Unknown(err.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| format!("HTTP {status}"));

    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::CONFLICT => ClientError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ClientError::Validation(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ClientError::NetworkUnavailable(message)
        }
        _ => {
            warn!("Backend returned {}: {}", status, message);
            ClientError::Unknown(message)
        }
    }
}

async fn read<T: DeserializeOwned>(sent: reqwest::Result<Response>) -> Result<T> {
    let resp = sent.map_err(transport_error)?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(status_error(status, &body));
    }
    resp.json::<T>().await.map_err(transport_error)
}

impl Backend for HttpBackend {
    async fn create_space(&self) -> Result<Space> {
        let space: Space = read(self.client.post(self.url("/spaces")).send().await).await?;
        debug!("Created space {}", space.code);
        Ok(space)
    }

    async fn get_space_by_code(&self, code: &str) -> Result<Space> {
        let code = parse_space_code(code)?;
        read(self.client.get(self.url(&format!("/spaces/code/{code}"))).send().await).await
    }

    async fn get_space(&self, space_id: Uuid) -> Result<Space> {
        read(self.client.get(self.url(&format!("/spaces/{space_id}"))).send().await).await
    }

    async fn create_user(&self, space_id: Uuid, req: CreateUserRequest) -> Result<User> {
        let url = self.url(&format!("/spaces/{space_id}/users"));
        read(self.client.post(url).json(&req).send().await).await
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User> {
        read(self.client.get(self.url(&format!("/users/{user_id}"))).send().await).await
    }

    async fn insert_mood(&self, space_id: Uuid, req: InsertMoodRequest) -> Result<Mood> {
        let url = self.url(&format!("/spaces/{space_id}/moods"));
        read(self.client.post(url).json(&req).send().await).await
    }

    async fn moods(&self, space_id: Uuid, limit: u32) -> Result<Vec<MoodEntry>> {
        let url = self.url(&format!("/spaces/{space_id}/moods"));
        read(self.client.get(url).query(&[("limit", limit)]).send().await).await
    }

    async fn questions(&self) -> Result<Vec<Question>> {
        read(self.client.get(self.url("/questions")).send().await).await
    }

    async fn answers(&self, space_id: Uuid, question_id: Option<Uuid>) -> Result<Vec<AnswerEntry>> {
        let mut req = self.client.get(self.url(&format!("/spaces/{space_id}/answers")));
        if let Some(question_id) = question_id {
            req = req.query(&[("question_id", question_id)]);
        }
        read(req.send().await).await
    }

    async fn upsert_answer(&self, space_id: Uuid, req: UpsertAnswerRequest) -> Result<Answer> {
        let url = self.url(&format!("/spaces/{space_id}/answers"));
        read(self.client.put(url).json(&req).send().await).await
    }
}
