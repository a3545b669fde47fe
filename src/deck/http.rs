use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, header};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::api::{
    BoardSummary, CardRef, CommentRequest, CreateCardRequest, DeckApi, LabelRequest,
    UpdateCardRequest, UserRequest,
};
use super::models::{Board, Card, Comment, Stack};
use crate::config::DeckConfig;
use crate::errors::DeckError;

const REST_PREFIX: &str = "/index.php/apps/deck/api/v1.0";
const OCS_PREFIX: &str = "/ocs/v2.php/apps/deck/api/v1.0";
const USER_AGENT: &str = concat!("tui-deck/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in an `Api` error message.
const MAX_ERROR_BODY: usize = 200;

#[derive(serde::Deserialize)]
struct OcsEnvelope<T> {
    ocs: OcsBody<T>,
}

#[derive(serde::Deserialize)]
struct OcsBody<T> {
    data: T,
}

/// Deck REST + OCS client over HTTP basic auth.
pub struct HttpDeckApi {
    client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
}

impl HttpDeckApi {
    pub fn new(base_url: &str, user: &str, password: &str) -> Result<Self, DeckError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(DeckError::Config("server url is empty".into()));
        }
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url,
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    pub fn from_config(config: &DeckConfig) -> Result<Self, DeckError> {
        Self::new(&config.url, &config.user, &config.password)
    }

    fn request(&self, method: Method, prefix: &str, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}{}", self.base_url, prefix, path))
            .basic_auth(&self.user, Some(&self.password))
            .header("OCS-APIRequest", "true")
            .header(header::ACCEPT, "application/json")
    }

    fn rest(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, REST_PREFIX, path)
    }

    fn ocs(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, OCS_PREFIX, path)
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Vec<u8>, DeckError> {
        tracing::debug!(path, "deck request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message: String = text.chars().take(MAX_ERROR_BODY).collect();
            tracing::warn!(path, status = status.as_u16(), "deck request failed");
            return Err(DeckError::Api {
                status: status.as_u16(),
                path: path.to_string(),
                message: if message.is_empty() {
                    status.canonical_reason().unwrap_or("error").to_string()
                } else {
                    message
                },
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, DeckError> {
        let body = self.send(path, request).await?;
        serde_json::from_slice(&body).map_err(|source| DeckError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn send_ocs<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, DeckError> {
        let envelope: OcsEnvelope<T> = self.send_json(path, request).await?;
        Ok(envelope.ocs.data)
    }

    async fn put_card_action<B: Serialize + Sync>(
        &self,
        at: CardRef,
        action: &str,
        body: &B,
    ) -> Result<(), DeckError> {
        let path = format!("{}/{}", card_path(at), action);
        self.send(&path, self.rest(Method::PUT, &path).json(body))
            .await
            .map(|_| ())
    }
}

fn card_path(at: CardRef) -> String {
    format!(
        "/boards/{}/stacks/{}/cards/{}",
        at.board_id, at.stack_id, at.card_id
    )
}

#[async_trait]
impl DeckApi for HttpDeckApi {
    async fn list_boards(&self) -> Result<Vec<BoardSummary>, DeckError> {
        let path = "/boards";
        self.send_json(path, self.rest(Method::GET, path)).await
    }

    async fn get_board(&self, board_id: i64) -> Result<Board, DeckError> {
        let path = format!("/boards/{}", board_id);
        match self.send_json(&path, self.rest(Method::GET, &path)).await {
            Err(DeckError::Api { status: 404, .. }) => {
                Err(DeckError::BoardNotFound { id: board_id })
            }
            other => other,
        }
    }

    async fn list_stacks(&self, board_id: i64) -> Result<Vec<Stack>, DeckError> {
        let path = format!("/boards/{}/stacks", board_id);
        self.send_json(&path, self.rest(Method::GET, &path)).await
    }

    async fn create_card(
        &self,
        board_id: i64,
        stack_id: i64,
        request: &CreateCardRequest,
    ) -> Result<Card, DeckError> {
        let path = format!("/boards/{}/stacks/{}/cards", board_id, stack_id);
        self.send_json(&path, self.rest(Method::POST, &path).json(request))
            .await
    }

    async fn update_card(
        &self,
        at: CardRef,
        request: &UpdateCardRequest,
    ) -> Result<Card, DeckError> {
        let path = card_path(at);
        self.send_json(&path, self.rest(Method::PUT, &path).json(request))
            .await
    }

    async fn delete_card(&self, at: CardRef) -> Result<(), DeckError> {
        let path = card_path(at);
        self.send(&path, self.rest(Method::DELETE, &path))
            .await
            .map(|_| ())
    }

    async fn assign_label(&self, at: CardRef, request: &LabelRequest) -> Result<(), DeckError> {
        self.put_card_action(at, "assignLabel", request).await
    }

    async fn remove_label(&self, at: CardRef, request: &LabelRequest) -> Result<(), DeckError> {
        self.put_card_action(at, "removeLabel", request).await
    }

    async fn assign_user(&self, at: CardRef, request: &UserRequest) -> Result<(), DeckError> {
        self.put_card_action(at, "assignUser", request).await
    }

    async fn unassign_user(&self, at: CardRef, request: &UserRequest) -> Result<(), DeckError> {
        self.put_card_action(at, "unassignUser", request).await
    }

    async fn list_comments(&self, card_id: i64) -> Result<Vec<Comment>, DeckError> {
        let path = format!("/cards/{}/comments", card_id);
        self.send_ocs(&path, self.ocs(Method::GET, &path)).await
    }

    async fn create_comment(
        &self,
        card_id: i64,
        request: &CommentRequest,
    ) -> Result<Comment, DeckError> {
        let path = format!("/cards/{}/comments", card_id);
        self.send_ocs(&path, self.ocs(Method::POST, &path).json(request))
            .await
    }

    async fn update_comment(
        &self,
        card_id: i64,
        comment_id: i64,
        request: &CommentRequest,
    ) -> Result<Comment, DeckError> {
        let path = format!("/cards/{}/comments/{}", card_id, comment_id);
        self.send_ocs(&path, self.ocs(Method::PUT, &path).json(request))
            .await
    }

    async fn delete_comment(&self, card_id: i64, comment_id: i64) -> Result<(), DeckError> {
        let path = format!("/cards/{}/comments/{}", card_id, comment_id);
        self.send(&path, self.ocs(Method::DELETE, &path))
            .await
            .map(|_| ())
    }
}
