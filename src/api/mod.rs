use crate::models::{AddedWord, AllWordsRow, EpisodeDetail, EpisodeSummary, Level};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    /// The request never completed.
    Network,
    /// Non-2xx status.
    Rejected,
    /// 2xx, but the body did not match the contract.
    Parse,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            status: None,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            status: None,
            message: e.to_string(),
        }
    }

    pub(crate) fn rejected(status: u16, reason: &str, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Rejected,
            status: Some(status),
            message: format!("{ctx} ({status}): {reason}"),
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EnvConfig {
    pub api_url: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        let default_api_url = "http://localhost:5002".to_string();

        // `window.ENV.API_URL` wins, then `window.ENV.api_url`, then the page origin
        // (the admin page is normally served by the API host itself).
        if let Some(window) = web_sys::window() {
            if let Some(env) = window.get("ENV") {
                if !env.is_undefined() && env.is_object() {
                    for key in ["API_URL", "api_url"] {
                        if let Ok(api_url) = js_sys::Reflect::get(&env, &key.into()) {
                            if let Some(url_str) = api_url.as_string() {
                                return Self {
                                    api_url: url_str.trim_end_matches('/').to_string(),
                                };
                            }
                        }
                    }
                }
            }

            if let Ok(origin) = window.location().origin() {
                if !origin.trim().is_empty() && origin != "null" {
                    return Self { api_url: origin };
                }
            }
        }

        Self {
            api_url: default_api_url,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct RenameWordRequest {
    pub new_word: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SetUsedRequest {
    pub is_used: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SetDefinitionRequest {
    pub definition: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SetLevelRequest {
    pub level: Level,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SetVocabularyRequest {
    pub is_vocabulary: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SetPublishableRequest {
    pub publishable: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct AddWordRequest {
    pub word: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct WordOrder {
    pub word: String,
    pub order: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct ReorderRequest {
    #[serde(rename = "wordOrders")]
    pub word_orders: Vec<WordOrder>,
}

/// One operation per collaborator API action.
///
/// No retries here; rollback and reload policy belongs to the edit session.
#[async_trait(?Send)]
pub(crate) trait WordStore {
    async fn list_episodes(&self) -> ApiResult<Vec<EpisodeSummary>>;
    async fn get_episode(&self, episode_id: &str) -> ApiResult<EpisodeDetail>;
    async fn get_all_words(&self, episode_id: &str) -> ApiResult<Vec<AllWordsRow>>;
    async fn get_definitions(&self, word: &str) -> ApiResult<Vec<String>>;
    async fn rename_word(&self, episode_id: &str, word: &str, new_word: &str) -> ApiResult<()>;
    async fn set_word_used(&self, episode_id: &str, word: &str, is_used: bool) -> ApiResult<()>;
    async fn set_word_definition(
        &self,
        episode_id: &str,
        word: &str,
        definition: &str,
    ) -> ApiResult<()>;
    async fn set_word_level(&self, episode_id: &str, word: &str, level: Level) -> ApiResult<()>;
    async fn set_word_vocabulary(&self, word: &str, is_vocabulary: bool) -> ApiResult<()>;
    async fn set_publishable(&self, episode_id: &str, publishable: bool) -> ApiResult<()>;
    async fn add_word(&self, episode_id: &str, word: &str) -> ApiResult<AddedWord>;
    async fn reorder_words(&self, episode_id: &str, word_orders: Vec<WordOrder>) -> ApiResult<()>;
}

#[derive(Clone)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(EnvConfig::new().api_url)
    }

    pub(crate) fn episode_path(episode_id: &str) -> String {
        format!("/api/episodes/{}", urlencoding::encode(episode_id))
    }

    pub(crate) fn episode_word_path(episode_id: &str, word: &str) -> String {
        format!(
            "{}/words/{}",
            Self::episode_path(episode_id),
            urlencoding::encode(word)
        )
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> ApiResult<reqwest::Response> {
        let client = reqwest::Client::new();
        let url = format!("{}{}", self.base_url, path);
        let mut req = client.request(method.clone(), url);

        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            Ok(res)
        } else {
            let status = res.status();
            let reason = status.canonical_reason().unwrap_or("error");
            Err(ApiError::rejected(
                status.as_u16(),
                reason,
                &format!("{method} {path} failed"),
            ))
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let res = self
            .send(reqwest::Method::GET, path, None::<&()>)
            .await?;
        res.json().await.map_err(ApiError::parse)
    }

    /// Write whose response body carries nothing but a status marker.
    async fn write(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &impl Serialize,
    ) -> ApiResult<()> {
        self.send(method, path, Some(body)).await.map(|_| ())
    }
}

#[async_trait(?Send)]
impl WordStore for ApiClient {
    async fn list_episodes(&self) -> ApiResult<Vec<EpisodeSummary>> {
        self.get_json("/api/episodes").await
    }

    async fn get_episode(&self, episode_id: &str) -> ApiResult<EpisodeDetail> {
        self.get_json(&Self::episode_path(episode_id)).await
    }

    async fn get_all_words(&self, episode_id: &str) -> ApiResult<Vec<AllWordsRow>> {
        self.get_json(&format!("{}/all-words", Self::episode_path(episode_id)))
            .await
    }

    async fn get_definitions(&self, word: &str) -> ApiResult<Vec<String>> {
        self.get_json(&format!(
            "/api/words/{}/definitions",
            urlencoding::encode(word)
        ))
        .await
    }

    async fn rename_word(&self, episode_id: &str, word: &str, new_word: &str) -> ApiResult<()> {
        self.write(
            reqwest::Method::PUT,
            &Self::episode_word_path(episode_id, word),
            &RenameWordRequest {
                new_word: new_word.to_string(),
            },
        )
        .await
    }

    async fn set_word_used(&self, episode_id: &str, word: &str, is_used: bool) -> ApiResult<()> {
        self.write(
            reqwest::Method::PUT,
            &format!("{}/use", Self::episode_word_path(episode_id, word)),
            &SetUsedRequest { is_used },
        )
        .await
    }

    async fn set_word_definition(
        &self,
        episode_id: &str,
        word: &str,
        definition: &str,
    ) -> ApiResult<()> {
        self.write(
            reqwest::Method::PUT,
            &format!("{}/definition", Self::episode_word_path(episode_id, word)),
            &SetDefinitionRequest {
                definition: definition.to_string(),
            },
        )
        .await
    }

    async fn set_word_level(&self, episode_id: &str, word: &str, level: Level) -> ApiResult<()> {
        self.write(
            reqwest::Method::PUT,
            &format!("{}/level", Self::episode_word_path(episode_id, word)),
            &SetLevelRequest { level },
        )
        .await
    }

    async fn set_word_vocabulary(&self, word: &str, is_vocabulary: bool) -> ApiResult<()> {
        self.write(
            reqwest::Method::PUT,
            &format!("/api/words/{}/vocabulary", urlencoding::encode(word)),
            &SetVocabularyRequest { is_vocabulary },
        )
        .await
    }

    async fn set_publishable(&self, episode_id: &str, publishable: bool) -> ApiResult<()> {
        self.write(
            reqwest::Method::PUT,
            &format!("{}/publishable", Self::episode_path(episode_id)),
            &SetPublishableRequest { publishable },
        )
        .await
    }

    async fn add_word(&self, episode_id: &str, word: &str) -> ApiResult<AddedWord> {
        let res = self
            .send(
                reqwest::Method::POST,
                &format!("{}/uses", Self::episode_path(episode_id)),
                Some(&AddWordRequest {
                    word: word.to_string(),
                }),
            )
            .await?;
        res.json().await.map_err(ApiError::parse)
    }

    async fn reorder_words(&self, episode_id: &str, word_orders: Vec<WordOrder>) -> ApiResult<()> {
        self.write(
            reqwest::Method::POST,
            &format!("{}/reorder", Self::episode_path(episode_id)),
            &ReorderRequest { word_orders },
        )
        .await
    }
}
