use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard Repolens response envelope. Every endpoint wraps its payload
/// in this shape; `data` is endpoint-specific and may be absent on
/// failures.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub repo_history: Vec<String>,
}

/// Payload of a successful login: the profile plus both tokens.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

/// The refresh endpoint answers outside the envelope, with the rotated
/// pair at the top level.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyseRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnswer {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryMessage {
    pub role: String,
    pub content: String,
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryData {
    #[serde(default)]
    pub messages: Vec<ChatHistoryMessage>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// One pollable facet of a repository analysis, as selected by the
/// `info` query parameter of the repo-info endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoFacet {
    BasicAnalysis,
    FileStructure,
    AiAnalysis,
}

impl RepoFacet {
    pub fn query_value(self) -> &'static str {
        match self {
            RepoFacet::BasicAnalysis => "basicAnalysis",
            RepoFacet::FileStructure => "fileStructure",
            RepoFacet::AiAnalysis => "aiAnalysis",
        }
    }

    /// Wording of the user-side entry appended when the action runs.
    pub fn action_label(self) -> &'static str {
        match self {
            RepoFacet::BasicAnalysis => "Basic Analysis",
            RepoFacet::FileStructure => "Get File Structure",
            RepoFacet::AiAnalysis => "AI Analysis",
        }
    }

    /// Wording of the transient placeholder while the facet loads.
    pub fn pending_label(self) -> &'static str {
        match self {
            RepoFacet::BasicAnalysis => "Processing request",
            RepoFacet::FileStructure => "Fetching file structure",
            RepoFacet::AiAnalysis => "Running AI analysis",
        }
    }
}

/// Payload of the analyse endpoint: basic info is available immediately,
/// the other facets catch up asynchronously.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyseData {
    pub basic_info: models::RepoBasicInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub page_size: u64,
    #[serde(default)]
    pub current_page: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<K> {
    #[serde(default = "Vec::new")]
    pub data: Vec<K>,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

pub mod models;
pub mod snapshot;
