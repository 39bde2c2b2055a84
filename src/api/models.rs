use serde::{Deserialize, Serialize};

/// Per-facet processing state reported alongside basic repository info.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetStatuses {
    #[serde(default)]
    pub file_structure_status: String,
    #[serde(default)]
    pub ai_status: String,
    #[serde(default)]
    pub embedding_status: String,
}

/// Repository metadata as the analyse endpoint and the basicAnalysis
/// facet return it. The backend emits `id` in some responses and `_id`
/// in others; both are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoBasicInfo {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub watchers: u64,
    #[serde(default)]
    pub commit_count: u64,
    #[serde(default)]
    pub branches: Vec<String>,
    #[serde(default)]
    pub contributors: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub last_synced: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub statuses: Option<FacetStatuses>,
}

/// One node in the repository file tree. Directories carry `children`;
/// files may carry `size` and `extension`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    pub fn is_dir(&self) -> bool {
        self.kind == "dir"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub complexity: String,
    #[serde(default)]
    pub potential_issues: Vec<String>,
    #[serde(default)]
    pub architecture: String,
}
