//! Shape classification for repository-info responses.
//!
//! The backend does not tag repo-info payloads with a discriminant; which
//! facet a response carries can only be told from the fields present
//! under `data`. All shape sniffing happens here, once, right after
//! deserialization; the rest of the crate works with the tagged
//! [`RepoSnapshot`] union.

use serde_json::Value;

use crate::api::models::{AiAnalysis, FileNode, RepoBasicInfo};

/// The structurally distinct shapes a repo-info `data` payload can take.
#[derive(Debug, Clone)]
pub enum RepoSnapshot {
    /// All facets at once. Must be checked before the narrower variants:
    /// a full payload satisfies each of their presence predicates too.
    Full {
        basic_info: RepoBasicInfo,
        file_structure: Option<FileNode>,
        ai_analysis: Option<AiAnalysis>,
    },
    Basic(RepoBasicInfo),
    /// `fileStructure: null` is a valid successful shape: extraction has
    /// not finished yet.
    FileStructure(Option<FileNode>),
    /// `aiAnalysis: null` plus a `status` field means the analysis is
    /// still running, not that the request failed.
    AiAnalysis {
        analysis: Option<AiAnalysis>,
        status: Option<String>,
    },
}

impl RepoSnapshot {
    /// Classify the `data` payload of a repo-info response, or `None`
    /// when it matches no known facet shape.
    pub fn classify(data: &Value) -> Option<RepoSnapshot> {
        let obj = data.as_object()?;

        let present = |key: &str| obj.contains_key(key);
        let non_null = |key: &str| obj.get(key).is_some_and(|v| !v.is_null());

        if non_null("basicInfo") && non_null("fileStructure") && non_null("aiAnalysis") {
            return Some(RepoSnapshot::Full {
                basic_info: decode(obj.get("basicInfo"))?,
                file_structure: decode_opt(obj.get("fileStructure")),
                ai_analysis: decode_opt(obj.get("aiAnalysis")),
            });
        }

        if non_null("basicInfo") {
            return Some(RepoSnapshot::Basic(decode(obj.get("basicInfo"))?));
        }

        if present("fileStructure") {
            return Some(RepoSnapshot::FileStructure(decode_opt(
                obj.get("fileStructure"),
            )));
        }

        if present("aiAnalysis") {
            return Some(RepoSnapshot::AiAnalysis {
                analysis: decode_opt(obj.get("aiAnalysis")),
                status: obj
                    .get("status")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            });
        }

        None
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Option<T> {
    serde_json::from_value(value?.clone()).ok()
}

fn decode_opt<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Option<T> {
    match value {
        Some(Value::Null) | None => None,
        Some(v) => serde_json::from_value(v.clone()).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn basic_info_json() -> Value {
        json!({
            "_id": "repo-1",
            "name": "repolens",
            "owner": "permacommons",
            "url": "https://github.com/permacommons/repolens",
            "stars": 42,
            "forks": 3,
            "watchers": 7,
            "commitCount": 120,
            "branches": ["main"],
            "contributors": ["a"],
            "languages": ["Rust"]
        })
    }

    #[test]
    fn full_payload_wins_over_narrower_variants() {
        let data = json!({
            "basicInfo": basic_info_json(),
            "fileStructure": { "type": "dir", "name": "root", "path": "" },
            "aiAnalysis": { "summary": "fine" },
            "statuses": { "aiStatus": "ready" }
        });
        match RepoSnapshot::classify(&data) {
            Some(RepoSnapshot::Full {
                basic_info,
                file_structure,
                ai_analysis,
            }) => {
                assert_eq!(basic_info.id, "repo-1");
                assert!(file_structure.is_some());
                assert!(ai_analysis.is_some());
            }
            other => panic!("expected full snapshot, got {:?}", other),
        }
    }

    #[test]
    fn basic_info_alone_is_basic() {
        let data = json!({ "basicInfo": basic_info_json() });
        assert!(matches!(
            RepoSnapshot::classify(&data),
            Some(RepoSnapshot::Basic(info)) if info.name == "repolens"
        ));
    }

    #[test]
    fn null_file_structure_is_a_successful_pending_shape() {
        let data = json!({ "fileStructure": null });
        assert!(matches!(
            RepoSnapshot::classify(&data),
            Some(RepoSnapshot::FileStructure(None))
        ));
    }

    #[test]
    fn processing_ai_analysis_keeps_its_status() {
        let data = json!({ "aiAnalysis": null, "status": "processing" });
        match RepoSnapshot::classify(&data) {
            Some(RepoSnapshot::AiAnalysis { analysis, status }) => {
                assert!(analysis.is_none());
                assert_eq!(status.as_deref(), Some("processing"));
            }
            other => panic!("expected ai-analysis snapshot, got {:?}", other),
        }
    }

    #[test]
    fn ready_ai_analysis_decodes_the_report() {
        let data = json!({
            "aiAnalysis": {
                "_id": "an-1",
                "repo": "repo-1",
                "summary": "A CLI for chatting with repositories",
                "complexity": "medium",
                "potentialIssues": ["unbounded history"],
                "architecture": "client/server"
            },
            "status": "ready"
        });
        match RepoSnapshot::classify(&data) {
            Some(RepoSnapshot::AiAnalysis { analysis, status }) => {
                let analysis = analysis.expect("analysis should decode");
                assert_eq!(analysis.complexity, "medium");
                assert_eq!(status.as_deref(), Some("ready"));
            }
            other => panic!("expected ai-analysis snapshot, got {:?}", other),
        }
    }

    #[test]
    fn unknown_payloads_are_a_miss() {
        assert!(RepoSnapshot::classify(&json!({ "unrelated": true })).is_none());
        assert!(RepoSnapshot::classify(&json!(null)).is_none());
        assert!(RepoSnapshot::classify(&json!("text")).is_none());
    }
}
