use crate::api::models::{AiAnalysis, FileNode, RepoBasicInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySender {
    User,
    Assistant,
}

impl EntrySender {
    pub fn as_str(self) -> &'static str {
        match self {
            EntrySender::User => "user",
            EntrySender::Assistant => "assistant",
        }
    }

    pub fn from_role(role: &str) -> Self {
        if role == "user" {
            EntrySender::User
        } else {
            EntrySender::Assistant
        }
    }
}

/// What a conversation entry carries. Structured variants stand in for
/// the server payload shapes; [`EntryBody::render_text`] turns any of
/// them into plain lines for display and transcript logging.
#[derive(Debug, Clone)]
pub enum EntryBody {
    Text(String),
    /// Informational terminal state, distinct from answers and errors
    /// ("analysis still running", server-side non-success messages).
    Notice(String),
    Error(String),
    BasicInfo(RepoBasicInfo),
    FileTree(FileNode),
    Analysis {
        analysis: AiAnalysis,
        status: Option<String>,
    },
    Answer {
        answer: String,
        sources: Vec<String>,
    },
    FullOverview(RepoBasicInfo),
}

/// One timeline entry. Append-only; `transient` marks the ephemeral
/// placeholder shown while an exchange is in flight, which is removed
/// before the exchange's terminal entry is appended.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub sender: EntrySender,
    pub body: EntryBody,
    pub transient: bool,
}

impl ConversationEntry {
    pub fn user(text: impl Into<String>) -> Self {
        ConversationEntry {
            sender: EntrySender::User,
            body: EntryBody::Text(text.into()),
            transient: false,
        }
    }

    pub fn assistant(body: EntryBody) -> Self {
        ConversationEntry {
            sender: EntrySender::Assistant,
            body,
            transient: false,
        }
    }

    pub fn pending(text: impl Into<String>) -> Self {
        ConversationEntry {
            sender: EntrySender::Assistant,
            body: EntryBody::Notice(text.into()),
            transient: true,
        }
    }
}

impl EntryBody {
    pub fn render_text(&self) -> String {
        match self {
            EntryBody::Text(text) => text.clone(),
            EntryBody::Notice(text) => text.clone(),
            EntryBody::Error(text) => format!("error: {text}"),
            EntryBody::BasicInfo(info) => render_basic_info(info),
            EntryBody::FileTree(root) => {
                let mut out = String::from("File structure:\n");
                render_tree(root, 0, &mut out);
                out.trim_end().to_string()
            }
            EntryBody::Analysis { analysis, status } => render_analysis(analysis, status.as_deref()),
            EntryBody::Answer { answer, sources } => {
                let mut out = answer.clone();
                if !sources.is_empty() {
                    out.push_str("\n\nSources:");
                    for source in sources {
                        out.push_str("\n  - ");
                        out.push_str(source);
                    }
                }
                out
            }
            EntryBody::FullOverview(info) => {
                let mut out = format!("Full repository overview: {}", info.name);
                if let Some(description) = info.description.as_deref().filter(|d| !d.is_empty()) {
                    out.push('\n');
                    out.push_str(description);
                }
                out
            }
        }
    }
}

fn render_basic_info(info: &RepoBasicInfo) -> String {
    let mut lines = vec![format!("{} ({})", info.name, info.owner)];
    if let Some(description) = info.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(description.to_string());
    }
    lines.push(format!(
        "stars {}  forks {}  watchers {}  commits {}",
        info.stars, info.forks, info.watchers, info.commit_count
    ));
    if !info.languages.is_empty() {
        lines.push(format!("languages: {}", info.languages.join(", ")));
    }
    if !info.branches.is_empty() {
        lines.push(format!("branches: {}", info.branches.join(", ")));
    }
    if !info.url.is_empty() {
        lines.push(info.url.clone());
    }
    lines.join("\n")
}

fn render_analysis(analysis: &AiAnalysis, status: Option<&str>) -> String {
    let mut lines = vec!["AI analysis".to_string()];
    if let Some(status) = status {
        lines.push(format!("status: {status}"));
    }
    if !analysis.summary.is_empty() {
        lines.push(format!("summary: {}", analysis.summary));
    }
    if !analysis.complexity.is_empty() {
        lines.push(format!("complexity: {}", analysis.complexity));
    }
    if !analysis.architecture.is_empty() {
        lines.push(format!("architecture: {}", analysis.architecture));
    }
    if !analysis.potential_issues.is_empty() {
        lines.push("potential issues:".to_string());
        for issue in &analysis.potential_issues {
            lines.push(format!("  - {issue}"));
        }
    }
    lines.join("\n")
}

fn render_tree(node: &FileNode, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.name);
    if node.is_dir() {
        out.push('/');
    }
    out.push('\n');
    if let Some(children) = &node.children {
        for child in children {
            render_tree(child, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> FileNode {
        FileNode {
            kind: "file".to_string(),
            name: name.to_string(),
            path: name.to_string(),
            size: Some(1),
            extension: None,
            children: None,
        }
    }

    #[test]
    fn file_tree_renders_with_indentation() {
        let root = FileNode {
            kind: "dir".to_string(),
            name: "src".to_string(),
            path: "src".to_string(),
            size: None,
            extension: None,
            children: Some(vec![leaf("main.rs"), leaf("lib.rs")]),
        };
        let text = EntryBody::FileTree(root).render_text();
        assert_eq!(text, "File structure:\nsrc/\n  main.rs\n  lib.rs");
    }

    #[test]
    fn answer_lists_its_sources() {
        let text = EntryBody::Answer {
            answer: "Because of the gate.".to_string(),
            sources: vec!["src/core/refresh.rs".to_string()],
        }
        .render_text();
        assert!(text.starts_with("Because of the gate."));
        assert!(text.contains("  - src/core/refresh.rs"));
    }

    #[test]
    fn pending_entries_are_transient_assistant_notices() {
        let entry = ConversationEntry::pending("AI is thinking");
        assert!(entry.transient);
        assert_eq!(entry.sender, EntrySender::Assistant);
    }
}
