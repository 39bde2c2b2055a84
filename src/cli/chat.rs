//! Interactive chat shell for one repository conversation.
//!
//! A line-oriented loop over the session reducer: plain lines become
//! questions, slash commands run the analysis actions. All timeline
//! rendering is plain text; the reducer owns the state.

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use crate::api::RepoFacet;
use crate::core::client::{ApiClient, ApiError};
use crate::core::message::{ConversationEntry, EntrySender};
use crate::core::session::ChatSession;
use crate::utils::logging::TranscriptLog;

pub async fn run_chat(
    client: Arc<ApiClient>,
    repo_id: &str,
    log_file: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let session = ChatSession::new(client, repo_id);
    let transcript = TranscriptLog::new(log_file);

    match session.load_history().await {
        Ok(()) => {}
        Err(ApiError::Unauthenticated) => return login_required(),
        Err(err) => {
            eprintln!("⚠️ Failed to load conversation data: {err}");
            std::process::exit(1);
        }
    }
    let mut rendered = render_new_entries(&session, 0, &transcript);

    println!("Commands: /basic, /files, /ai, /quit");
    println!();

    loop {
        let Some(line) = read_line()? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let result = match line.as_str() {
            "/quit" | "/exit" => break,
            "/basic" => session.run_action(RepoFacet::BasicAnalysis).await,
            "/files" => session.run_action(RepoFacet::FileStructure).await,
            "/ai" => session.run_action(RepoFacet::AiAnalysis).await,
            question => session.send_question(question).await,
        };

        match result {
            Ok(()) => {}
            Err(ApiError::Unauthenticated) => return login_required(),
            Err(err) => eprintln!("⚠️ {err}"),
        }
        rendered = render_new_entries(&session, rendered, &transcript);
    }

    Ok(())
}

fn login_required() -> Result<(), Box<dyn Error>> {
    eprintln!("Session expired. Run `repolens login` and try again.");
    std::process::exit(1);
}

fn render_new_entries(session: &ChatSession, from: usize, transcript: &TranscriptLog) -> usize {
    let entries = session.entries();
    for entry in &entries[from.min(entries.len())..] {
        let text = format_entry(entry);
        println!("{text}");
        println!();
        if let Err(err) = transcript.log_message(&text) {
            eprintln!("⚠️ transcript logging failed: {err}");
        }
    }
    entries.len()
}

fn format_entry(entry: &ConversationEntry) -> String {
    let prefix = match entry.sender {
        EntrySender::User => "you",
        EntrySender::Assistant => "repolens",
    };
    let body = entry.body.render_text();
    format!("{prefix}> {}", body.replace('\n', "\n    "))
}

/// Returns `None` on EOF.
fn read_line() -> Result<Option<String>, Box<dyn Error>> {
    print!("> ");
    io::stdout().flush()?;
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input)?;
    if read == 0 {
        Ok(None)
    } else {
        Ok(Some(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::EntryBody;

    #[test]
    fn multi_line_bodies_are_indented_under_the_prefix() {
        let entry = ConversationEntry::assistant(EntryBody::Text("one\ntwo".to_string()));
        assert_eq!(format_entry(&entry), "repolens> one\n    two");
    }

    #[test]
    fn user_entries_use_the_you_prefix() {
        let entry = ConversationEntry::user("hello");
        assert_eq!(format_entry(&entry), "you> hello");
    }
}
