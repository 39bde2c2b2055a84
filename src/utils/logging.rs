use std::fs::OpenOptions;
use std::io::Write;

/// Appends chat transcript lines to a user-chosen file.
///
/// This is transcript logging for the interactive shell, separate from
/// the `tracing` diagnostics: it records exactly what was shown on
/// screen so a session can be reviewed later.
pub struct TranscriptLog {
    file_path: Option<String>,
    is_active: bool,
}

impl TranscriptLog {
    pub fn new(log_file: Option<String>) -> Self {
        let is_active = log_file.is_some();
        TranscriptLog {
            file_path: log_file,
            is_active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active && self.file_path.is_some()
    }

    pub fn log_message(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = self.file_path.as_ref().filter(|_| self.is_active) else {
            return Ok(());
        };

        let mut file = OpenOptions::new().create(true).append(true).open(file_path)?;

        for line in content.lines() {
            writeln!(file, "{}", line)?;
        }
        // Blank line between messages, matching screen display.
        writeln!(file)?;

        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_log_is_a_no_op() {
        let log = TranscriptLog::new(None);
        assert!(!log.is_active());
        log.log_message("hello").unwrap();
    }

    #[test]
    fn writes_messages_with_spacing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.txt");
        let log = TranscriptLog::new(Some(path.to_string_lossy().into_owned()));

        log.log_message("you: hi").unwrap();
        log.log_message("assistant: hello").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "you: hi\n\nassistant: hello\n\n");
    }
}
