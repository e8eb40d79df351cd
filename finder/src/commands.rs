//! Subcommand bodies
//!
//! Each command logs its own failures and reports success as a bool so
//! `main` only has to map it to an exit status.

use std::path::Path;
use std::time::Duration;

use clipqa_core::clipboard::{ClipboardTool, CommandClipboard};
use clipqa_core::pidfile::PidFile;
use clipqa_core::{
    Corpus, Finder, FinderSettings, MatchResult, Matcher, OverlayPayload, PayloadSink,
    QuestionIndex, ShutdownFlag, TcpSink, WireMessage,
};

pub struct WatchOptions<'a> {
    pub corpus: &'a Path,
    pub port: u16,
    pub interval: Duration,
    pub threshold: f32,
    pub min_query_chars: usize,
    pub backend: Option<ClipboardTool>,
    pub pid_file: Option<&'a Path>,
}

/// Load the corpus and watch the clipboard until shutdown
pub fn watch(options: WatchOptions<'_>, shutdown: &ShutdownFlag) -> bool {
    let Some(matcher) = load_matcher(options.corpus, options.threshold) else {
        return false;
    };

    let source = match CommandClipboard::detect(options.backend) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!(error = %e, "No usable clipboard backend");
            return false;
        }
    };

    let pid_file = match options.pid_file.map(PidFile::create).transpose() {
        Ok(pid) => pid,
        Err(e) => {
            tracing::error!(error = %e, "Failed to write pid file");
            return false;
        }
    };
    if let Some(pid) = &pid_file {
        tracing::info!(path = %pid.path().display(), pid = pid.handle().pid, "Liveness marker written");
    }

    let settings = FinderSettings {
        interval: options.interval,
        min_query_chars: options.min_query_chars,
        ..FinderSettings::default()
    };
    let sink = TcpSink::new(options.port);
    tracing::info!(
        addr = %sink.addr(),
        tool = %source.tool(),
        entries = matcher.len(),
        threshold = matcher.threshold(),
        "Finder ready"
    );

    let mut finder = Finder::new(source, matcher, sink, settings);
    match finder.run(shutdown.as_atomic()) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Clipboard watching failed");
            false
        }
    }
}

/// Send one message to the overlay, as the watch loop would
pub fn deliver(sink: &mut impl PayloadSink, message: &WireMessage) -> bool {
    match sink.send(message) {
        Ok(()) => {
            tracing::info!(kind = message.kind(), "Delivered");
            true
        }
        Err(e) => {
            tracing::error!(kind = message.kind(), error = %e, "Overlay unreachable");
            false
        }
    }
}

pub fn show_message(question: String, answers: Vec<String>) -> WireMessage {
    WireMessage::Show(OverlayPayload { question, answers })
}

/// Look `query` up offline and print the result
pub fn lookup(corpus: &Path, threshold: f32, query: &str) -> bool {
    let Some(matcher) = load_matcher(corpus, threshold) else {
        return false;
    };
    match matcher.best_match(query) {
        Some(result) => {
            println!("{}", describe(&result));
            true
        }
        None => {
            println!("no match (threshold {:.2})", matcher.threshold());
            true
        }
    }
}

fn load_matcher(corpus: &Path, threshold: f32) -> Option<Matcher> {
    match Corpus::load(corpus) {
        Ok(corpus) => Some(Matcher::with_threshold(corpus, threshold)),
        Err(e) => {
            tracing::error!(error = %e, "Cannot load corpus");
            None
        }
    }
}

/// Human-readable summary of a match
pub fn describe(result: &MatchResult) -> String {
    let mut out = format!(
        "#{} {:?} score {:.2}\nQ: {}",
        result.index, result.kind, result.score, result.entry.question
    );
    for answer in &result.entry.answers {
        out.push_str("\nA: ");
        out.push_str(answer);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipqa_core::{QAEntry, TransportError};

    struct MemorySink {
        sent: Vec<WireMessage>,
        offline: bool,
    }

    impl PayloadSink for MemorySink {
        fn send(&mut self, message: &WireMessage) -> Result<(), TransportError> {
            if self.offline {
                return Err(TransportError::Empty);
            }
            self.sent.push(message.clone());
            Ok(())
        }
    }

    fn corpus() -> Corpus {
        Corpus::new(vec![
            QAEntry {
                question: "capital of france".to_string(),
                answers: vec!["Paris".to_string()],
            },
            QAEntry {
                question: "primary colors".to_string(),
                answers: vec!["red".to_string(), "yellow".to_string(), "blue".to_string()],
            },
        ])
    }

    #[test]
    fn test_describe_lists_answers() {
        let matcher = Matcher::new(corpus());
        let result = matcher.best_match("Primary   Colors").unwrap();
        assert_eq!(
            describe(&result),
            "#1 Exact score 1.00\nQ: primary colors\nA: red\nA: yellow\nA: blue"
        );
    }

    #[test]
    fn test_deliver_reports_failure() {
        let mut sink = MemorySink {
            sent: Vec::new(),
            offline: false,
        };
        let message = show_message("q".to_string(), vec!["a".to_string()]);
        assert!(deliver(&mut sink, &message));
        assert_eq!(sink.sent, vec![message.clone()]);

        sink.offline = true;
        assert!(!deliver(&mut sink, &message));
        assert_eq!(sink.sent.len(), 1);
    }

    #[test]
    fn test_lookup_missing_corpus_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!lookup(&dir.path().join("absent.json"), 0.6, "anything"));
    }

    #[test]
    fn test_lookup_reads_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answers.json");
        std::fs::write(
            &path,
            r#"[{"question": "capital of france", "answer": "Paris"}]"#,
        )
        .unwrap();
        assert!(lookup(&path, 0.6, "Capital Of France"));
        assert!(lookup(&path, 0.6, "zzzz"));
    }
}
