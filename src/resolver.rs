//! Reply resolution: ordered rule matching over the info store.
//!
//! `Resolver::resolve` is total - it always produces a non-empty reply, even
//! when the store is empty or the answer service is down. Rules are checked
//! in strict precedence order and the first match wins.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::store::{InfoStore, Notice};

/// Reply length cap for SMS-style channels (Twilio).
pub const SMS_ANSWER_CAP: usize = 1000;
/// Reply length cap for Telegram, which allows longer messages.
pub const TELEGRAM_ANSWER_CAP: usize = 4000;

/// Listing and search results are capped at 5 lines. Contacts and timetable
/// are rendered in full - both are assumed small.
const LISTING_CAP: usize = 5;

const HELP_TEXT: &str = "Hi! I'm the University of Lucknow Info Bot. Commands:\n\
                         - notices: latest notices\n\
                         - events: upcoming events\n\
                         - contacts: important numbers\n\
                         - timetable: department timetables\n\
                         - latest <keyword>: search notices for a keyword\n\
                         Example: latest exam";

/// Final fallback when nothing matched and the answer service produced nothing.
pub const FALLBACK_TEXT: &str =
    "Sorry, I didn't understand. Send 'help' for commands or ask a question!";

/// Errors from the free-form answer service.
#[derive(Debug)]
pub enum AnswerError {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl fmt::Display for AnswerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Api(e) => write!(f, "API error: {e}"),
            Self::Parse(e) => write!(f, "Parse error: {e}"),
            Self::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for AnswerError {}

/// Free-form answer generation behind a swappable seam: the resolver only
/// needs "prompt in, text out", so tests can script it and deployments
/// without an API key simply run without it.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AnswerError>;
}

pub struct Resolver {
    answerer: Option<Arc<dyn Answerer>>,
}

impl Resolver {
    /// `answerer` is an optional capability; `None` disables free-form
    /// answers and is a valid configuration, not an error.
    pub fn new(answerer: Option<Arc<dyn Answerer>>) -> Self {
        Self { answerer }
    }

    /// Map an incoming text to a reply. Total: never errors, never empty.
    ///
    /// `answer_cap` bounds free-form answers in chars; pick
    /// [`SMS_ANSWER_CAP`] or [`TELEGRAM_ANSWER_CAP`] per channel.
    pub async fn resolve(&self, raw_text: &str, store: &InfoStore, answer_cap: usize) -> String {
        let text = raw_text.trim();
        let lc = text.to_lowercase();

        match lc.as_str() {
            "help" | "hi" | "hello" | "/start" => return HELP_TEXT.to_string(),
            "notices" => return list_notices(store),
            "events" => return list_events(store),
            "contacts" => return list_contacts(store),
            "timetable" => return list_timetable(store),
            _ => {}
        }

        if let Some(query) = lc.strip_prefix("latest ") {
            let matches = search_notices(store, query);
            if matches.is_empty() {
                return format!("No notices found containing '{query}'.");
            }
            return format!("Notices matching '{query}':\n{}", notice_lines(&matches));
        }

        // Last structured attempt: the whole input as a notice search.
        let matches = search_notices(store, &lc);
        if !matches.is_empty() {
            return format!("I found these notices:\n{}", notice_lines(&matches));
        }

        if let Some(ref answerer) = self.answerer
            && text.chars().count() > 3
        {
            let prompt = build_prompt(text, store);
            // Failures here must never reach the user; fall through instead.
            match answerer.generate(&prompt).await {
                Ok(answer) if !answer.trim().is_empty() => {
                    return truncate_chars(answer.trim(), answer_cap);
                }
                Ok(_) => warn!("Answer service returned an empty answer"),
                Err(e) => warn!("Answer service failed: {e}"),
            }
        }

        FALLBACK_TEXT.to_string()
    }
}

fn list_notices(store: &InfoStore) -> String {
    if store.notices.is_empty() {
        return "No notices found.".to_string();
    }
    let all: Vec<_> = store.notices.iter().collect();
    format!("Latest notices:\n{}", notice_lines(&all))
}

fn list_events(store: &InfoStore) -> String {
    if store.events.is_empty() {
        return "No upcoming events.".to_string();
    }
    let lines: Vec<String> = store
        .events
        .iter()
        .take(LISTING_CAP)
        .map(|e| format!("{} - {} @ {}", e.date, e.title, e.location.as_deref().unwrap_or("TBA")))
        .collect();
    format!("Upcoming events:\n{}", lines.join("\n"))
}

fn list_contacts(store: &InfoStore) -> String {
    if store.contacts.is_empty() {
        return "No contact information available.".to_string();
    }
    let lines: Vec<String> = store
        .contacts
        .iter()
        .map(|(name, number)| format!("{name}: {number}"))
        .collect();
    format!("Important contacts:\n{}", lines.join("\n"))
}

fn list_timetable(store: &InfoStore) -> String {
    if store.timetable.is_empty() {
        return "No timetable data available.".to_string();
    }
    let lines: Vec<String> = store
        .timetable
        .iter()
        .map(|(dept, when)| format!("{dept}: {when}"))
        .collect();
    format!("Timetables:\n{}", lines.join("\n"))
}

/// Case-insensitive substring search over title and content concatenated
/// without a separator. The missing separator is long-standing observed
/// behavior: a query can span the title/content boundary.
fn search_notices<'a>(store: &'a InfoStore, query: &str) -> Vec<&'a Notice> {
    store
        .notices
        .iter()
        .filter(|n| {
            let haystack =
                format!("{}{}", n.title, n.content.as_deref().unwrap_or("")).to_lowercase();
            haystack.contains(query)
        })
        .collect()
}

fn notice_lines(notices: &[&Notice]) -> String {
    notices
        .iter()
        .take(LISTING_CAP)
        .map(|n| format!("{} - {}", n.date, n.title))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_prompt(question: &str, store: &InfoStore) -> String {
    let mut prompt = String::from(
        "You are a helpful assistant for University of Lucknow students. \
         Answer the student's question briefly and helpfully.\n",
    );

    let digest = store_digest(store);
    if !digest.is_empty() {
        prompt.push_str("\nRecent campus information:\n");
        prompt.push_str(&digest);
        prompt.push('\n');
    }

    prompt.push_str(&format!("\nStudent question: {question}\n\nAnswer:"));
    prompt
}

/// A few recent notices and events, so short factual questions can be
/// answered from the store even when no keyword matched.
fn store_digest(store: &InfoStore) -> String {
    let mut lines = Vec::new();
    for n in store.notices.iter().take(3) {
        lines.push(format!("notice: {} - {}", n.date, n.title));
    }
    for e in store.events.iter().take(3) {
        lines.push(format!("event: {} - {}", e.date, e.title));
    }
    lines.join("\n")
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
