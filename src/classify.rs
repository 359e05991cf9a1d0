//! Keyword classification for call text
//!
//! Stateless matchers that decide whether a blob of text denotes an incoming
//! call, or whether an action label denotes an answer/accept affordance.
//! Both the notification and accessibility detectors route through these, so
//! the keyword sets stay in one place.

/// Phrases that mark text as describing an incoming call.
///
/// Matching is substring containment over lower-cased input, so "Incoming
/// voice call from Ana" matches on both "incoming call" fragments and
/// "voice call".
pub const DEFAULT_CALL_PHRASES: &[&str] = &[
    "incoming call",
    "incoming voice call",
    "incoming video call",
    "voice call",
    "video call",
    "calling",
    "llamada entrante",
    "रही है",
];

/// Labels that mark a control or notification action as "answer this call".
/// One entry per supported locale; coverage is deliberately best-effort.
pub const DEFAULT_ANSWER_LABELS: &[&str] = &[
    "answer",
    "accept",
    "pick up",
    "responder",
    "atender",
    "acceptar",
    "décrocher",
    "accepter",
    "antworten",
    "annehmen",
    "rispondere",
    "accettare",
    "接听",
    "接受",
    "응답",
    "수락",
    "받기",
    "उत्तर",
    "जवाब",
];

/// The multilingual keyword sets used by every detector.
#[derive(Debug, Clone)]
pub struct KeywordSets {
    /// Phrases denoting an incoming call.
    pub call_phrases: Vec<String>,
    /// Labels denoting an answer/accept action.
    pub answer_labels: Vec<String>,
}

impl Default for KeywordSets {
    fn default() -> Self {
        Self {
            call_phrases: DEFAULT_CALL_PHRASES.iter().map(|s| s.to_string()).collect(),
            answer_labels: DEFAULT_ANSWER_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl KeywordSets {
    /// Build sets from configured phrase lists, falling back to the defaults
    /// when a list is empty.
    pub fn from_lists(call_phrases: &[String], answer_labels: &[String]) -> Self {
        let mut sets = Self::default();
        if !call_phrases.is_empty() {
            sets.call_phrases = call_phrases.to_vec();
        }
        if !answer_labels.is_empty() {
            sets.answer_labels = answer_labels.to_vec();
        }
        sets
    }
}

/// Returns true when `text` contains any configured call phrase.
///
/// Case-insensitive, any substring position, OR semantics across the set.
/// Pure and side-effect-free.
pub fn classify_call_text(text: &str, keywords: &KeywordSets) -> bool {
    contains_any(text, &keywords.call_phrases)
}

/// Returns true when `label` contains any configured answer keyword.
pub fn classify_answer_label(label: &str, keywords: &KeywordSets) -> bool {
    contains_any(label, &keywords.answer_labels)
}

fn contains_any(text: &str, needles: &[String]) -> bool {
    if text.is_empty() {
        return false;
    }
    let lowered = text.to_lowercase();
    needles
        .iter()
        .any(|needle| !needle.is_empty() && lowered.contains(&needle.to_lowercase()))
}
