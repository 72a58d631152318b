//! Trigger-word matching.
//!
//! A message matches when any whitespace-delimited token contains any trigger
//! as a substring. Matching is case-sensitive unless the set was built with
//! `case_insensitive`, in which case both token and trigger are lower-cased.

/// Immutable set of trigger substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSet {
    /// Stored already folded when `case_insensitive` is set.
    words: Vec<String>,
    case_insensitive: bool,
}

impl TriggerSet {
    /// Build a set from configured words.
    ///
    /// Empty and whitespace-only entries are dropped rather than kept as the
    /// empty substring, so `{""}` matches nothing instead of every non-blank
    /// message. Entries are trimmed and deduplicated after case folding.
    pub fn new<I, S>(words: I, case_insensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut folded: Vec<String> = Vec::new();
        for word in words {
            let word = word.as_ref().trim();
            if word.is_empty() {
                continue;
            }
            let word = if case_insensitive {
                word.to_lowercase()
            } else {
                word.to_string()
            };
            if !folded.contains(&word) {
                folded.push(word);
            }
        }
        Self {
            words: folded,
            case_insensitive,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// First trigger found in `text`, scanning tokens left to right.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        if self.words.is_empty() {
            return None;
        }
        text.split_whitespace().find_map(|token| {
            if self.case_insensitive {
                let token = token.to_lowercase();
                self.find_in(&token)
            } else {
                self.find_in(token)
            }
        })
    }

    /// Whether `text` contains any trigger.
    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    fn find_in(&self, token: &str) -> Option<&str> {
        self.words
            .iter()
            .find(|w| token.contains(w.as_str()))
            .map(String::as_str)
    }
}

/// Whether `text` contains any trigger from `triggers`.
pub fn matches(text: &str, triggers: &TriggerSet) -> bool {
    triggers.matches(text)
}
