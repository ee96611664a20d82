//! Wake phrase matching on transcribed text
//!
//! Speech recognizers rarely hear "hey hats eye" verbatim, so matching is
//! lenient: known phonetic variants first, then a keyword check on short
//! utterances.

/// Phrases accepted anywhere in the transcript
pub const DEFAULT_WAKE_PHRASES: &[&str] = &[
    "hey hats eye",
    "hey hats i",
    "hey hat eye",
    "hey hat i",
    "hats eye",
    "hat eye",
    "hats i",
    "hat i",
    "hot sauce",
    "hot saw",
    "hat sauce",
    "hat saw",
    "heart sauce",
    "hard sauce",
    "hot sighs",
    "hat sighs",
    "hey hot",
    "hey hat",
    "hey heart",
    "hey hard",
    "hat seye",
    "hats ai",
    "hats aye",
    "hats sauce",
    "hot eye",
    "hot i",
    "heart eye",
    "hard eye",
];

/// Words heard in place of "hats"
const HATS_KEYWORDS: &[&str] = &["hats", "hat", "hat's", "hot", "hut", "hart", "heart", "hard"];

/// Words heard in place of "eye"
const EYE_KEYWORDS: &[&str] = &[
    "eye", "i", "ai", "aye", "sauce", "saws", "saw", "so", "sigh", "sighs",
];

const GREETINGS: &[&str] = &["hey", "hi"];

/// Detects the wake phrase in transcribed speech
#[derive(Debug, Clone)]
pub struct WakePhraseMatcher {
    /// Phrases split into words, longest first
    phrases: Vec<Vec<String>>,
}

impl Default for WakePhraseMatcher {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl WakePhraseMatcher {
    /// Create a matcher; an empty list selects the built-in variants
    #[must_use]
    pub fn new(phrases: Vec<String>) -> Self {
        let source: Vec<String> = if phrases.is_empty() {
            DEFAULT_WAKE_PHRASES.iter().map(ToString::to_string).collect()
        } else {
            phrases
        };

        let mut phrases: Vec<Vec<String>> = source
            .iter()
            .map(|p| tokens(p).into_iter().map(|t| t.word).collect::<Vec<_>>())
            .filter(|words| !words.is_empty())
            .collect();
        phrases.sort_by_key(|words| std::cmp::Reverse(words.len()));

        tracing::debug!(count = phrases.len(), "wake phrase matcher initialized");
        Self { phrases }
    }

    /// Whether the transcript contains the wake phrase
    #[must_use]
    pub fn matches(&self, transcript: &str) -> bool {
        let tokens = tokens(transcript);
        if self.find(&tokens).is_some() {
            return true;
        }

        if tokens.len() < 2 {
            return false;
        }

        let has = |set: &[&str]| tokens.iter().any(|t| set.contains(&t.word.as_str()));
        if !(has(HATS_KEYWORDS) && has(EYE_KEYWORDS)) {
            return false;
        }

        tokens.len() <= 3 || (tokens.len() <= 4 && has(GREETINGS))
    }

    /// Question following the wake phrase, if the transcript carries one
    ///
    /// Returns `None` when there is no wake phrase or nothing follows it.
    #[must_use]
    pub fn strip(&self, transcript: &str) -> Option<String> {
        let tokens = tokens(transcript);
        let end = self.find(&tokens)?;

        let question = tokens[end..]
            .iter()
            .map(|t| t.raw)
            .collect::<Vec<_>>()
            .join(" ");
        (!question.is_empty()).then_some(question)
    }

    /// Token index just past the earliest (then longest) phrase occurrence
    fn find(&self, tokens: &[Token<'_>]) -> Option<usize> {
        (0..tokens.len()).find_map(|start| {
            self.phrases.iter().find_map(|phrase| {
                let window = tokens.get(start..start + phrase.len())?;
                window
                    .iter()
                    .zip(phrase)
                    .all(|(t, w)| t.word == *w)
                    .then_some(start + phrase.len())
            })
        })
    }
}

/// A transcript word: as spoken, and normalized for comparison
struct Token<'a> {
    raw: &'a str,
    word: String,
}

fn tokens(text: &str) -> Vec<Token<'_>> {
    text.split_whitespace()
        .filter_map(|raw| {
            let word = raw
                .trim_matches(|c: char| c.is_ascii_punctuation() && c != '\'')
                .to_lowercase();
            (!word.is_empty()).then_some(Token { raw, word })
        })
        .collect()
}
