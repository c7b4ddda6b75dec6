//! The per-message match predicate.

use std::ops::Range;

use regex::{Regex, RegexBuilder};

use crate::CoreError;
use crate::groupme::models::Message;
use crate::search::context::ContextWindow;

/// Restriction on who liked a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FavoriteFilter {
    /// No restriction.
    #[default]
    Any,
    /// Only messages liked by this user ID.
    RequireFavorited(String),
    /// Only messages not liked by this user ID.
    RequireNotFavorited(String),
}

impl FavoriteFilter {
    fn admits(&self, message: &Message) -> bool {
        match self {
            Self::Any => true,
            Self::RequireFavorited(user) => message.is_favorited_by(user),
            Self::RequireNotFavorited(user) => !message.is_favorited_by(user),
        }
    }
}

/// Everything that decides whether a message matches. Fixed for a run.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Text pattern.
    pub pattern: Regex,
    /// Select messages that do not match `pattern`.
    pub reverse: bool,
    /// Print only the matched part of the text.
    pub only_matching: bool,
    /// Whether `pattern` was compiled case-insensitively.
    pub ignore_case: bool,
    /// Author name pattern.
    pub user_pattern: Option<Regex>,
    /// Like restriction.
    pub favorited: FavoriteFilter,
    /// Surrounding messages to print with each match.
    pub context: ContextWindow,
}

impl MatchConfig {
    /// A config matching `pattern` with every option off.
    #[must_use]
    pub fn new(pattern: Regex) -> Self {
        Self {
            pattern,
            reverse: false,
            only_matching: false,
            ignore_case: false,
            user_pattern: None,
            favorited: FavoriteFilter::Any,
            context: ContextWindow::default(),
        }
    }
}

/// Where in the text a message matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSpan {
    /// Byte range of the match in the message text.
    Bytes(Range<usize>),
    /// The message passed without a concrete span (reverse matching).
    Empty,
}

/// Outcome of [`filter_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// The message is not selected.
    NoMatch,
    /// The message is selected.
    Match(MatchSpan),
}

/// Compile `patterns` into one alternation, with `.` matching newlines.
///
/// # Errors
///
/// Returns an error if the joined pattern is not a valid regex.
pub fn compile_alternation<S: AsRef<str>>(
    patterns: &[S],
    ignore_case: bool,
) -> Result<Regex, CoreError> {
    let joined = join(patterns);
    Ok(RegexBuilder::new(&joined)
        .dot_matches_new_line(true)
        .case_insensitive(ignore_case)
        .build()?)
}

/// Compile author name patterns. No patterns, or only empty ones, means no
/// author restriction.
///
/// # Errors
///
/// Returns an error if the joined pattern is not a valid regex.
pub fn compile_user_pattern<S: AsRef<str>>(
    patterns: &[S],
    ignore_case: bool,
) -> Result<Option<Regex>, CoreError> {
    if join(patterns).is_empty() {
        return Ok(None);
    }
    compile_alternation(patterns, ignore_case).map(Some)
}

fn join<S: AsRef<str>>(patterns: &[S]) -> String {
    patterns
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("|")
}

/// Decide whether `message` is selected by `config`.
///
/// Checks run in order and the first failure wins:
/// 1. messages without text never match
/// 2. the author must match the user pattern, if any
/// 3. the like restriction must hold
/// 4. the text pattern must match, or must not in reverse mode
#[must_use]
pub fn filter_message(message: &Message, config: &MatchConfig) -> MatchResult {
    let Some(text) = message.text.as_deref() else {
        return MatchResult::NoMatch;
    };
    if let Some(user) = &config.user_pattern
        && !user.is_match(&message.author_name)
    {
        return MatchResult::NoMatch;
    }
    if !config.favorited.admits(message) {
        return MatchResult::NoMatch;
    }

    let found = config.pattern.find(text);
    if found.is_some() == config.reverse {
        return MatchResult::NoMatch;
    }
    MatchResult::Match(found.map_or(MatchSpan::Empty, |m| MatchSpan::Bytes(m.range())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{message, message_json};
    use proptest::prelude::*;

    fn config(pattern: &str) -> MatchConfig {
        MatchConfig::new(compile_alternation(&[pattern], false).expect("pattern"))
    }

    fn matched_text<'m>(message: &'m Message, result: &MatchResult) -> &'m str {
        let MatchResult::Match(MatchSpan::Bytes(range)) = result else {
            panic!("expected a span, got {result:?}");
        };
        &message.text.as_deref().expect("text")[range.clone()]
    }

    #[test]
    fn reverse_selects_non_matches_without_span() {
        let mut config = config("hello");
        config.reverse = true;
        assert_eq!(
            filter_message(&message("1", "goodbye"), &config),
            MatchResult::Match(MatchSpan::Empty)
        );
        assert_eq!(filter_message(&message("1", "hello"), &config), MatchResult::NoMatch);
    }

    #[test]
    fn missing_text_never_matches() {
        let mut msg = message("1", "");
        msg.text = None;
        assert_eq!(filter_message(&msg, &config(".*")), MatchResult::NoMatch);

        let mut reverse = config("x");
        reverse.reverse = true;
        assert_eq!(filter_message(&msg, &reverse), MatchResult::NoMatch);
    }

    #[test]
    fn empty_user_patterns_mean_no_restriction() {
        assert!(compile_user_pattern::<&str>(&[], false).expect("user").is_none());
        assert!(compile_user_pattern(&[""], false).expect("user").is_none());
    }

    #[test]
    fn patterns_are_alternated() {
        let config = config("cat|dog");
        let msg = message("1", "hot dog");
        let result = filter_message(&msg, &config);
        assert_eq!(matched_text(&msg, &result), "dog");

        let joined = compile_alternation(&["cat", "dog"], false).expect("pattern");
        assert_eq!(joined.as_str(), "cat|dog");
    }

    #[test]
    fn ignore_case() {
        let msg = message("1", "HeLLo there");
        assert_eq!(filter_message(&msg, &config("hello")), MatchResult::NoMatch);

        let config = MatchConfig::new(compile_alternation(&["hello"], true).expect("pattern"));
        let result = filter_message(&msg, &config);
        assert_eq!(matched_text(&msg, &result), "HeLLo");
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = compile_alternation(&["("], false).expect_err("invalid");
        assert!(matches!(err, CoreError::Pattern(_)));
    }

    fn authored(text: &str, author: &str, liked_by: &[&str]) -> Message {
        let mut msg: Message =
            serde_json::from_value(message_json("1", text, author)).expect("message");
        msg.favorited_by = liked_by.iter().map(ToString::to_string).collect();
        msg
    }

    proptest! {
        #[test]
        fn dot_star_matches_whole_text(text in any::<String>()) {
            let msg = message("1", &text);
            let result = filter_message(&msg, &config(".*"));
            prop_assert_eq!(result, MatchResult::Match(MatchSpan::Bytes(0..text.len())));
        }

        #[test]
        fn reverse_never_matches_everything_pattern(text in any::<String>()) {
            let mut config = config(".*");
            config.reverse = true;
            prop_assert_eq!(filter_message(&message("1", &text), &config), MatchResult::NoMatch);
        }

        #[test]
        fn favorite_filters(text in any::<String>(), author in any::<String>()) {
            let liked = authored(&text, &author, &["42"]);
            let unliked = authored(&text, &author, &["7"]);
            let mut config = config(".*");

            config.favorited = FavoriteFilter::RequireFavorited("42".to_string());
            prop_assert!(matches!(filter_message(&liked, &config), MatchResult::Match(_)));
            prop_assert_eq!(filter_message(&unliked, &config), MatchResult::NoMatch);

            config.favorited = FavoriteFilter::RequireNotFavorited("42".to_string());
            prop_assert_eq!(filter_message(&liked, &config), MatchResult::NoMatch);
            prop_assert!(matches!(filter_message(&unliked, &config), MatchResult::Match(_)));
        }

        #[test]
        fn user_pattern(text in any::<String>(), author in any::<String>()) {
            let msg = authored(&text, &author, &[]);
            let mut config = config(".*");

            config.user_pattern = compile_user_pattern(&[".*"], false).expect("user");
            prop_assert!(matches!(filter_message(&msg, &config), MatchResult::Match(_)));

            config.user_pattern = compile_user_pattern(&["a^"], false).expect("user");
            prop_assert_eq!(filter_message(&msg, &config), MatchResult::NoMatch);
        }
    }
}
