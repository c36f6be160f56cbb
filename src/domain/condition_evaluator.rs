/// Key condition evaluation against a single record.
///
/// Only string attributes take part: a record without the attribute, or with a
/// non-string value under that name, never matches.
use super::key_condition::{KeyCondition, KeyTerm};

pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Check whether a record satisfies every term of the condition.
    ///
    /// `lookup` resolves an attribute name to its string value.
    pub fn matches<'a, F>(condition: &KeyCondition, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        condition
            .terms()
            .all(|term| Self::matches_term(term, &lookup))
    }

    /// Check a single term
    ///
    /// - `=`: exact string equality
    /// - `begins_with`: string prefix
    /// - `BETWEEN`: start <= value <= end, byte-wise lexicographic
    pub fn matches_term<'a, F>(term: &KeyTerm, lookup: &F) -> bool
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let Some(actual) = lookup(term.name().attribute()) else {
            return false;
        };

        match term {
            KeyTerm::Equals { value, .. } => actual == value.value(),
            KeyTerm::BeginsWith { prefix, .. } => actual.starts_with(prefix.value()),
            KeyTerm::Between { start, end, .. } => {
                start.value() <= actual && actual <= end.value()
            }
        }
    }
}
