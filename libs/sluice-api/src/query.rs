use crate::record::{FieldValue, Record};
use crate::schema::CampaignField;

/// Exact-match clause: `field == value`, nothing fuzzy.
#[derive(Debug, Clone, PartialEq)]
pub struct Equality {
    pub field: CampaignField,
    pub value: FieldValue,
}

impl Equality {
    pub fn new(field: CampaignField, value: impl Into<FieldValue>) -> Self {
        Self { field, value: value.into() }
    }

    /// Textual equality against the stored field. A missing or null field
    /// never matches.
    pub fn matches(&self, record: &Record) -> bool {
        let expected = match self.value.as_text() {
            Some(v) => v,
            None => return false,
        };
        record
            .get(self.field.as_str())
            .and_then(FieldValue::as_text)
            .is_some_and(|actual| actual == expected)
    }
}

/// Backend-neutral filter expression.
///
/// `MatchAll` and an empty `Conjunction` are different things: backends
/// may treat an empty conjunction as matching nothing. The predicate
/// builder never produces an empty conjunction.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    MatchAll,
    Conjunction(Vec<Equality>),
}

impl QueryExpr {
    pub fn is_match_all(&self) -> bool {
        matches!(self, QueryExpr::MatchAll)
    }

    pub fn clauses(&self) -> &[Equality] {
        match self {
            QueryExpr::MatchAll => &[],
            QueryExpr::Conjunction(clauses) => clauses,
        }
    }

    /// Reference evaluation, for in-process backends.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            QueryExpr::MatchAll => true,
            QueryExpr::Conjunction(clauses) => {
                !clauses.is_empty() && clauses.iter().all(|c| c.matches(record))
            }
        }
    }
}
