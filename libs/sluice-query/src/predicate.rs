use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use sluice_api::{CampaignField, Equality, FieldValue, QueryExpr};

/// Optional filter value per campaign field.
///
/// Built from a flat map of column name to value. Names outside the
/// campaign schema are dropped; blank values are kept here and skipped by
/// [`build_predicate`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "HashMap<String, serde_json::Value>")]
pub struct FilterSpec {
    values: BTreeMap<CampaignField, FieldValue>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: CampaignField, value: impl Into<FieldValue>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    /// Collect `(name, value)` pairs, ignoring names that are not campaign
    /// fields.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        let mut values = BTreeMap::new();
        for (name, value) in pairs {
            match name.as_ref().parse::<CampaignField>() {
                Ok(field) => {
                    values.insert(field, value.into());
                }
                Err(e) => tracing::debug!(error = %e, "ignoring filter"),
            }
        }
        Self { values }
    }

    pub fn value(&self, field: CampaignField) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// Fields of `other` replace the same fields of `self`.
    pub fn overlay(mut self, other: FilterSpec) -> Self {
        self.values.extend(other.values);
        self
    }

    /// No field carries a usable value.
    pub fn is_empty(&self) -> bool {
        self.values.values().all(FieldValue::is_blank)
    }
}

impl From<HashMap<String, serde_json::Value>> for FilterSpec {
    fn from(map: HashMap<String, serde_json::Value>) -> Self {
        FilterSpec::from_pairs(map)
    }
}

/// Conjunction of one exact-match clause per present field, in schema
/// order. With nothing present the result is match-all, never an empty
/// conjunction.
pub fn build_predicate(filters: &FilterSpec) -> QueryExpr {
    let clauses: Vec<Equality> = CampaignField::ALL
        .iter()
        .filter_map(|&field| {
            filters
                .value(field)
                .filter(|v| !v.is_blank())
                .map(|v| Equality::new(field, v.clone()))
        })
        .collect();

    if clauses.is_empty() {
        QueryExpr::MatchAll
    } else {
        QueryExpr::Conjunction(clauses)
    }
}
