use serde::Serialize;
use serde_json::{Value, json};

use sluice_api::{BackendError, BulkOp, IndexDirective, QueryExpr};

#[derive(Serialize)]
struct Action<'a> {
    index: &'a IndexDirective,
}

/// NDJSON bulk body: one action line and one source line per operation,
/// newline-terminated.
pub fn bulk_body(ops: &[BulkOp]) -> Result<String, BackendError> {
    let mut body = String::new();
    for op in ops {
        body.push_str(&serde_json::to_string(&Action { index: &op.directive })?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&op.record)?);
        body.push('\n');
    }
    Ok(body)
}

/// Query DSL for `query`: `match_all`, or a `bool.must` of `term` clauses.
pub fn query_dsl(query: &QueryExpr, keyword_suffix: &str) -> Value {
    match query {
        QueryExpr::MatchAll => json!({ "match_all": {} }),
        QueryExpr::Conjunction(clauses) => {
            let must: Vec<Value> = clauses
                .iter()
                .map(|c| {
                    let field = format!("{}{}", c.field.as_str(), keyword_suffix);
                    let value = c.value.as_text().map(|v| v.into_owned());
                    json!({ "term": { field: value } })
                })
                .collect();
            json!({ "bool": { "must": must } })
        }
    }
}

pub fn search_body(query: &QueryExpr, keyword_suffix: &str) -> Value {
    json!({ "query": query_dsl(query, keyword_suffix) })
}

#[cfg(test)]
mod tests {
    use sluice_api::{CampaignField, Equality, Record};

    use super::*;

    #[test]
    fn bulk_body_interleaves_action_and_source() {
        let ops: Vec<BulkOp> = ["1", "2"]
            .iter()
            .map(|id| BulkOp {
                directive: IndexDirective::new("campaigns"),
                record: [("id", *id), ("cost", "9.5")].into_iter().collect::<Record>(),
            })
            .collect();

        let body = bulk_body(&ops).unwrap();
        assert_eq!(
            body,
            "{\"index\":{\"_index\":\"campaigns\"}}\n{\"id\":\"1\",\"cost\":\"9.5\"}\n\
             {\"index\":{\"_index\":\"campaigns\"}}\n{\"id\":\"2\",\"cost\":\"9.5\"}\n"
        );
    }

    #[test]
    fn match_all_query() {
        assert_eq!(
            search_body(&QueryExpr::MatchAll, ".keyword"),
            json!({ "query": { "match_all": {} } })
        );
    }

    #[test]
    fn conjunction_becomes_term_clauses_in_order() {
        let query = QueryExpr::Conjunction(vec![
            Equality::new(CampaignField::Location, "US"),
            Equality::new(CampaignField::Clicks, 0i64),
        ]);
        assert_eq!(
            query_dsl(&query, ".keyword"),
            json!({ "bool": { "must": [
                { "term": { "Location.keyword": "US" } },
                { "term": { "Clicks.keyword": "0" } },
            ] } })
        );
        assert_eq!(
            query_dsl(&query, ""),
            json!({ "bool": { "must": [
                { "term": { "Location": "US" } },
                { "term": { "Clicks": "0" } },
            ] } })
        );
    }
}
