pub mod backend;
pub mod error;
pub mod query;
pub mod record;
pub mod schema;

pub use backend::{
    BulkItemError, BulkItemResult, BulkOp, BulkResponse, IndexDirective, Refresh, SearchBackend,
    SearchResponse,
};
pub use error::{BackendError, ErrorKind};
pub use query::{Equality, QueryExpr};
pub use record::{FieldValue, Record};
pub use schema::{CampaignField, HeaderCoverage};
