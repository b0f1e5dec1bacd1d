use serde::{Deserialize, Serialize};

use crate::data_models::SearchResult;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// 500 envelope. Shaped like a search response so clients can still show
/// the answer.
#[derive(Debug, Serialize, Deserialize)]
pub struct InternalErrorBody {
    pub error: String,
    pub results: Vec<SearchResult>,
    pub answer: String,
}
