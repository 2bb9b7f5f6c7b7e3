use crate::types::RowValues;

/// A SQL string with `?` markers and the parameters bound to them.
///
/// The explicit-pair form of a statement, for callers that already hold SQL
/// text; convert it with `Fragment::try_from` (marker count is checked):
/// ```rust
/// use fragsql::prelude::*;
///
/// let qp = QueryAndParams::new(
///     "INSERT INTO t (id, name) VALUES (?, ?)",
///     vec![RowValues::Int(1), RowValues::Text("alice".into())],
/// );
/// let fragment = Fragment::try_from(qp)?;
/// assert_eq!(fragment.params().len(), 2);
/// # Ok::<(), FragSqlError>(())
/// ```
#[derive(Debug, Clone)]
pub struct QueryAndParams {
    /// The SQL query string
    pub query: String,
    /// The parameters to be bound to the query
    pub params: Vec<RowValues>,
}

impl QueryAndParams {
    pub fn new(query: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    pub fn new_without_params(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }
}
