//! The driver boundary and fragment execution.
//!
//! [`DriverConnection`] is everything the access layer needs from a database
//! driver; [`execute`] and [`execute_single`] are the only places a fragment is
//! rendered to text and handed to one.

use async_trait::async_trait;

use crate::error::FragSqlError;
use crate::fragment::{Fragment, PlaceholderStyle};
use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

#[async_trait]
pub trait DriverConnection: Send {
    /// Marker the driver expects between segments of a rendered fragment.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Run one statement with positionally bound parameters, returning all rows.
    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, FragSqlError>;

    /// Run a parameterless script of one or more statements.
    async fn execute_batch(&mut self, sql: &str) -> Result<(), FragSqlError>;

    async fn begin_transaction(&mut self) -> Result<(), FragSqlError>;

    async fn commit(&mut self) -> Result<(), FragSqlError>;

    async fn rollback(&mut self) -> Result<(), FragSqlError>;
}

/// Render `fragment` for `conn` and return every row the driver produces.
///
/// # Errors
/// Driver failures surface as [`FragSqlError::QueryError`]; nothing is retried.
pub async fn execute<C>(conn: &mut C, fragment: &Fragment) -> Result<ResultSet, FragSqlError>
where
    C: DriverConnection + ?Sized,
{
    let sql = fragment.render_sql(conn.placeholder_style());
    tracing::trace!(sql = %sql, params = fragment.params().len(), "executing fragment");
    conn.query(&sql, fragment.params()).await
}

/// Like [`execute`] but keeps only the first row; zero rows yields `Ok(None)`.
///
/// # Errors
/// Same as [`execute`].
pub async fn execute_single<C>(
    conn: &mut C,
    fragment: &Fragment,
) -> Result<Option<CustomDbRow>, FragSqlError>
where
    C: DriverConnection + ?Sized,
{
    execute(conn, fragment).await.map(ResultSet::into_first)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::DriverError;

    struct Scripted {
        style: PlaceholderStyle,
        rows: Vec<i64>,
        fail: bool,
        last_sql: Option<String>,
    }

    impl Scripted {
        fn new(style: PlaceholderStyle, rows: Vec<i64>) -> Self {
            Self {
                style,
                rows,
                fail: false,
                last_sql: None,
            }
        }
    }

    #[async_trait]
    impl DriverConnection for Scripted {
        fn placeholder_style(&self) -> PlaceholderStyle {
            self.style
        }

        async fn query(
            &mut self,
            sql: &str,
            _params: &[RowValues],
        ) -> Result<ResultSet, FragSqlError> {
            self.last_sql = Some(sql.to_owned());
            if self.fail {
                return Err(DriverError::Worker("syntax error".into()).into());
            }
            let mut rs = ResultSet::with_capacity(self.rows.len());
            rs.set_column_names(Arc::new(vec!["n".into()]));
            for n in &self.rows {
                rs.add_row_values(vec![RowValues::Int(*n)]);
            }
            Ok(rs)
        }

        async fn execute_batch(&mut self, _sql: &str) -> Result<(), FragSqlError> {
            Ok(())
        }

        async fn begin_transaction(&mut self) -> Result<(), FragSqlError> {
            Ok(())
        }

        async fn commit(&mut self) -> Result<(), FragSqlError> {
            Ok(())
        }

        async fn rollback(&mut self) -> Result<(), FragSqlError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn renders_with_connection_style() -> Result<(), FragSqlError> {
        let mut conn = Scripted::new(PlaceholderStyle::Numbered, vec![1, 2]);
        let fragment = crate::sql!("select n from t where a = " {1_i64} " or a = " {2_i64});

        let rows = execute(&mut conn, &fragment).await?;

        assert_eq!(rows.len(), 2);
        assert_eq!(
            conn.last_sql.as_deref(),
            Some("select n from t where a = $1 or a = $2")
        );
        Ok(())
    }

    #[tokio::test]
    async fn single_returns_first_row_or_none() -> Result<(), FragSqlError> {
        let mut conn = Scripted::new(PlaceholderStyle::Positional, vec![7, 8]);
        let first = execute_single(&mut conn, &Fragment::text("select n from t")).await?;
        assert_eq!(first.and_then(|r| r.get("n").cloned()), Some(RowValues::Int(7)));

        let mut conn = Scripted::new(PlaceholderStyle::Positional, vec![]);
        let none = execute_single(&mut conn, &Fragment::text("select n from t")).await?;
        assert!(none.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn driver_failure_is_query_error() {
        let mut conn = Scripted::new(PlaceholderStyle::Positional, vec![]);
        conn.fail = true;
        let err = execute(&mut conn, &Fragment::text("selec")).await.unwrap_err();
        assert!(err.is_query_error());
    }
}
