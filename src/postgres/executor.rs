use async_trait::async_trait;

use crate::error::FragSqlError;
use crate::executor::DriverConnection;
use crate::fragment::PlaceholderStyle;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::config::PgManagedConnection;
use super::params::Params;
use super::query::build_result_set;

#[async_trait]
impl DriverConnection for PgManagedConnection {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, FragSqlError> {
        let stmt = self.client.prepare(sql).await?;
        let converted = Params::convert(params);
        let rows = self.client.query(&stmt, converted.as_refs()).await?;
        build_result_set(&stmt, &rows)
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), FragSqlError> {
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn begin_transaction(&mut self) -> Result<(), FragSqlError> {
        self.client.batch_execute("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), FragSqlError> {
        self.client.batch_execute("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), FragSqlError> {
        self.client.batch_execute("ROLLBACK").await?;
        self.in_transaction = false;
        Ok(())
    }
}
