use bb8::Pool;

use crate::error::FragSqlError;
use crate::sqlite::SqliteManager;

use super::LeasedConnection;

pub(super) async fn get_connection(
    pool: &Pool<SqliteManager>,
) -> Result<LeasedConnection, FragSqlError> {
    let conn = pool.get_owned().await?;
    Ok(LeasedConnection::Sqlite(conn))
}
