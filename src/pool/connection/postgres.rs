use bb8::Pool;

use crate::error::FragSqlError;
use crate::postgres::PgManager;

use super::LeasedConnection;

pub(super) async fn get_connection(
    pool: &Pool<PgManager>,
) -> Result<LeasedConnection, FragSqlError> {
    let conn = pool.get_owned().await?;
    Ok(LeasedConnection::Postgres(conn))
}
