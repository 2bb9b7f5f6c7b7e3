#![cfg(feature = "sqlite")]

use fragsql::prelude::*;
use tempfile::tempdir;

#[tokio::test]
async fn test05_close_refuses_later_operations_on_every_clone()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let db = Database::sqlite_builder(dir.path().join("close.db").to_string_lossy())
        .build()
        .await?;
    let other = db.clone();

    db.close();

    assert!(matches!(
        other.query("SELECT 1").await.unwrap_err(),
        FragSqlError::PoolClosed
    ));
    let result = other
        .transaction(|tx| {
            Box::pin(async move {
                tx.query("SELECT 1").await?;
                Ok::<_, FragSqlError>(())
            })
        })
        .await;
    assert!(matches!(result, Err(FragSqlError::PoolClosed)));
    Ok(())
}

#[tokio::test]
async fn test05_with_connection_keeps_one_session() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let db = Database::sqlite_builder(dir.path().join("session.db").to_string_lossy())
        .build()
        .await?;

    // A temp table lives only on the connection that created it.
    let seen = db
        .with_connection(|conn| {
            Box::pin(async move {
                conn.execute_batch("CREATE TEMP TABLE scratch (v TEXT);").await?;
                conn.query(sql!("INSERT INTO scratch (v) VALUES (" {"kept"} ")"))
                    .await?;
                conn.query_single("SELECT v FROM scratch").await
            })
        })
        .await?;

    assert_eq!(
        seen.and_then(|r| r.get("v").cloned()),
        Some(RowValues::Text("kept".into()))
    );
    assert_eq!(db.pool_state().idle_connections, db.pool_state().connections);
    Ok(())
}

#[tokio::test]
async fn test05_missing_directory_fails_to_open() {
    let err = Database::sqlite_builder("/nonexistent-dir/sub/db.sqlite")
        .connection_timeout(std::time::Duration::from_millis(300))
        .build()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FragSqlError::PoolUnavailable(_) | FragSqlError::ConnectionError(_)
    ));
}

#[tokio::test]
async fn test05_options_from_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("config.db");
    let raw = serde_json::json!({ "db_path": path.to_string_lossy(), "max_connections": 3 });
    let opts: SqliteOptions = serde_json::from_value(raw)?;
    assert!(opts.wal);

    let db = Database::open_sqlite(opts).await?;
    db.execute_batch("CREATE TABLE t (n INTEGER);").await?;
    let mode = db.query_single("PRAGMA journal_mode").await?;
    assert_eq!(
        mode.and_then(|r| r.get_by_index(0).and_then(RowValues::as_text).map(str::to_owned)),
        Some("wal".to_string())
    );
    Ok(())
}
