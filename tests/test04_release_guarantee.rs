#![cfg(feature = "sqlite")]

use std::time::Duration;

use fragsql::prelude::*;
use tempfile::tempdir;

async fn open(dir: &tempfile::TempDir) -> Result<Database, FragSqlError> {
    let db = Database::sqlite_builder(dir.path().join("release.db").to_string_lossy())
        .max_connections(2)
        .connection_timeout(Duration::from_secs(5))
        .build()
        .await?;
    db.execute_batch("CREATE TABLE t (n INTEGER NOT NULL);").await?;
    Ok(db)
}

#[derive(Debug)]
enum AppError {
    Db(FragSqlError),
    Business(&'static str),
}

impl From<FragSqlError> for AppError {
    fn from(err: FragSqlError) -> Self {
        AppError::Db(err)
    }
}

fn idle(db: &Database) -> u32 {
    db.pool_state().idle_connections
}

#[tokio::test]
async fn test04_every_operation_returns_its_connection() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let db = open(&dir).await?;
    let before = idle(&db);
    assert!(before >= 1);

    db.query(sql!("INSERT INTO t (n) VALUES (" {1_i64} ")")).await?;
    assert_eq!(idle(&db), before);

    let _ = db.query("SELECT * FROM nope").await.unwrap_err();
    assert_eq!(idle(&db), before);

    let _ = db.query_single("SELECT n FROM t WHERE n = 99").await?;
    assert_eq!(idle(&db), before);

    let _ = db.query_single("SELECT * FROM nope").await.unwrap_err();
    assert_eq!(idle(&db), before);

    db.transaction(|tx| {
        Box::pin(async move {
            tx.query(sql!("INSERT INTO t (n) VALUES (" {2_i64} ")")).await?;
            Ok::<_, FragSqlError>(())
        })
    })
    .await?;
    assert_eq!(idle(&db), before);

    let _ = db
        .transaction(|tx| {
            Box::pin(async move {
                tx.query(sql!("INSERT INTO t (n) VALUES (" {None::<i64>} ")")).await?;
                Ok::<_, FragSqlError>(())
            })
        })
        .await
        .unwrap_err();
    assert_eq!(idle(&db), before);

    let result: Result<(), AppError> = db
        .transaction(|tx| {
            Box::pin(async move {
                tx.query(sql!("INSERT INTO t (n) VALUES (" {3_i64} ")")).await?;
                Err(AppError::Business("order rejected"))
            })
        })
        .await;
    assert!(matches!(result, Err(AppError::Business("order rejected"))));
    assert_eq!(idle(&db), before);
    Ok(())
}

#[tokio::test]
async fn test04_transaction_left_open_by_a_script_is_not_reused() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let db = open(&dir).await?;

    db.with_connection(|conn| {
        Box::pin(async move {
            conn.execute_batch("BEGIN; INSERT INTO t (n) VALUES (7);").await?;
            Ok::<_, FragSqlError>(())
        })
    })
    .await?;

    // The dirty connection was discarded, taking its uncommitted insert with it.
    db.query(sql!("INSERT INTO t (n) VALUES (" {8_i64} ")")).await?;
    let rows = db.query("SELECT n FROM t").await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.first().and_then(|r| r.get("n")), Some(&RowValues::Int(8)));
    Ok(())
}

#[tokio::test]
async fn test04_pool_does_not_leak_under_repeated_failures() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let db = open(&dir).await?;

    for _ in 0..20 {
        let _ = db.query("SELEC broken").await.unwrap_err();
        let _ = db
            .transaction(|tx| {
                Box::pin(async move {
                    tx.query("INSERT INTO t (n) VALUES (NULL)").await?;
                    Ok::<_, FragSqlError>(())
                })
            })
            .await
            .unwrap_err();
    }

    // With a pool of two, a leak would have exhausted it long ago.
    let rows = db.query("SELECT COUNT(*) AS c FROM t").await?;
    assert_eq!(
        rows.first().and_then(|r| r.get("c")),
        Some(&RowValues::Int(0))
    );
    assert!(db.pool_state().connections <= 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test04_concurrent_transactions_share_the_pool() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let db = open(&dir).await?;

    let mut handles = Vec::new();
    for i in 0..16_i64 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.transaction(|tx| {
                Box::pin(async move {
                    tx.query(sql!("INSERT INTO t (n) VALUES (" {i} ")")).await?;
                    Ok::<_, FragSqlError>(())
                })
            })
            .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let rows = db.query("SELECT COUNT(*) AS c FROM t").await?;
    assert_eq!(
        rows.first().and_then(|r| r.get("c")),
        Some(&RowValues::Int(16))
    );
    Ok(())
}
