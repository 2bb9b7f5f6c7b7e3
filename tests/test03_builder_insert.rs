#![cfg(feature = "sqlite")]

use fragsql::prelude::*;
use tempfile::tempdir;

#[tokio::test]
async fn test03_builder_inserts_rows_in_order_inside_transaction()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let db = Database::sqlite_builder(dir.path().join("builder.db").to_string_lossy())
        .build()
        .await?;
    db.execute_batch("CREATE TABLE testDbTable (id INTEGER PRIMARY KEY AUTOINCREMENT, name INTEGER);")
        .await?;

    db.transaction(|tx| {
        Box::pin(async move {
            let mut builder = tx.builder().append("insert into testDbTable (name) values");
            for n in 0_i64..3 {
                let sep = if n == 0 { "" } else { "," };
                builder = builder.append(sql!([Fragment::text(sep)] "(" {n} ")"));
            }
            assert_eq!(
                builder.fragment().to_string(),
                "insert into testDbTable (name) values(?),(?),(?)"
            );
            builder.run().await?;
            Ok::<_, FragSqlError>(())
        })
    })
    .await?;

    let rows = db.query("SELECT name FROM testDbTable ORDER BY id").await?;
    let names: Vec<i64> = rows
        .iter()
        .filter_map(|r| r.get("name").and_then(RowValues::as_int).copied())
        .collect();
    assert_eq!(names, vec![0, 1, 2]);
    Ok(())
}

#[tokio::test]
async fn test03_join_builds_value_lists() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let db = Database::sqlite_builder(dir.path().join("join.db").to_string_lossy())
        .build()
        .await?;
    db.execute_batch("CREATE TABLE t (n INTEGER);").await?;

    let values = Fragment::join((10_i64..13).map(|n| sql!("(" {n} ")")), ", ");
    let insert = sql!("INSERT INTO t (n) VALUES " [values]);
    assert_eq!(insert.to_string(), "INSERT INTO t (n) VALUES (?), (?), (?)");

    let total = db
        .with_connection(|conn| {
            Box::pin(async move {
                conn.query(&insert).await?;
                let total = conn
                    .builder()
                    .append("SELECT SUM(n) AS s FROM t WHERE n > ")
                    .push_param(10_i64)
                    .run_single()
                    .await?;
                Ok::<_, FragSqlError>(total.and_then(|r| r.get("s").cloned()))
            })
        })
        .await?;
    assert_eq!(total, Some(RowValues::Int(23)));
    Ok(())
}
