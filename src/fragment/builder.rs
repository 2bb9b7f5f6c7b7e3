use async_trait::async_trait;

use super::Fragment;
use crate::error::FragSqlError;
use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

/// Something a composed fragment can be run against: a leased connection or an
/// open transaction.
#[async_trait]
pub trait FragmentExecutor: Send {
    /// Render `fragment` for this target and run it, returning every row.
    async fn run_fragment(&mut self, fragment: &Fragment) -> Result<ResultSet, FragSqlError>;
}

/// Fluent fragment composition bound to an execution target.
///
/// Appending is pure; nothing touches the connection until [`run`](Self::run)
/// or [`run_single`](Self::run_single) consumes the builder.
pub struct FragmentBuilder<'conn> {
    target: &'conn mut dyn FragmentExecutor,
    fragment: Fragment,
}

impl<'conn> FragmentBuilder<'conn> {
    pub(crate) fn new(target: &'conn mut dyn FragmentExecutor) -> Self {
        Self {
            target,
            fragment: Fragment::empty(),
        }
    }

    /// Append a fragment (or literal text) to the statement being built.
    #[must_use]
    pub fn append(mut self, fragment: impl Into<Fragment>) -> Self {
        self.fragment = self.fragment.append(fragment);
        self
    }

    #[must_use]
    pub fn push_text(mut self, text: impl AsRef<str>) -> Self {
        self.fragment = self.fragment.push_text(text);
        self
    }

    #[must_use]
    pub fn push_param(mut self, value: impl Into<RowValues>) -> Self {
        self.fragment = self.fragment.push_param(value);
        self
    }

    /// The statement composed so far.
    #[must_use]
    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    /// Execute the composed statement and return all rows.
    ///
    /// # Errors
    /// Returns whatever the target reports: driver failures as
    /// [`FragSqlError::QueryError`], or
    /// [`FragSqlError::TransactionAlreadyFinalized`] for a finished transaction.
    pub async fn run(self) -> Result<ResultSet, FragSqlError> {
        self.target.run_fragment(&self.fragment).await
    }

    /// Execute the composed statement and return only its first row.
    ///
    /// # Errors
    /// Same as [`run`](Self::run).
    pub async fn run_single(self) -> Result<Option<CustomDbRow>, FragSqlError> {
        self.run().await.map(ResultSet::into_first)
    }
}

impl std::fmt::Debug for FragmentBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentBuilder")
            .field("fragment", &self.fragment)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records what it was asked to run instead of talking to a database.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<(String, Vec<RowValues>)>,
    }

    #[async_trait]
    impl FragmentExecutor for Recorder {
        async fn run_fragment(&mut self, fragment: &Fragment) -> Result<ResultSet, FragSqlError> {
            self.seen.push(fragment.render());
            Ok(ResultSet::default())
        }
    }

    #[tokio::test]
    async fn builder_runs_once_with_composed_statement() -> Result<(), FragSqlError> {
        let mut recorder = Recorder::default();

        let mut builder = FragmentBuilder::new(&mut recorder)
            .append("insert into testDbTable (name) values");
        for n in 0_i64..3 {
            if n != 0 {
                builder = builder.push_text(",");
            }
            builder = builder.append(crate::sql!("(" {n} ")"));
        }
        assert_eq!(
            builder.fragment().to_string(),
            "insert into testDbTable (name) values(?),(?),(?)"
        );
        let first = builder.run_single().await?;

        assert!(first.is_none());
        assert_eq!(recorder.seen.len(), 1);
        assert_eq!(
            recorder.seen[0].1,
            vec![RowValues::Int(0), RowValues::Int(1), RowValues::Int(2)]
        );
        Ok(())
    }
}
