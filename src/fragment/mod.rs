//! Composable SQL fragments.
//!
//! A [`Fragment`] is literal SQL text interleaved with bound values. Text and
//! values are kept apart until [`Fragment::render_with`] joins the text with the
//! backend's placeholder marker, so values never end up inside the SQL string.
//!
//! ```rust
//! use fragsql::{Fragment, sql};
//!
//! let mut insert = sql!("INSERT INTO t (n) VALUES ");
//! for (i, n) in [1_i64, 2, 3].into_iter().enumerate() {
//!     if i > 0 {
//!         insert = insert.push_text(", ");
//!     }
//!     insert = insert.append(sql!("(" {n} ")"));
//! }
//!
//! let (text, params) = insert.render();
//! assert_eq!(text, "INSERT INTO t (n) VALUES (?), (?), (?)");
//! assert_eq!(params.len(), 3);
//! ```

use std::fmt;

use crate::error::FragSqlError;
use crate::query::QueryAndParams;
use crate::types::RowValues;

pub mod builder;
mod macros;
mod scanner;

pub use builder::{FragmentBuilder, FragmentExecutor};

/// Placeholder marker written between text segments when a fragment is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// A bare `?` per parameter (`SQLite`, MySQL).
    #[default]
    Positional,
    /// `$1`, `$2`, ... numbered left to right (`PostgreSQL`).
    Numbered,
}

impl PlaceholderStyle {
    fn write_marker(self, out: &mut String, position: usize) {
        match self {
            PlaceholderStyle::Positional => out.push('?'),
            PlaceholderStyle::Numbered => {
                out.push('$');
                out.push_str(&position.to_string());
            }
        }
    }
}

/// Immutable SQL text plus the values bound between its segments.
///
/// `segments.len() == params.len() + 1` always holds: parameter `i` sits
/// between `segments[i]` and `segments[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    segments: Vec<String>,
    params: Vec<RowValues>,
}

impl Default for Fragment {
    fn default() -> Self {
        Self::empty()
    }
}

impl Fragment {
    /// Build a fragment from explicit segments and parameters.
    ///
    /// # Errors
    /// Returns [`FragSqlError::MalformedFragment`] unless there is exactly one
    /// more segment than there are parameters.
    pub fn new(segments: Vec<String>, params: Vec<RowValues>) -> Result<Self, FragSqlError> {
        if segments.len() != params.len() + 1 {
            return Err(FragSqlError::MalformedFragment {
                segments: segments.len(),
                params: params.len(),
            });
        }
        Ok(Self { segments, params })
    }

    /// The empty fragment: one empty segment, no parameters.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            segments: vec![String::new()],
            params: Vec::new(),
        }
    }

    /// Literal SQL text with no parameters.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![text.into()],
            params: Vec::new(),
        }
    }

    /// A single bound value with no surrounding text.
    #[must_use]
    pub fn param(value: impl Into<RowValues>) -> Self {
        Self {
            segments: vec![String::new(), String::new()],
            params: vec![value.into()],
        }
    }

    /// Split `sql` at each `?` marker and bind `params` to the markers in order.
    ///
    /// Markers inside quoted strings, comments and dollar-quoted blocks are left
    /// alone. Only bare `?` counts as a marker.
    ///
    /// # Errors
    /// Returns [`FragSqlError::MalformedFragment`] when the number of markers
    /// differs from `params.len()`.
    pub fn parse(sql: &str, params: Vec<RowValues>) -> Result<Self, FragSqlError> {
        Self::new(scanner::split_placeholders(sql), params)
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn params(&self) -> &[RowValues] {
        &self.params
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Vec<RowValues>) {
        (self.segments, self.params)
    }

    /// True when the fragment carries neither text nor parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.segments.iter().all(String::is_empty)
    }

    /// Append `other` after this fragment.
    ///
    /// The last segment of `self` and the first segment of `other` are joined
    /// into one (no separator); parameters keep left-to-right order.
    #[must_use]
    pub fn append(mut self, other: impl Into<Fragment>) -> Fragment {
        let Fragment {
            segments: other_segments,
            params: other_params,
        } = other.into();

        let mut incoming = other_segments.into_iter();
        if let Some(head) = incoming.next() {
            match self.segments.last_mut() {
                Some(last) => last.push_str(&head),
                None => self.segments.push(head),
            }
        }
        self.segments.extend(incoming);
        self.params.extend(other_params);
        self
    }

    /// Append raw segments and parameters, validating them like [`Fragment::new`].
    ///
    /// # Errors
    /// Returns [`FragSqlError::MalformedFragment`] if the appended parts are malformed.
    pub fn append_parts(
        self,
        segments: Vec<String>,
        params: Vec<RowValues>,
    ) -> Result<Fragment, FragSqlError> {
        let other = Fragment::new(segments, params)?;
        Ok(self.append(other))
    }

    /// Append literal text to the trailing segment.
    #[must_use]
    pub fn push_text(mut self, text: impl AsRef<str>) -> Fragment {
        if let Some(last) = self.segments.last_mut() {
            last.push_str(text.as_ref());
        }
        self
    }

    /// Append one bound value.
    #[must_use]
    pub fn push_param(mut self, value: impl Into<RowValues>) -> Fragment {
        self.params.push(value.into());
        self.segments.push(String::new());
        self
    }

    /// Concatenate `fragments`, putting literal `separator` text between neighbours.
    #[must_use]
    pub fn join<I>(fragments: I, separator: &str) -> Fragment
    where
        I: IntoIterator<Item = Fragment>,
    {
        fragments
            .into_iter()
            .enumerate()
            .fold(Fragment::empty(), |acc, (idx, fragment)| {
                let acc = if idx == 0 { acc } else { acc.push_text(separator) };
                acc.append(fragment)
            })
    }

    /// Render with `?` markers; see [`Fragment::render_with`].
    #[must_use]
    pub fn render(&self) -> (String, Vec<RowValues>) {
        self.render_with(PlaceholderStyle::Positional)
    }

    /// Materialize the SQL text and its parameters for a driver call.
    #[must_use]
    pub fn render_with(&self, style: PlaceholderStyle) -> (String, Vec<RowValues>) {
        (self.render_sql(style), self.params.clone())
    }

    /// Only the SQL text; parameters stay borrowed from [`Fragment::params`].
    #[must_use]
    pub fn render_sql(&self, style: PlaceholderStyle) -> String {
        let capacity = self.segments.iter().map(String::len).sum::<usize>() + self.params.len() * 3;
        let mut sql = String::with_capacity(capacity);
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                style.write_marker(&mut sql, idx);
            }
            sql.push_str(segment);
        }
        sql
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_sql(PlaceholderStyle::Positional))
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::text(text)
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Fragment::text(text)
    }
}

impl From<&Fragment> for Fragment {
    fn from(fragment: &Fragment) -> Self {
        fragment.clone()
    }
}

impl TryFrom<QueryAndParams> for Fragment {
    type Error = FragSqlError;

    fn try_from(qp: QueryAndParams) -> Result<Self, Self::Error> {
        Fragment::parse(&qp.query, qp.params)
    }
}
