/// Build a [`Fragment`](crate::Fragment) from literal text interleaved with values.
///
/// * `"text"` string literals are appended as SQL text,
/// * `{expr}` binds `expr` as a parameter (anything convertible into
///   [`RowValues`](crate::RowValues)),
/// * `[expr]` appends another fragment in place.
///
/// ```rust
/// use fragsql::{PlaceholderStyle, sql};
///
/// let name = "David";
/// let filter = sql!(" where name = " {name});
/// let f = sql!("select * from people" [filter] " limit " {10_i64});
///
/// assert_eq!(f.to_string(), "select * from people where name = ? limit ?");
/// assert_eq!(
///     f.render_sql(PlaceholderStyle::Numbered),
///     "select * from people where name = $1 limit $2"
/// );
/// ```
#[macro_export]
macro_rules! sql {
    () => {
        $crate::Fragment::empty()
    };
    ($($parts:tt)+) => {
        $crate::__sql_fragment!(@acc $crate::Fragment::empty(); $($parts)+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __sql_fragment {
    (@acc $frag:expr;) => {
        $frag
    };
    (@acc $frag:expr; $text:literal $($rest:tt)*) => {
        $crate::__sql_fragment!(@acc $crate::Fragment::push_text($frag, $text); $($rest)*)
    };
    (@acc $frag:expr; { $value:expr } $($rest:tt)*) => {
        $crate::__sql_fragment!(@acc $crate::Fragment::push_param($frag, $value); $($rest)*)
    };
    (@acc $frag:expr; [ $inner:expr ] $($rest:tt)*) => {
        $crate::__sql_fragment!(@acc $crate::Fragment::append($frag, $inner); $($rest)*)
    };
}
