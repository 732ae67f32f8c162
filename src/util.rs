/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```should_panic
/// # use menv::assert_interval;
/// let eps = 2.0;
/// assert_interval!(eps, 0.0, 1.0);
/// ```
/// This will panic with the message "Invalid value for \`eps\`. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`. Must be in the interval [{}, {}].",
            stringify!($var),
            $a,
            $b,
        );
    };
}

/// Iterate over the columns of a list of rows, as long as the shortest row
pub fn transpose_iter<T>(rows: Vec<Vec<T>>) -> impl Iterator<Item = Vec<T>> {
    let len = rows.iter().map(Vec::len).min().unwrap_or(0);
    let mut iters = rows.into_iter().map(Vec::into_iter).collect::<Vec<_>>();
    (0..len).map(move |_| iters.iter_mut().filter_map(Iterator::next).collect())
}

/// Columns of a list of rows, as long as the shortest row
pub fn transpose<T>(rows: Vec<Vec<T>>) -> Vec<Vec<T>> {
    transpose_iter(rows).collect()
}
