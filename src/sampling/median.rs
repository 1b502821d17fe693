use crate::error::{SentryError, SentryResult};

/// Median of `values` using the standard odd/even midpoint rule.
///
/// Works on a sorted copy; the caller's slice is left untouched.
pub fn median(values: &[f32]) -> SentryResult<f32> {
    if values.is_empty() {
        return Err(SentryError::InvalidInput(
            "median of an empty sequence".into(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    let value = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Ok(value)
}
