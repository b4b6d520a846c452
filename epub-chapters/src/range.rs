//! Chapter range expressions such as `5`, `1-5`, `1,3,5` or `1-3,5,7-9`.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::SelectionError;

/// A sorted, duplicate-free set of chapter indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSelection(BTreeSet<usize>);

impl RangeSelection {
    /// Every index of a catalog with `len` chapters.
    pub fn all(len: usize) -> Self {
        Self((0..len).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

impl FromIterator<usize> for RangeSelection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Canonical form: indices joined by commas, e.g. `1,2,5`.
impl fmt::Display for RangeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|i| i.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

/// Parse a range expression against the highest valid index.
///
/// Single indices above `max_index` are dropped and range ends are clamped to
/// it, so an approximate upper bound selects "to the end". Anything that is
/// not a non-negative integer fails the whole expression. An expression that
/// selects nothing is returned as an empty selection, not an error.
pub fn parse_range(expr: &str, max_index: usize) -> Result<RangeSelection, SelectionError> {
    let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let mut indices = BTreeSet::new();

    for token in compact.split(',') {
        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_index(start, expr)?;
                let end = parse_index(end, expr)?.min(max_index);
                if start <= end {
                    indices.extend(start..=end);
                }
            }
            None => {
                let index = parse_index(token, expr)?;
                if index <= max_index {
                    indices.insert(index);
                }
            }
        }
    }

    Ok(RangeSelection(indices))
}

/// Parse an expression against a catalog of `len` chapters, rejecting
/// expressions that select nothing.
pub fn select(expr: &str, len: usize) -> Result<RangeSelection, SelectionError> {
    let Some(max_index) = len.checked_sub(1) else {
        return Err(SelectionError::EmptySelection);
    };
    let selection = parse_range(expr, max_index)?;
    if selection.is_empty() {
        return Err(SelectionError::EmptySelection);
    }
    Ok(selection)
}

/// Digits only. Literals too large for `usize` saturate, which puts them
/// above any real catalog instead of failing the parse.
fn parse_index(literal: &str, expr: &str) -> Result<usize, SelectionError> {
    if literal.is_empty() || !literal.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SelectionError::MalformedRangeExpression(expr.to_string()));
    }
    Ok(literal.parse().unwrap_or(usize::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(indices: &[usize]) -> RangeSelection {
        indices.iter().copied().collect()
    }

    #[test]
    fn test_single_index() {
        assert_eq!(parse_range("5", 10).unwrap(), set(&[5]));
    }

    #[test]
    fn test_closed_range() {
        assert_eq!(parse_range("1-5", 10).unwrap(), set(&[1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_list() {
        assert_eq!(parse_range("1,3,5", 10).unwrap(), set(&[1, 3, 5]));
    }

    #[test]
    fn test_mixed() {
        assert_eq!(
            parse_range("1-3,5,7-9", 10).unwrap(),
            set(&[1, 2, 3, 5, 7, 8, 9])
        );
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert!(parse_range("3-1", 10).unwrap().is_empty());
    }

    #[test]
    fn test_range_clamped_to_max() {
        assert_eq!(
            parse_range("2-20", 10).unwrap(),
            set(&[2, 3, 4, 5, 6, 7, 8, 9, 10])
        );
    }

    #[test]
    fn test_range_entirely_above_max() {
        assert!(parse_range("15-20", 10).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_single_dropped() {
        assert!(parse_range("20", 10).unwrap().is_empty());
        assert_eq!(parse_range("20,4", 10).unwrap(), set(&[4]));
    }

    #[test]
    fn test_duplicates_and_overlaps_collapse() {
        assert_eq!(parse_range("3,1-4,2,3", 10).unwrap(), set(&[1, 2, 3, 4]));
    }

    #[test]
    fn test_whitespace_is_ignored() {
        assert_eq!(parse_range("  1 - 3 , 5 ", 10).unwrap(), set(&[1, 2, 3, 5]));
    }

    #[test]
    fn test_malformed() {
        for expr in ["a-3", "", "1,,2", "1,", "-3", "3-", "1-2-3", "x", "1.5", "+2"] {
            assert_eq!(
                parse_range(expr, 10),
                Err(SelectionError::MalformedRangeExpression(expr.to_string())),
                "expected '{}' to be malformed",
                expr
            );
        }
    }

    #[test]
    fn test_huge_literal_saturates() {
        assert!(parse_range("99999999999999999999999", 10).unwrap().is_empty());
        assert_eq!(
            parse_range("8-99999999999999999999999", 10).unwrap(),
            set(&[8, 9, 10])
        );
    }

    #[test]
    fn test_select_rejects_empty() {
        assert_eq!(select("20", 11), Err(SelectionError::EmptySelection));
        assert_eq!(select("0", 0), Err(SelectionError::EmptySelection));
        assert_eq!(select("0-2", 2).unwrap(), set(&[0, 1]));
        assert!(matches!(
            select("a", 5),
            Err(SelectionError::MalformedRangeExpression(_))
        ));
    }

    #[test]
    fn test_display_and_all() {
        assert_eq!(RangeSelection::all(4).to_string(), "0,1,2,3");
        assert_eq!(RangeSelection::all(0).to_string(), "");
        assert_eq!(set(&[9, 2, 2]).to_vec(), vec![2, 9]);
    }

    fn token() -> impl Strategy<Value = String> {
        prop_oneof![
            (0usize..60).prop_map(|n| n.to_string()),
            (0usize..60, 0usize..60).prop_map(|(a, b)| format!("{}-{}", a, b)),
        ]
    }

    proptest! {
        #[test]
        fn prop_sorted_unique_and_bounded(
            tokens in prop::collection::vec(token(), 1..8),
            max_index in 0usize..40,
        ) {
            let expr = tokens.join(",");
            let selection = parse_range(&expr, max_index).unwrap();
            let indices = selection.to_vec();
            prop_assert!(indices.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(indices.iter().all(|&i| i <= max_index));
        }

        #[test]
        fn prop_canonical_form_is_stable(
            tokens in prop::collection::vec(token(), 1..8),
            max_index in 0usize..40,
        ) {
            let selection = parse_range(&tokens.join(","), max_index).unwrap();
            // The canonical form of an empty selection is the empty string,
            // which is not itself a valid expression.
            prop_assume!(!selection.is_empty());
            let reparsed = parse_range(&selection.to_string(), max_index).unwrap();
            prop_assert_eq!(reparsed, selection);
        }
    }
}
