use std::cmp::Ordering;
use std::ops::Range;

/// A line of input together with the byte span of its sort key.
///
/// The key is the column at the configured index after splitting the line on
/// the column separator. Ordering compares keys only, so a stable sort of
/// keyed lines preserves the encounter order of equal keys.
#[derive(Debug)]
pub(crate) struct KeyedLine {
    line: String,
    key: Range<usize>,
}

impl KeyedLine {
    /// Locate the sort key and take ownership of `line`.
    ///
    /// When the line has fewer than `column_index + 1` columns it is handed
    /// back as `Err`, so the caller can divert it without copying.
    pub(crate) fn new(
        line: String,
        column_separator: &str,
        column_index: usize,
    ) -> Result<KeyedLine, String> {
        match key_span(&line, column_separator, column_index) {
            Some(key) => Ok(KeyedLine { line, key }),
            None => Err(line),
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.line[self.key.start..self.key.end]
    }

    pub(crate) fn line(&self) -> &str {
        &self.line
    }
}

impl Eq for KeyedLine {}

impl PartialEq<Self> for KeyedLine {
    fn eq(&self, other: &Self) -> bool {
        self.key().eq(other.key())
    }
}

impl PartialOrd<Self> for KeyedLine {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyedLine {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(other.key())
    }
}

fn key_span(line: &str, column_separator: &str, column_index: usize) -> Option<Range<usize>> {
    let mut start = 0;
    for _ in 0..column_index {
        start += line[start..].find(column_separator)? + column_separator.len();
    }
    let end = line[start..]
        .find(column_separator)
        .map(|offset| start + offset)
        .unwrap_or(line.len());
    Some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_first_column() {
        let keyed = KeyedLine::new("beta,1,x".to_string(), ",", 0).unwrap();
        assert_eq!(keyed.key(), "beta");
        assert_eq!(keyed.line(), "beta,1,x");
    }

    #[test]
    fn key_is_middle_column() {
        let keyed = KeyedLine::new("beta,1,x".to_string(), ",", 1).unwrap();
        assert_eq!(keyed.key(), "1");
    }

    #[test]
    fn key_is_last_column() {
        let keyed = KeyedLine::new("beta,1,x".to_string(), ",", 2).unwrap();
        assert_eq!(keyed.key(), "x");
    }

    #[test]
    fn missing_column_returns_the_line() {
        let result = KeyedLine::new("beta,1".to_string(), ",", 2);
        assert_eq!(result.unwrap_err(), "beta,1");
    }

    #[test]
    fn line_without_separator_keys_on_whole_line() {
        let keyed = KeyedLine::new("beta".to_string(), ",", 0).unwrap();
        assert_eq!(keyed.key(), "beta");
    }

    #[test]
    fn empty_line_has_empty_key() {
        let keyed = KeyedLine::new(String::new(), ",", 0).unwrap();
        assert_eq!(keyed.key(), "");
    }

    #[test]
    fn empty_trailing_column_has_empty_key() {
        let keyed = KeyedLine::new("beta,".to_string(), ",", 1).unwrap();
        assert_eq!(keyed.key(), "");
    }

    #[test]
    fn multi_character_separator() {
        let keyed = KeyedLine::new("beta::1::x".to_string(), "::", 1).unwrap();
        assert_eq!(keyed.key(), "1");
    }

    #[test]
    fn ordering_compares_keys_only() {
        let a = KeyedLine::new("alpha,2".to_string(), ",", 0).unwrap();
        let b = KeyedLine::new("beta,1".to_string(), ",", 0).unwrap();
        assert!(a < b);
    }

    #[test]
    fn equal_keys_compare_equal_regardless_of_rest() {
        let a = KeyedLine::new("alpha,2".to_string(), ",", 0).unwrap();
        let b = KeyedLine::new("alpha,9,extra".to_string(), ",", 0).unwrap();
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn keys_compare_lexicographically() {
        let ten = KeyedLine::new("10,a".to_string(), ",", 0).unwrap();
        let nine = KeyedLine::new("9,b".to_string(), ",", 0).unwrap();
        assert!(ten < nine);
    }

    #[test]
    fn stable_sort_preserves_encounter_order_of_ties() {
        let mut lines = vec![
            KeyedLine::new("k,first".to_string(), ",", 0).unwrap(),
            KeyedLine::new("a,zero".to_string(), ",", 0).unwrap(),
            KeyedLine::new("k,second".to_string(), ",", 0).unwrap(),
        ];
        lines.sort();
        let sorted: Vec<&str> = lines.iter().map(|keyed| keyed.line()).collect();
        assert_eq!(sorted, vec!["a,zero", "k,first", "k,second"]);
    }
}
