pub mod scenario;

pub use scenario::{Expectation, Scenario, ScenarioError, SceneNode, load_scenarios};

/// Side-by-side report of the first differing line, with two lines of context.
pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    use std::fmt::Write;

    let max = expected.len().max(actual.len());
    let missing = "<missing>";
    let mut out = String::new();
    let first = (0..max).find(|&i| expected.get(i) != actual.get(i));
    if let Some(i) = first {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(&mut out, "first mismatch at line {}:", i + 1);
        for line in start..end {
            let left = expected.get(line).map(String::as_str).unwrap_or(missing);
            let right = actual.get(line).map(String::as_str).unwrap_or(missing);
            let marker = if line == i { ">" } else { " " };
            let _ = writeln!(&mut out, "{marker} {:>4}  expected: {left}", line + 1);
            let _ = writeln!(&mut out, "{marker} {:>4}    actual: {right}", line + 1);
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_lines_points_at_first_mismatch() {
        let expected = vec!["a".to_string(), "b".to_string()];
        let actual = vec!["a".to_string(), "c".to_string()];
        let report = diff_lines(&expected, &actual);
        assert!(report.contains("first mismatch at line 2"));
        assert!(report.contains("expected: b"));
        assert!(report.contains("actual: c"));
    }
}
