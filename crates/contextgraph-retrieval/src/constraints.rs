//! Constraint evaluation against node property values.
//!
//! Every kind fails closed: a malformed constraint value, a missing
//! property (except NOT_IN) or an uncoercible operand makes the constraint
//! false rather than raising.

use contextgraph_core::ConstraintKind;
use serde_json::Value;

/// Evaluate one constraint kind against the property value found at the
/// constraint's path (`None` when the node has no such property).
pub fn constraint_holds(kind: ConstraintKind, actual: Option<&Value>, expected: &Value) -> bool {
    match kind {
        ConstraintKind::PropertyEquals => actual.map_or(false, |a| a == expected),
        ConstraintKind::PropertyIn => in_list(actual, expected),
        ConstraintKind::NotIn => match expected.as_array() {
            Some(_) => !in_list(actual, expected),
            None => false,
        },
        ConstraintKind::GreaterThan => compare(actual, expected, |a, b| a > b),
        ConstraintKind::LessThan => compare(actual, expected, |a, b| a < b),
        ConstraintKind::GreaterOrEqual => compare(actual, expected, |a, b| a >= b),
        ConstraintKind::LessOrEqual => compare(actual, expected, |a, b| a <= b),
        ConstraintKind::Contains => match (actual, expected.as_str()) {
            (Some(Value::String(s)), Some(needle)) => s.contains(needle),
            (Some(Value::Array(items)), _) => items.iter().any(|item| item == expected),
            _ => false,
        },
        ConstraintKind::StartsWith => string_pair(actual, expected)
            .map_or(false, |(s, prefix)| s.starts_with(prefix)),
        ConstraintKind::EndsWith => {
            string_pair(actual, expected).map_or(false, |(s, suffix)| s.ends_with(suffix))
        }
        ConstraintKind::RegexMatch => regex_full_match(actual, expected),
    }
}

fn in_list(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected.as_array()) {
        (Some(a), Some(items)) => items.iter().any(|item| item == a),
        _ => false,
    }
}

/// Numeric comparison with both sides coerced to f64; numbers and numeric
/// strings coerce, everything else fails the constraint.
fn compare(actual: Option<&Value>, expected: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(coerce_f64), coerce_f64(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_pair<'a>(actual: Option<&'a Value>, expected: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((actual?.as_str()?, expected.as_str()?))
}

/// Full-match semantics; an invalid pattern makes the constraint false.
fn regex_full_match(actual: Option<&Value>, expected: &Value) -> bool {
    let (Some(text), Some(pattern)) = (actual.and_then(|a| a.as_str()), expected.as_str()) else {
        return false;
    };
    match regex::Regex::new(&format!("^(?:{})$", pattern)) {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contextgraph_core::GraphNode;
    use serde_json::json;

    /// The 4-node truth-table fixture: one row per node, every constraint
    /// kind checked against each.
    fn fixture() -> Vec<GraphNode> {
        vec![
            GraphNode::new("Patient")
                .with_property("name", "Type 2 Diabetes")
                .with_property("severity", 7)
                .with_property("tags", json!(["chronic", "metabolic"])),
            GraphNode::new("Patient")
                .with_property("name", "Asthma")
                .with_property("severity", "3")
                .with_property("tags", json!(["respiratory"])),
            GraphNode::new("Patient")
                .with_property("name", "RA")
                .with_property("severity", json!(null)),
            GraphNode::new("Patient").with_property("other", true),
        ]
    }

    fn eval(kind: ConstraintKind, path: &str, expected: Value) -> Vec<bool> {
        fixture()
            .iter()
            .map(|n| constraint_holds(kind, n.property_at(path), &expected))
            .collect()
    }

    #[test]
    fn property_equals() {
        assert_eq!(
            eval(ConstraintKind::PropertyEquals, "name", json!("Asthma")),
            vec![false, true, false, false]
        );
    }

    #[test]
    fn property_in_and_not_in() {
        let list = json!(["Asthma", "RA"]);
        assert_eq!(
            eval(ConstraintKind::PropertyIn, "name", list.clone()),
            vec![false, true, true, false]
        );
        // NOT_IN is the complement; a missing property is trivially not in
        // the list.
        assert_eq!(
            eval(ConstraintKind::NotIn, "name", list),
            vec![true, false, false, true]
        );
        // Malformed list fails closed for both.
        assert_eq!(
            eval(ConstraintKind::PropertyIn, "name", json!("Asthma")),
            vec![false; 4]
        );
        assert_eq!(
            eval(ConstraintKind::NotIn, "name", json!("Asthma")),
            vec![false; 4]
        );
    }

    #[test]
    fn numeric_comparisons_coerce_strings() {
        assert_eq!(
            eval(ConstraintKind::GreaterThan, "severity", json!(5)),
            vec![true, false, false, false]
        );
        // "3" coerces; null and missing do not.
        assert_eq!(
            eval(ConstraintKind::LessThan, "severity", json!(5)),
            vec![false, true, false, false]
        );
        assert_eq!(
            eval(ConstraintKind::GreaterOrEqual, "severity", json!(7)),
            vec![true, false, false, false]
        );
        assert_eq!(
            eval(ConstraintKind::LessOrEqual, "severity", json!(3)),
            vec![false, true, false, false]
        );
        // Uncoercible expected side fails every row.
        assert_eq!(
            eval(ConstraintKind::GreaterThan, "severity", json!("high")),
            vec![false; 4]
        );
    }

    #[test]
    fn string_operators() {
        assert_eq!(
            eval(ConstraintKind::Contains, "name", json!("Diabetes")),
            vec![true, false, false, false]
        );
        assert_eq!(
            eval(ConstraintKind::StartsWith, "name", json!("Type")),
            vec![true, false, false, false]
        );
        assert_eq!(
            eval(ConstraintKind::EndsWith, "name", json!("ma")),
            vec![false, true, false, false]
        );
        // CONTAINS over an array checks membership.
        assert_eq!(
            eval(ConstraintKind::Contains, "tags", json!("chronic")),
            vec![true, false, false, false]
        );
    }

    #[test]
    fn regex_is_full_match_and_never_raises() {
        assert_eq!(
            eval(ConstraintKind::RegexMatch, "name", json!("Type .*")),
            vec![true, false, false, false]
        );
        // Search-style partial hits do not count.
        assert_eq!(
            eval(ConstraintKind::RegexMatch, "name", json!("Type")),
            vec![false; 4]
        );
        // Invalid pattern is false, not an error.
        assert_eq!(
            eval(ConstraintKind::RegexMatch, "name", json!("(unclosed")),
            vec![false; 4]
        );
    }
}
