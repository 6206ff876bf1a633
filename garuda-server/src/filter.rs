//! The storage filter grammar: `"attribute operator value"`. Grounded on
//! `garuda/plugins/storage/mongodb.py`'s `_parse_filter`, which recognizes
//! the same ten operators and splits on whitespace into exactly three
//! components. Unlike the original's `except: return {}` (silently matching
//! everything on a malformed filter), an unparseable or unrecognized-operator
//! filter here is rejected outright — see DESIGN.md's "filter grammar
//! strictness" Open Question resolution.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Contains,
    Equals,
    In,
    NotIn,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "contains" => Some(FilterOp::Contains),
            "equals" => Some(FilterOp::Equals),
            "in" => Some(FilterOp::In),
            "not in" => Some(FilterOp::NotIn),
            "==" => Some(FilterOp::Eq),
            "!=" => Some(FilterOp::Neq),
            ">" => Some(FilterOp::Gt),
            ">=" => Some(FilterOp::Gte),
            "<" => Some(FilterOp::Lt),
            "<=" => Some(FilterOp::Lte),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub attribute: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    /// Parses a raw filter string. Returns `None` for anything that doesn't
    /// match `"attribute operator value"` with a recognized operator,
    /// including the two-word `"not in"` operator.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();

        let (op_token, op_len, value) = if tokens.len() >= 4 && tokens[1] == "not" && tokens[2] == "in"
        {
            ("not in".to_string(), 3, tokens[3..].join(" "))
        } else if tokens.len() >= 3 {
            (tokens[1].to_string(), 2, tokens[2..].join(" "))
        } else {
            return None;
        };
        let _ = op_len;

        let attribute = tokens[0].to_string();
        let op = FilterOp::parse(&op_token)?;
        Some(Filter { attribute, op, value })
    }

    /// Evaluates this filter against an entity's `to_dict()` representation.
    pub fn matches(&self, entity: &Value) -> bool {
        let field = match entity.get(&self.attribute) {
            Some(v) => v,
            None => return false,
        };
        let field_str = value_to_string(field);

        match self.op {
            FilterOp::Contains => field_str.contains(&self.value),
            FilterOp::Equals | FilterOp::Eq => field_str == self.value,
            FilterOp::Neq => field_str != self.value,
            FilterOp::In => self.value.split(',').any(|v| v.trim() == field_str),
            FilterOp::NotIn => !self.value.split(',').any(|v| v.trim() == field_str),
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                compare_numeric(&field_str, &self.value, self.op)
            }
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_numeric(lhs: &str, rhs: &str, op: FilterOp) -> bool {
    let (a, b) = match (lhs.parse::<f64>(), rhs.parse::<f64>()) {
        (Ok(a), Ok(b)) => (a, b),
        _ => return false,
    };
    match op {
        FilterOp::Gt => a > b,
        FilterOp::Gte => a >= b,
        FilterOp::Lt => a < b,
        FilterOp::Lte => a <= b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_known_operator() {
        assert!(Filter::parse("name equals alice").is_some());
        assert!(Filter::parse("name contains ali").is_some());
        assert!(Filter::parse("age > 3").is_some());
        assert!(Filter::parse("age not in 1,2,3").is_some());
    }

    #[test]
    fn rejects_unknown_operator() {
        assert!(Filter::parse("name matches alice").is_none());
        assert!(Filter::parse("justonetoken").is_none());
    }

    #[test]
    fn equality_matches_string_field() {
        let filter = Filter::parse("name == alice").unwrap();
        assert!(filter.matches(&serde_json::json!({"name": "alice"})));
        assert!(!filter.matches(&serde_json::json!({"name": "bob"})));
    }

    #[test]
    fn numeric_comparison() {
        let filter = Filter::parse("age >= 18").unwrap();
        assert!(filter.matches(&serde_json::json!({"age": 21})));
        assert!(!filter.matches(&serde_json::json!({"age": 5})));
    }

    #[test]
    fn not_in_excludes_listed_values() {
        let filter = Filter::parse("status not in archived,deleted").unwrap();
        assert!(filter.matches(&serde_json::json!({"status": "active"})));
        assert!(!filter.matches(&serde_json::json!({"status": "archived"})));
    }
}
