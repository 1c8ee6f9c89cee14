//! Server-side filters over composed columns.
//!
//! A filter never places its value in query text: it renders a predicate
//! that references a parameter, and the composer assigns parameter names
//! after normalizing the filter set.

use smallvec::SmallVec;

use crate::model::Value;

/// A column a filter applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
    pub column: String,
    /// The column holds a list of strings rather than a scalar.
    pub list: bool,
}

impl Target {
    pub fn scalar(column: &str) -> Self {
        Self { column: column.to_owned(), list: false }
    }

    pub fn list(column: &str) -> Self {
        Self { column: column.to_owned(), list: true }
    }
}

/// Comparison a filter performs.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Exact equality; membership for list columns.
    Equals(Value),
    /// Value is one of the given values.
    OneOf(Vec<Value>),
    /// Case-insensitive equality. The value is stored lowercased.
    EqualsIgnoreCase(String),
    /// Case-insensitive membership. Values are stored lowercased.
    OneOfIgnoreCase(Vec<String>),
    /// Case-insensitive prefix match. The value is stored lowercased.
    StartsWith(String),
}

/// A predicate over one or more columns. With several targets the filter
/// matches when any target matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    targets: SmallVec<[Target; 2]>,
    op: FilterOp,
}

impl Filter {
    pub fn equals(target: Target, value: impl Into<Value>) -> Self {
        Self { targets: SmallVec::from_iter([target]), op: FilterOp::Equals(value.into()) }
    }

    pub fn one_of<I, V>(target: Target, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            targets: SmallVec::from_iter([target]),
            op: FilterOp::OneOf(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn equals_ignore_case(target: Target, value: &str) -> Self {
        Self {
            targets: SmallVec::from_iter([target]),
            op: FilterOp::EqualsIgnoreCase(value.to_lowercase()),
        }
    }

    pub fn one_of_ignore_case<I, S>(target: Target, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            targets: SmallVec::from_iter([target]),
            op: FilterOp::OneOfIgnoreCase(values.into_iter().map(|v| v.as_ref().to_lowercase()).collect()),
        }
    }

    /// Any of `targets` satisfying `op`.
    pub fn any<I>(targets: I, op: FilterOp) -> Self
    where
        I: IntoIterator<Item = Target>,
    {
        Self { targets: targets.into_iter().collect(), op }
    }

    /// Case-insensitive prefix over any of `targets`.
    pub fn starts_with<I>(targets: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = Target>,
    {
        Self {
            targets: targets.into_iter().collect(),
            op: FilterOp::StartsWith(prefix.to_lowercase()),
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn op(&self) -> &FilterOp {
        &self.op
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.column.as_str())
    }

    /// The bound parameter value.
    pub fn param_value(&self) -> Value {
        match &self.op {
            FilterOp::Equals(v) => v.clone(),
            FilterOp::OneOf(vs) => Value::List(vs.clone()),
            FilterOp::OneOfIgnoreCase(vs) => Value::from(vs.clone()),
            FilterOp::EqualsIgnoreCase(s) | FilterOp::StartsWith(s) => Value::from(s.as_str()),
        }
    }

    /// Stable identity used to sort and dedup a filter set.
    pub(crate) fn sort_key(&self) -> String {
        let mut targets: Vec<&Target> = self.targets.iter().collect();
        targets.sort();
        let targets: Vec<String> = targets
            .iter()
            .map(|t| format!("{}{}", t.column, if t.list { "[]" } else { "" }))
            .collect();
        let op = match &self.op {
            FilterOp::Equals(_) => "eq",
            FilterOp::OneOf(_) => "in",
            FilterOp::EqualsIgnoreCase(_) => "ieq",
            FilterOp::OneOfIgnoreCase(_) => "iin",
            FilterOp::StartsWith(_) => "prefix",
        };
        format!("{}|{op}|{}", targets.join(","), self.param_value())
    }

    /// Render the predicate against parameter `$param`.
    pub fn render(&self, param: &str) -> String {
        let mut targets: Vec<&Target> = self.targets.iter().collect();
        targets.sort();
        let parts: Vec<String> = targets.iter().map(|t| self.render_target(t, param)).collect();
        if parts.len() == 1 {
            parts.into_iter().next().unwrap_or_default()
        } else {
            format!("({})", parts.join(" OR "))
        }
    }

    fn render_target(&self, t: &Target, param: &str) -> String {
        let c = &t.column;
        match (&self.op, t.list) {
            (FilterOp::Equals(_), false) => format!("{c} = ${param}"),
            (FilterOp::Equals(_), true) => format!("${param} IN {c}"),
            (FilterOp::OneOf(_), false) => format!("{c} IN ${param}"),
            (FilterOp::OneOf(_), true) => format!("ANY(x IN {c} WHERE x IN ${param})"),
            (FilterOp::EqualsIgnoreCase(_), false) => format!("toLower({c}) = ${param}"),
            (FilterOp::EqualsIgnoreCase(_), true) => {
                format!("ANY(x IN {c} WHERE toLower(x) = ${param})")
            }
            (FilterOp::OneOfIgnoreCase(_), false) => format!("toLower({c}) IN ${param}"),
            (FilterOp::OneOfIgnoreCase(_), true) => {
                format!("ANY(x IN {c} WHERE toLower(x) IN ${param})")
            }
            (FilterOp::StartsWith(_), false) => format!("toLower({c}) STARTS WITH ${param}"),
            (FilterOp::StartsWith(_), true) => {
                format!("ANY(x IN {c} WHERE toLower(x) STARTS WITH ${param})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_and_list_equality() {
        let f = Filter::equals(Target::scalar("data_type"), "RNAseq");
        assert_eq!(f.render("filter_0"), "data_type = $filter_0");
        let f = Filter::equals(Target::list("alt_names"), "rna");
        assert_eq!(f.render("filter_0"), "$filter_0 IN alt_names");
    }

    #[test]
    fn test_ignore_case_lowercases_value() {
        let f = Filter::equals_ignore_case(Target::scalar("dataset_provider"), "HuBMAP IEC");
        assert_eq!(f.param_value(), Value::from("hubmap iec"));
        assert_eq!(f.render("p"), "toLower(dataset_provider) = $p");
    }

    #[test]
    fn test_starts_with_any_target() {
        let f = Filter::starts_with([Target::scalar("symbol"), Target::list("synonyms")], "MM");
        assert_eq!(
            f.render("p"),
            "(toLower(symbol) STARTS WITH $p OR ANY(x IN synonyms WHERE toLower(x) STARTS WITH $p))"
        );
    }

    #[test]
    fn test_identifier_over_several_columns() {
        let f = Filter::any(
            [Target::scalar("hgnc_id"), Target::scalar("approved_symbol")],
            FilterOp::OneOfIgnoreCase(vec!["hgnc:7178".into(), "mmrn1".into()]),
        );
        assert_eq!(
            f.render("p"),
            "(toLower(approved_symbol) IN $p OR toLower(hgnc_id) IN $p)"
        );
        assert_eq!(f.param_value(), Value::from(vec!["hgnc:7178", "mmrn1"]));
    }

    #[test]
    fn test_sort_key_ignores_target_order() {
        let a = Filter::starts_with([Target::scalar("a"), Target::scalar("b")], "x");
        let b = Filter::starts_with([Target::scalar("b"), Target::scalar("a")], "x");
        assert_eq!(a.sort_key(), b.sort_key());
        assert_eq!(a.render("p"), b.render("p"));
    }
}
