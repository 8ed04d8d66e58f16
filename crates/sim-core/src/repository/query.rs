use super::{Entity, FieldValue};
use crate::error::{SimError, SimResult};
use std::cmp::Ordering;
use std::str::FromStr;

/// Rows returned when a query does not set a limit.
pub const DEFAULT_QUERY_LIMIT: usize = 20;

/// Comparison operator of a filter triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl FilterOp {
    pub fn matches(self, lhs: &FieldValue, rhs: &FieldValue) -> bool {
        match self {
            FilterOp::Eq => lhs == rhs,
            FilterOp::Ne => lhs != rhs,
            FilterOp::Gt => lhs > rhs,
            FilterOp::Ge => lhs >= rhs,
            FilterOp::Lt => lhs < rhs,
            FilterOp::Le => lhs <= rhs,
        }
    }
}

impl FromStr for FilterOp {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "=" => FilterOp::Eq,
            "!=" => FilterOp::Ne,
            ">" => FilterOp::Gt,
            ">=" => FilterOp::Ge,
            "<" => FilterOp::Lt,
            "<=" => FilterOp::Le,
            other => {
                return Err(SimError::unexpected(format!(
                    "unknown filter operation '{other}' requested"
                )))
            }
        })
    }
}

/// `(field, operator, value)` triple. A query matches the conjunction of its filters.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: FieldValue,
}

/// One component of a composite sort key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl FromStr for SortKey {
    type Err = SimError;

    /// `"name"` and `"+name"` sort ascending, `"-name"` descending.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, field) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        if field.is_empty() {
            return Err(SimError::invalid(format!("empty sort expression '{s}'")));
        }
        Ok(SortKey {
            field: field.to_string(),
            descending,
        })
    }
}

/// Query parameters.
///
/// `limit: None` is unbounded, `Some(0)` only counts. `offset` applies after
/// filtering and sorting, before the limit cut.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub filter: Vec<Filter>,
    pub sort: Vec<SortKey>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub show_total: bool,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filter: Vec::new(),
            sort: Vec::new(),
            limit: Some(DEFAULT_QUERY_LIMIT),
            offset: 0,
            show_total: true,
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every matching row, no total.
    pub fn all() -> Self {
        Self {
            limit: None,
            show_total: false,
            ..Self::default()
        }
    }

    /// Only the post-filter count.
    pub fn count() -> Self {
        Self {
            limit: Some(0),
            show_total: true,
            ..Self::default()
        }
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<FieldValue>) -> Self {
        self.filter.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    /// Shorthand for an equality filter.
    pub fn eq(self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn sort_by(mut self, field: &str, descending: bool) -> Self {
        self.sort.push(SortKey {
            field: field.to_string(),
            descending,
        });
        self
    }

    /// Append sort expressions in `+field` / `-field` form.
    pub fn sort<'a>(mut self, exprs: impl IntoIterator<Item = &'a str>) -> SimResult<Self> {
        for e in exprs {
            self.sort.push(e.parse()?);
        }
        Ok(self)
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn show_total(mut self, show_total: bool) -> Self {
        self.show_total = show_total;
        self
    }
}

/// Rows of a query plus the optional pre-limit count.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult<E> {
    pub items: Vec<E>,
    pub total: Option<usize>,
}

impl<E> QueryResult<E> {
    pub fn into_items(self) -> Vec<E> {
        self.items
    }
}

fn field_of<E: Entity>(entity: &E, name: &str) -> SimResult<FieldValue> {
    entity.field(name).ok_or_else(|| {
        SimError::unexpected(format!(
            "field '{name}' is not queryable on {}",
            E::ENTITY_TYPE
        ))
    })
}

/// Run `query` over rows already in insertion order. Ties keep that order.
pub(super) fn execute<E: Entity>(mut rows: Vec<&E>, query: &Query) -> SimResult<QueryResult<E>> {
    if !query.filter.is_empty() {
        let mut kept = Vec::with_capacity(rows.len());
        for e in rows {
            let mut ok = true;
            for f in &query.filter {
                if !f.op.matches(&field_of(e, &f.field)?, &f.value) {
                    ok = false;
                    break;
                }
            }
            if ok {
                kept.push(e);
            }
        }
        rows = kept;
    }
    let total = rows.len();

    if query.limit == Some(0) {
        return Ok(QueryResult {
            items: Vec::new(),
            total: query.show_total.then_some(total),
        });
    }

    if !query.sort.is_empty() {
        let mut keyed = Vec::with_capacity(rows.len());
        for e in rows {
            let key = query
                .sort
                .iter()
                .map(|k| field_of(e, &k.field))
                .collect::<SimResult<Vec<_>>>()?;
            keyed.push((key, e));
        }
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, &query.sort));
        rows = keyed.into_iter().map(|(_, e)| e).collect();
    }

    let items = rows
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    Ok(QueryResult {
        items,
        total: query.show_total.then_some(total),
    })
}

fn compare_keys(a: &[FieldValue], b: &[FieldValue], sort: &[SortKey]) -> Ordering {
    for ((x, y), k) in a.iter().zip(b).zip(sort) {
        let ord = if k.descending { y.cmp(x) } else { x.cmp(y) };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sort_expressions() {
        assert_eq!(
            "-cash".parse::<SortKey>().unwrap(),
            SortKey { field: "cash".into(), descending: true }
        );
        assert_eq!(
            "+name".parse::<SortKey>().unwrap(),
            SortKey { field: "name".into(), descending: false }
        );
        assert!(!"size".parse::<SortKey>().unwrap().descending);
        assert!("-".parse::<SortKey>().is_err());
    }

    #[test]
    fn parses_operators() {
        assert_eq!("<=".parse::<FilterOp>().unwrap(), FilterOp::Le);
        assert!("~".parse::<FilterOp>().unwrap_err().is_fatal());
    }

    #[test]
    fn default_query_has_limit_and_total() {
        let q = Query::new();
        assert_eq!(q.limit, Some(DEFAULT_QUERY_LIMIT));
        assert!(q.show_total);
        let all = Query::all();
        assert_eq!(all.limit, None);
        assert!(!all.show_total);
    }
}
