//! Query parameters: filter, sort and pagination for order listings.
//!
//! Parsed from the decoded key/value pairs of a request's query string:
//!
//! - `limit=<n>` / `offset=<n>`
//! - `order=<field> [ASC|DESC][,<field> [ASC|DESC]...]`
//! - `where=<field>:<OP>:<value>[ <field>:<OP>:<value>...]`
//!
//! Filters in a `where` clause are whitespace separated and combined with AND.
//! Text values may be wrapped in single quotes to carry spaces, list operands
//! are written `[a,b,c]`. Keys other than the four above are ignored.
//!
//! Stores either evaluate a parsed [`QueryParameters`] directly
//! ([`QueryParameters::apply`]) or compile it to their own query language.

use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::Order;

/// Malformed query string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid value for '{key}': {value}")]
    InvalidNumber { key: String, value: String },

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("operator {op} is not supported on field {field}")]
    UnsupportedOperator { field: String, op: String },

    #[error("malformed filter: {0}")]
    MalformedFilter(String),

    #[error("malformed order expression: {0}")]
    MalformedOrder(String),
}

/// Queryable order attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderField {
    Id,
    CustomerId,
    Title,
    Description,
}

impl OrderField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CustomerId => "customerId",
            Self::Title => "title",
            Self::Description => "description",
        }
    }

    /// Storage column backing this field.
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CustomerId => "customer_id",
            Self::Title => "title",
            Self::Description => "description",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Id | Self::CustomerId)
    }

    fn value_of(self, order: &Order) -> Option<FilterValue> {
        match self {
            Self::Id => Some(FilterValue::Int(order.id.get())),
            Self::CustomerId => Some(FilterValue::Int(order.customer_id)),
            Self::Title => order.title.clone().map(FilterValue::Text),
            Self::Description => order.description.clone().map(FilterValue::Text),
        }
    }

    fn parse_value(self, raw: &str) -> Result<FilterValue, QueryError> {
        let raw = unquote(raw.trim());
        if self.is_numeric() {
            raw.parse::<i64>()
                .map(FilterValue::Int)
                .map_err(|_| QueryError::InvalidNumber {
                    key: self.as_str().to_string(),
                    value: raw.to_string(),
                })
        } else {
            Ok(FilterValue::Text(raw.to_string()))
        }
    }
}

impl FromStr for OrderField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "customerId" => Ok(Self::CustomerId),
            "title" => Ok(Self::Title),
            "description" => Ok(Self::Description),
            other => Err(QueryError::UnknownField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// One `order` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: OrderField,
    pub direction: Direction,
}

/// Filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    EqIc,
    Neq,
    NeqIc,
    Like,
    LikeIc,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    IsNull,
    IsNotNull,
}

enum Arity {
    Zero,
    One,
    Many,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::EqIc => "EQIC",
            Self::Neq => "NEQ",
            Self::NeqIc => "NEQIC",
            Self::Like => "LIKE",
            Self::LikeIc => "LIKEIC",
            Self::Gt => "GT",
            Self::Gte => "GTE",
            Self::Lt => "LT",
            Self::Lte => "LTE",
            Self::In => "IN",
            Self::Nin => "NIN",
            Self::IsNull => "ISNULL",
            Self::IsNotNull => "ISNOTNULL",
        }
    }

    /// Operators that only make sense on text fields.
    pub fn is_text_only(self) -> bool {
        matches!(self, Self::EqIc | Self::NeqIc | Self::Like | Self::LikeIc)
    }

    fn arity(self) -> Arity {
        match self {
            Self::IsNull | Self::IsNotNull => Arity::Zero,
            Self::In | Self::Nin => Arity::Many,
            _ => Arity::One,
        }
    }
}

impl FromStr for FilterOp {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.to_ascii_uppercase().as_str() {
            "EQ" => Self::Eq,
            "EQIC" => Self::EqIc,
            "NEQ" => Self::Neq,
            "NEQIC" => Self::NeqIc,
            "LIKE" => Self::Like,
            "LIKEIC" => Self::LikeIc,
            "GT" => Self::Gt,
            "GTE" => Self::Gte,
            "LT" => Self::Lt,
            "LTE" => Self::Lte,
            "IN" => Self::In,
            "NIN" => Self::Nin,
            "ISNULL" => Self::IsNull,
            "ISNOTNULL" => Self::IsNotNull,
            _ => return Err(QueryError::UnknownOperator(s.to_string())),
        };
        Ok(op)
    }
}

/// Typed filter operand. Numeric fields always carry `Int`, text fields `Text`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterValue {
    Int(i64),
    Text(String),
}

impl FilterValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Int(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    None,
    One(FilterValue),
    Many(Vec<FilterValue>),
}

/// One `<field>:<OP>:<value>` expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: OrderField,
    pub op: FilterOp,
    pub operand: Operand,
}

impl Filter {
    pub fn eq(field: OrderField, value: FilterValue) -> Self {
        Self {
            field,
            op: FilterOp::Eq,
            operand: Operand::One(value),
        }
    }

    fn parse(expr: &str) -> Result<Self, QueryError> {
        let mut parts = expr.splitn(3, ':');
        let field: OrderField = parts.next().unwrap_or_default().parse()?;
        let op: FilterOp = parts
            .next()
            .ok_or_else(|| QueryError::MalformedFilter(expr.to_string()))?
            .parse()?;

        if op.is_text_only() && field.is_numeric() {
            return Err(QueryError::UnsupportedOperator {
                field: field.as_str().to_string(),
                op: op.as_str().to_string(),
            });
        }

        let operand = match (op.arity(), parts.next()) {
            (Arity::Zero, None) => Operand::None,
            (Arity::One, Some(raw)) => Operand::One(field.parse_value(raw)?),
            (Arity::Many, Some(raw)) => {
                let inner = raw
                    .trim()
                    .strip_prefix('[')
                    .and_then(|s| s.strip_suffix(']'))
                    .ok_or_else(|| QueryError::MalformedFilter(expr.to_string()))?;
                let values = inner
                    .split(',')
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| field.parse_value(v))
                    .collect::<Result<Vec<_>, _>>()?;
                Operand::Many(values)
            }
            _ => return Err(QueryError::MalformedFilter(expr.to_string())),
        };

        Ok(Self { field, op, operand })
    }

    pub fn matches(&self, order: &Order) -> bool {
        let actual = self.field.value_of(order);
        match self.op {
            FilterOp::IsNull => return actual.is_none(),
            FilterOp::IsNotNull => return actual.is_some(),
            _ => {}
        }

        // NULL never satisfies a comparison.
        let Some(actual) = actual else {
            return false;
        };

        match &self.operand {
            Operand::One(expected) => compare(self.op, &actual, expected),
            Operand::Many(list) => match self.op {
                FilterOp::In => list.contains(&actual),
                FilterOp::Nin => !list.contains(&actual),
                _ => false,
            },
            Operand::None => false,
        }
    }
}

fn compare(op: FilterOp, actual: &FilterValue, expected: &FilterValue) -> bool {
    match op {
        FilterOp::Eq => actual == expected,
        FilterOp::Neq => actual != expected,
        FilterOp::EqIc => eq_ignore_case(actual, expected),
        FilterOp::NeqIc => !eq_ignore_case(actual, expected),
        FilterOp::Like | FilterOp::LikeIc => match (actual.as_text(), expected.as_text()) {
            (Some(text), Some(pattern)) if op == FilterOp::LikeIc => {
                like_match(&pattern.to_lowercase(), &text.to_lowercase())
            }
            (Some(text), Some(pattern)) => like_match(pattern, text),
            _ => false,
        },
        FilterOp::Gt => actual > expected,
        FilterOp::Gte => actual >= expected,
        FilterOp::Lt => actual < expected,
        FilterOp::Lte => actual <= expected,
        _ => false,
    }
}

fn eq_ignore_case(a: &FilterValue, b: &FilterValue) -> bool {
    match (a.as_text(), b.as_text()) {
        (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
        _ => a == b,
    }
}

/// SQL `LIKE` semantics: `%` matches any run, `_` exactly one character.
pub fn like_match(pattern: &str, text: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;

    for pc in pattern.chars() {
        let mut next = vec![false; text.len() + 1];
        if pc == '%' {
            let mut seen = false;
            for (j, slot) in next.iter_mut().enumerate() {
                seen |= reachable[j];
                *slot = seen;
            }
        } else {
            for j in 1..=text.len() {
                next[j] = reachable[j - 1] && (pc == '_' || pc == text[j - 1]);
            }
        }
        reachable = next;
    }

    reachable[text.len()]
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(raw)
}

/// Split a `where` clause on whitespace that is not inside single quotes.
fn split_filters(clause: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut quoted = false;

    for (i, c) in clause.char_indices() {
        if c == '\'' {
            quoted = !quoted;
        }
        if c.is_whitespace() && !quoted {
            if let Some(s) = start.take() {
                out.push(&clause[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push(&clause[s..]);
    }
    out
}

fn parse_order(raw: &str) -> Result<Vec<Sort>, QueryError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let mut tokens = entry.split_whitespace();
            let field: OrderField = tokens.next().unwrap_or_default().parse()?;
            let direction = match tokens.next().map(str::to_ascii_uppercase).as_deref() {
                None | Some("ASC") => Direction::Asc,
                Some("DESC") => Direction::Desc,
                Some(_) => return Err(QueryError::MalformedOrder(entry.to_string())),
            };
            if tokens.next().is_some() {
                return Err(QueryError::MalformedOrder(entry.to_string()));
            }
            Ok(Sort { field, direction })
        })
        .collect()
}

fn parse_count(key: &str, raw: &str) -> Result<u32, QueryError> {
    raw.trim().parse::<u32>().map_err(|_| QueryError::InvalidNumber {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

/// Filter, sort and pagination of an order listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParameters {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order: Vec<Sort>,
    pub filters: Vec<Filter>,
}

impl QueryParameters {
    /// Match everything, ordered by id.
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse from already-decoded query string pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "limit" => params.limit = Some(parse_count("limit", value)?),
                "offset" => params.offset = Some(parse_count("offset", value)?),
                "order" => params.order.extend(parse_order(value)?),
                "where" => {
                    for expr in split_filters(value) {
                        params.filters.push(Filter::parse(expr)?);
                    }
                }
                _ => {}
            }
        }
        Ok(params)
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.filters.iter().all(|f| f.matches(order))
    }

    /// Ordering for two orders: explicit sorts first, then ascending id.
    ///
    /// `NULL` sorts before any value ascending and after any value descending.
    pub fn compare(&self, a: &Order, b: &Order) -> Ordering {
        for sort in &self.order {
            let ord = sort.field.value_of(a).cmp(&sort.field.value_of(b));
            let ord = match sort.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.id.cmp(&b.id)
    }

    /// Filter, sort and paginate an in-memory collection.
    pub fn apply<I>(&self, orders: I) -> Vec<Order>
    where
        I: IntoIterator<Item = Order>,
    {
        let mut selected: Vec<Order> = orders.into_iter().filter(|o| self.matches(o)).collect();
        selected.sort_by(|a, b| self.compare(a, b));

        let page = selected
            .into_iter()
            .skip(self.offset.unwrap_or(0) as usize);
        match self.limit {
            Some(limit) => page.take(limit as usize).collect(),
            None => page.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{NewOrder, OrderId};
    use proptest::prelude::*;

    fn order(id: i64, customer_id: i64, title: Option<&str>) -> Order {
        NewOrder {
            customer_id,
            title: title.map(str::to_string),
            description: None,
        }
        .into_order(OrderId::new(id))
    }

    fn sample() -> Vec<Order> {
        vec![
            order(1, 100, Some("New order")),
            order(2, 101, Some("Laptop")),
            order(3, 100, None),
            order(4, 102, Some("laptop bag")),
        ]
    }

    fn ids(orders: &[Order]) -> Vec<i64> {
        orders.iter().map(|o| o.id.get()).collect()
    }

    #[test]
    fn empty_query_returns_everything_by_id() {
        let mut input = sample();
        input.reverse();
        let out = QueryParameters::all().apply(input);
        assert_eq!(ids(&out), vec![1, 2, 3, 4]);
    }

    #[test]
    fn where_eq_on_customer_id() {
        let q = QueryParameters::from_pairs([("where", "customerId:EQ:100")]).unwrap();
        assert_eq!(ids(&q.apply(sample())), vec![1, 3]);
    }

    #[test]
    fn zero_matches_is_an_empty_list() {
        let q = QueryParameters::from_pairs([("where", "customerId:EQ:999")]).unwrap();
        assert!(q.apply(sample()).is_empty());
    }

    #[test]
    fn quoted_values_keep_spaces_and_filters_combine() {
        let q = QueryParameters::from_pairs([("where", "title:EQ:'New order' customerId:EQ:100")])
            .unwrap();
        assert_eq!(q.filters.len(), 2);
        assert_eq!(ids(&q.apply(sample())), vec![1]);
    }

    #[test]
    fn like_and_likeic() {
        let q = QueryParameters::from_pairs([("where", "title:LIKE:Lap%")]).unwrap();
        assert_eq!(ids(&q.apply(sample())), vec![2]);

        let q = QueryParameters::from_pairs([("where", "title:LIKEIC:lap%")]).unwrap();
        assert_eq!(ids(&q.apply(sample())), vec![2, 4]);
    }

    #[test]
    fn like_wildcards() {
        assert!(like_match("%", ""));
        assert!(like_match("a_c", "abc"));
        assert!(!like_match("a_c", "ac"));
        assert!(like_match("%bag", "laptop bag"));
        assert!(!like_match("bag%", "laptop bag"));
    }

    #[test]
    fn null_handling() {
        let q = QueryParameters::from_pairs([("where", "title:ISNULL")]).unwrap();
        assert_eq!(ids(&q.apply(sample())), vec![3]);

        let q = QueryParameters::from_pairs([("where", "title:ISNOTNULL")]).unwrap();
        assert_eq!(ids(&q.apply(sample())), vec![1, 2, 4]);

        // NULL does not satisfy NEQ.
        let q = QueryParameters::from_pairs([("where", "title:NEQ:Laptop")]).unwrap();
        assert_eq!(ids(&q.apply(sample())), vec![1, 4]);
    }

    #[test]
    fn in_and_range_operators() {
        let q = QueryParameters::from_pairs([("where", "customerId:IN:[101,102]")]).unwrap();
        assert_eq!(ids(&q.apply(sample())), vec![2, 4]);

        let q = QueryParameters::from_pairs([("where", "customerId:NIN:[100]")]).unwrap();
        assert_eq!(ids(&q.apply(sample())), vec![2, 4]);

        let q = QueryParameters::from_pairs([("where", "id:GT:1 id:LTE:3")]).unwrap();
        assert_eq!(ids(&q.apply(sample())), vec![2, 3]);
    }

    #[test]
    fn order_and_pagination() {
        let q = QueryParameters::from_pairs([
            ("order", "customerId DESC, id"),
            ("offset", "1"),
            ("limit", "2"),
        ])
        .unwrap();
        // customerId DESC: 4(102), 2(101), 1(100), 3(100)
        assert_eq!(ids(&q.apply(sample())), vec![2, 1]);
    }

    #[test]
    fn nulls_sort_first_ascending() {
        let q = QueryParameters::from_pairs([("order", "title")]).unwrap();
        let out = q.apply(sample());
        assert_eq!(out[0].id.get(), 3);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let q = QueryParameters::from_pairs([("fields", "id,title"), ("foo", "bar")]).unwrap();
        assert_eq!(q, QueryParameters::all());
    }

    #[test]
    fn malformed_queries_are_rejected() {
        assert_eq!(
            QueryParameters::from_pairs([("where", "colour:EQ:red")]).unwrap_err(),
            QueryError::UnknownField("colour".to_string())
        );
        assert!(matches!(
            QueryParameters::from_pairs([("where", "id:ABOUT:1")]).unwrap_err(),
            QueryError::UnknownOperator(_)
        ));
        assert!(matches!(
            QueryParameters::from_pairs([("where", "customerId:EQ:abc")]).unwrap_err(),
            QueryError::InvalidNumber { .. }
        ));
        assert!(matches!(
            QueryParameters::from_pairs([("where", "id:LIKE:1%")]).unwrap_err(),
            QueryError::UnsupportedOperator { .. }
        ));
        assert!(matches!(
            QueryParameters::from_pairs([("where", "title:EQ")]).unwrap_err(),
            QueryError::MalformedFilter(_)
        ));
        assert!(matches!(
            QueryParameters::from_pairs([("where", "id:IN:1,2")]).unwrap_err(),
            QueryError::MalformedFilter(_)
        ));
        assert!(matches!(
            QueryParameters::from_pairs([("order", "title SIDEWAYS")]).unwrap_err(),
            QueryError::MalformedOrder(_)
        ));
        assert!(matches!(
            QueryParameters::from_pairs([("limit", "-1")]).unwrap_err(),
            QueryError::InvalidNumber { .. }
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: pagination never returns more than `limit` rows, and every
        /// returned row satisfies the filter.
        #[test]
        fn apply_respects_filter_and_limit(
            customers in prop::collection::vec(0i64..5, 0..40),
            wanted in 0i64..5,
            limit in 0u32..10,
            offset in 0u32..10,
        ) {
            let orders: Vec<Order> = customers
                .iter()
                .enumerate()
                .map(|(i, c)| order(i as i64 + 1, *c, None))
                .collect();

            let q = QueryParameters {
                limit: Some(limit),
                offset: Some(offset),
                ..QueryParameters::all()
            }
            .with_filter(Filter::eq(OrderField::CustomerId, FilterValue::Int(wanted)));

            let out = q.apply(orders);
            prop_assert!(out.len() <= limit as usize);
            prop_assert!(out.iter().all(|o| o.customer_id == wanted));
            prop_assert!(out.windows(2).all(|w| w[0].id < w[1].id));
        }
    }
}
