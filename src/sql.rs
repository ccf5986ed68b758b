//! Tiny SQL builder used by filters.
//!
//! Builds the tail of a `SELECT` (joins, `WHERE`, `ORDER BY`) as a string.
//! Values may be placeholders, which render as their macro token and are
//! substituted later by [`crate::placeholder::replace_for_query`].

use std::fmt;

use crate::placeholder::Placeholder;

/// A column of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    table: &'static str,
    name: &'static str,
}

impl Field {
    pub const fn new(table: &'static str, name: &'static str) -> Self {
        Self { table, name }
    }

    /// Bare column name, as used for keys in default value maps
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[allow(clippy::should_implement_trait)]
    pub fn eq(self, value: impl Into<Value>) -> Criterion {
        self.compare(Operator::Eq, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Criterion {
        self.compare(Operator::Gt, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Criterion {
        self.compare(Operator::Lt, value)
    }

    pub fn lte(self, value: impl Into<Value>) -> Criterion {
        self.compare(Operator::Lte, value)
    }

    pub fn is_null(self) -> Criterion {
        Criterion::IsNull(self)
    }

    pub fn asc(self) -> Order {
        Order { field: self, descending: false }
    }

    pub fn desc(self) -> Order {
        Order { field: self, descending: true }
    }

    fn compare(self, op: Operator, value: impl Into<Value>) -> Criterion {
        Criterion::Compare {
            field: self,
            op,
            value: value.into(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Lt,
    Lte,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Text(String),
    Field(Field),
    Placeholder(Placeholder),
    /// Placeholder shifted by a number of milliseconds
    Offset(Placeholder, i64),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Field> for Value {
    fn from(value: Field) -> Self {
        Value::Field(value)
    }
}

impl From<Placeholder> for Value {
    fn from(value: Placeholder) -> Self {
        Value::Placeholder(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Field(field) => write!(f, "{}", field),
            Value::Placeholder(p) => write!(f, "{}", p),
            Value::Offset(p, delta) if *delta < 0 => write!(f, "({}-{})", p, delta.unsigned_abs()),
            Value::Offset(p, delta) => write!(f, "({}+{})", p, delta),
        }
    }
}

/// A boolean condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    Compare { field: Field, op: Operator, value: Value },
    IsNull(Field),
    And(Vec<Criterion>),
    Or(Vec<Criterion>),
    Not(Box<Criterion>),
}

impl Criterion {
    pub fn and(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Criterion::And(criteria.into_iter().collect())
    }

    pub fn or(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Criterion::Or(criteria.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(criterion: Criterion) -> Self {
        Criterion::Not(Box::new(criterion))
    }

    /// Every field this condition reads
    pub fn fields(&self) -> Vec<Field> {
        match self {
            Criterion::Compare { field, value, .. } => match value {
                Value::Field(other) => vec![*field, *other],
                _ => vec![*field],
            },
            Criterion::IsNull(field) => vec![*field],
            Criterion::And(items) | Criterion::Or(items) => {
                items.iter().flat_map(Criterion::fields).collect()
            }
            Criterion::Not(inner) => inner.fields(),
        }
    }

    /// True if `other` appears as this condition or one of its conjuncts
    pub fn contains(&self, other: &Criterion) -> bool {
        if self == other {
            return true;
        }
        match self {
            Criterion::And(items) | Criterion::Or(items) => items.iter().any(|c| c.contains(other)),
            Criterion::Not(inner) => inner.contains(other),
            _ => false,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Compare { field, op, value } => write!(f, "{}{}{}", field, op.as_str(), value),
            Criterion::IsNull(field) => write!(f, "{} IS NULL", field),
            Criterion::And(items) => write_joined(f, items, " AND ", "1"),
            Criterion::Or(items) => write_joined(f, items, " OR ", "0"),
            Criterion::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    items: &[Criterion],
    separator: &str,
    empty: &str,
) -> fmt::Result {
    if items.is_empty() {
        return f.write_str(empty);
    }
    f.write_str("(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str(")")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    field: Field,
    descending: bool,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, if self.descending { "DESC" } else { "ASC" })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    table: &'static str,
    on: Criterion,
}

impl Join {
    pub fn inner(table: &'static str, on: Criterion) -> Self {
        Self { table, on }
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INNER JOIN {} ON {}", self.table, self.on)
    }
}

/// Joins, condition and ordering appended after `SELECT ... FROM tasks`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTemplate {
    joins: Vec<Join>,
    condition: Option<Criterion>,
    order: Vec<Order>,
}

impl QueryTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn where_clause(mut self, criterion: Criterion) -> Self {
        self.condition = Some(criterion);
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn condition(&self) -> Option<&Criterion> {
        self.condition.as_ref()
    }
}

impl fmt::Display for QueryTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.joins.iter().map(ToString::to_string).collect();
        if let Some(ref condition) = self.condition {
            parts.push(format!("WHERE {}", condition));
        }
        if !self.order.is_empty() {
            let order = self.order.iter().map(ToString::to_string).collect::<Vec<_>>();
            parts.push(format!("ORDER BY {}", order.join(", ")));
        }
        f.write_str(&parts.join(" "))
    }
}
