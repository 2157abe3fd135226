use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;

use crate::domain::SchemaError;
use crate::record::{Person, Record};

/// Raw cell value as produced by a column accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Integer(_) => 0,
            Value::Date(_) => 1,
            Value::Text(_) => 2,
        }
    }

    /// Natural ordering: numeric, chronological or lexicographic ignoring case,
    /// with the exact text as tie-break. Mixed variants order by variant rank so
    /// the comparison stays total.
    pub fn cmp_natural(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Declared value kind of a leaf column. Selects how cells are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Date,
}

impl ValueKind {
    pub fn render(&self, value: &Value) -> String {
        match (self, value) {
            (ValueKind::Text, Value::Text(s)) => s.clone(),
            (ValueKind::Integer, Value::Integer(v)) => v.to_string(),
            // Medium date, e.g. "Jan 1, 1990"
            (ValueKind::Date, Value::Date(d)) => d.format("%b %-d, %Y").to_string(),
            (_, other) => other.to_string(),
        }
    }
}

/// How a leaf column reads its value from a record.
pub enum Accessor<R> {
    /// Direct reference to a named record field.
    Field(String),
    Computed(fn(&R) -> Value),
}

impl<R> Clone for Accessor<R> {
    fn clone(&self) -> Self {
        match self {
            Accessor::Field(name) => Accessor::Field(name.clone()),
            Accessor::Computed(f) => Accessor::Computed(*f),
        }
    }
}

impl<R> fmt::Debug for Accessor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Accessor::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeafColumn<R> {
    pub key: String,
    pub header: Option<String>,
    pub accessor: Option<Accessor<R>>,
    pub kind: ValueKind,
}

#[derive(Debug, Clone)]
pub struct GroupColumn<R> {
    pub key: String,
    pub header: Option<String>,
    pub columns: Vec<ColumnDef<R>>,
}

/// A column of the table: either a leaf bound to one value or a labelled group
/// of child columns.
#[derive(Debug, Clone)]
pub enum ColumnDef<R> {
    Leaf(LeafColumn<R>),
    Group(GroupColumn<R>),
}

impl<R> ColumnDef<R> {
    /// Leaf reading the record field named like the column key.
    pub fn accessor(key: &str, kind: ValueKind) -> Self {
        ColumnDef::Leaf(LeafColumn {
            key: key.to_string(),
            header: None,
            accessor: Some(Accessor::Field(key.to_string())),
            kind,
        })
    }

    pub fn computed(key: &str, kind: ValueKind, f: fn(&R) -> Value) -> Self {
        ColumnDef::Leaf(LeafColumn {
            key: key.to_string(),
            header: None,
            accessor: Some(Accessor::Computed(f)),
            kind,
        })
    }

    /// Leaf without an accessor. It renders but can neither be sorted nor filtered.
    pub fn display(key: &str) -> Self {
        ColumnDef::Leaf(LeafColumn {
            key: key.to_string(),
            header: None,
            accessor: None,
            kind: ValueKind::Text,
        })
    }

    pub fn group(key: &str, columns: Vec<ColumnDef<R>>) -> Self {
        ColumnDef::Group(GroupColumn {
            key: key.to_string(),
            header: None,
            columns,
        })
    }

    pub fn header(mut self, label: &str) -> Self {
        match &mut self {
            ColumnDef::Leaf(leaf) => leaf.header = Some(label.to_string()),
            ColumnDef::Group(group) => group.header = Some(label.to_string()),
        }
        self
    }

    pub fn key(&self) -> &str {
        match self {
            ColumnDef::Leaf(leaf) => &leaf.key,
            ColumnDef::Group(group) => &group.key,
        }
    }

    /// Header label, falling back to the column key.
    pub fn label(&self) -> &str {
        let header = match self {
            ColumnDef::Leaf(leaf) => leaf.header.as_deref(),
            ColumnDef::Group(group) => group.header.as_deref(),
        };
        header.unwrap_or_else(|| self.key())
    }

    pub fn footer(&self) -> &str {
        self.key()
    }

    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            ColumnDef::Leaf(leaf) => Some(leaf.kind),
            ColumnDef::Group(_) => None,
        }
    }

    pub fn is_sortable(&self) -> bool {
        matches!(self, ColumnDef::Leaf(LeafColumn { accessor: Some(_), .. }))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, ColumnDef::Leaf(_))
    }

    /// Number of leaves below this column; 1 for a leaf.
    pub fn leaf_count(&self) -> usize {
        match self {
            ColumnDef::Leaf(_) => 1,
            ColumnDef::Group(group) => group.columns.iter().map(|c| c.leaf_count()).sum(),
        }
    }

    /// Number of header rows this column occupies.
    pub fn depth(&self) -> usize {
        match self {
            ColumnDef::Leaf(_) => 1,
            ColumnDef::Group(group) => {
                1 + group.columns.iter().map(|c| c.depth()).max().unwrap_or(0)
            }
        }
    }
}

/// Applies the column's accessor to a record.
pub fn resolve_value<R: Record>(column: &ColumnDef<R>, record: &R) -> Result<Value, SchemaError> {
    match column {
        ColumnDef::Leaf(LeafColumn {
            accessor: Some(Accessor::Field(name)),
            key,
            ..
        }) => record.field(name).ok_or_else(|| SchemaError::UnknownField {
            key: key.clone(),
            field: name.clone(),
        }),
        ColumnDef::Leaf(LeafColumn {
            accessor: Some(Accessor::Computed(f)),
            ..
        }) => Ok(f(record)),
        other => Err(SchemaError::NoAccessor {
            key: other.key().to_string(),
        }),
    }
}

/// Leaf columns in display order, depth first. Groups are skipped.
pub fn flatten_leaves<R>(columns: &[ColumnDef<R>]) -> Vec<&ColumnDef<R>> {
    let mut leaves = Vec::new();
    for column in columns {
        match column {
            ColumnDef::Leaf(_) => leaves.push(column),
            ColumnDef::Group(group) => leaves.extend(flatten_leaves(&group.columns)),
        }
    }
    leaves
}

/// Display text of a value in the given column.
pub fn render<R>(column: &ColumnDef<R>, value: &Value) -> String {
    match column.kind() {
        Some(kind) => kind.render(value),
        None => value.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub key: String,
    pub label: String,
    pub col_span: usize,
    pub is_placeholder: bool,
    pub is_leaf: bool,
}

/// Header rows from top to bottom. Every row spans all leaves; leaves sit in the
/// bottom row with placeholders above them where no group covers them.
pub fn header_groups<R>(columns: &[ColumnDef<R>]) -> Vec<Vec<HeaderCell>> {
    let max_depth = columns.iter().map(|c| c.depth()).max().unwrap_or(0);
    (0..max_depth)
        .map(|row| {
            let mut cells = Vec::new();
            for column in columns {
                collect_header_cells(column, 0, row, max_depth, &mut cells);
            }
            cells
        })
        .collect()
}

fn collect_header_cells<R>(
    column: &ColumnDef<R>,
    depth: usize,
    row: usize,
    max_depth: usize,
    cells: &mut Vec<HeaderCell>,
) {
    match column {
        ColumnDef::Group(group) => {
            if depth == row {
                cells.push(HeaderCell {
                    key: group.key.clone(),
                    label: column.label().to_string(),
                    col_span: column.leaf_count(),
                    is_placeholder: false,
                    is_leaf: false,
                });
            } else if depth < row {
                for child in group.columns.iter() {
                    collect_header_cells(child, depth + 1, row, max_depth, cells);
                }
            }
        }
        ColumnDef::Leaf(leaf) => {
            let is_placeholder = row + 1 < max_depth;
            cells.push(HeaderCell {
                key: leaf.key.clone(),
                label: if is_placeholder {
                    String::new()
                } else {
                    column.label().to_string()
                },
                col_span: 1,
                is_placeholder,
                is_leaf: true,
            });
        }
    }
}

/// Validated set of columns.
#[derive(Debug, Clone)]
pub struct Schema<R> {
    columns: Vec<ColumnDef<R>>,
}

impl<R> Schema<R> {
    pub fn new(columns: Vec<ColumnDef<R>>) -> Result<Self, SchemaError> {
        validate_siblings(&columns)?;

        // Sorting addresses leaves by key, so leaf keys must be unique table wide.
        let mut seen = HashSet::new();
        for leaf in flatten_leaves(&columns) {
            if !seen.insert(leaf.key()) {
                return Err(SchemaError::DuplicateKey {
                    key: leaf.key().to_string(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnDef<R>] {
        &self.columns
    }

    pub fn leaves(&self) -> Vec<&ColumnDef<R>> {
        flatten_leaves(&self.columns)
    }

    pub fn sortable_leaves(&self) -> Vec<&ColumnDef<R>> {
        self.leaves().into_iter().filter(|c| c.is_sortable()).collect()
    }

    pub fn find_leaf(&self, key: &str) -> Option<&ColumnDef<R>> {
        self.leaves().into_iter().find(|c| c.key() == key)
    }

    pub fn header_groups(&self) -> Vec<Vec<HeaderCell>> {
        header_groups(&self.columns)
    }
}

fn validate_siblings<R>(columns: &[ColumnDef<R>]) -> Result<(), SchemaError> {
    let mut keys = HashSet::new();
    for column in columns {
        if !keys.insert(column.key()) {
            return Err(SchemaError::DuplicateKey {
                key: column.key().to_string(),
            });
        }
        if let ColumnDef::Group(group) = column {
            if group.columns.is_empty() {
                return Err(SchemaError::EmptyGroup {
                    key: group.key.clone(),
                });
            }
            validate_siblings(&group.columns)?;
        }
    }
    Ok(())
}

/// Columns of the people table.
pub fn person_columns() -> Vec<ColumnDef<Person>> {
    vec![
        ColumnDef::group(
            "hello",
            vec![
                ColumnDef::accessor("id", ValueKind::Integer),
                ColumnDef::accessor("firstName", ValueKind::Text),
                ColumnDef::computed("lastName", ValueKind::Text, |p: &Person| {
                    Value::Text(p.last_name.clone())
                })
                .header("Last Name"),
            ],
        )
        .header("full Name"),
        ColumnDef::group(
            "info",
            vec![
                ColumnDef::accessor("email", ValueKind::Text).header("Email"),
                ColumnDef::accessor("dob", ValueKind::Date).header("Date of Birth"),
                ColumnDef::accessor("gender", ValueKind::Text).header("Gender"),
            ],
        )
        .header("info"),
    ]
}

pub fn person_schema() -> Result<Schema<Person>, SchemaError> {
    Schema::new(person_columns())
}
