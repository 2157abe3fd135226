//! tq: a terminal table viewer with global filtering, single column sorting and
//! page based navigation.
//!
//! The query engine in [`query`] is independent of the terminal UI: it takes a
//! borrowed dataset, a [`schema::Schema`] and a [`query::ViewState`] and derives
//! the rows of the current page.

pub mod controller;
pub mod domain;
pub mod inputter;
pub mod loader;
pub mod model;
pub mod query;
pub mod record;
pub mod schema;
pub mod ui;

pub use domain::{SchemaError, TVError, TableConfig};
pub use query::{
    ColumnSort, Page, QueryResult, SortDirection, SortingState, ViewState, apply_global_filter,
    apply_sort, paginate, query, toggle_sort,
};
pub use record::{Person, Record};
pub use schema::{
    ColumnDef, HeaderCell, Schema, Value, ValueKind, flatten_leaves, header_groups, person_schema,
    render, resolve_value,
};
