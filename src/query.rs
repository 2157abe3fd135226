//! In-memory query engine: global filter, single column sort and paging over a
//! borrowed dataset. Every function here is pure; callers own the `ViewState`
//! and re-run `query` after each change.

use std::time::Instant;

use tracing::{debug, trace};

use crate::domain::{DEFAULT_PAGE_SIZE, SchemaError};
use crate::record::Record;
use crate::schema::{ColumnDef, Schema, render, resolve_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSort {
    pub column_key: String,
    pub direction: SortDirection,
}

impl ColumnSort {
    pub fn asc(key: &str) -> Self {
        Self {
            column_key: key.to_string(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(key: &str) -> Self {
        Self {
            column_key: key.to_string(),
            direction: SortDirection::Descending,
        }
    }
}

/// Active sort entries. Holds at most one entry; empty keeps dataset order.
pub type SortingState = Vec<ColumnSort>;

/// Snapshot of what the user asked to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub filter_text: String,
    pub sorting: SortingState,
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            filter_text: String::new(),
            sorting: Vec::new(),
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn can_previous_page(&self) -> bool {
        self.page_index > 0
    }

    pub fn can_next_page(&self, page_count: usize) -> bool {
        self.page_index + 1 < page_count
    }

    pub fn go_to_first_page(&mut self) {
        self.page_index = 0;
    }

    pub fn go_to_last_page(&mut self, page_count: usize) {
        self.page_index = page_count.saturating_sub(1);
    }

    pub fn go_to_previous_page(&mut self) {
        if self.can_previous_page() {
            self.page_index -= 1;
        }
    }

    pub fn go_to_next_page(&mut self, page_count: usize) {
        if self.can_next_page(page_count) {
            self.page_index += 1;
        }
    }

    /// Pulls the page index back into `[0, page_count-1]`. Never called by the
    /// engine itself.
    pub fn clamp_page_index(&mut self, page_count: usize) {
        self.page_index = self.page_index.min(page_count.saturating_sub(1));
    }

    pub fn toggle_sort<R>(&mut self, column: &ColumnDef<R>) {
        self.sorting = toggle_sort(&self.sorting, column);
    }

    pub fn sort_direction(&self, key: &str) -> Option<SortDirection> {
        self.sorting
            .iter()
            .find(|s| s.column_key == key)
            .map(|s| s.direction)
    }
}

/// Next sorting after a click on `column`: none -> ascending -> descending -> none.
/// A different column starts over at ascending. Non sortable columns change nothing.
pub fn toggle_sort<R>(sorting: &SortingState, column: &ColumnDef<R>) -> SortingState {
    if !column.is_sortable() {
        trace!("Column {} is not sortable", column.key());
        return sorting.clone();
    }
    match sorting.first() {
        Some(current) if current.column_key == column.key() => match current.direction {
            SortDirection::Ascending => vec![ColumnSort::desc(column.key())],
            SortDirection::Descending => Vec::new(),
        },
        _ => vec![ColumnSort::asc(column.key())],
    }
}

/// Keeps records where any sortable leaf renders to text containing `filter_text`,
/// ignoring case. Order is preserved.
/// Leaves without an accessor (display columns) are skipped, never resolved.
pub fn apply_global_filter<'a, R: Record>(
    dataset: &'a [R],
    filter_text: &str,
    leaves: &[&ColumnDef<R>],
) -> Result<Vec<&'a R>, SchemaError> {
    if filter_text.is_empty() {
        return Ok(dataset.iter().collect());
    }
    let needle = filter_text.to_lowercase();
    let searchable: Vec<&ColumnDef<R>> = leaves
        .iter()
        .copied()
        .filter(|c| c.is_sortable())
        .collect();

    let mut rows = Vec::new();
    for record in dataset.iter() {
        if record_matches(record, &needle, &searchable)? {
            rows.push(record);
        }
    }
    Ok(rows)
}

fn record_matches<R: Record>(
    record: &R,
    needle: &str,
    columns: &[&ColumnDef<R>],
) -> Result<bool, SchemaError> {
    for &column in columns.iter() {
        let value = resolve_value(column, record)?;
        if render(column, &value).to_lowercase().contains(needle) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Stable sort on the raw value of the first sorting entry.
pub fn apply_sort<'a, R: Record>(
    rows: Vec<&'a R>,
    sorting: &[ColumnSort],
    leaves: &[&ColumnDef<R>],
) -> Result<Vec<&'a R>, SchemaError> {
    let Some(sort) = sorting.first() else {
        return Ok(rows);
    };
    let column = leaves
        .iter()
        .copied()
        .find(|c| c.key() == sort.column_key)
        .ok_or_else(|| SchemaError::UnknownColumn {
            key: sort.column_key.clone(),
        })?;
    if !column.is_sortable() {
        return Err(SchemaError::NoAccessor {
            key: sort.column_key.clone(),
        });
    }

    let mut keyed = rows
        .into_iter()
        .map(|r| resolve_value(column, r).map(|v| (v, r)))
        .collect::<Result<Vec<_>, _>>()?;

    // sort_by is stable, reversing the comparator keeps ties in input order
    keyed.sort_by(|(a, _), (b, _)| {
        let ord = a.cmp_natural(b);
        match sort.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    Ok(keyed.into_iter().map(|(_, r)| r).collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub page_count: usize,
}

/// Cuts the page window out of `rows`. An index past the end yields no rows.
pub fn paginate<T: Clone>(rows: &[T], page_index: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let page_count = rows.len().div_ceil(page_size).max(1);
    let begin = page_index.saturating_mul(page_size).min(rows.len());
    let end = begin.saturating_add(page_size).min(rows.len());
    Page {
        rows: rows[begin..end].to_vec(),
        page_count,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult<'a, R> {
    pub page_rows: Vec<&'a R>,
    pub page_count: usize,
    pub total_filtered_rows: usize,
}

/// Filter, then sort, then paginate.
pub fn query<'a, R: Record>(
    dataset: &'a [R],
    schema: &Schema<R>,
    state: &ViewState,
) -> Result<QueryResult<'a, R>, SchemaError> {
    let start_time = Instant::now();
    let leaves = schema.leaves();

    let filtered = apply_global_filter(dataset, &state.filter_text, &leaves)?;
    let total_filtered_rows = filtered.len();
    let sorted = apply_sort(filtered, &state.sorting, &leaves)?;
    let page = paginate(&sorted, state.page_index, state.page_size);

    trace!(
        "Query filter {:?}, sort {:?}, page {}/{} took {}us",
        state.filter_text,
        state.sorting,
        state.page_index,
        page.page_count,
        start_time.elapsed().as_micros()
    );
    debug!(
        "Query matched {} of {} rows, showing {}",
        total_filtered_rows,
        dataset.len(),
        page.rows.len()
    );

    Ok(QueryResult {
        page_rows: page.rows,
        page_count: page.page_count,
        total_filtered_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Person;
    use crate::record::tests::person;
    use crate::schema::person_schema;

    fn ann_and_bob() -> Vec<Person> {
        vec![
            person(1, "Ann", "Female", (1990, 1, 1)),
            person(2, "Bob", "Male", (1985, 5, 5)),
        ]
    }

    fn first_names(rows: &[&Person]) -> Vec<String> {
        rows.iter().map(|p| p.first_name.clone()).collect()
    }

    #[test]
    fn page_size_one_walks_rows() {
        let data = ann_and_bob();
        let schema = person_schema().unwrap();
        let mut state = ViewState::new(1);

        let result = query(&data, &schema, &state).unwrap();
        assert_eq!(first_names(&result.page_rows), vec!["Ann"]);
        assert_eq!(result.page_count, 2);
        assert_eq!(result.total_filtered_rows, 2);

        state.page_index = 1;
        let result = query(&data, &schema, &state).unwrap();
        assert_eq!(first_names(&result.page_rows), vec!["Bob"]);
    }

    #[test]
    fn filter_is_case_insensitive() {
        let data = ann_and_bob();
        let schema = person_schema().unwrap();
        let leaves = schema.leaves();
        let rows = apply_global_filter(&data, "bob", &leaves).unwrap();
        assert_eq!(first_names(&rows), vec!["Bob"]);
        let rows = apply_global_filter(&data, "BOB", &leaves).unwrap();
        assert_eq!(first_names(&rows), vec!["Bob"]);
    }

    #[test]
    fn filter_matches_rendered_dates_and_numbers() {
        let data = ann_and_bob();
        let schema = person_schema().unwrap();
        let leaves = schema.leaves();

        let rows = apply_global_filter(&data, "may 5", &leaves).unwrap();
        assert_eq!(first_names(&rows), vec!["Bob"]);

        let rows = apply_global_filter(&data, "1990", &leaves).unwrap();
        assert_eq!(first_names(&rows), vec!["Ann"]);

        let rows = apply_global_filter(&data, "2", &leaves).unwrap();
        assert_eq!(first_names(&rows), vec!["Bob"]);

        // ISO form is not what the date column renders
        let rows = apply_global_filter(&data, "1990-01", &leaves).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn empty_filter_is_identity() {
        let data = ann_and_bob();
        let schema = person_schema().unwrap();
        let rows = apply_global_filter(&data, "", &schema.leaves()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(std::ptr::eq(rows[0], &data[0]));
        assert!(std::ptr::eq(rows[1], &data[1]));
    }

    #[test]
    fn sort_descending_first_name() {
        let data = ann_and_bob();
        let schema = person_schema().unwrap();
        let mut state = ViewState::new(5);
        state.sorting = vec![ColumnSort::desc("firstName")];
        let result = query(&data, &schema, &state).unwrap();
        assert_eq!(first_names(&result.page_rows), vec!["Bob", "Ann"]);
    }

    #[test]
    fn sort_uses_raw_values() {
        let mut data = ann_and_bob();
        data.push(person(10, "Cid", "Male", (2001, 3, 9)));
        let schema = person_schema().unwrap();
        let leaves = schema.leaves();

        // Numeric, not "10" < "2"
        let rows = apply_sort(data.iter().collect(), &[ColumnSort::asc("id")], &leaves).unwrap();
        assert_eq!(first_names(&rows), vec!["Ann", "Bob", "Cid"]);

        // Chronological, not by "Jan 1, 1990" < "Mar 9, 2001" < "May 5, 1985"
        let rows = apply_sort(data.iter().collect(), &[ColumnSort::asc("dob")], &leaves).unwrap();
        assert_eq!(first_names(&rows), vec!["Bob", "Ann", "Cid"]);
    }

    #[test]
    fn sort_is_stable_both_directions() {
        let data = vec![
            person(1, "Ann", "Female", (1990, 1, 1)),
            person(2, "Bob", "Male", (1985, 5, 5)),
            person(3, "Cat", "Female", (1970, 7, 7)),
            person(4, "Dan", "Male", (1999, 9, 9)),
        ];
        let schema = person_schema().unwrap();
        let leaves = schema.leaves();

        let rows = apply_sort(data.iter().collect(), &[ColumnSort::asc("gender")], &leaves).unwrap();
        assert_eq!(first_names(&rows), vec!["Ann", "Cat", "Bob", "Dan"]);

        let rows =
            apply_sort(data.iter().collect(), &[ColumnSort::desc("gender")], &leaves).unwrap();
        assert_eq!(first_names(&rows), vec!["Bob", "Dan", "Ann", "Cat"]);
    }

    #[test]
    fn sort_text_ignores_case() {
        let data = vec![
            person(1, "Zed", "Male", (1990, 1, 1)),
            person(2, "alice", "Female", (1985, 5, 5)),
            person(3, "Bea", "Female", (1970, 7, 7)),
        ];
        let schema = person_schema().unwrap();
        let rows = apply_sort(
            data.iter().collect(),
            &[ColumnSort::asc("firstName")],
            &schema.leaves(),
        )
        .unwrap();
        assert_eq!(first_names(&rows), vec!["alice", "Bea", "Zed"]);
    }

    #[test]
    fn filter_skips_display_columns() {
        let data = ann_and_bob();
        let schema = person_schema().unwrap();
        let display: ColumnDef<Person> = ColumnDef::display("actions");
        let mut leaves = schema.leaves();
        leaves.push(&display);

        let rows = apply_global_filter(&data, "bob", &leaves).unwrap();
        assert_eq!(first_names(&rows), vec!["Bob"]);

        let rows = apply_global_filter(&data, "actions", &[&display]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn sort_unknown_column() {
        let data = ann_and_bob();
        let schema = person_schema().unwrap();
        let err = apply_sort(
            data.iter().collect(),
            &[ColumnSort::asc("age")],
            &schema.leaves(),
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::UnknownColumn { key: "age".into() });
    }

    #[test]
    fn sort_display_column_fails() {
        let data = ann_and_bob();
        let display: ColumnDef<Person> = ColumnDef::display("actions");
        let err = apply_sort(data.iter().collect(), &[ColumnSort::asc("actions")], &[&display])
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::NoAccessor {
                key: "actions".into()
            }
        );
    }

    #[test]
    fn toggle_cycle() {
        let data = ann_and_bob();
        let schema = person_schema().unwrap();
        let first = schema.find_leaf("firstName").unwrap();
        let mut state = ViewState::new(5);

        state.toggle_sort(first);
        assert_eq!(state.sorting, vec![ColumnSort::asc("firstName")]);
        state.toggle_sort(first);
        assert_eq!(state.sorting, vec![ColumnSort::desc("firstName")]);
        let result = query(&data, &schema, &state).unwrap();
        assert_eq!(first_names(&result.page_rows), vec!["Bob", "Ann"]);

        state.toggle_sort(first);
        assert!(state.sorting.is_empty());
        let result = query(&data, &schema, &state).unwrap();
        assert_eq!(first_names(&result.page_rows), vec!["Ann", "Bob"]);
    }

    #[test]
    fn toggle_other_column_replaces_sort() {
        let schema = person_schema().unwrap();
        let mut state = ViewState::new(5);
        state.sorting = vec![ColumnSort::desc("firstName")];
        state.toggle_sort(schema.find_leaf("dob").unwrap());
        assert_eq!(state.sorting, vec![ColumnSort::asc("dob")]);
        assert_eq!(state.sort_direction("dob"), Some(SortDirection::Ascending));
        assert_eq!(state.sort_direction("firstName"), None);
    }

    #[test]
    fn toggle_group_is_noop() {
        let schema = person_schema().unwrap();
        let mut state = ViewState::new(5);
        state.sorting = vec![ColumnSort::asc("id")];
        state.toggle_sort(&schema.columns()[0]);
        assert_eq!(state.sorting, vec![ColumnSort::asc("id")]);
    }

    #[test]
    fn paginate_bounds() {
        let rows: Vec<u32> = (0..12).collect();
        let page = paginate(&rows, 0, 5);
        assert_eq!(page.rows, vec![0, 1, 2, 3, 4]);
        assert_eq!(page.page_count, 3);

        let page = paginate(&rows, 2, 5);
        assert_eq!(page.rows, vec![10, 11]);

        let page = paginate(&rows, 3, 5);
        assert!(page.rows.is_empty());
        assert_eq!(page.page_count, 3);

        let page = paginate(&rows, usize::MAX, 5);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn paginate_empty() {
        let rows: Vec<u32> = Vec::new();
        let page = paginate(&rows, 0, 5);
        assert!(page.rows.is_empty());
        assert_eq!(page.page_count, 1);
    }

    #[test]
    fn empty_dataset_query() {
        let data: Vec<Person> = Vec::new();
        let schema = person_schema().unwrap();
        let result = query(&data, &schema, &ViewState::default()).unwrap();
        assert!(result.page_rows.is_empty());
        assert_eq!(result.page_count, 1);
        assert_eq!(result.total_filtered_rows, 0);
    }

    #[test]
    fn page_beyond_filtered_results_is_empty() {
        let data = ann_and_bob();
        let schema = person_schema().unwrap();
        let mut state = ViewState::new(1);
        state.page_index = 1;
        state.filter_text = "ann".into();

        let result = query(&data, &schema, &state).unwrap();
        assert!(result.page_rows.is_empty());
        assert_eq!(result.page_count, 1);
        assert_eq!(result.total_filtered_rows, 1);
        // The engine leaves the index alone
        assert_eq!(state.page_index, 1);
    }

    #[test]
    fn navigation() {
        let mut state = ViewState::new(5);
        assert!(!state.can_previous_page());
        state.go_to_previous_page();
        assert_eq!(state.page_index, 0);

        state.go_to_next_page(3);
        state.go_to_next_page(3);
        assert_eq!(state.page_index, 2);
        assert!(!state.can_next_page(3));
        state.go_to_next_page(3);
        assert_eq!(state.page_index, 2);

        state.go_to_previous_page();
        assert_eq!(state.page_index, 1);

        state.go_to_last_page(4);
        assert_eq!(state.page_index, 3);
        state.go_to_first_page();
        assert_eq!(state.page_index, 0);
    }

    #[test]
    fn clamp_page_index() {
        let mut state = ViewState::new(5);
        state.page_index = 7;
        state.clamp_page_index(2);
        assert_eq!(state.page_index, 1);
        state.clamp_page_index(1);
        assert_eq!(state.page_index, 0);
    }

    #[test]
    fn query_is_idempotent() {
        let data = ann_and_bob();
        let schema = person_schema().unwrap();
        let mut state = ViewState::new(1);
        state.filter_text = "o".into();
        state.sorting = vec![ColumnSort::desc("dob")];
        let a = query(&data, &schema, &state).unwrap();
        let b = query(&data, &schema, &state).unwrap();
        assert_eq!(a, b);
    }
}
