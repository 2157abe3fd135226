use std::time::Instant;

use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace};

use crate::domain::{HELP_TEXT, Message, SchemaError, TVError, TableConfig};
use crate::inputter::{InputResult, Inputter};
use crate::query::{SortDirection, ViewState, query};
use crate::record::Person;
use crate::schema::{ColumnDef, HeaderCell, Schema, person_schema, render, resolve_value};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    FILTER,
    POPUP,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub cells: Vec<String>,
    pub shaded: bool,
}

/// Everything the UI needs to draw one frame.
pub struct UIData {
    pub header_rows: Vec<Vec<HeaderCell>>,
    pub footer: Vec<String>,
    pub sort_indicators: Vec<Option<SortDirection>>,
    pub selected_column: usize,
    pub rows: Vec<RowView>,
    pub page_index: usize,
    pub page_count: usize,
    pub filtered_rows: usize,
    pub total_rows: usize,
    pub can_previous_page: bool,
    pub can_next_page: bool,
    pub filter: InputResult,
    pub active_filter: bool,
    pub show_popup: bool,
    pub popup_message: String,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            header_rows: Vec::new(),
            footer: Vec::new(),
            sort_indicators: Vec::new(),
            selected_column: 0,
            rows: Vec::new(),
            page_index: 0,
            page_count: 1,
            filtered_rows: 0,
            total_rows: 0,
            can_previous_page: false,
            can_next_page: false,
            filter: InputResult::default(),
            active_filter: false,
            show_popup: false,
            popup_message: String::new(),
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

/// Owns the dataset and the view state, applies messages and keeps `UIData` in
/// sync with the query engine.
pub struct Model {
    config: TableConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    dataset: Vec<Person>,
    schema: Schema<Person>,
    state: ViewState,
    page_count: usize,
    selected_column: usize,
    input: Inputter,
    last_input: InputResult,
    uidata: UIData,
    status_message: String,
}

impl Model {
    pub fn init(config: &TableConfig, dataset: Vec<Person>) -> Result<Self, TVError> {
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            dataset,
            schema: person_schema()?,
            state: ViewState::new(config.page_size),
            page_count: 1,
            selected_column: 0,
            input: Inputter::default(),
            last_input: InputResult::default(),
            uidata: UIData::empty(),
            status_message: String::new(),
        };
        model.set_status_message(format!("Loaded {} records", model.dataset.len()));
        model.refresh(false)?;
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn view_state(&self) -> &ViewState {
        &self.state
    }

    /// True while the search box consumes every key.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::FILTER
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TVError> {
        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::Help => self.show_help(),
                Message::EnterFilter => self.enter_filter_mode(),
                Message::MoveLeft => self.select_column(self.selected_column.saturating_sub(1))?,
                Message::MoveRight => self.select_column(self.selected_column + 1)?,
                Message::ToggleSort => self.toggle_sort()?,
                Message::FirstPage => {
                    self.state.go_to_first_page();
                    self.refresh(false)?;
                }
                Message::LastPage => {
                    self.state.go_to_last_page(self.page_count);
                    self.refresh(false)?;
                }
                Message::PreviousPage => {
                    self.state.go_to_previous_page();
                    self.refresh(false)?;
                }
                Message::NextPage => {
                    self.state.go_to_next_page(self.page_count);
                    self.refresh(false)?;
                }
                _ => (),
            },
            Modus::FILTER => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)?;
                }
            }
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => self.close_popup(),
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
        self.uidata.last_update = Instant::now();
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.uidata.show_popup = false;
        self.uidata.last_update = Instant::now();
    }

    fn enter_filter_mode(&mut self) {
        trace!("Entering filter mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::FILTER;
        self.input.set(&self.state.filter_text);
        self.last_input = self.input.get();
        self.uidata.filter = self.last_input.clone();
        self.uidata.active_filter = true;
        self.uidata.last_update = Instant::now();
    }

    fn raw_input(&mut self, key: KeyEvent) -> Result<(), TVError> {
        self.last_input = self.input.read(key);
        let changed = self.last_input.input != self.state.filter_text;
        if changed {
            self.state.filter_text = self.last_input.input.clone();
        }
        if self.last_input.finished {
            self.modus = self.previous_modus;
            self.previous_modus = Modus::FILTER;
            info!("Filter set to {:?}", self.state.filter_text);
        }
        self.refresh(changed)?;
        if changed {
            self.set_status_message(format!(
                "Filter matched {} of {} rows",
                self.uidata.filtered_rows,
                self.dataset.len()
            ));
        }
        Ok(())
    }

    fn select_column(&mut self, idx: usize) -> Result<(), TVError> {
        let leaves = self.schema.leaves().len();
        self.selected_column = idx.min(leaves.saturating_sub(1));
        self.refresh(false)
    }

    fn toggle_sort(&mut self) -> Result<(), TVError> {
        let leaves = self.schema.leaves();
        let column = leaves
            .get(self.selected_column)
            .copied()
            .ok_or_else(|| SchemaError::UnknownColumn {
                key: self.selected_column.to_string(),
            })?;
        let key = column.key().to_string();
        self.state.toggle_sort(column);

        let message = match self.state.sort_direction(&key) {
            Some(SortDirection::Ascending) => format!("Sorted by {key} ascending"),
            Some(SortDirection::Descending) => format!("Sorted by {key} descending"),
            None => "Sorting cleared".to_string(),
        };
        debug!("{message}");
        self.refresh(true)?;
        self.set_status_message(message);
        Ok(())
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_update = Instant::now();
    }

    /// Re-runs the query for the current state and rebuilds the UI data.
    /// `rows_changed` marks a filter or sort change, which may clamp the page.
    fn refresh(&mut self, rows_changed: bool) -> Result<(), TVError> {
        let mut result = query(&self.dataset, &self.schema, &self.state)?;
        if rows_changed && self.config.clamp_pages && self.state.page_index >= result.page_count {
            self.state.clamp_page_index(result.page_count);
            result = query(&self.dataset, &self.schema, &self.state)?;
        }
        self.page_count = result.page_count;

        let leaves = self.schema.leaves();
        let rows = result
            .page_rows
            .iter()
            .map(|person| build_row(&leaves, person))
            .collect::<Result<Vec<_>, _>>()?;

        self.uidata = UIData {
            header_rows: self.schema.header_groups(),
            footer: leaves.iter().map(|c| c.footer().to_string()).collect(),
            sort_indicators: leaves
                .iter()
                .map(|c| self.state.sort_direction(c.key()))
                .collect(),
            selected_column: self.selected_column,
            rows,
            page_index: self.state.page_index,
            page_count: result.page_count,
            filtered_rows: result.total_filtered_rows,
            total_rows: self.dataset.len(),
            can_previous_page: self.state.can_previous_page(),
            can_next_page: self.state.can_next_page(result.page_count),
            filter: self.last_input.clone(),
            active_filter: self.modus == Modus::FILTER,
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.uidata.popup_message.clone(),
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
        Ok(())
    }
}

fn build_row(leaves: &[&ColumnDef<Person>], person: &Person) -> Result<RowView, SchemaError> {
    let cells = leaves
        .iter()
        .map(|&column| {
            if column.is_sortable() {
                resolve_value(column, person).map(|v| render(column, &v))
            } else {
                Ok(String::new())
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RowView {
        cells,
        shaded: person.is_male(),
    })
}
