use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Row, Table},
};
use tracing::trace;

use crate::inputter::InputResult;
use crate::model::{Model, UIData};
use crate::query::SortDirection;
use crate::schema::HeaderCell;

pub const COLUMN_WIDTH_MARGIN: usize = 2;
pub const COLUMN_SPACING: u16 = 1;
pub const SEARCH_HEIGHT: u16 = 3;
const SORT_INDICATOR_WIDTH: usize = 2;

#[derive(Debug, Default)]
pub struct TableUI {
    column_widths: Vec<u16>,
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [search_area, table_area, pager_area, status_area] = Layout::vertical([
            Constraint::Length(SEARCH_HEIGHT),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.column_widths = column_widths(uidata);
        trace!("Drawing {} rows, widths {:?}", uidata.rows.len(), self.column_widths);

        self.draw_search(uidata, frame, search_area);
        self.draw_table(uidata, frame, table_area);
        frame.render_widget(Paragraph::new(pager_line(uidata)).centered(), pager_area);
        frame.render_widget(status_line(uidata), status_area);

        if uidata.show_popup {
            draw_popup(&uidata.popup_message, frame);
        }
    }

    fn draw_search(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let border_style = if uidata.active_filter {
            Style::new().fg(Color::Yellow)
        } else {
            Style::new().fg(Color::DarkGray)
        };
        let text = if uidata.filter.input.is_empty() && !uidata.active_filter {
            Line::from("Search...".dark_gray())
        } else {
            Line::from(uidata.filter.input.as_str())
        };
        let block = Block::bordered().title(" Search ").border_style(border_style);
        frame.render_widget(Paragraph::new(text).block(block), area);

        if uidata.active_filter {
            let x = area.x.saturating_add(1).saturating_add(cursor_offset(&uidata.filter));
            frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
        }
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        // Upper header rows carry groups and are drawn as plain lines, the
        // bottom row is the table header.
        let group_rows = uidata.header_rows.len().saturating_sub(1);
        let [groups_area, rows_area] =
            Layout::vertical([Constraint::Length(group_rows as u16), Constraint::Min(0)])
                .areas(area);

        let lines: Vec<Line> = uidata.header_rows[..group_rows]
            .iter()
            .map(|cells| group_line(cells, &self.column_widths))
            .collect();
        frame.render_widget(Paragraph::new(lines), groups_area);

        let header = Row::new(
            uidata
                .header_rows
                .last()
                .map(|cells| {
                    cells
                        .iter()
                        .enumerate()
                        .map(|(idx, cell)| leaf_header(uidata, idx, cell))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
        )
        .style(Style::new().add_modifier(Modifier::BOLD));

        let rows = uidata.rows.iter().map(|row| {
            let style = if row.shaded {
                Style::new().fg(Color::Black).bg(Color::Gray)
            } else {
                Style::new().fg(Color::Black).bg(Color::LightGreen)
            };
            Row::new(row.cells.clone()).style(style)
        });

        let footer = Row::new(uidata.footer.clone()).style(Style::new().fg(Color::DarkGray));
        let widths = self.column_widths.iter().map(|w| Constraint::Length(*w));

        let table = Table::new(rows, widths)
            .header(header)
            .footer(footer)
            .column_spacing(COLUMN_SPACING);
        frame.render_widget(table, rows_area);
    }
}

/// Display width of the input left of the cursor.
pub fn cursor_offset(input: &InputResult) -> u16 {
    let before: String = input.input.chars().take(input.curser_pos).collect();
    u16::try_from(Line::raw(before).width()).unwrap_or(u16::MAX)
}

fn leaf_header<'a>(uidata: &UIData, idx: usize, cell: &'a HeaderCell) -> Span<'a> {
    let indicator = match uidata.sort_indicators.get(idx).copied().flatten() {
        Some(SortDirection::Ascending) => " ▲",
        Some(SortDirection::Descending) => " ▼",
        None => "",
    };
    let span = Span::raw(format!("{}{}", cell.label, indicator));
    if idx == uidata.selected_column {
        span.reversed()
    } else {
        span
    }
}

/// Width of every leaf column: widest of header, footer and visible cells.
pub fn column_widths(uidata: &UIData) -> Vec<u16> {
    let leaves = uidata.header_rows.last().map(|r| r.as_slice()).unwrap_or(&[]);
    leaves
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let header = cell.label.chars().count() + SORT_INDICATOR_WIDTH;
            let footer = uidata.footer.get(idx).map(|f| f.chars().count()).unwrap_or(0);
            let data = uidata
                .rows
                .iter()
                .filter_map(|r| r.cells.get(idx))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0);
            (header.max(footer).max(data) + COLUMN_WIDTH_MARGIN) as u16
        })
        .collect()
}

/// One upper header row, each cell centred over the leaves it spans.
pub fn group_line(cells: &[HeaderCell], widths: &[u16]) -> Line<'static> {
    let mut spans = Vec::with_capacity(cells.len() * 2);
    let mut leaf = 0;
    for (i, cell) in cells.iter().enumerate() {
        let covered = &widths[leaf.min(widths.len())..(leaf + cell.col_span).min(widths.len())];
        let width = covered.iter().map(|w| *w as usize).sum::<usize>()
            + (COLUMN_SPACING as usize) * cell.col_span.saturating_sub(1);
        leaf += cell.col_span;

        let label: String = cell.label.chars().take(width).collect();
        let text = format!("{label:^width$}");
        if cell.is_placeholder {
            spans.push(Span::raw(text));
        } else {
            spans.push(Span::styled(
                text,
                Style::new().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            ));
        }
        if i + 1 < cells.len() {
            spans.push(Span::raw(" ".repeat(COLUMN_SPACING as usize)));
        }
    }
    Line::from(spans)
}

fn button(label: &str, enabled: bool) -> Span<'static> {
    let style = if enabled {
        Style::new().fg(Color::White).bg(Color::Blue)
    } else {
        Style::new().fg(Color::DarkGray).bg(Color::Gray)
    };
    Span::styled(format!(" {label} "), style)
}

pub fn pager_line(uidata: &UIData) -> Line<'static> {
    Line::from(vec![
        button("First Page", uidata.can_previous_page),
        Span::raw(" "),
        button("Last Page", uidata.can_next_page),
        Span::raw(" "),
        button("Previous Page", uidata.can_previous_page),
        Span::raw(" "),
        button("Next Page", uidata.can_next_page),
        Span::raw(format!(
            "  Page {} of {} | {} of {} rows",
            uidata.page_index + 1,
            uidata.page_count,
            uidata.filtered_rows,
            uidata.total_rows
        )),
    ])
}

fn status_line(uidata: &UIData) -> Paragraph<'static> {
    Paragraph::new(Line::from(vec![
        Span::raw(format!(" {} ", uidata.status_message)).yellow(),
        Span::raw(" <?> help  </> search  <s> sort  <q> quit").dark_gray(),
    ]))
}

fn draw_popup(message: &str, frame: &mut Frame) {
    let lines = message.lines().count() as u16;
    let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16;
    let [area] = Layout::horizontal([Constraint::Length(width + 4)])
        .flex(Flex::Center)
        .areas(frame.area());
    let [area] = Layout::vertical([Constraint::Length(lines + 2)])
        .flex(Flex::Center)
        .areas(area);

    let block = Block::bordered().title(" Help ").title_bottom(" <Esc> close ");
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(message.to_string()).block(block), area);
}
