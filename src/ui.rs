use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::io;
use tradeflow_dashboard::{
    format_compact, BarEntry, CompareAxis, CompareSide, CompareView, CriteriaUpdate, Dashboard, LineChart,
    RenderPass, Side, SingleView, UsaCard,
};

/// Breakdown columns beyond this are left out of the year table
const MAX_LINE_COLUMNS: usize = 6;

pub struct App {
    pub dashboard: Dashboard,
    pub pass: Option<RenderPass>,
    pub error: Option<String>,
}

impl App {
    pub fn new(dashboard: Dashboard) -> Self {
        let mut app = Self {
            dashboard,
            pass: None,
            error: None,
        };
        app.refresh();
        app
    }

    /// Recompute the view-model; a failed rebuild keeps the error for the status bar.
    pub fn refresh(&mut self) {
        match self.dashboard.rebuild_view_model() {
            Ok(pass) => {
                self.pass = Some(pass);
                self.error = None;
            }
            Err(err) => {
                self.pass = None;
                self.error = Some(err.to_string());
            }
        }
    }

    /// Apply one key press. Returns false when the app should quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let compare = self.dashboard.state().compare;
        let criteria = self.dashboard.state().criteria.clone();

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('c') => {
                if compare.enabled() {
                    self.dashboard.exit_compare();
                } else {
                    self.dashboard.enter_compare(compare.axis());
                }
            }
            KeyCode::Char('a') if compare.enabled() => {
                self.dashboard.enter_compare(compare.axis().next());
            }
            KeyCode::Char('1') if compare.enabled() => self.dashboard.toggle_visibility(Side::A),
            KeyCode::Char('2') if compare.enabled() => self.dashboard.toggle_visibility(Side::B),
            KeyCode::Char('m') => {
                self.dashboard
                    .set_criteria([CriteriaUpdate::Metric(criteria.metric.toggled())]);
            }
            KeyCode::Char('p') => {
                let next = self.cycle_partner(criteria.primary_partner.as_deref());
                self.dashboard.set_criteria([CriteriaUpdate::PrimaryPartner(next)]);
            }
            KeyCode::Char('P') => {
                let next = self.cycle_partner(criteria.secondary_partner.as_deref());
                self.dashboard.set_criteria([CriteriaUpdate::SecondaryPartner(next)]);
            }
            KeyCode::Char('y') => {
                let next = cycle_optional(&self.dashboard.options().years, criteria.year);
                self.dashboard.set_criteria([CriteriaUpdate::Year(next)]);
            }
            KeyCode::Char('Y') => {
                let next = cycle_optional(&self.dashboard.options().years, criteria.secondary_year);
                self.dashboard.set_criteria([CriteriaUpdate::SecondaryYear(next)]);
            }
            KeyCode::Char('t') => {
                let next = cycle_optional(&self.dashboard.options().temperatures, criteria.temperature);
                self.dashboard.set_criteria([CriteriaUpdate::Temperature(next)]);
            }
            KeyCode::Char('T') => {
                let next = cycle_optional(
                    &self.dashboard.options().temperatures,
                    criteria.secondary_temperature,
                );
                self.dashboard.set_criteria([CriteriaUpdate::SecondaryTemperature(next)]);
            }
            KeyCode::Char('v') => {
                let next = cycle_optional(&self.dashboard.options().product_classes, criteria.product_class);
                self.dashboard.set_criteria([CriteriaUpdate::ProductClass(next)]);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.dashboard
                    .set_criteria([CriteriaUpdate::TopN(criteria.top_n as i64 + 1)]);
            }
            KeyCode::Char('-') if criteria.top_n > 1 => {
                self.dashboard
                    .set_criteria([CriteriaUpdate::TopN(criteria.top_n as i64 - 1)]);
            }
            KeyCode::Char('l') => {
                let on = !self.dashboard.state().line_toggles.show_total();
                self.dashboard.set_show_total(on);
            }
            KeyCode::Char('b') => {
                let on = !self.dashboard.state().line_toggles.show_breakdown();
                self.dashboard.set_show_breakdown(on);
            }
            KeyCode::Char('r') => self.dashboard.reset(),
            _ => return true,
        }

        self.refresh();
        true
    }

    fn cycle_partner(&self, current: Option<&str>) -> Option<String> {
        let codes = self.dashboard.options().partner_codes();
        if codes.is_empty() {
            return None;
        }
        let next = match current.and_then(|c| codes.iter().position(|code| code == c)) {
            Some(i) => (i + 1) % codes.len(),
            None => 0,
        };
        codes.get(next).cloned()
    }
}

/// Step through the options with a trailing "All" (None) slot.
fn cycle_optional<T: Clone + PartialEq>(values: &[T], current: Option<T>) -> Option<T> {
    match current.and_then(|c| values.iter().position(|v| *v == c)) {
        Some(i) => values.get(i + 1).cloned(),
        None => values.first().cloned(),
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        if app.pass.as_ref().map_or(false, RenderPass::is_stale) {
            app.refresh();
        }
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && !app.handle_key(key.code) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Criteria header
            Constraint::Min(0),    // Charts
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match &app.pass {
        Some(pass) => match (pass.view.as_single(), pass.view.as_compare()) {
            (Some(single), _) => render_single(f, chunks[1], single, &pass.view.axis_label),
            (_, Some(compare)) => render_compare(f, chunks[1], compare, &pass.view.axis_label),
            _ => {}
        },
        None => {
            let message = app.error.as_deref().unwrap_or("No data loaded");
            let placeholder = Paragraph::new(message)
                .style(Style::default().fg(Color::Red))
                .block(Block::default().borders(Borders::ALL).title(" Dashboard "));
            f.render_widget(placeholder, chunks[1]);
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let state = app.dashboard.state();
    let criteria = &state.criteria;
    let compare = state.compare;
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);

    let mode = if compare.enabled() {
        format!("Compare: {}", compare.axis())
    } else {
        "Single".to_string()
    };

    let mut spans = vec![
        Span::styled(mode, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::raw("  |  "),
        Span::styled("Importer ", label),
        Span::styled(criteria.primary_partner.clone().unwrap_or_else(|| "All".to_string()), value),
    ];
    if compare.enabled() && compare.axis() == CompareAxis::Countries {
        spans.push(Span::styled(" vs ", label));
        spans.push(Span::styled(
            criteria.secondary_partner.clone().unwrap_or_else(|| "All".to_string()),
            value,
        ));
    }

    spans.push(Span::styled("  Year ", label));
    spans.push(Span::styled(year_text(criteria.year), value));
    if compare.enabled() && compare.axis() == CompareAxis::Years {
        spans.push(Span::styled(" vs ", label));
        spans.push(Span::styled(year_text(criteria.secondary_year), value));
    }

    spans.push(Span::styled("  Temp ", label));
    spans.push(Span::styled(criteria.temperature.clone().unwrap_or_else(|| "All".to_string()), value));
    if compare.enabled() && compare.axis() == CompareAxis::Temperature {
        spans.push(Span::styled(" vs ", label));
        spans.push(Span::styled(
            criteria.secondary_temperature.clone().unwrap_or_else(|| "All".to_string()),
            value,
        ));
    }

    spans.push(Span::styled("  Product ", label));
    spans.push(Span::styled(criteria.product_class.clone().unwrap_or_else(|| "All".to_string()), value));

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(format!("Top {}", criteria.top_n), value));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(criteria.metric.unit(), Style::default().fg(Color::Cyan)));

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn year_text(year: Option<i32>) -> String {
    year.map(|y| y.to_string()).unwrap_or_else(|| "All".to_string())
}

// ============================================================================
// SINGLE MODE
// ============================================================================

fn render_single(f: &mut Frame, area: Rect, view: &SingleView, axis_label: &str) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(columns[1]);

    render_bar_table(f, columns[0], &view.bar_title, &view.bar_series, axis_label, Color::Cyan);
    render_usa_card(f, right[0], &view.usa, Color::Cyan);
    render_line_table(f, right[1], &view.line);
}

// ============================================================================
// COMPARE MODE
// ============================================================================

fn render_compare(f: &mut Frame, area: Rect, view: &CompareView, axis_label: &str) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let sides = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    render_compare_side(f, sides[0], &view.side_a, axis_label, Color::Cyan);
    render_compare_side(f, sides[1], &view.side_b, axis_label, Color::Magenta);
    render_line_table(f, rows[1], &view.line);
}

/// The distinguished-entity card stays up for a hidden side; only its bars are hidden.
fn render_compare_side(f: &mut Frame, area: Rect, side: &CompareSide, axis_label: &str, color: Color) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(area);

    render_usa_card(f, parts[0], &side.usa, color);

    if side.hidden {
        let hidden = Paragraph::new(format!("{} hidden (press 1/2 to show)", side.label))
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(format!(" {} ", side.bar_title)));
        f.render_widget(hidden, parts[1]);
    } else {
        render_bar_table(f, parts[1], &side.bar_title, &side.bar_series, axis_label, color);
    }
}

// ============================================================================
// SHARED WIDGETS
// ============================================================================

fn render_bar_table(f: &mut Frame, area: Rect, title: &str, entries: &[BarEntry], axis_label: &str, color: Color) {
    let header_cells = ["#", "Exporter", axis_label].into_iter().map(|h| {
        Cell::from(h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let max = entries.iter().map(|e| e.value).fold(0.0, f64::max);
    let rows = entries.iter().enumerate().map(|(i, entry)| {
        let cells = vec![
            Cell::from(format!("{}", i + 1)),
            Cell::from(truncate(&entry.label, 24)),
            Cell::from(format!("{:>8} {}", format_compact(entry.value), bar(entry.value, max, 12)))
                .style(Style::default().fg(color)),
        ];
        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [Constraint::Length(4), Constraint::Length(26), Constraint::Min(10)],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", title)),
    );

    f.render_widget(table, area);
}

fn render_usa_card(f: &mut Frame, area: Rect, card: &UsaCard, color: Color) {
    let content = vec![
        Line::from(Span::styled(
            card.value_text.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(card.rank_text.clone()),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", card.title)),
    );

    f.render_widget(paragraph, area);
}

fn render_line_table(f: &mut Frame, area: Rect, chart: &LineChart) {
    let series: Vec<_> = chart
        .series
        .iter()
        .filter(|s| !s.hidden)
        .take(MAX_LINE_COLUMNS)
        .collect();

    let header_cells = std::iter::once("Year".to_string())
        .chain(series.iter().map(|s| truncate(&s.name, 14)))
        .map(|h| Cell::from(h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = chart.years.iter().enumerate().map(|(i, year)| {
        let cells = std::iter::once(Cell::from(year.to_string())).chain(
            series
                .iter()
                .map(|s| Cell::from(format_compact(s.values.get(i).copied().unwrap_or(0.0)))),
        );
        Row::new(cells).height(1)
    });

    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(6))
        .chain(series.iter().map(|_| Constraint::Length(15)))
        .collect();

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", chart.title)),
    );

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = Style::default().fg(Color::Yellow);
    let mut status_spans = Vec::new();

    if let Some(pass) = &app.pass {
        status_spans.push(Span::styled(
            format!(" Epoch {} ", pass.epoch.epoch()),
            Style::default().fg(Color::Cyan),
        ));
        status_spans.push(Span::raw("| "));
    }

    let hints: &[(&str, &str)] = if app.dashboard.state().compare.enabled() {
        &[("c", " Single"), ("a", " Axis"), ("1/2", " Sides"), ("P", " Importer 2"), ("Y/T", " Year/Temp 2")]
    } else {
        &[("c", " Compare"), ("l", " Total"), ("b", " Breakdown")]
    };
    let common: &[(&str, &str)] = &[
        ("p", " Importer"),
        ("y", " Year"),
        ("t", " Temp"),
        ("v", " Product"),
        ("m", " Metric"),
        ("+/-", " Top N"),
        ("r", " Reset"),
    ];

    for (k, text) in hints.iter().chain(common.iter()) {
        status_spans.push(Span::styled(*k, key));
        status_spans.push(Span::raw(format!("{} | ", text)));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let filled = ((value / max) * width as f64).round() as usize;
    "█".repeat(filled.min(width))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
