use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use territorio_ubs::{AgeSexAggregate, ScatterPlot, Sex, StreetCount, TerritoryManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Streets,
    AgeSex,
    Charts,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Streets => Page::AgeSex,
            Page::AgeSex => Page::Charts,
            Page::Charts => Page::Streets,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Streets => Page::Charts,
            Page::AgeSex => Page::Streets,
            Page::Charts => Page::AgeSex,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Streets => "Streets",
            Page::AgeSex => "Mean Age",
            Page::Charts => "Charts",
        }
    }
}

pub struct App {
    pub source: String,
    pub total_rows: usize,
    pub street_counts: Vec<StreetCount>,
    pub mean_age: Vec<AgeSexAggregate>,
    pub street_chart: BarChart<'static>,
    pub mean_age_chart: BarChart<'static>,
    pub age_band_chart: BarChart<'static>,
    pub scatter: ScatterPlot,
    pub current_page: Page,
    pub streets_state: TableState,
    pub age_sex_state: TableState,
}

impl App {
    /// Snapshot the aggregates of a manager whose street counts and mean
    /// ages are already computed.
    pub fn new(manager: &TerritoryManager<'_>, source: String) -> territorio_ubs::Result<Self> {
        let street_chart = manager.plot_street_counts()?;
        let mean_age_chart = manager.plot_mean_age()?;
        let scatter = manager.plot_women_scatter()?;

        let street_counts = manager.street_counts().unwrap_or_default().to_vec();
        let mean_age = manager.mean_age_per_street_sex().unwrap_or_default().to_vec();

        let mut streets_state = TableState::default();
        if !street_counts.is_empty() {
            streets_state.select(Some(0));
        }
        let mut age_sex_state = TableState::default();
        if !mean_age.is_empty() {
            age_sex_state.select(Some(0));
        }

        Ok(Self {
            source,
            total_rows: manager.row_count(),
            street_counts,
            mean_age,
            street_chart,
            mean_age_chart,
            age_band_chart: manager.plot_age_bands(),
            scatter,
            current_page: Page::Streets,
            streets_state,
            age_sex_state,
        })
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn active_table(&mut self) -> Option<(&mut TableState, usize)> {
        match self.current_page {
            Page::Streets => Some((&mut self.streets_state, self.street_counts.len())),
            Page::AgeSex => Some((&mut self.age_sex_state, self.mean_age.len())),
            Page::Charts => None,
        }
    }

    pub fn next(&mut self) {
        if let Some((state, len)) = self.active_table() {
            if len == 0 {
                return;
            }
            let i = match state.selected() {
                Some(i) if i + 1 >= len => 0,
                Some(i) => i + 1,
                None => 0,
            };
            state.select(Some(i));
        }
    }

    pub fn previous(&mut self) {
        if let Some((state, len)) = self.active_table() {
            if len == 0 {
                return;
            }
            let i = match state.selected() {
                Some(0) | None => len - 1,
                Some(i) => i - 1,
            };
            state.select(Some(i));
        }
    }

    pub fn home(&mut self) {
        if let Some((state, len)) = self.active_table() {
            if len > 0 {
                state.select(Some(0));
            }
        }
    }

    pub fn end(&mut self) {
        if let Some((state, len)) = self.active_table() {
            if len > 0 {
                state.select(Some(len - 1));
            }
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Home => app.home(),
                KeyCode::End => app.end(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Streets => render_streets(f, chunks[1], app),
        Page::AgeSex => render_age_sex(f, chunks[1], app),
        Page::Charts => render_charts(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Streets, Page::AgeSex, Page::Charts];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Residents: {}", app.total_rows),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Streets: {}", app.street_counts.len()),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(format!(" {} ", truncate(&app.source, 40))),
    );

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn table_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(format!(" {} ", title))
}

fn render_streets(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.street_counts.iter().map(|c| {
        Row::new(vec![
            Cell::from(truncate(&c.street, 40)),
            Cell::from(c.count.to_string()).style(Style::default().fg(Color::Green)),
        ])
    });

    let table = Table::new(rows, [Constraint::Length(42), Constraint::Length(10)])
        .header(header_row(&["Street", "Residents"]))
        .block(table_block("Residents per street"))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.streets_state);
}

fn render_age_sex(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.mean_age.iter().map(|m| {
        let color = match m.sex {
            Sex::Female => Color::Magenta,
            Sex::Male => Color::Cyan,
        };
        Row::new(vec![
            Cell::from(truncate(&m.street, 40)),
            Cell::from(m.sex.code()).style(Style::default().fg(color)),
            Cell::from(format!("{:.1}", m.mean_age)),
            Cell::from(m.residents.to_string()),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(42),
            Constraint::Length(5),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["Street", "Sex", "Mean age", "Residents"]))
    .block(table_block("Mean age per street and sex"))
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.age_sex_state);
}

fn render_charts(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    f.render_widget(app.street_chart.clone(), top[0]);
    f.render_widget(app.mean_age_chart.clone(), top[1]);
    f.render_widget(app.age_band_chart.clone(), bottom[0]);

    if app.scatter.points().is_empty() {
        let empty = Paragraph::new(format!("No women on {}", app.scatter.title()))
            .block(table_block(app.scatter.title()));
        f.render_widget(empty, bottom[1]);
    } else {
        f.render_widget(app.scatter.chart(), bottom[1]);
    }
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    let position = match app.current_page {
        Page::Streets => Some((app.streets_state.selected(), app.street_counts.len())),
        Page::AgeSex => Some((app.age_sex_state.selected(), app.mean_age.len())),
        Page::Charts => None,
    };
    if let Some((selected, total)) = position {
        status_spans.push(Span::styled(
            format!(" Row: {}/{} ", selected.map(|i| i + 1).unwrap_or(0), total),
            Style::default().fg(Color::Cyan),
        ));
        status_spans.push(Span::raw(" | "));
    }

    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use territorio_ubs::{ResidentRecord, ResidentTable};

    fn sample_table() -> ResidentTable {
        ResidentTable::from_records(vec![
            ResidentRecord::new("AV MARTE", "10", 34, Sex::Female),
            ResidentRecord::new("AV MARTE", "12", 61, Sex::Male),
            ResidentRecord::new("RUA A", "3", 4, Sex::Female),
        ])
    }

    fn sample_app(table: &ResidentTable) -> App {
        let mut manager = TerritoryManager::new(table).unwrap().with_focus_street("AV MARTE");
        manager.compute_street_counts();
        manager.compute_mean_age_per_street_sex();
        App::new(&manager, "fake.csv".to_string()).unwrap()
    }

    #[test]
    fn test_app_requires_computed_aggregates() {
        let table = sample_table();
        let manager = TerritoryManager::new(&table).unwrap().with_focus_street("AV MARTE");
        assert!(App::new(&manager, "fake.csv".to_string()).is_err());
    }

    #[test]
    fn test_page_cycle() {
        let table = sample_table();
        let mut app = sample_app(&table);

        assert_eq!(app.current_page, Page::Streets);
        app.next_page();
        assert_eq!(app.current_page, Page::AgeSex);
        app.next_page();
        app.next_page();
        assert_eq!(app.current_page, Page::Streets);
        app.previous_page();
        assert_eq!(app.current_page, Page::Charts);
    }

    #[test]
    fn test_row_navigation_wraps() {
        let table = sample_table();
        let mut app = sample_app(&table);

        assert_eq!(app.streets_state.selected(), Some(0));
        app.next();
        assert_eq!(app.streets_state.selected(), Some(1));
        app.next();
        assert_eq!(app.streets_state.selected(), Some(0));
        app.previous();
        assert_eq!(app.streets_state.selected(), Some(1));

        // Charts page has no selection
        app.current_page = Page::Charts;
        app.next();
        assert_eq!(app.streets_state.selected(), Some(1));
    }

    #[test]
    fn test_every_page_renders() {
        let table = sample_table();
        let mut app = sample_app(&table);
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        for _ in 0..3 {
            terminal.draw(|f| ui(f, &mut app)).unwrap();
            app.next_page();
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("AV MARTE", 20), "AV MARTE");
        assert_eq!(truncate("RUA DOS BANDEIRANTES", 10), "RUA DOS...");
    }
}
