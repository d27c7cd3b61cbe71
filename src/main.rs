use std::io::{self, Write};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph, Wrap};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use octagon_terminal::backend::PredictionBackend;
use octagon_terminal::comparison::{self, RADAR_LABELS, RadarSeries};
use octagon_terminal::config::{Config, Variant};
use octagon_terminal::history::HistoryStore;
use octagon_terminal::live_backend::LiveBackend;
use octagon_terminal::offline_backend::OfflineBackend;
use octagon_terminal::persist::KvStore;
use octagon_terminal::provider::spawn_provider;
use octagon_terminal::state::{
    AppState, Delta, FighterSlot, Focus, ProviderCommand, apply_delta,
};
use octagon_terminal::theme::{Palette, Theme};
use octagon_terminal::workflow::{Phase, Workflow, prediction_view};

// Forwards formatted tracing lines into the console panel.
struct ChannelWriter {
    sender: mpsc::Sender<String>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let msg = String::from_utf8_lossy(buf).trim_end().to_string();
        if !msg.is_empty() {
            let _ = self.sender.send(msg);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
struct ChannelWriterFactory {
    sender: mpsc::Sender<String>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for ChannelWriterFactory {
    type Writer = ChannelWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ChannelWriter {
            sender: self.sender.clone(),
        }
    }
}

fn init_tracing(sender: mpsc::Sender<String>) {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(ChannelWriterFactory { sender })
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(console_layer)
        .init();
}

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    log_rx: mpsc::Receiver<String>,
    prefs: KvStore,
    history: HistoryStore,
    api_label: String,
}

impl App {
    fn new(
        config: &Config,
        store: KvStore,
        cmd_tx: mpsc::Sender<ProviderCommand>,
        log_rx: mpsc::Receiver<String>,
    ) -> Self {
        let history = HistoryStore::new(store.clone());
        let mut state = AppState::new(config.variant, Workflow::new(config.error_dismiss));
        state.theme = Theme::load(&store);
        state.history = history.load();
        let api_label = match config.variant {
            Variant::Live => config.api_url.clone(),
            Variant::Offline => "offline demo".to_string(),
        };
        Self {
            state,
            should_quit: false,
            cmd_tx,
            log_rx,
            prefs: store,
            history,
            api_label,
        }
    }

    fn start(&mut self) {
        for cmd in self.state.startup_commands() {
            self.send(cmd);
        }
    }

    fn send(&mut self, cmd: ProviderCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            warn!("backend worker is gone; request dropped");
        }
    }

    fn send_opt(&mut self, cmd: Option<ProviderCommand>) {
        if let Some(cmd) = cmd {
            self.send(cmd);
        }
    }

    fn drain_logs(&mut self) {
        while let Ok(line) = self.log_rx.try_recv() {
            self.state.push_log(line);
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        let now = Instant::now();

        if self.state.confirm_clear {
            let confirmed = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
            if let Err(err) = self.state.resolve_clear_history(confirmed, &self.history) {
                warn!("failed to clear history: {err:#}");
            }
            return;
        }
        if self.state.help_overlay {
            self.state.help_overlay = false;
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => self.should_quit = true,
            KeyCode::Char('s') if ctrl => match self.state.save_prediction(&self.history) {
                Ok(true) => {}
                Ok(false) => info!("Nothing to save yet"),
                Err(err) => warn!("failed to save prediction: {err:#}"),
            },
            KeyCode::Char('t') if ctrl => {
                let theme = self.state.toggle_theme();
                theme.save(&self.prefs);
            }
            KeyCode::Char('d') if ctrl => self.state.toggle_model_details(),
            KeyCode::Char('x') if ctrl => self.state.request_clear_history(),
            KeyCode::Char('r') if ctrl => self.start(),
            KeyCode::F(1) => self.state.help_overlay = true,
            KeyCode::Esc => {
                if !self.state.dismiss_suggestions() {
                    self.state.workflow.dismiss();
                }
            }
            KeyCode::Tab => {
                let cmd = self.state.focus_next(now);
                self.send_opt(cmd);
            }
            KeyCode::BackTab => {
                let cmd = self.state.focus_prev(now);
                self.send_opt(cmd);
            }
            KeyCode::Up | KeyCode::Down => {
                let step = if key.code == KeyCode::Up { -1 } else { 1 };
                if self.state.focus == Focus::WeightClass {
                    let cmd = self.state.cycle_weight_class(step);
                    self.send_opt(cmd);
                } else {
                    self.state.move_suggestion(step);
                }
            }
            KeyCode::Left | KeyCode::Right if self.state.focus == Focus::WeightClass => {
                let step = if key.code == KeyCode::Left { -1 } else { 1 };
                let cmd = self.state.cycle_weight_class(step);
                self.send_opt(cmd);
            }
            KeyCode::Enter => {
                let cmd = if self.state.has_highlighted_suggestion() {
                    self.state.accept_suggestion()
                } else {
                    self.state.submit(now)
                };
                self.send_opt(cmd);
            }
            KeyCode::Backspace => self.state.backspace(),
            KeyCode::Char(ch) if !ctrl => self.state.type_char(ch),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let (log_tx, log_rx) = mpsc::channel();
    init_tracing(log_tx);

    let config = Config::from_env();
    let backend: Box<dyn PredictionBackend> = match config.variant {
        Variant::Live => Box::new(LiveBackend::new(&config.api_url, config.request_timeout)?),
        Variant::Offline => Box::new(OfflineBackend::demo()),
    };
    let store = config
        .state_file()
        .map(KvStore::at)
        .unwrap_or_else(KvStore::ephemeral);

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(backend, config.variant, tx, cmd_rx);

    let mut app = App::new(&config, store, cmd_tx, log_rx);
    info!("Fight predictor ready ({})", app.api_label);
    app.start();

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture).context("enter alternate screen")?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }
        app.drain_logs();
        app.state.tick(Instant::now());

        terminal.draw(|f| ui(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let palette = app.state.theme.palette();
    let area = frame.size();
    frame.render_widget(
        Block::default().style(Style::default().fg(palette.fg).bg(palette.bg)),
        area,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(10),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(area);

    let header = Paragraph::new(header_text(app))
        .style(Style::default().fg(palette.accent).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(6),
        ])
        .split(columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(13)])
        .split(columns[1]);

    render_fighter_input(frame, left[0], &app.state, FighterSlot::First, palette);
    render_fighter_input(frame, left[1], &app.state, FighterSlot::Second, palette);
    render_weight_class(frame, left[2], &app.state, palette);
    render_prediction(frame, left[3], &app.state, palette);
    render_comparison(frame, right[0], &app.state, palette);
    render_history(frame, right[1], &app.state, palette);

    let console = Paragraph::new(console_text(&app.state))
        .style(Style::default().fg(palette.muted))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state)).style(Style::default().fg(palette.muted));
    frame.render_widget(footer, chunks[3]);

    // Suggestion panels float over whatever sits below their field.
    for (slot, field) in [(FighterSlot::First, left[0]), (FighterSlot::Second, left[1])] {
        render_suggestions(frame, field, area, &app.state, slot, palette);
    }

    if app.state.confirm_clear {
        render_confirm_clear(frame, area, palette);
    }
    if app.state.help_overlay {
        render_help_overlay(frame, area);
    }
}

fn header_text(app: &App) -> String {
    let state = &app.state;
    let variant = match state.variant {
        Variant::Live => "LIVE",
        Variant::Offline => "OFFLINE",
    };
    let health = match state.backend_healthy {
        Some(true) => "healthy",
        Some(false) => "degraded",
        None => "...",
    };
    let stats = match state.stats {
        Some(stats) => format!(
            "Fights {} | Fighters {} | Weight Classes {}",
            stats.total_fights, stats.total_fighters, stats.weight_classes
        ),
        None => "Loading stats...".to_string(),
    };
    format!(
        "OCTAGON PREDICTOR | {variant} {} ({health}) | {stats} | Theme: {}",
        app.api_label,
        state.theme.label()
    )
}

fn field_block(title: &str, focused: bool, palette: Palette) -> Block<'_> {
    let border = if focused {
        Style::default().fg(palette.accent)
    } else {
        Style::default().fg(palette.muted)
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border)
}

fn render_fighter_input(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    slot: FighterSlot,
    palette: Palette,
) {
    let (title, color) = match slot {
        FighterSlot::First => ("Fighter 1", palette.first),
        FighterSlot::Second => ("Fighter 2", palette.second),
    };
    let focused = state.focus == Focus::Fighter(slot);
    let input = state.input(slot);
    let mut lines = vec![Line::from(vec![
        Span::styled(input.text.clone(), Style::default().fg(color)),
        Span::raw(if focused { "▏" } else { "" }),
    ])];
    if let Some(classes) = &input.weight_class_hint {
        if !classes.is_empty() {
            lines.push(Line::styled(
                format!("Fights in: {}", classes.join(", ")),
                Style::default().fg(palette.muted),
            ));
        }
    }
    let paragraph = Paragraph::new(lines).block(field_block(title, focused, palette));
    frame.render_widget(paragraph, area);
}

fn render_weight_class(frame: &mut Frame, area: Rect, state: &AppState, palette: Palette) {
    let focused = state.focus == Focus::WeightClass;
    let text = format!("◀ {} ▶", state.weight_class_label());
    let paragraph = Paragraph::new(text).block(field_block("Weight Class", focused, palette));
    frame.render_widget(paragraph, area);
}

fn render_suggestions(
    frame: &mut Frame,
    field: Rect,
    bounds: Rect,
    state: &AppState,
    slot: FighterSlot,
    palette: Palette,
) {
    let panel = &state.input(slot).suggestions;
    if !panel.is_visible() {
        return;
    }
    let top = field.y + field.height.saturating_sub(1);
    let wanted = panel.items().len() as u16 + 2;
    let height = wanted.min(bounds.bottom().saturating_sub(top));
    if height < 3 {
        return;
    }
    let popup = Rect {
        x: field.x + 1,
        y: top,
        width: field.width.saturating_sub(2),
        height,
    };
    let lines: Vec<Line> = panel
        .items()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if panel.highlighted() == Some(idx) {
                Line::styled(
                    format!("> {name}"),
                    Style::default()
                        .bg(palette.highlight_bg)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Line::raw(format!("  {name}"))
            }
        })
        .collect();
    frame.render_widget(Clear, popup);
    let list = Paragraph::new(lines)
        .style(Style::default().fg(palette.fg).bg(palette.bg))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(palette.accent)));
    frame.render_widget(list, popup);
}

fn render_prediction(frame: &mut Frame, area: Rect, state: &AppState, palette: Palette) {
    let block = Block::default().title("Prediction").borders(Borders::ALL);
    match state.workflow.phase() {
        Phase::Idle => {
            let idle = Paragraph::new("Pick two fighters and press Enter to predict.")
                .style(Style::default().fg(palette.muted))
                .block(block);
            frame.render_widget(idle, area);
        }
        Phase::Loading { request, .. } => {
            let loading = Paragraph::new(format!(
                "Analyzing {} vs {}...",
                request.fighter1, request.fighter2
            ))
            .style(Style::default().fg(palette.accent))
            .block(block);
            frame.render_widget(loading, area);
        }
        Phase::Error { message, .. } => {
            let error = Paragraph::new(message.as_str())
                .style(Style::default().fg(palette.error).add_modifier(Modifier::BOLD))
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(error, area);
        }
        Phase::Result(outcome) => {
            let view = prediction_view(outcome, state.variant.qualitative_confidence());
            let inner = block.inner(area);
            frame.render_widget(block, area);

            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(2)])
                .split(inner);

            let mut lines = vec![
                Line::styled(view.sentence, Style::default().add_modifier(Modifier::BOLD)),
                Line::raw(view.confidence),
                Line::raw(view.weight_class),
            ];
            if state.show_model_details {
                lines.push(Line::raw(view.method));
                lines.push(Line::raw(view.model_confidences));
                lines.push(Line::raw(view.order_randomized));
            } else {
                lines.push(Line::styled(
                    "Ctrl-D: show model details",
                    Style::default().fg(palette.muted),
                ));
            }
            frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), rows[0]);
            frame.render_widget(probability_bars(&view.split, palette), rows[1]);
        }
    }
}

fn probability_bars(split: &[(String, f64); 2], palette: Palette) -> BarChart<'static> {
    let colors = [palette.first, palette.second];
    let bars: Vec<Bar<'static>> = split
        .iter()
        .zip(colors)
        .map(|((name, pct), color)| {
            Bar::default()
                .value(pct.round().max(0.0) as u64)
                .label(Line::from(name.clone()))
                .text_value(format!("{pct:.1}%"))
                .style(Style::default().fg(color))
        })
        .collect();
    BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .max(100)
}

fn render_comparison(frame: &mut Frame, area: Rect, state: &AppState, palette: Palette) {
    let block = Block::default().title("Fighter Comparison").borders(Borders::ALL);
    let Some(cmp) = &state.comparison else {
        let empty = Paragraph::new("Comparison appears with the next prediction")
            .style(Style::default().fg(palette.muted))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(26), Constraint::Min(10)])
        .split(inner);

    let mut lines = Vec::new();
    for (stats, color) in [(&cmp.fighter1, palette.first), (&cmp.fighter2, palette.second)] {
        lines.push(Line::styled(
            stats.name.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        lines.extend(comparison::stat_lines(stats).into_iter().map(Line::raw));
    }
    frame.render_widget(Paragraph::new(lines), cols[0]);

    let [first, second] = comparison::normalize(cmp);
    frame.render_widget(radar_chart(first, second, palette), cols[1]);
}

fn radar_chart(
    first: RadarSeries,
    second: RadarSeries,
    palette: Palette,
) -> Canvas<'static, impl Fn(&mut ratatui::widgets::canvas::Context<'_>)> {
    let grid = palette.muted;
    let colors = [palette.first, palette.second];
    Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([-1.6, 1.6])
        .y_bounds([-1.3, 1.3])
        .paint(move |ctx| {
            for i in 0..RADAR_LABELS.len() {
                let (x, y) = comparison::spoke(i);
                ctx.draw(&CanvasLine {
                    x1: 0.0,
                    y1: 0.0,
                    x2: x,
                    y2: y,
                    color: grid,
                });
                ctx.print(x * 1.15 - 0.25, y * 1.15, RADAR_LABELS[i]);
            }
            ctx.layer();
            for (series, color) in [&first, &second].into_iter().zip(colors) {
                let verts = comparison::radar_vertices(series);
                for (i, (x1, y1)) in verts.iter().enumerate() {
                    let (x2, y2) = verts[(i + 1) % verts.len()];
                    ctx.draw(&CanvasLine {
                        x1: *x1,
                        y1: *y1,
                        x2,
                        y2,
                        color,
                    });
                }
            }
        })
}

fn render_history(frame: &mut Frame, area: Rect, state: &AppState, palette: Palette) {
    let view = state.history_view();
    let title = if view.show_clear {
        "Prediction History (Ctrl-X clear)"
    } else {
        "Prediction History"
    };
    let style = if view.show_clear {
        Style::default()
    } else {
        Style::default().fg(palette.muted)
    };
    let history = Paragraph::new(view.lines.join("\n"))
        .style(style)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(history, area);
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    let start = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn footer_text(state: &AppState) -> String {
    let focus = match state.focus {
        Focus::Fighter(_) => "type to search | ↑/↓ pick | Enter select/predict",
        Focus::WeightClass => "←/→ change class | Enter predict",
    };
    format!("{focus} | Tab next | Ctrl-S save | Ctrl-D details | Ctrl-T theme | F1 help | Ctrl-C quit")
}

fn render_confirm_clear(frame: &mut Frame, area: Rect, palette: Palette) {
    let popup = centered_rect(50, 20, area);
    frame.render_widget(Clear, popup);
    let prompt = Paragraph::new("Are you sure you want to clear all prediction history? (y/n)")
        .style(Style::default().fg(palette.error))
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Clear History").borders(Borders::ALL));
    frame.render_widget(prompt, popup);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Octagon Predictor - Help",
        "",
        "Inputs:",
        "  Tab / Shift-Tab   Next / previous field",
        "  type              Search fighters (2+ characters)",
        "  ↑/↓               Move through suggestions",
        "  Enter             Take suggestion, or predict",
        "  ←/→               Change weight class",
        "  Esc               Close suggestions / dismiss error",
        "",
        "Results:",
        "  Ctrl-D            Toggle model details",
        "  Ctrl-S            Save prediction to history",
        "  Ctrl-X            Clear history",
        "",
        "Global:",
        "  Ctrl-T            Toggle light/dark theme",
        "  Ctrl-R            Reload fighters and stats",
        "  F1                Toggle help",
        "  Ctrl-C / Ctrl-Q   Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
