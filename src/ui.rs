use crate::blob::DisplayFields;
use crate::config::Config;
use crate::fetch::PokemonSource;
use crate::models::StatName;
use crate::pipeline::{Pipeline, Stage};
use crate::utils::{capitalize_first, sprite_pixels};
use crossterm::event::KeyCode;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Span, Spans};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use std::io;
use std::io::Stdout;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Terminal background the sprite is blended onto.
const SPRITE_BG: (u8, u8, u8) = (0, 0, 0);
const MAX_INPUT_DIGITS: usize = 4;

type SpriteRows = Vec<Vec<(u8, u8, u8)>>;

/// Shared between the draw loop and the background sprite download.
#[derive(Default)]
struct SpriteSlot {
    /// URL the app currently wants. Downloads for any other URL are dropped.
    wanted: Option<String>,
    loaded: Option<(String, Vec<u8>)>,
}

impl SpriteSlot {
    /// Keep `bytes` only if `url` is still the wanted image.
    fn store(&mut self, url: String, bytes: Vec<u8>) -> bool {
        if self.wanted.as_deref() != Some(url.as_str()) {
            return false;
        }
        self.loaded = Some((url, bytes));
        true
    }
}

pub struct App {
    pub config: Config,
    pub pipeline: Pipeline,
    pub input: String,
    pub show_help: bool,
    source: Arc<dyn PokemonSource>,
    image_rx: watch::Receiver<Option<String>>,
    requested_sprite: Option<String>,
    sprite_slot: Arc<Mutex<SpriteSlot>>,
    sprite_task: Option<JoinHandle<()>>,
    decoded: Option<((String, u32, u32), SpriteRows)>,
}

impl App {
    pub fn new(config: Config, source: Arc<dyn PokemonSource>) -> Self {
        let pipeline = Pipeline::spawn(source.clone(), config.clamp_id(config.initial_id));
        let image_rx = pipeline.image();
        Self {
            config,
            pipeline,
            input: String::new(),
            show_help: false,
            source,
            image_rx,
            requested_sprite: None,
            sprite_slot: Arc::new(Mutex::new(SpriteSlot::default())),
            sprite_task: None,
            decoded: None,
        }
    }

    pub fn next(&mut self) {
        let id = self.pipeline.id().saturating_add(1);
        self.pipeline.set_id(self.config.clamp_id(id));
    }

    pub fn previous(&mut self) {
        let id = self.pipeline.id().saturating_sub(1);
        self.pipeline.set_id(self.config.clamp_id(id));
    }

    /// Apply one key press. Returns `false` when the app should quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Char('h') | KeyCode::F(1) => self.show_help = !self.show_help,
            KeyCode::Up | KeyCode::Right | KeyCode::Char('+') => self.next(),
            KeyCode::Down | KeyCode::Left | KeyCode::Char('-') => self.previous(),
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.input.len() < MAX_INPUT_DIGITS {
                    self.input.push(c);
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Esc => self.input.clear(),
            KeyCode::Enter => {
                if let Ok(id) = self.input.parse::<u32>() {
                    self.pipeline.set_id(self.config.clamp_id(id));
                }
                self.input.clear();
            }
            _ => {}
        }
        true
    }

    /// Start downloading the sprite for the current image cell if it changed.
    pub fn sync_sprite(&mut self) {
        let wanted = self.image_rx.borrow_and_update().clone();
        if wanted == self.requested_sprite {
            return;
        }
        self.requested_sprite = wanted.clone();
        self.decoded = None;
        if let Some(task) = self.sprite_task.take() {
            task.abort();
        }
        if let Ok(mut slot) = self.sprite_slot.lock() {
            slot.wanted = wanted.clone();
        }
        let Some(url) = wanted else {
            return;
        };

        let source = self.source.clone();
        let slot = self.sprite_slot.clone();
        self.sprite_task = Some(tokio::spawn(async move {
            match source.sprite(&url).await {
                Ok(bytes) => {
                    if let Ok(mut s) = slot.lock() {
                        if !s.store(url.clone(), bytes) {
                            tracing::debug!(%url, "dropping sprite for stale image");
                        }
                    }
                }
                Err(err) => tracing::warn!(%url, error = %err, "sprite download failed"),
            }
        }));
    }

    /// Sprite rows for the current image at `w` x `h`, if downloaded.
    fn sprite_rows(&mut self, w: u32, h: u32) -> Option<&SpriteRows> {
        let url = self.requested_sprite.clone()?;
        let key = (url.clone(), w, h);
        let fresh = matches!(&self.decoded, Some((k, _)) if *k == key);
        if !fresh {
            let bytes = {
                let slot = self.sprite_slot.lock().ok()?;
                match slot.loaded.as_ref() {
                    Some((u, b)) if *u == url => b.clone(),
                    _ => return None,
                }
            };
            let rows = sprite_pixels(&bytes, w, h, SPRITE_BG)?;
            self.decoded = Some((key, rows));
        }
        self.decoded.as_ref().map(|(_, rows)| rows)
    }

    fn display(&self) -> DisplayFields {
        match self.pipeline.stage() {
            Stage::Ready { blob, .. } => DisplayFields::from_blob(&blob),
            other => DisplayFields::fallback(other.id().unwrap_or_default()),
        }
    }
}

pub fn draw_ui(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    let display = app.display();
    let stage = app.pipeline.stage();
    let loading = app.pipeline.is_loading();
    let current_id = app.pipeline.id();

    terminal
        .draw(|f| {
            // helper to compute a centered rect for popups
            fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
                let popup_w = r.width.saturating_mul(percent_x) / 100;
                let popup_h = r.height.saturating_mul(percent_y) / 100;
                let popup_x = r.x + (r.width.saturating_sub(popup_w) / 2);
                let popup_y = r.y + (r.height.saturating_sub(popup_h) / 2);
                Rect::new(popup_x, popup_y, popup_w, popup_h)
            }
            let size = f.size();
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(8), Constraint::Length(3)])
                .split(size);

            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(rows[0]);

            let left_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(4), Constraint::Min(8)])
                .split(chunks[0]);

            // Name + types
            let mut info_lines: Vec<Spans> = Vec::new();
            let heading = if loading {
                format!("#{} loading...", current_id)
            } else if display.name.is_empty() {
                format!("#{}", current_id)
            } else {
                format!("#{} {}", current_id, display.name)
            };
            info_lines.push(Spans::from(Span::styled(
                heading,
                Style::default().add_modifier(Modifier::BOLD),
            )));
            if !display.types.is_empty() {
                let labels: Vec<String> =
                    display.types.iter().map(|t| capitalize_first(t)).collect();
                info_lines.push(Spans::from(Span::raw(format!(
                    "Types: {}",
                    labels.join(", ")
                ))));
            }
            let info_para = Paragraph::new(info_lines)
                .block(Block::default().borders(Borders::ALL).title("Pokémon"))
                .wrap(Wrap { trim: true });
            f.render_widget(info_para, left_chunks[0]);

            // Render per-stat horizontal bars aligned with each stat name.
            // NAME (padded) | VALUE | [bar...]
            let stats_rect = left_chunks[1];
            let inner_w = stats_rect.width.saturating_sub(2).max(1) as usize;
            let name_w = 4usize;
            let val_w = 4usize;
            let bar_max_w = inner_w.saturating_sub(name_w + val_w + 2);
            // base stats top out at 255
            let scale_max = 255.0f32;

            let mut stat_lines: Vec<Spans> = Vec::new();
            if let Some(stats) = &display.stats {
                for (name, base) in stats.iter() {
                    let bar_len =
                        (((base as f32) / scale_max) * (bar_max_w as f32)).round() as usize;
                    let bar = "█".repeat(bar_len.min(bar_max_w));
                    let line = format!(
                        "{:<name_w$} {:>val_w$} {}",
                        name.abbrev(),
                        base,
                        bar,
                        name_w = name_w,
                        val_w = val_w
                    );
                    stat_lines.push(Spans::from(Span::styled(line, stat_style(name))));
                }
            } else {
                stat_lines.push(Spans::from(Span::raw("(no stats)")));
            }
            let stats_para = Paragraph::new(stat_lines)
                .block(Block::default().borders(Borders::ALL).title("Stats"));
            f.render_widget(stats_para, stats_rect);

            // Sprite widget
            let rect = chunks[1];
            let sprite_w = (rect.width.saturating_sub(2) as u32).clamp(1, 64);
            // Terminal cells are roughly twice as tall as wide.
            let sprite_h = (rect.height.saturating_sub(2) as u32).clamp(1, 32);
            let sprite_para = match app.sprite_rows(sprite_w, sprite_h) {
                Some(sprite_lines) => {
                    let mut stext: Vec<Spans> = Vec::new();
                    for row in sprite_lines.iter() {
                        let spans: Vec<Span> = row
                            .iter()
                            .map(|&(r, g, b)| {
                                Span::styled(" ", Style::default().bg(Color::Rgb(r, g, b)))
                            })
                            .collect();
                        stext.push(Spans::from(spans));
                    }
                    Paragraph::new(stext)
                }
                None if display.image.is_some() => Paragraph::new("(loading sprite)"),
                None => Paragraph::new("(no sprite)"),
            }
            .block(Block::default().borders(Borders::ALL).title("Sprite"));
            f.render_widget(sprite_para, rect);

            // Input / status line
            let status = match &stage {
                Stage::Failed { message, .. } if !loading => Span::styled(
                    format!("Error: {}", message),
                    Style::default().fg(Color::Red),
                ),
                _ if !app.input.is_empty() => Span::raw(format!("Go to #{}", app.input)),
                _ => Span::raw(format!(
                    "Up/Down to browse {}-{}, type a number + Enter to jump, h for help",
                    app.config.min_id, app.config.max_id
                )),
            };
            let status_para = Paragraph::new(vec![Spans::from(status)])
                .block(Block::default().borders(Borders::ALL).title("Id"));
            f.render_widget(status_para, rows[1]);

            // If help is requested, draw a centered help modal on top
            if app.show_help {
                let area = f.size();
                let popup = centered_rect(60, 40, area);
                let help_lines: Vec<Spans> = vec![
                    Spans::from(Span::styled(
                        "Keybindings",
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Spans::from(Span::raw("")),
                    Spans::from(Span::raw("q          Quit")),
                    Spans::from(Span::raw("Up/Down    Next / previous id")),
                    Spans::from(Span::raw("0-9 Enter  Jump to id")),
                    Spans::from(Span::raw("Esc        Clear typed id")),
                    Spans::from(Span::raw("h          Toggle this help modal")),
                ];
                let help_para = Paragraph::new(help_lines)
                    .block(Block::default().borders(Borders::ALL).title("Help"))
                    .wrap(Wrap { trim: true });
                f.render_widget(help_para, popup);
            }
        })
        .map(|_| ())
}

fn stat_style(name: StatName) -> Style {
    let color = match name {
        StatName::Hp => Color::Rgb(120, 200, 80),
        StatName::Attack => Color::Rgb(240, 128, 48),
        StatName::Defense => Color::Rgb(248, 208, 48),
        StatName::SpecialAttack => Color::Rgb(104, 144, 240),
        StatName::SpecialDefense => Color::Rgb(120, 200, 200),
        StatName::Speed => Color::Rgb(248, 88, 136),
    };
    Style::default().fg(color)
}
