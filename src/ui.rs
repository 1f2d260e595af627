use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

use crate::app::{App, Selection};
use crate::braille::BrailleCanvas;
use crate::map::{CanvasLayer, MapRenderer};
use crate::popup::Popup;

const SIDEBAR_WIDTH: u16 = 36;

/// Screen regions
pub struct AppLayout {
    pub sidebar: Rect,
    pub map: Rect,
    /// Map area inside its border
    pub map_inner: Rect,
    pub info_bar: Rect,
}

/// Split the terminal into sidebar, map and info bar
pub fn layout(area: Rect) -> AppLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Sidebar + map
            Constraint::Length(1), // Info bar
        ])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
        .split(rows[0]);

    let map = cols[1];
    AppLayout {
        sidebar: cols[0],
        map,
        map_inner: map_block(" Peta ").inner(map),
        info_bar: rows[1],
    }
}

fn map_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Parse `#RGB` / `#RRGGBB` and dim it toward black by `opacity` (0..1)
pub fn hex_color(hex: &str, opacity: f64) -> Color {
    let digits = hex.trim_start_matches('#');
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return Color::White,
    };
    let Ok(rgb) = u32::from_str_radix(&expanded, 16) else {
        return Color::White;
    };

    // Keep faint layers readable on a dark background
    let k = 0.35 + 0.65 * opacity.clamp(0.0, 1.0);
    let channel = |shift: u32| (f64::from((rgb >> shift) & 0xFF) * k).round() as u8;
    Color::Rgb(channel(16), channel(8), channel(0))
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let regions = layout(frame.area());

    render_sidebar(frame, app, regions.sidebar);
    render_map(frame, app, regions.map);
    render_info_bar(frame, app, regions.info_bar);

    if let Selection::FeatureSelected { popup, .. } = &app.selection {
        render_popup(frame, popup, app.popup_scroll, regions.map_inner);
    }
    if !app.notices.is_empty() {
        render_notices(frame, app, regions.map_inner);
    }
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " WebGIS Papua Barat Daya ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let dim = Style::default().fg(Color::DarkGray);
    let heading = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(Span::styled("Peta Dasar", heading)),
        Line::from(vec![
            Span::styled(" ◆ ", Style::default().fg(Color::Cyan)),
            Span::raw(app.view.basemap.name),
            Span::styled(format!(" (maks z{})", app.view.basemap.max_zoom), dim),
        ]),
        Line::from(""),
        Line::from(Span::styled("Statistik", heading)),
        Line::from(vec![
            Span::styled(" Layer aktif  ", dim),
            Span::raw(format!("{}/{}", app.view.visible.len(), app.registry.len())),
        ]),
        Line::from(vec![
            Span::styled(" Fitur dimuat ", dim),
            Span::raw(app.cache.feature_count().to_string()),
        ]),
        Line::from(""),
        Line::from(Span::styled("Layer", heading)),
    ];

    for (idx, layer) in app.registry.iter().enumerate() {
        let visible = app.view.is_visible(&layer.id);
        let opacity = app.view.opacity(&layer.id);
        let check = if visible { "[x] " } else { "[ ] " };
        let status = if app.is_loading(&layer.id) {
            " …".to_string()
        } else if visible {
            format!(" {opacity:>3}%")
        } else {
            String::new()
        };

        let mut name_style = Style::default().fg(if visible { Color::White } else { Color::Gray });
        if idx == app.sidebar_cursor {
            name_style = name_style.add_modifier(Modifier::REVERSED);
        }

        lines.push(Line::from(vec![
            Span::styled("■ ", Style::default().fg(hex_color(&layer.color, 1.0))),
            Span::styled(check, dim),
            Span::styled(layer.name.clone(), name_style),
            Span::styled(status, dim),
        ]));
    }

    if let Some(layer) = app.registry.get(app.sidebar_cursor) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("Legenda: {}", layer.name), heading)));
        let entries = layer.legend_entries();
        if entries.is_empty() {
            lines.push(Line::from(vec![
                Span::styled(" ■ ", Style::default().fg(hex_color(&layer.color, 1.0))),
                Span::raw(layer.name.clone()),
            ]));
        }
        for entry in entries {
            lines.push(Line::from(vec![
                Span::styled(" ■ ", Style::default().fg(hex_color(&entry.color, 1.0))),
                Span::raw(entry.label),
            ]));
        }
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = map_block(" Peta ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layers = MapRenderer::new(&app.registry, &app.cache).render(
        &app.view,
        &app.viewport,
        inner.width as usize,
        inner.height as usize,
    );

    // Braille pixels back to character cells
    let to_cell = |(px, py): (i32, i32)| {
        let (cx, cy) = (px / 2, py / 4);
        (px >= 0 && py >= 0 && cx < i32::from(inner.width) && cy < i32::from(inner.height))
            .then_some((cx as u16, cy as u16))
    };

    let anchor_pos = match &app.selection {
        Selection::FeatureSelected { anchor, .. } => to_cell(app.viewport.project(*anchor)),
        Selection::Idle => None,
    };

    let map_widget = MapWidget {
        layers,
        cursor_pos: app.mouse_pixel_pos().and_then(to_cell),
        anchor_pos,
    };
    frame.render_widget(map_widget, inner);
}

/// Braille map with cursor and selection markers
struct MapWidget {
    layers: Vec<CanvasLayer>,
    cursor_pos: Option<(u16, u16)>,
    anchor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(&self, canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }

    fn render_marker(pos: Option<(u16, u16)>, ch: char, color: Color, area: Rect, buf: &mut Buffer) {
        if let Some((cx, cy)) = pos {
            let x = area.x + cx;
            let y = area.y + cy;
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: registry order, highlights last
        for layer in &self.layers {
            self.render_layer(&layer.canvas, hex_color(&layer.color, layer.opacity), area, buf);
        }

        Self::render_marker(self.anchor_pos, '◉', Color::Cyan, area, buf);
        Self::render_marker(self.cursor_pos, '╋', Color::Red, area, buf);
    }
}

fn render_info_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled(" ", dim),
        Span::styled(app.cursor_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", dim),
        Span::styled(app.view.basemap.name, Style::default().fg(Color::Magenta)),
    ];
    if let Some(hover) = &app.view.hover {
        spans.push(Span::styled(" | ", dim));
        spans.push(Span::styled(hover.clone(), Style::default().fg(Color::White)));
    }
    if app.loading_count() > 0 {
        spans.push(Span::styled(" | ", dim));
        spans.push(Span::styled(
            format!("memuat {} layer…", app.loading_count()),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::styled(
        " | tab:layer spasi:tampil ,/.:opasitas b:peta dasar c:tutup q:keluar",
        dim,
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Styled lines matching `Popup::body`, one section after another
fn popup_lines(popup: &Popup) -> Vec<Line<'static>> {
    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    for (i, section) in popup.sections.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            format!("# {}", section.title),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        if section.title != section.layer_name {
            lines.push(Line::from(Span::styled(format!("({})", section.layer_name), dim)));
        }
        for field in &section.fields {
            let mut spans = vec![
                Span::styled(format!("{}: ", field.label), dim),
                Span::styled(field.value.clone(), Style::default().add_modifier(Modifier::BOLD)),
            ];
            if let Some(accent) = field.accent {
                spans.push(Span::styled(" ■", Style::default().fg(hex_color(accent, 1.0))));
            }
            lines.push(Line::from(spans));
        }
        lines.push(Line::from(Span::styled("-- Detail Atribut --", dim)));
        for (key, value) in &section.attributes {
            lines.push(Line::from(vec![
                Span::styled(format!("  {key} = "), dim),
                Span::raw(value.clone()),
            ]));
        }
    }
    lines
}

fn render_popup(frame: &mut Frame, popup: &Popup, scroll: u16, map: Rect) {
    let width = (map.width / 2).max(30).min(map.width);
    let area = Rect::new(map.x + map.width - width, map.y, width, map.height);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" Info Fitur ({}) ", popup.sections.len()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Span::styled(" PgUp/PgDn gulir  c tutup ", Style::default().fg(Color::DarkGray)));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(popup_lines(popup)).block(block).scroll((scroll, 0)), area);
}

fn render_notices(frame: &mut Frame, app: &App, map: Rect) {
    let height = (app.notices.len() as u16 + 2).min(6).min(map.height);
    let area = Rect::new(map.x, map.y, map.width, height);

    let lines: Vec<Line> = app
        .notices
        .iter()
        .map(|n| Line::from(Span::styled(n.message.clone(), Style::default().fg(Color::LightRed))))
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(" Error ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)))
        .title_bottom(Span::styled(" x tutup ", Style::default().fg(Color::DarkGray)));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}
