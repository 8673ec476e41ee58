use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::canvas;
use crate::surface::PreSurface;
use ab_core::traits::TextSurface;

/// Informations de l'overlay de diagnostic (`--show-fps` / touche `f`).
#[derive(Clone, Debug, PartialEq)]
pub struct StatusLine {
    /// "live", "fallback", "starting"...
    pub mode: &'static str,
    /// Rendered ticks per second.
    pub fps: f64,
    /// Glyph grid dimensions.
    pub grid: (u16, u16),
}

/// Draw a full frame: the surface text as background, then the optional overlay.
pub fn draw(frame: &mut Frame, surface: &PreSurface, status: Option<&StatusLine>) {
    let area = frame.area();
    canvas::render_text(
        frame.buffer_mut(),
        area,
        surface.text(),
        Style::default().fg(Color::DarkGray),
    );

    if let Some(status) = status {
        draw_status(frame, area, status);
    }
}

/// Small box in the top-right corner.
fn draw_status(frame: &mut Frame, area: Rect, status: &StatusLine) {
    let lines = vec![
        Line::from(Span::styled(
            format!(" {} ", status.mode),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(format!(" {:.0} FPS", status.fps)),
        Line::from(format!(" {}×{}", status.grid.0, status.grid.1)),
    ];

    let width = 16u16.min(area.width);
    let height = (lines.len() as u16 + 2).min(area.height);
    let overlay = Rect::new(area.x + area.width - width, area.y, width, height);

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" backscii ")
            .style(Style::default().bg(Color::Black).fg(Color::White)),
    );
    frame.render_widget(Clear, overlay);
    frame.render_widget(panel, overlay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn draws_surface_and_overlay() {
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();
        let mut surface = PreSurface::new();
        surface.set_text("@@@@\n");
        let status = StatusLine {
            mode: "fallback",
            fps: 30.0,
            grid: (4, 1),
        };
        terminal
            .draw(|f| draw(f, &surface, Some(&status)))
            .unwrap();
        let buf = terminal.backend().buffer();
        // Texte centré : ligne 4, colonnes 18..22.
        assert_eq!(buf[(18, 4)].symbol(), "@");
        let top: String = (0..40).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert!(top.contains("fallback"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(3, 2)).unwrap();
        let surface = PreSurface::new();
        let status = StatusLine {
            mode: "live",
            fps: 0.0,
            grid: (1, 1),
        };
        terminal
            .draw(|f| draw(f, &surface, Some(&status)))
            .unwrap();
    }
}
