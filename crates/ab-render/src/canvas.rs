use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;

/// Écrit un bloc de texte multi-lignes directement dans un `ratatui::Buffer`,
/// centré dans `area`.
///
/// Pas de widget Paragraph : écriture cellule par cellule, sans allocation.
/// Lines wider than `area` keep their centre columns; rows beyond its height
/// keep the centre rows.
///
/// # Example
/// ```
/// use ratatui::buffer::Buffer;
/// use ratatui::layout::Rect;
/// use ratatui::style::Style;
/// use ab_render::canvas::render_text;
///
/// let area = Rect::new(0, 0, 4, 1);
/// let mut buf = Buffer::empty(area);
/// render_text(&mut buf, area, " #\n", Style::default());
/// assert_eq!(buf[(2, 0)].symbol(), "#");
/// ```
pub fn render_text(buf: &mut Buffer, area: Rect, text: &str, style: Style) {
    let rows = text.lines().count();
    let cols = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    let (skip_rows, pad_y) = center(rows, area.height);
    let (skip_cols, pad_x) = center(cols, area.width);

    for (dy, line) in text
        .lines()
        .skip(skip_rows)
        .take(usize::from(area.height))
        .enumerate()
    {
        let y = area.y + pad_y + dy as u16;
        for (dx, ch) in line
            .chars()
            .skip(skip_cols)
            .take(usize::from(area.width))
            .enumerate()
        {
            let x = area.x + pad_x + dx as u16;
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_char(ch).set_style(style);
            }
        }
    }
}

/// Centre `content` cells in `avail`: returns (cells skipped, leading padding).
fn center(content: usize, avail: u16) -> (usize, u16) {
    let avail_usize = usize::from(avail);
    if content > avail_usize {
        ((content - avail_usize) / 2, 0)
    } else {
        (0, ((avail_usize - content) / 2) as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol().to_string()).collect()
    }

    #[test]
    fn smaller_text_is_centred() {
        let area = Rect::new(0, 0, 6, 3);
        let mut buf = Buffer::empty(area);
        render_text(&mut buf, area, "ab\n", Style::default());
        assert_eq!(row(&buf, 1), "  ab  ");
        assert_eq!(row(&buf, 0), "      ");
    }

    #[test]
    fn larger_text_is_cropped_around_centre() {
        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        render_text(&mut buf, area, "0123\nabcd\nwxyz\n", Style::default());
        assert_eq!(row(&buf, 0), "bc");
    }

    #[test]
    fn offset_area_is_respected() {
        let full = Rect::new(0, 0, 5, 2);
        let mut buf = Buffer::empty(full);
        render_text(&mut buf, Rect::new(3, 1, 2, 1), "xy\n", Style::default());
        assert_eq!(row(&buf, 1), "   xy");
        assert_eq!(row(&buf, 0), "     ");
    }

    #[test]
    fn empty_text_draws_nothing() {
        let area = Rect::new(0, 0, 3, 1);
        let mut buf = Buffer::empty(area);
        render_text(&mut buf, area, "", Style::default());
        assert_eq!(row(&buf, 0), "   ");
    }
}
