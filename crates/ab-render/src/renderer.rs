use std::cell::RefCell;
use std::rc::Weak;

use ab_core::error::CoreError;
use ab_core::frame::GlyphGrid;
use ab_core::traits::TextSurface;

/// Remplace le contenu de la surface par la grille sérialisée.
///
/// Holds only a weak handle: the host owns the surface and may drop it at
/// any time, after which every render is a no-op reporting
/// `SurfaceUnavailable`. The text buffer is reused between ticks.
///
/// # Example
/// ```
/// use std::cell::RefCell;
/// use std::rc::{Rc, Weak};
/// use ab_core::frame::GlyphGrid;
/// use ab_core::traits::TextSurface;
/// use ab_render::{GlyphRenderer, PreSurface};
///
/// let surface = Rc::new(RefCell::new(PreSurface::new()));
/// let weak: Weak<RefCell<dyn TextSurface>> = Rc::downgrade(&surface) as _;
/// let mut renderer = GlyphRenderer::new(weak);
///
/// let grid = GlyphGrid::from_glyphs(2, 1, vec![' ', '#']).unwrap();
/// renderer.render(&grid).unwrap();
/// assert_eq!(surface.borrow().text(), " #\n");
/// ```
pub struct GlyphRenderer {
    surface: Weak<RefCell<dyn TextSurface>>,
    text: String,
    /// `SurfaceUnavailable` n'est loggé qu'une fois.
    reported: bool,
}

impl GlyphRenderer {
    /// Bind a renderer to the host's surface.
    #[must_use]
    pub fn new(surface: Weak<RefCell<dyn TextSurface>>) -> Self {
        Self {
            surface,
            text: String::new(),
            reported: false,
        }
    }

    /// Serialize `grid` and make it the surface's entire content.
    ///
    /// Idempotent: rendering the same grid twice leaves the same text.
    ///
    /// # Errors
    /// `CoreError::SurfaceUnavailable` if the surface was dropped or is
    /// currently borrowed by the host. Nothing is written in that case.
    pub fn render(&mut self, grid: &GlyphGrid) -> Result<(), CoreError> {
        let Some(surface) = self.surface.upgrade() else {
            if !self.reported {
                log::warn!("renderer: surface disparue, rendu ignoré");
                self.reported = true;
            }
            return Err(CoreError::SurfaceUnavailable);
        };
        let Ok(mut surface) = surface.try_borrow_mut() else {
            log::debug!("renderer: surface occupée, tick ignoré");
            return Err(CoreError::SurfaceUnavailable);
        };

        grid.write_text(&mut self.text);
        surface.set_text(&self.text);
        Ok(())
    }

    /// Forward a viewport change to the surface, if still present.
    pub fn set_viewport(&self, cols: u16, rows: u16) {
        if let Some(surface) = self.surface.upgrade()
            && let Ok(mut surface) = surface.try_borrow_mut()
        {
            surface.set_viewport(cols, rows);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::PreSurface;
    use ab_core::charset::GlyphRamp;
    use std::rc::Rc;

    fn bind(surface: &Rc<RefCell<PreSurface>>) -> GlyphRenderer {
        let weak: Weak<RefCell<dyn TextSurface>> = Rc::downgrade(surface) as _;
        GlyphRenderer::new(weak)
    }

    #[test]
    fn text_is_exact_serialization() {
        let surface = Rc::new(RefCell::new(PreSurface::new()));
        let mut renderer = bind(&surface);
        let grid = GlyphGrid::blank(120, 50, &GlyphRamp::default());
        renderer.render(&grid).unwrap();
        let text = surface.borrow().text().to_string();
        assert_eq!(text, grid.to_text());
        assert_eq!(text.chars().count(), 120 * 50 + 50);
    }

    #[test]
    fn render_is_idempotent() {
        let surface = Rc::new(RefCell::new(PreSurface::new()));
        let mut renderer = bind(&surface);
        let grid = GlyphGrid::from_glyphs(2, 2, vec!['a', 'b', 'c', 'd']).unwrap();
        renderer.render(&grid).unwrap();
        let first = surface.borrow().text().to_string();
        renderer.render(&grid).unwrap();
        assert_eq!(surface.borrow().text(), first);
        assert_eq!(surface.borrow().revision(), 2);
    }

    #[test]
    fn dropped_surface_is_a_noop() {
        let surface = Rc::new(RefCell::new(PreSurface::new()));
        let mut renderer = bind(&surface);
        drop(surface);
        let grid = GlyphGrid::blank(4, 2, &GlyphRamp::default());
        assert_eq!(renderer.render(&grid), Err(CoreError::SurfaceUnavailable));
        assert_eq!(renderer.render(&grid), Err(CoreError::SurfaceUnavailable));
        renderer.set_viewport(10, 10);
    }

    #[test]
    fn borrowed_surface_skips_tick() {
        let surface = Rc::new(RefCell::new(PreSurface::new()));
        let mut renderer = bind(&surface);
        let grid = GlyphGrid::blank(1, 1, &GlyphRamp::default());
        let guard = surface.borrow();
        assert_eq!(renderer.render(&grid), Err(CoreError::SurfaceUnavailable));
        drop(guard);
        assert!(renderer.render(&grid).is_ok());
    }
}
