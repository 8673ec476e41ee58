use ab_core::traits::TextSurface;

/// Bloc de texte monospace en mémoire, équivalent d'un `<pre>` plein écran.
///
/// The host owns it (behind `Rc<RefCell<_>>`) and draws it every frame; the
/// effect only replaces its content. `revision` increments on every
/// `set_text`, so the host can tell a fresh write from a stale one.
///
/// # Example
/// ```
/// use ab_core::traits::TextSurface;
/// use ab_render::surface::PreSurface;
///
/// let mut surface = PreSurface::new();
/// surface.set_text(" #\n");
/// assert_eq!(surface.text(), " #\n");
/// assert_eq!(surface.revision(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct PreSurface {
    text: String,
    revision: u64,
    viewport: (u16, u16),
}

impl PreSurface {
    /// Empty surface with a zero viewport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set_text` calls so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Last viewport reported by the host, `(cols, rows)`.
    #[must_use]
    pub fn viewport(&self) -> (u16, u16) {
        self.viewport
    }
}

impl TextSurface for PreSurface {
    fn set_text(&mut self, text: &str) {
        // Réutilise la capacité existante.
        self.text.clear();
        self.text.push_str(text);
        self.revision += 1;
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn set_viewport(&mut self, cols: u16, rows: u16) {
        self.viewport = (cols, rows);
    }
}
