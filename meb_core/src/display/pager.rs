use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::display::{record::DisplayEvent, status_line, FAILED_MESSAGE, LOADING_MESSAGE};

/// The smallest factor a page is scaled down by.
static MIN_SCALE: f64 = 0.7;

/// Split `items` into consecutive pages of `per_page` elements, the last one possibly shorter.
pub fn paginate<T: Clone>(items: &[T], per_page: usize) -> Vec<Vec<T>> {
    items
        .chunks(per_page.max(1))
        .map(<[T]>::to_vec)
        .collect()
}

/// The factor to scale a page by so `content_height` fits into `viewport_height`.
pub fn fit_scale(content_height: f64, viewport_height: f64) -> f64 {
    if content_height <= 0.0 || viewport_height <= 0.0 {
        return 1.0;
    }
    (viewport_height / content_height).clamp(MIN_SCALE, 1.0)
}

/// How hard a page is squeezed to fit the screen.
///
/// A page starts out `Normal` and is stepped down until it fits.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum FitStep {
    #[default]
    Normal,
    Tight,
    Tighter,
    Scaled(f64),
}

impl FitStep {
    /// The step after this one, `None` once the page is scaled.
    pub fn next(self, content_height: f64, viewport_height: f64) -> Option<Self> {
        match self {
            Self::Normal => Some(Self::Tight),
            Self::Tight => Some(Self::Tighter),
            Self::Tighter => Some(Self::Scaled(fit_scale(content_height, viewport_height))),
            Self::Scaled(_) => None,
        }
    }

    /// The CSS classes of a page at this step.
    pub fn classes(&self) -> &'static [&'static str] {
        match self {
            Self::Normal => &[],
            Self::Tight => &["tight"],
            Self::Tighter => &["tight", "tighter"],
            Self::Scaled(_) => &["tight", "tighter", "scaled"],
        }
    }

    /// The CSS `transform` of a page at this step.
    pub fn transform(&self) -> Option<String> {
        match self {
            Self::Scaled(scale) => Some(format!("scale({scale})")),
            _ => None,
        }
    }
}

/// What the display currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererState {
    pub pages: Vec<Vec<DisplayEvent>>,
    pub current: usize,
    pub status: String,
}

impl Default for RendererState {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererState {
    pub fn new() -> Self {
        Self {
            pages: vec![],
            current: 0,
            status: LOADING_MESSAGE.to_string(),
        }
    }

    /// Show freshly loaded events, starting over at the first page.
    pub fn load(&mut self, events: Vec<DisplayEvent>, per_page: usize, now: DateTime<Utc>, timezone: &Tz) {
        self.status = status_line(events.len(), now, timezone);
        self.pages = paginate(&events, per_page);
        self.current = 0;
    }

    /// The events file could not be loaded.
    pub fn fail(&mut self) {
        self.pages.clear();
        self.current = 0;
        self.status = FAILED_MESSAGE.to_string();
    }

    pub fn should_rotate(&self) -> bool {
        self.pages.len() > 1
    }

    /// Move to the next page, wrapping around after the last one.
    pub fn advance(&mut self) {
        if self.should_rotate() {
            self.current = (self.current + 1) % self.pages.len();
        }
    }

    pub fn current_page(&self) -> &[DisplayEvent] {
        self.pages
            .get(self.current)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
