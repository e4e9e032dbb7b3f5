//! Client view-model for browsing the catalog.
//!
//! [`BrowserView`] keeps the filter, the grade, the current page and the last
//! server response, nothing else. Transitions such as [`BrowserView::next`]
//! return a candidate [`Navigation`] without mutating the view; the caller
//! fetches it and only [`commit`](BrowserView::commit)s on success, so a
//! failed request leaves the last good page on screen.

use crate::catalog::{self, ProductPage};
use crate::models::{Grade, Product};
use crate::query::ListParams;

const NAME_WIDTH: usize = 28;
const BRAND_WIDTH: usize = 16;
const CATEGORY_WIDTH: usize = 28;
const LABELS_WIDTH: usize = 32;

/// Filter and page position the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub filter_text: String,
    pub grade: Option<Grade>,
    pub page: i64,
}

impl Default for Navigation {
    fn default() -> Self {
        Self {
            filter_text: String::new(),
            grade: None,
            page: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserView {
    nav: Navigation,
    page_size: i64,
    last: Option<ProductPage>,
}

impl BrowserView {
    pub fn new(page_size: i64) -> Self {
        Self {
            nav: Navigation::default(),
            page_size: page_size.max(1),
            last: None,
        }
    }

    pub fn navigation(&self) -> &Navigation {
        &self.nav
    }

    pub fn products(&self) -> &[Product] {
        self.last.as_ref().map(|p| p.data.as_slice()).unwrap_or(&[])
    }

    pub fn total(&self) -> i64 {
        self.last.as_ref().map(|p| p.total).unwrap_or(0)
    }

    pub fn total_pages(&self) -> i64 {
        catalog::total_pages(self.total(), self.page_size)
    }

    pub fn can_prev(&self) -> bool {
        self.nav.page > 1
    }

    pub fn can_next(&self) -> bool {
        self.nav.page < self.total_pages()
    }

    /// The current position again, for a plain reload.
    pub fn refresh(&self) -> Navigation {
        self.nav.clone()
    }

    pub fn prev(&self) -> Option<Navigation> {
        self.can_prev().then(|| Navigation {
            page: self.nav.page - 1,
            ..self.nav.clone()
        })
    }

    pub fn next(&self) -> Option<Navigation> {
        self.can_next().then(|| Navigation {
            page: self.nav.page + 1,
            ..self.nav.clone()
        })
    }

    /// Jump to `page`, clamped to the known page range.
    pub fn goto(&self, page: i64) -> Navigation {
        Navigation {
            page: page.clamp(1, self.total_pages()),
            ..self.nav.clone()
        }
    }

    /// New filter values. The page always restarts at 1.
    pub fn with_filter(&self, filter_text: &str, grade: Option<Grade>) -> Navigation {
        Navigation {
            filter_text: filter_text.trim().to_string(),
            grade,
            page: 1,
        }
    }

    /// Request parameters for `nav`.
    pub fn request(&self, nav: &Navigation) -> ListParams {
        ListParams {
            q: (!nav.filter_text.is_empty()).then(|| nav.filter_text.clone()),
            nutri: nav.grade.map(|g| g.as_str().to_string()),
            page: Some(nav.page.to_string()),
            limit: Some(self.page_size.to_string()),
            ..ListParams::default()
        }
    }

    /// Accept a successful response for `nav`.
    pub fn commit(&mut self, nav: Navigation, page: ProductPage) {
        self.nav = nav;
        self.last = Some(page);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        let mut filters = Vec::new();
        if !self.nav.filter_text.is_empty() {
            filters.push(format!("text \"{}\"", self.nav.filter_text));
        }
        if let Some(g) = self.nav.grade {
            filters.push(format!("nutriscore {}", g));
        }
        if filters.is_empty() {
            out.push_str(&format!("{} products\n", self.total()));
        } else {
            out.push_str(&format!(
                "{} products matching {}\n",
                self.total(),
                filters.join(", ")
            ));
        }

        out.push_str(&format!(
            "{:<NAME_WIDTH$} {:<BRAND_WIDTH$} {:<CATEGORY_WIDTH$} {:<5} {}\n",
            "NAME", "BRAND", "CATEGORY", "GRADE", "LABELS"
        ));
        out.push_str(&"-".repeat(NAME_WIDTH + BRAND_WIDTH + CATEGORY_WIDTH + LABELS_WIDTH + 9));
        out.push('\n');

        if self.products().is_empty() {
            out.push_str("(no products)\n");
        }
        for p in self.products() {
            out.push_str(&format!(
                "{:<NAME_WIDTH$} {:<BRAND_WIDTH$} {:<CATEGORY_WIDTH$} {:<5} {}\n",
                fit(&p.name, NAME_WIDTH),
                fit(&p.brand, BRAND_WIDTH),
                fit(&p.category_string(), CATEGORY_WIDTH),
                grade_badge(p.nutriscore),
                fit(&label_chips(&p.labels), LABELS_WIDTH),
            ));
        }

        out.push_str(&format!(
            "{}  Page {} / {}  {}\n",
            if self.can_prev() { "< prev" } else { "      " },
            self.nav.page,
            self.total_pages(),
            if self.can_next() { "next >" } else { "" },
        ));
        out
    }
}

/// Badge for a grade; unknown renders as a neutral placeholder.
pub fn grade_badge(grade: Option<Grade>) -> String {
    match grade {
        Some(g) => format!("[{}]", g),
        None => "[-]".to_string(),
    }
}

/// Render labels as chips, e.g. `[Bio] [Vegan]`.
pub fn label_chips(labels: &[String]) -> String {
    labels
        .iter()
        .map(|l| format!("[{}]", l))
        .collect::<Vec<_>>()
        .join(" ")
}

// Truncate to `width` characters, marking the cut with an ellipsis.
fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
