// Static catalog of template resources and the local files they map to.

use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// HTML template with its own stylesheet, edited on the `HTCS` page.
    PairedHtmlCss,
    /// Stylesheet only, edited on the `CSS` page.
    CssOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemplateResource {
    pub id: u32,
    pub slug: &'static str,
    pub kind: ResourceKind,
}

const fn paired(id: u32, slug: &'static str) -> TemplateResource {
    TemplateResource {
        id,
        slug,
        kind: ResourceKind::PairedHtmlCss,
    }
}

const fn css_only(id: u32, slug: &'static str) -> TemplateResource {
    TemplateResource {
        id,
        slug,
        kind: ResourceKind::CssOnly,
    }
}

/// Every resource the editor exposes, in the order runs visit them.
pub const CATALOG: [TemplateResource; 13] = [
    paired(0, "common"),
    paired(1, "top"),
    paired(2, "product_detail"),
    paired(3, "product_list"),
    paired(4, "trade_act"),
    paired(5, "product_search_results"),
    paired(6, "option_stock_price"),
    paired(7, "privacy_policy"),
    css_only(51, "inquiry"),
    css_only(52, "my_account_login"),
    css_only(53, "tell_a_friend"),
    css_only(54, "newsletter_subscribe_unsubscribe"),
    css_only(55, "review"),
];

impl TemplateResource {
    pub fn has_html(&self) -> bool {
        self.kind == ResourceKind::PairedHtmlCss
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.id, self.slug)
    }
}

/// How local filenames are derived from a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileNaming {
    /// `{id}_{slug}.html`
    #[default]
    SlugQualified,
    /// `{id}.html`
    BareId,
}

/// Where a resource's HTML and CSS live on disk.
#[derive(Debug, Clone)]
pub struct LocalLayout {
    dir: PathBuf,
    naming: FileNaming,
}

impl LocalLayout {
    pub fn new(dir: impl Into<PathBuf>, naming: FileNaming) -> Self {
        LocalLayout {
            dir: dir.into(),
            naming,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stem(&self, resource: &TemplateResource) -> String {
        match self.naming {
            FileNaming::SlugQualified => resource.label(),
            FileNaming::BareId => resource.id.to_string(),
        }
    }

    /// `None` for CSS-only resources.
    pub fn html_path(&self, resource: &TemplateResource) -> Option<PathBuf> {
        resource
            .has_html()
            .then(|| self.dir.join(format!("{}.html", self.stem(resource))))
    }

    pub fn css_path(&self, resource: &TemplateResource) -> PathBuf {
        self.dir.join(format!("{}.css", self.stem(resource)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_eight_pairs_and_five_stylesheets() {
        let paired: Vec<u32> = CATALOG.iter().filter(|r| r.has_html()).map(|r| r.id).collect();
        let css: Vec<u32> = CATALOG.iter().filter(|r| !r.has_html()).map(|r| r.id).collect();
        assert_eq!(paired, (0..=7).collect::<Vec<_>>());
        assert_eq!(css, (51..=55).collect::<Vec<_>>());
    }

    #[test]
    fn slug_qualified_names() {
        let layout = LocalLayout::new("work", FileNaming::SlugQualified);
        assert_eq!(layout.html_path(&CATALOG[0]), Some(PathBuf::from("work/0_common.html")));
        assert_eq!(layout.css_path(&CATALOG[0]), PathBuf::from("work/0_common.css"));
        assert_eq!(layout.html_path(&CATALOG[12]), None);
        assert_eq!(layout.css_path(&CATALOG[12]), PathBuf::from("work/55_review.css"));
    }

    #[test]
    fn bare_id_names() {
        let layout = LocalLayout::new("", FileNaming::BareId);
        assert_eq!(layout.html_path(&CATALOG[2]), Some(PathBuf::from("2.html")));
        assert_eq!(layout.css_path(&CATALOG[9]), PathBuf::from("52.css"));
    }
}
