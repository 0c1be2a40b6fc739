// Named extraction rules and the edit-form state scraper.
//
// Every selector the engine depends on lives here as an `ExtractionRule`,
// so a markup change on the admin side breaks one named rule and the error
// says which. Textarea contents are always taken from the page source as
// written, never entity-decoded.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Result, SyncError};

/// A named CSS selector, optionally reading an attribute instead of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRule {
    pub name: &'static str,
    pub selector: &'static str,
    pub attribute: Option<&'static str>,
}

pub const LOGIN_ERROR_BANNER: ExtractionRule = ExtractionRule {
    name: "login error banner",
    selector: "#login_form > div.block_login_error > p > span.gn_txt_16px.gn_txt_fwb.gn_dp_block.gn_mg_b_10",
    attribute: None,
};

pub const HTML_TEXTAREA: ExtractionRule = ExtractionRule {
    name: "html textarea",
    selector: "textarea#html",
    attribute: None,
};

pub const CSS_TEXTAREA: ExtractionRule = ExtractionRule {
    name: "css textarea",
    selector: "textarea#css",
    attribute: None,
};

/// Scope of the form whose state is replayed on upload.
pub const EDIT_FORM: ExtractionRule = ExtractionRule {
    name: "design edit form",
    selector: "#design_edit",
    attribute: None,
};

/// "Continue editing" button of the active template on the list page.
pub const DEFAULT_TEMPLATE_ANCHOR: ExtractionRule = ExtractionRule {
    name: "default template anchor",
    selector: "#pt_admin > div.MAIN_center > div > div > div > div.layout-content__main_cont > div.l-page > \
               div.l-page__inner.l-page__inner--sm.u-mar-b-60 > div > div.design-tmpl-lst__tmp-data-text > \
               div.design-tmpl-lst__tmp-data-buttons > a",
    attribute: Some("href"),
};

/// Same button, located without the full page path.
pub const DEFAULT_TEMPLATE_ANCHOR_LOOSE: ExtractionRule = ExtractionRule {
    name: "default template anchor (loose)",
    selector: ".design-tmpl-lst__tmp-data-buttons a[href*=\"tmpl_uid=\"]",
    attribute: Some("href"),
};

impl ExtractionRule {
    fn compile(&self) -> Result<Selector> {
        Selector::parse(self.selector).map_err(|e| SyncError::scrape(self.name, format!("invalid selector: {}", e)))
    }

    /// First match on `page`, or a `Scrape` error naming this rule.
    pub fn extract(&self, page: &Page<'_>) -> Result<String> {
        let selector = self.compile()?;
        let element = page
            .doc
            .select(&selector)
            .next()
            .ok_or_else(|| SyncError::scrape(self.name, "no element matched"))?;
        match self.attribute {
            Some(attr) => element
                .value()
                .attr(attr)
                .map(str::to_string)
                .ok_or_else(|| SyncError::scrape(self.name, format!("element has no '{}' attribute", attr))),
            None if element.value().name() == "textarea" => page.textarea_source(element, self.name).map(str::to_string),
            None => Ok(element.text().collect()),
        }
    }

    pub fn extract_from(&self, source: &str) -> Result<String> {
        self.extract(&Page::parse(source)?)
    }
}

/// A parsed page that still knows the raw source of its textareas.
pub struct Page<'a> {
    doc: Html,
    textareas: Selector,
    /// `None` when the source scan and the parsed tree disagree on the count.
    raw_textareas: Option<Vec<&'a str>>,
}

impl<'a> Page<'a> {
    pub fn parse(source: &'a str) -> Result<Self> {
        let doc = Html::parse_document(source);
        let textareas =
            Selector::parse("textarea").map_err(|e| SyncError::scrape("textarea", format!("invalid selector: {}", e)))?;
        let raw = scan_textareas(source);
        let parsed = doc.select(&textareas).count();
        let raw_textareas = (raw.len() == parsed).then_some(raw);
        Ok(Page {
            doc,
            textareas,
            raw_textareas,
        })
    }

    /// Source text between a textarea's tags, minus the single leading
    /// newline the HTML parser drops as well.
    fn textarea_source(&self, element: ElementRef<'_>, rule: &str) -> Result<&'a str> {
        let index = self
            .doc
            .select(&self.textareas)
            .position(|t| t.id() == element.id())
            .ok_or_else(|| SyncError::scrape(rule, "element is not a textarea"))?;
        let raw = self
            .raw_textareas
            .as_ref()
            .and_then(|all| all.get(index).copied())
            .ok_or_else(|| SyncError::scrape(rule, "textarea source could not be located in the page"))?;
        Ok(raw
            .strip_prefix("\r\n")
            .or_else(|| raw.strip_prefix('\n'))
            .unwrap_or(raw))
    }
}

/// Inner source of every textarea, in document order. Comments, scripts and
/// styles are skipped so markup inside them is not mistaken for a control.
fn scan_textareas(source: &str) -> Vec<&str> {
    let Ok(pattern) = Regex::new(
        r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|<textarea\b[^>]*>(.*?)</textarea\s*>",
    ) else {
        return Vec::new();
    };
    pattern
        .captures_iter(source)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Named form values in document order. A repeated name keeps its first
/// position and takes the last value, as a keyed map would.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFieldSet {
    fields: Vec<(String, String)>,
}

impl FormFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Scrape what a browser would submit from the edit form on `source`.
pub fn form_state(source: &str) -> Result<FormFieldSet> {
    let page = Page::parse(source)?;
    let form_sel = EDIT_FORM.compile()?;
    let form = page
        .doc
        .select(&form_sel)
        .next()
        .ok_or_else(|| SyncError::scrape(EDIT_FORM.name, "no element matched"))?;

    let controls = Selector::parse("input, select, textarea")
        .map_err(|e| SyncError::scrape(EDIT_FORM.name, format!("invalid selector: {}", e)))?;
    let options = Selector::parse("option")
        .map_err(|e| SyncError::scrape(EDIT_FORM.name, format!("invalid selector: {}", e)))?;

    let mut fields = FormFieldSet::new();
    for control in form.select(&controls) {
        let el = control.value();
        let Some(name) = el.attr("name") else { continue };
        match el.name() {
            "input" => {
                let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
                if (kind == "checkbox" || kind == "radio") && el.attr("checked").is_none() {
                    continue;
                }
                let default = if kind == "checkbox" || kind == "radio" { "on" } else { "" };
                fields.set(name, el.attr("value").unwrap_or(default));
            }
            "textarea" => fields.set(name, page.textarea_source(control, EDIT_FORM.name)?),
            "select" => {
                if let Some(value) = selected_option(control, &options) {
                    fields.set(name, value);
                }
            }
            _ => {}
        }
    }
    Ok(fields)
}

fn selected_option(select: ElementRef<'_>, options: &Selector) -> Option<String> {
    let mut first = None;
    for option in select.select(options) {
        let value = option
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| option.text().collect::<String>().trim().to_string());
        if option.value().attr("selected").is_some() {
            return Some(value);
        }
        first.get_or_insert(value);
    }
    first
}
