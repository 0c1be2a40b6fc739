// Default template discovery: read the templates list page and take the
// tmpl_uid out of the active template's "continue editing" link.

use regex::Regex;
use tracing::{debug, info};

use crate::auth::Session;
use crate::error::{Result, SyncError};
use crate::scrape::{ExtractionRule, Page, DEFAULT_TEMPLATE_ANCHOR, DEFAULT_TEMPLATE_ANCHOR_LOOSE};
use crate::TemplateId;

/// Tried in order; the first rule that yields a usable href wins.
pub const ANCHOR_RULES: [ExtractionRule; 2] = [DEFAULT_TEMPLATE_ANCHOR, DEFAULT_TEMPLATE_ANCHOR_LOOSE];

pub fn resolve_default(session: &Session) -> Result<TemplateId> {
    let url = session.client().endpoints().template_list();
    info!("Resolving default template from {}", url);
    let res = session.client().get(&url)?;
    if !res.is_ok() {
        return Err(SyncError::Resolution(format!(
            "templates list {} returned status {}",
            url, res.status
        )));
    }
    let id = template_id_from_list_page(&res.body, &ANCHOR_RULES)?;
    info!("Default template id: {}", id);
    Ok(id)
}

/// Apply `rules` to a list page and parse the id out of the first match.
pub fn template_id_from_list_page(source: &str, rules: &[ExtractionRule]) -> Result<TemplateId> {
    let page = Page::parse(source)?;
    let mut failures = Vec::new();
    for rule in rules {
        match rule.extract(&page) {
            Ok(href) => match tmpl_uid_from_href(&href) {
                Some(id) => {
                    debug!("rule '{}' matched href {}", rule.name, href);
                    return TemplateId::new(id);
                }
                None => failures.push(format!("{}: href '{}' has no tmpl_uid", rule.name, href)),
            },
            Err(e) => failures.push(e.to_string()),
        }
    }
    Err(SyncError::Resolution(failures.join("; ")))
}

fn tmpl_uid_from_href(href: &str) -> Option<&str> {
    let pattern = Regex::new(r"tmpl_uid=(\d+)").ok()?;
    pattern.captures(href).and_then(|c| c.get(1)).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{establish, Credentials};
    use crate::testing::{ScriptedTransport, Step};

    const FULL_PATH_PAGE: &str = r#"<html><body><div id="pt_admin"><div class="MAIN_center"><div><div><div>
        <div class="layout-content__main_cont"><div class="l-page">
        <div class="l-page__inner l-page__inner--sm u-mar-b-60"><div>
        <div class="design-tmpl-lst__tmp-data-text"><div class="design-tmpl-lst__tmp-data-buttons">
          <a href="/?mode=design_tmpl_edt&amp;tmpl_uid=4821&amp;tmpl_type=0">編集を続ける</a>
        </div></div></div></div></div></div></div></div></div></div></div></body></html>"#;

    #[test]
    fn full_path_rule_finds_the_id() {
        let id = template_id_from_list_page(FULL_PATH_PAGE, &[DEFAULT_TEMPLATE_ANCHOR]).unwrap();
        assert_eq!(id.as_str(), "4821");
    }

    #[test]
    fn loose_rule_survives_layout_changes() {
        let page = r#"<main><div class="design-tmpl-lst__tmp-data-buttons">
            <a href="/?mode=preview">preview</a>
            <a href="/?mode=design_tmpl_edt&tmpl_uid=77&x=1">edit</a></div></main>"#;
        let id = template_id_from_list_page(page, &ANCHOR_RULES).unwrap();
        assert_eq!(id.as_str(), "77");
    }

    #[test]
    fn missing_anchor_is_a_resolution_failure() {
        let err = template_id_from_list_page("<html><body></body></html>", &ANCHOR_RULES).unwrap_err();
        match err {
            SyncError::Resolution(msg) => assert!(msg.contains(DEFAULT_TEMPLATE_ANCHOR.name)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn href_without_uid_is_a_resolution_failure() {
        let page = r#"<div class="design-tmpl-lst__tmp-data-buttons"><a href="/?mode=x">edit</a></div>"#;
        let rule = ExtractionRule {
            name: "any button",
            selector: ".design-tmpl-lst__tmp-data-buttons a",
            attribute: Some("href"),
        };
        let err = template_id_from_list_page(page, &[rule]).unwrap_err();
        assert!(err.to_string().contains("has no tmpl_uid"));
    }

    #[test]
    fn resolves_through_a_session() {
        let transport = ScriptedTransport::new(vec![Step::status(302), Step::page(200, FULL_PATH_PAGE)]);
        let session = establish(transport.client(), &Credentials::new("id", "pw")).unwrap();
        assert_eq!(resolve_default(&session).unwrap().as_str(), "4821");
        assert!(transport.requests()[1].url.ends_with("?mode=design_tmpl_lst"));
    }

    #[test]
    fn non_200_list_page_fails() {
        let transport = ScriptedTransport::new(vec![Step::status(302), Step::status(500)]);
        let session = establish(transport.client(), &Credentials::new("id", "pw")).unwrap();
        assert!(matches!(resolve_default(&session), Err(SyncError::Resolution(_))));
    }
}
