// Fetch: pull every catalog resource's HTML/CSS out of its edit page and
// write it over the local file. Best-effort per resource.

use std::fs;
use std::path::PathBuf;

use tracing::{error, info};

use crate::auth::Session;
use crate::catalog::{LocalLayout, ResourceKind, TemplateResource, CATALOG};
use crate::error::{Result, SyncError};
use crate::report::{Operation, ResourceOutcome, RunReport};
use crate::scrape::{Page, CSS_TEXTAREA, HTML_TEXTAREA};
use crate::TemplateId;

/// Fetch every resource in catalog order. Only fatal errors are returned;
/// everything else is recorded against its resource.
pub fn fetch_all(session: &Session, template_id: &TemplateId, layout: &LocalLayout) -> Result<RunReport> {
    let mut report = RunReport::new(Operation::Fetch, template_id.as_str());
    for resource in CATALOG.iter() {
        match fetch_one(session, template_id, layout, resource) {
            Ok(files) => report.push(ResourceOutcome::succeeded(resource, files)),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Failed to fetch {}: {}", resource.label(), e);
                report.push(ResourceOutcome::failed(resource, &e));
            }
        }
    }
    info!("Fetch finished: {} of {} resources saved", report.succeeded(), CATALOG.len());
    Ok(report)
}

/// URL of the edit page for `resource`.
pub fn edit_page_url(session: &Session, template_id: &TemplateId, resource: &TemplateResource) -> url::Url {
    let endpoints = session.client().endpoints();
    match resource.kind {
        ResourceKind::PairedHtmlCss => endpoints.paired_edit(template_id.as_str(), resource.id),
        ResourceKind::CssOnly => endpoints.css_edit(template_id.as_str(), resource.id),
    }
}

fn fetch_one(
    session: &Session,
    template_id: &TemplateId,
    layout: &LocalLayout,
    resource: &TemplateResource,
) -> Result<Vec<PathBuf>> {
    let url = edit_page_url(session, template_id, resource);
    info!("Fetching content from: {}", url);
    let res = session.client().get(&url)?;
    if !res.is_ok() {
        return Err(SyncError::ResourceFetch {
            url: url.to_string(),
            status: res.status,
        });
    }

    let page = Page::parse(&res.body)?;
    // scrape everything before writing so a broken page leaves local files alone
    let html = match layout.html_path(resource) {
        Some(path) => Some((path, HTML_TEXTAREA.extract(&page)?)),
        None => None,
    };
    let css = (layout.css_path(resource), CSS_TEXTAREA.extract(&page)?);

    let mut written = Vec::new();
    for (path, content) in html.into_iter().chain(std::iter::once(css)) {
        fs::write(&path, content).map_err(|e| SyncError::io(&path, e))?;
        info!("Saved {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::establish;
    use crate::auth::Credentials;
    use crate::catalog::FileNaming;
    use crate::testing::{ScriptedTransport, Step};

    fn paired_page(html: &str, css: &str) -> String {
        format!(
            r#"<html><body><form id="design_edit"><textarea name="html" id="html">{}</textarea><textarea name="css" id="css">{}</textarea></form></body></html>"#,
            html, css
        )
    }

    fn css_page(css: &str) -> String {
        format!(
            r#"<html><body><form id="design_edit"><textarea name="css" id="css">{}</textarea></form></body></html>"#,
            css
        )
    }

    #[test]
    fn fetches_whole_catalog_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let layout = LocalLayout::new(dir.path(), FileNaming::SlugQualified);

        let mut steps = vec![Step::status(302)];
        for id in 0..=7 {
            if id == 3 {
                steps.push(Step::status(404));
            } else {
                steps.push(Step::page(200, &paired_page(&format!("<p>ページ{}&nbsp;&copy;</p>", id), ".a{}")));
            }
        }
        for id in 51..=55 {
            if id == 53 {
                steps.push(Step::page(200, "<html><body>no editor here</body></html>"));
            } else {
                steps.push(Step::page(200, &css_page(&format!(".c{}{{}}", id))));
            }
        }
        let transport = ScriptedTransport::new(steps);
        let session = establish(transport.client(), &Credentials::new("id", "pw")).unwrap();
        let report = fetch_all(&session, &TemplateId::new("4821").unwrap(), &layout).unwrap();

        assert_eq!(report.outcomes.len(), CATALOG.len());
        assert_eq!(report.succeeded(), 11);
        assert_eq!(report.failed(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("0_common.html")).unwrap(),
            "<p>ページ0&nbsp;&copy;</p>"
        );
        assert_eq!(fs::read_to_string(dir.path().join("55_review.css")).unwrap(), ".c55{}");
        assert!(!dir.path().join("3_product_list.html").exists());
        assert!(!dir.path().join("53_tell_a_friend.css").exists());

        let urls: Vec<String> = transport.requests().iter().map(|r| r.url.clone()).collect();
        assert!(urls[1].ends_with("smode=HTCS&tmpl_uid=4821&tmpl_type=0"));
        assert!(urls[9].ends_with("smode=CSS&tmpl_uid=4821&tmpl_type=51"));
    }

    #[test]
    fn fetch_overwrites_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = LocalLayout::new(dir.path(), FileNaming::BareId);
        fs::write(dir.path().join("0.html"), "stale").unwrap();

        let mut steps = vec![Step::status(302), Step::page(200, &paired_page("fresh", "x{}"))];
        steps.extend((1..CATALOG.len()).map(|_| Step::status(500)));
        let transport = ScriptedTransport::new(steps);
        let session = establish(transport.client(), &Credentials::new("id", "pw")).unwrap();
        fetch_all(&session, &TemplateId::new("1").unwrap(), &layout).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("0.html")).unwrap(), "fresh");
        assert_eq!(fs::read_to_string(dir.path().join("0.css")).unwrap(), "x{}");
    }

    #[test]
    fn transport_failure_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let layout = LocalLayout::new(dir.path(), FileNaming::SlugQualified);
        let transport = ScriptedTransport::new(vec![Step::status(302), Step::ConnectionRefused]);
        let session = establish(transport.client(), &Credentials::new("id", "pw")).unwrap();
        let err = fetch_all(&session, &TemplateId::new("1").unwrap(), &layout).unwrap_err();
        assert!(matches!(err, SyncError::Transport { .. }));
        assert_eq!(transport.requests().len(), 2);
    }
}
