// Upload: replay each resource's live edit form with the local html/css
// swapped in. The admin expects every field it rendered (tokens, unrelated
// settings) to come back, so the whole form is resubmitted every time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::api::LEGACY_FORM_CONTENT_TYPE;
use crate::auth::Session;
use crate::catalog::{LocalLayout, TemplateResource, CATALOG};
use crate::encoding::{self, UnmappablePolicy};
use crate::error::{Result, SyncError};
use crate::fetch::edit_page_url;
use crate::report::{Operation, ResourceOutcome, RunReport};
use crate::scrape::{self, FormFieldSet};
use crate::TemplateId;

/// Fields serialized after all others, in this order.
const CONTENT_FIELDS: [&str; 2] = ["html", "css"];

/// Local content for one resource.
struct LocalContent {
    html: Option<(PathBuf, String)>,
    css: (PathBuf, String),
}

/// Upload every resource in catalog order. Needs `&mut` so two uploads can
/// never interleave on one session.
pub fn upload_all(session: &mut Session, template_id: &TemplateId, layout: &LocalLayout) -> Result<RunReport> {
    let mut report = RunReport::new(Operation::Upload, template_id.as_str());
    info!("Uploading templates for {}", template_id);
    for resource in CATALOG.iter() {
        let content = match read_local(layout, resource) {
            Ok(Some(content)) => content,
            Ok(None) => {
                info!("Skipping {}: local file(s) missing", resource.label());
                report.push(ResourceOutcome::skipped(resource, "local file(s) missing"));
                continue;
            }
            Err(e) => {
                error!("Failed to read local files for {}: {}", resource.label(), e);
                report.push(ResourceOutcome::failed(resource, &e));
                continue;
            }
        };
        match upload_one(session, template_id, resource, &content) {
            Ok(()) => {
                let mut files: Vec<PathBuf> = content.html.into_iter().map(|(p, _)| p).collect();
                files.push(content.css.0);
                info!("Uploaded {}", resource.label());
                report.push(ResourceOutcome::succeeded(resource, files));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Failed to upload {}: {}", resource.label(), e);
                report.push(ResourceOutcome::failed(resource, &e));
            }
        }
    }
    info!(
        "Upload finished: {} uploaded, {} skipped, {} failed",
        report.succeeded(),
        report.skipped(),
        report.failed()
    );
    Ok(report)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SyncError::io(path, e)),
    }
}

/// `None` when any file the resource needs is absent.
fn read_local(layout: &LocalLayout, resource: &TemplateResource) -> Result<Option<LocalContent>> {
    let html = match layout.html_path(resource) {
        Some(path) => match read_optional(&path)? {
            Some(text) => Some((path, text)),
            None => return Ok(None),
        },
        None => None,
    };
    let css_path = layout.css_path(resource);
    let Some(css) = read_optional(&css_path)? else {
        return Ok(None);
    };
    Ok(Some(LocalContent {
        html,
        css: (css_path, css),
    }))
}

fn upload_one(
    session: &mut Session,
    template_id: &TemplateId,
    resource: &TemplateResource,
    content: &LocalContent,
) -> Result<()> {
    let client = session.client();
    let page_url = edit_page_url(session, template_id, resource);
    let page = client.get(&page_url)?;
    if !page.is_ok() {
        return Err(SyncError::ResourceFetch {
            url: page_url.to_string(),
            status: page.status,
        });
    }

    let mut fields = scrape::form_state(&page.body)?;
    if let Some((_, html)) = &content.html {
        fields.set("html", html.as_str());
    }
    fields.set("css", content.css.1.as_str());

    let body = build_body(&fields, client.unmappable(), &resource.label())?;
    let update_url = client.endpoints().update();
    let res = client.post(&update_url, body, LEGACY_FORM_CONTENT_TYPE)?;
    if !res.is_ok() {
        return Err(SyncError::ResourceUpload {
            url: update_url.to_string(),
            status: res.status,
        });
    }
    Ok(())
}

/// Serialize a field set into an `application/x-www-form-urlencoded` body.
/// Every value is encoded as EUC-JP bytes before escaping; `html` and `css`
/// go last.
pub fn build_body(fields: &FormFieldSet, policy: UnmappablePolicy, origin: &str) -> Result<String> {
    let mut pairs = Vec::new();
    let ordinary = fields.iter().filter(|(name, _)| !CONTENT_FIELDS.contains(name));
    let content = CONTENT_FIELDS
        .iter()
        .filter_map(|name| fields.get(name).map(|value| (*name, value)));
    for (name, value) in ordinary.chain(content) {
        let what = format!("{} field '{}'", origin, name);
        pairs.push(format!(
            "{}={}",
            encoding::encode_form_value(name, policy, &what)?,
            encoding::encode_form_value(value, policy, &what)?
        ));
    }
    Ok(pairs.join("&"))
}
