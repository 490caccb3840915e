//! Canonical resource URL building, parsing, and shortening
//!
//! Compute Engine identifies resources by canonical URLs of the form
//! `https://www.googleapis.com/compute/v1/projects/<project>/...`. Desired
//! state uses short names; these helpers translate between the two.

use crate::error::TaskError;
use anyhow::Result;

/// A parsed canonical Google Cloud resource URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleCloudUrl {
    pub project: String,
    /// Resource kind segment, e.g. `images`, `disks`, `machineTypes`.
    pub kind: String,
    pub name: String,
    /// Zone segment, if the URL is zonal.
    pub zone: Option<String>,
}

/// Last path component of a URL, the resource's short name.
pub fn last_component(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Parse a canonical resource URL into its project/zone/kind/name parts.
///
/// Accepts both global (`projects/<p>/global/<kind>/<name>`) and zonal
/// (`projects/<p>/zones/<zone>/<kind>/<name>`) shapes.
pub fn parse_google_cloud_url(url: &str) -> Result<GoogleCloudUrl> {
    let malformed = || TaskError::MalformedUrl(url.to_string());

    let parsed = url::Url::parse(url).map_err(|_| malformed())?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    let projects_at = segments
        .iter()
        .position(|s| *s == "projects")
        .ok_or_else(malformed)?;
    let rest = &segments[projects_at..];

    match rest {
        ["projects", project, "global", kind, name] => Ok(GoogleCloudUrl {
            project: project.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            zone: None,
        }),
        ["projects", project, "zones", zone, kind, name] => Ok(GoogleCloudUrl {
            project: project.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            zone: Some(zone.to_string()),
        }),
        _ => Err(malformed().into()),
    }
}

/// Build the canonical URL for a machine type.
pub fn build_machine_type_url(project: &str, zone: &str, name: &str) -> String {
    format!(
        "https://www.googleapis.com/compute/v1/projects/{}/zones/{}/machineTypes/{}",
        project, zone, name
    )
}

/// Build the canonical URL for an image spec.
///
/// The spec is either a bare image name (resolved against `default_project`)
/// or `<project>/<name>`; any other shape is an error.
pub fn build_image_url(default_project: &str, name_spec: &str) -> Result<String> {
    let tokens: Vec<&str> = name_spec.split('/').collect();
    let (project, name) = match tokens.as_slice() {
        [name] => (default_project, *name),
        [project, name] => (*project, *name),
        _ => return Err(TaskError::MalformedUrl(name_spec.to_string()).into()),
    };

    Ok(format!(
        "https://www.googleapis.com/compute/v1/projects/{}/global/images/{}",
        project, name
    ))
}

/// Shorten a canonical image URL back into an image spec, relative to
/// `default_project`: the bare name if the projects match, `project/name`
/// otherwise.
pub fn shorten_image_url(default_project: &str, image_url: &str) -> Result<String> {
    let parsed = parse_google_cloud_url(image_url)?;
    if parsed.project == default_project {
        Ok(parsed.name)
    } else {
        Ok(format!("{}/{}", parsed.project, parsed.name))
    }
}
