// src/routes.rs
use crate::app::App;
use crate::content::Issue;
use crate::errors::GenerateError;
use crate::feed::{FEED_PATH, build_channel, render_channel};
use chrono::Utc;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

pub const ROUTES_FILE: &str = "routes.json";

/// One pre-rendered page per issue, in the order the issues were received.
pub fn issue_routes(issues: &[Issue]) -> Vec<String> {
    issues.iter().map(|issue| format!("/issues/{}/", issue.issue_number())).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub feed_path: PathBuf,
    pub routes_path: PathBuf,
    pub routes: Vec<String>,
}

fn write_file(path: &Path, contents: &str) -> Result<(), GenerateError> {
    fs::write(path, contents).map_err(|source| GenerateError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Static generation step: writes the feed and the issue route list under `out_dir`, both
/// built from a single fetch of the issues.
pub async fn generate_site(app: &App, out_dir: &Path) -> Result<GenerateReport, GenerateError> {
    fs::create_dir_all(out_dir).map_err(|source| GenerateError::Write {
        path: out_dir.display().to_string(),
        source,
    })?;

    let raw = app.gateway.fetch_issues().await?;
    let issues = app.factory.create_issues(&raw)?;
    let routes = issue_routes(&issues);

    let feed_xml = render_channel(&build_channel(app.feed.meta(), &issues, Utc::now()))?;
    let feed_path = out_dir.join(FEED_PATH);
    write_file(&feed_path, &feed_xml)?;

    let routes_path = out_dir.join(ROUTES_FILE);
    write_file(&routes_path, &serde_json::to_string_pretty(&routes)?)?;

    info!(
        "generate_site: wrote {} and {} routes to {}",
        FEED_PATH,
        routes.len(),
        out_dir.display()
    );
    Ok(GenerateReport { feed_path, routes_path, routes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::IssueNumber;

    #[test]
    fn test_issue_routes() {
        let issues = vec![
            Issue::new(IssueNumber::new(2), "b".to_string(), String::new()),
            Issue::new(IssueNumber::new(10), "j".to_string(), String::new()),
        ];
        assert_eq!(issue_routes(&issues), vec!["/issues/2/", "/issues/10/"]);
        assert!(issue_routes(&[]).is_empty());
    }
}
