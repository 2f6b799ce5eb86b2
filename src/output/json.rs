use crate::state::PageResult;
use crate::Result;
use std::fs;
use std::path::Path;

/// Writes results as a pretty-printed JSON array
///
/// The file is overwritten if it exists.
///
/// # Example
///
/// ```no_run
/// use webcrawler::output::save_results;
/// use webcrawler::PageResult;
/// use std::path::Path;
///
/// let results = vec![PageResult::new("https://example.com/", 0)];
/// save_results(Path::new("crawl_results.json"), &results).unwrap();
/// ```
pub fn save_results(path: &Path, results: &[PageResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    fs::write(path, json)?;
    tracing::info!("Saved {} results to {}", results.len(), path.display());
    Ok(())
}

/// Reads results previously written by [`save_results`]
pub fn load_results(path: &Path) -> Result<Vec<PageResult>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load_preserves_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");

        let mut ok = PageResult::new("https://example.com/", 0);
        ok.title = "Home".to_string();
        ok.status_code = Some(200);
        ok.response_time = Some(Duration::from_millis(250));
        ok.links = vec!["https://example.com/a".to_string()];
        let mut failed = PageResult::new("https://example.com/a", 1);
        failed.error = Some("HTTP 404".to_string());

        save_results(&path, &[ok.clone(), failed.clone()]).unwrap();
        let loaded = load_results(&path).unwrap();
        assert_eq!(loaded, vec![ok, failed]);
    }

    #[test]
    fn test_optional_fields_serialized_as_null() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        let mut timed_out = PageResult::new("https://example.com/", 0);
        timed_out.error = Some("request timeout".to_string());
        save_results(&path, &[timed_out]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let record = &raw[0];
        assert!(record["status_code"].is_null());
        assert!(record["response_time"].is_null());
        assert!(record["proxy_used"].is_null());
        assert_eq!(record["error"], "request timeout");
        assert_eq!(record["links"], serde_json::json!([]));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(load_results(&dir.path().join("missing.json")).is_err());
    }
}
