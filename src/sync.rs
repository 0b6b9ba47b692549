//! The four sync verbs and their outcome type
//!
//! Each operation maps one work item (a template name or a file path)
//! to one [`SyncOutcome`]. Operations catch their own errors and
//! downgrade them to `Failed` results; a partial failure across a
//! multi-template run must not abort the remaining items.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use similar::TextDiff;
use tracing::{debug, warn};

use crate::canonical;
use crate::config::ExportFormat;
use crate::error::{Result, SyncError};
use crate::store::TemplateStore;

const DIFF_CONTEXT_LINES: usize = 3;

/// Outcome of one operation against one template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Export written to disk
    Saved {
        /// Template name
        name: String,
        /// Destination file
        path: PathBuf,
    },
    /// Local and remote definitions differ
    Diff {
        /// Template name
        name: String,
        /// Unified-diff lines, remote as "before"
        lines: Vec<String>,
    },
    /// Local and remote definitions are identical
    NoDifference {
        /// Template name
        name: String,
    },
    /// The template does not exist on the server
    NotFound {
        /// Template name
        name: String,
    },
    /// Definition imported into the server
    Imported {
        /// Template name
        name: String,
        /// Server acknowledgment, passed through verbatim
        response: Value,
    },
    /// The operation failed; other items are unaffected
    Failed {
        /// The work item (name or path) that failed
        item: String,
        /// Error description
        error: String,
    },
}

/// Capability set every serialization format must provide.
///
/// One concrete variant exists per supported format; adding a format
/// means adding a variant, not subclassing.
pub trait TemplateSync: Sync {
    /// Export a template and write its canonical form under `dest_dir`.
    fn save_to_file(&self, dest_dir: &Path, name: &str, id: Option<&str>) -> SyncOutcome;

    /// Read a local file and return its template name and canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::FileRead`] when the path is unreadable and
    /// document errors when the content cannot be normalized.
    fn load_from_file(&self, path: &Path) -> Result<(String, String)>;

    /// Diff a local file against the server's definition.
    fn compare(&self, path: &Path) -> SyncOutcome;

    /// Import a local file into the server under the given rule set.
    fn import(&self, rules: &Value, path: &Path) -> SyncOutcome;
}

/// Select the implementation for a configured format.
#[must_use]
pub fn for_format(format: ExportFormat, store: TemplateStore) -> Box<dyn TemplateSync> {
    match format {
        ExportFormat::Xml => Box::new(XmlTemplateSync::new(store)),
    }
}

/// XML implementation of the sync capability set.
pub struct XmlTemplateSync {
    store: TemplateStore,
}

impl XmlTemplateSync {
    /// Build the XML syncer on top of a template store.
    #[must_use]
    pub const fn new(store: TemplateStore) -> Self {
        Self { store }
    }

    fn export_canonical(&self, name: &str, id: Option<&str>) -> Result<Option<String>> {
        let raw = match id {
            Some(id) => Some(self.store.export_by_id(id)?),
            None => self.store.export_by_name(name)?,
        };
        raw.map(|r| canonical::normalize(&r)).transpose()
    }

    fn try_save(&self, dest_dir: &Path, name: &str, id: Option<&str>) -> Result<SyncOutcome> {
        let Some(data) = self.export_canonical(name, id)? else {
            return Ok(SyncOutcome::NotFound {
                name: name.to_string(),
            });
        };

        fs::create_dir_all(dest_dir).map_err(|e| SyncError::io(dest_dir, e))?;
        let path = dest_dir.join(format!("{}.xml", name.replace(' ', "_")));
        fs::write(&path, &data).map_err(|e| SyncError::io(&path, e))?;
        debug!(template = name, path = %path.display(), "saved template");

        Ok(SyncOutcome::Saved {
            name: name.to_string(),
            path,
        })
    }

    fn try_compare(&self, path: &Path) -> Result<SyncOutcome> {
        let (name, local) = self.load_from_file(path)?;
        let Some(raw) = self.store.export_by_name(&name)? else {
            return Ok(SyncOutcome::NotFound { name });
        };
        let remote = canonical::normalize(&raw)?;

        let lines = unified_diff(&remote, &local, &name, path);
        if lines.is_empty() {
            Ok(SyncOutcome::NoDifference { name })
        } else {
            Ok(SyncOutcome::Diff { name, lines })
        }
    }

    fn try_import(&self, rules: &Value, path: &Path) -> Result<SyncOutcome> {
        let (name, source) = self.load_from_file(path)?;
        let response = self.store.import_document(rules, &source)?;
        debug!(template = name, "imported template");
        Ok(SyncOutcome::Imported { name, response })
    }
}

impl TemplateSync for XmlTemplateSync {
    fn save_to_file(&self, dest_dir: &Path, name: &str, id: Option<&str>) -> SyncOutcome {
        self.try_save(dest_dir, name, id).unwrap_or_else(|e| {
            warn!(template = name, error = %e, "save failed");
            SyncOutcome::Failed {
                item: name.to_string(),
                error: e.to_string(),
            }
        })
    }

    fn load_from_file(&self, path: &Path) -> Result<(String, String)> {
        let raw = fs::read_to_string(path).map_err(|e| SyncError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let tree = canonical::parse_stripped(&raw)?;
        let name = canonical::extract_name(&tree)?;
        Ok((name, canonical::render(tree)?))
    }

    fn compare(&self, path: &Path) -> SyncOutcome {
        self.try_compare(path).unwrap_or_else(|e| {
            warn!(file = %path.display(), error = %e, "compare failed");
            SyncOutcome::Failed {
                item: path.display().to_string(),
                error: e.to_string(),
            }
        })
    }

    fn import(&self, rules: &Value, path: &Path) -> SyncOutcome {
        self.try_import(rules, path).unwrap_or_else(|e| {
            warn!(file = %path.display(), error = %e, "import failed");
            SyncOutcome::Failed {
                item: path.display().to_string(),
                error: e.to_string(),
            }
        })
    }
}

/// Line-based unified diff between the remote ("before") and local
/// ("after") canonical documents, labeled with the server-side name and
/// the local file path. Identical inputs yield no lines.
fn unified_diff(remote: &str, local: &str, name: &str, path: &Path) -> Vec<String> {
    let diff = TextDiff::from_lines(remote, local);
    let text = diff
        .unified_diff()
        .context_radius(DIFF_CONTEXT_LINES)
        .header(name, &path.display().to_string())
        .to_string();
    text.lines().map(str::to_owned).collect()
}

/// Render a batch of outcomes as key-sorted, indented JSON.
///
/// # Errors
///
/// Returns a serialization error if an outcome cannot be represented
/// as JSON.
pub fn render_report(results: &[SyncOutcome]) -> std::result::Result<String, serde_json::Error> {
    // Round-trip through Value to get key-sorted objects
    let value = serde_json::to_value(results)?;
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use crate::api::ApiClient;
    use crate::api::testing::{FakeServer, sample_export};

    use super::*;

    fn syncer_with(server: FakeServer) -> XmlTemplateSync {
        let client = ApiClient::connect(Box::new(server), "user", "pass").unwrap();
        XmlTemplateSync::new(TemplateStore::new(client, ExportFormat::Xml))
    }

    fn linux_server() -> FakeServer {
        FakeServer::new().with_template(
            "Template OS Linux",
            "10001",
            &sample_export("Template OS Linux"),
        )
    }

    #[test]
    fn test_save_writes_canonical_file() {
        let tmp = TempDir::new().unwrap();
        let syncer = syncer_with(linux_server());

        let outcome = syncer.save_to_file(tmp.path(), "Template OS Linux", None);

        let expected = tmp.path().join("Template_OS_Linux.xml");
        assert_eq!(
            outcome,
            SyncOutcome::Saved {
                name: "Template OS Linux".to_string(),
                path: expected.clone(),
            }
        );
        let written = fs::read_to_string(expected).unwrap();
        assert!(!written.contains("<date>"));
        assert!(!written.contains("<?xml"));
        assert!(written.contains("<template>Template OS Linux</template>"));
    }

    #[test]
    fn test_save_by_id_skips_name_lookup() {
        let tmp = TempDir::new().unwrap();
        let syncer = syncer_with(linux_server());

        let outcome = syncer.save_to_file(tmp.path(), "Template OS Linux", Some("10001"));
        assert!(matches!(outcome, SyncOutcome::Saved { .. }));
    }

    #[test]
    fn test_save_missing_template_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let syncer = syncer_with(FakeServer::new());

        let outcome = syncer.save_to_file(tmp.path(), "Missing", None);

        assert_eq!(
            outcome,
            SyncOutcome::NotFound {
                name: "Missing".to_string()
            }
        );
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_creates_dest_dir() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("nested").join("exports");
        let syncer = syncer_with(linux_server());

        let outcome = syncer.save_to_file(&dest, "Template OS Linux", None);
        assert!(matches!(outcome, SyncOutcome::Saved { .. }));
        assert!(dest.join("Template_OS_Linux.xml").exists());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.xml");
        fs::write(&path, sample_export("Template OS Linux")).unwrap();

        let syncer = syncer_with(FakeServer::new());
        let (name, data) = syncer.load_from_file(&path).unwrap();

        assert_eq!(name, "Template OS Linux");
        assert!(!data.contains("<date>"));
    }

    #[test]
    fn test_load_unreadable_path() {
        let syncer = syncer_with(FakeServer::new());
        let result = syncer.load_from_file(Path::new("/no/such/file.xml"));
        assert!(matches!(result, Err(SyncError::FileRead { .. })));
    }

    #[test]
    fn test_compare_identical_is_no_difference() {
        let tmp = TempDir::new().unwrap();
        let syncer = syncer_with(linux_server());

        // A freshly-exported file matches the server byte for byte
        let outcome = syncer.save_to_file(tmp.path(), "Template OS Linux", None);
        let SyncOutcome::Saved { path, .. } = outcome else {
            panic!("expected Saved, got {outcome:?}");
        };

        assert_eq!(
            syncer.compare(&path),
            SyncOutcome::NoDifference {
                name: "Template OS Linux".to_string()
            }
        );
    }

    #[test]
    fn test_compare_detects_local_change() {
        let tmp = TempDir::new().unwrap();
        let syncer = syncer_with(linux_server());

        let local = sample_export("Template OS Linux")
            .replace("Templates", "Templates/Modified");
        let path = tmp.path().join("t.xml");
        fs::write(&path, local).unwrap();

        let outcome = syncer.compare(&path);
        let SyncOutcome::Diff { name, lines } = outcome else {
            panic!("expected Diff, got {outcome:?}");
        };
        assert_eq!(name, "Template OS Linux");
        assert!(lines.iter().any(|l| l.starts_with("---")));
        assert!(lines.iter().any(|l| l.starts_with("+++")));
        assert!(lines.iter().any(|l| l.starts_with("@@")));
        assert!(lines.iter().any(|l| l.starts_with('-') && l.contains("<name>Templates</name>")));
        assert!(
            lines
                .iter()
                .any(|l| l.starts_with('+') && l.contains("<name>Templates/Modified</name>"))
        );
    }

    #[test]
    fn test_compare_unknown_template_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let syncer = syncer_with(FakeServer::new());

        let path = tmp.path().join("t.xml");
        fs::write(&path, sample_export("Template App New")).unwrap();

        assert_eq!(
            syncer.compare(&path),
            SyncOutcome::NotFound {
                name: "Template App New".to_string()
            }
        );
    }

    #[test]
    fn test_compare_missing_file_is_failed_not_panic() {
        let syncer = syncer_with(FakeServer::new());
        let outcome = syncer.compare(Path::new("/no/such/file.xml"));
        assert!(matches!(outcome, SyncOutcome::Failed { .. }));
    }

    #[test]
    fn test_import_returns_server_response() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("new.xml");
        fs::write(&path, sample_export("Template App New")).unwrap();

        let syncer = syncer_with(FakeServer::new());
        let outcome = syncer.import(&json!({"templates": {"createMissing": true}}), &path);

        assert_eq!(
            outcome,
            SyncOutcome::Imported {
                name: "Template App New".to_string(),
                response: json!({"imported": true}),
            }
        );
    }

    #[test]
    fn test_import_malformed_file_is_failed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.xml");
        fs::write(&path, "definitely not xml").unwrap();

        let syncer = syncer_with(FakeServer::new());
        let outcome = syncer.import(&Value::Null, &path);
        assert!(matches!(outcome, SyncOutcome::Failed { .. }));
    }

    #[test]
    fn test_export_all_writes_every_template() {
        let tmp = TempDir::new().unwrap();
        let server = FakeServer::new()
            .with_template("Template OS Linux", "1", &sample_export("Template OS Linux"))
            .with_template("Template OS Windows", "2", &sample_export("Template OS Windows"));
        let client = ApiClient::connect(Box::new(server), "user", "pass").unwrap();
        let store = TemplateStore::new(client, ExportFormat::Xml);

        let items: Vec<(String, String)> = store.list_all().unwrap().into_iter().collect();
        let syncer = XmlTemplateSync::new(store);

        let results = crate::runner::run(
            4,
            |(name, id): &(String, String)| syncer.save_to_file(tmp.path(), name, Some(id.as_str())),
            &items,
        );

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| matches!(r, SyncOutcome::Saved { .. })));
        assert!(tmp.path().join("Template_OS_Linux.xml").exists());
        assert!(tmp.path().join("Template_OS_Windows.xml").exists());
    }

    #[test]
    fn test_report_is_key_sorted_and_indented() {
        let results = vec![
            SyncOutcome::Saved {
                name: "T".to_string(),
                path: PathBuf::from("exports/T.xml"),
            },
            SyncOutcome::NotFound {
                name: "U".to_string(),
            },
        ];
        let report = render_report(&results).unwrap();

        // keys of the Saved record come out alphabetically
        let name_pos = report.find("\"name\"").unwrap();
        let path_pos = report.find("\"path\"").unwrap();
        let status_pos = report.find("\"status\"").unwrap();
        assert!(name_pos < path_pos && path_pos < status_pos);
        assert!(report.contains("    \"status\": \"saved\""));
        assert!(report.contains("\"not_found\""));
    }
}
