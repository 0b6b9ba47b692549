//! Template-scoped facade over the configuration API
//!
//! Restricts the generic export/import calls to template semantics and
//! translates transport-level failures into the engine's error
//! vocabulary. Template names are the stable join key between local
//! files and server state; ids are resolved lazily.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::api::ApiClient;
use crate::config::ExportFormat;
use crate::error::{Result, SyncError};

/// Object type tag used by `configuration.export`.
const OBJECT_TYPE: &str = "templates";

/// Thin facade restricting the API client to template operations.
pub struct TemplateStore {
    client: ApiClient,
    format: ExportFormat,
}

impl TemplateStore {
    /// Wrap an authenticated client for the given serialization format.
    #[must_use]
    pub const fn new(client: ApiClient, format: ExportFormat) -> Self {
        Self { client, format }
    }

    /// Resolve a template's server id by its exact technical name.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TemplateNotFound`] on zero matches and
    /// [`SyncError::AmbiguousTemplate`] when the lookup matches more
    /// than one template.
    pub fn resolve_id(&self, name: &str) -> Result<String> {
        let mut matches = self.client.get_templates(&[name.to_string()])?;
        if matches.len() > 1 {
            return Err(SyncError::AmbiguousTemplate {
                name: name.to_string(),
                count: matches.len(),
            });
        }
        match matches.pop() {
            Some(template) => Ok(template.templateid),
            None => Err(SyncError::TemplateNotFound(name.to_string())),
        }
    }

    /// Export the raw definition of the template with the given id.
    pub fn export_by_id(&self, id: &str) -> Result<String> {
        self.client.export(OBJECT_TYPE, id, self.format)
    }

    /// Export the raw definition of the template with the given name.
    ///
    /// An absent template is a normal outcome for by-name exports and
    /// maps to `Ok(None)`; every other failure propagates.
    pub fn export_by_name(&self, name: &str) -> Result<Option<String>> {
        match self.resolve_id(name) {
            Ok(id) => self.export_by_id(&id).map(Some),
            Err(SyncError::TemplateNotFound(_)) => {
                debug!(template = name, "template not found on server");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Import a definition with the supplied server-side rule set.
    pub fn import_document(&self, rules: &Value, raw: &str) -> Result<Value> {
        self.client.import(rules, self.format, raw)
    }

    /// Enumerate all templates on the server as a name → id mapping in
    /// stable name order.
    pub fn list_all(&self) -> Result<BTreeMap<String, String>> {
        let all = self.client.get_templates(&[])?;
        Ok(all
            .into_iter()
            .map(|t| (t.name, t.templateid))
            .collect())
    }
}
