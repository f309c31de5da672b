//! Startup loading of template documents.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
    sync::Arc,
};

use tracing::{debug, info};

use crate::{
    errors::{SpecError, TemplateError},
    expr::SafeContext,
    session::Session,
    spec::SpecGroup,
    template::Template,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSummary {
    pub name: String,
    pub description: Option<String>,
    /// Template ids in document order.
    pub templates: Vec<String>,
}

/// Compiled templates keyed by id. Immutable once loading is done; sessions share templates
/// through `Arc`.
#[derive(Debug, Default)]
pub struct SpecRegistry {
    groups: Vec<GroupSummary>,
    templates: BTreeMap<String, Arc<Template>>,
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` document in `dir`, in file name order.
    pub fn from_dir(dir: &Path) -> Result<Self, SpecError> {
        let io = |path: &Path, e: std::io::Error| SpecError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        let mut paths = fs::read_dir(dir)
            .map_err(|e| io(dir, e))?
            .map(|entry| entry.map(|e| e.path()).map_err(|e| io(dir, e)))
            .collect::<Result<Vec<_>, _>>()?;
        paths.retain(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"));
        paths.sort();

        let mut registry = Self::new();
        for path in &paths {
            let json = fs::read_to_string(path).map_err(|e| io(path, e))?;
            registry.add_document(&path.display().to_string(), &json)?;
        }
        info!(
            dir = %dir.display(),
            groups = registry.groups.len(),
            templates = registry.templates.len(),
            "loaded template specs"
        );
        Ok(registry)
    }

    pub fn add_document(&mut self, source_name: &str, json: &str) -> Result<(), SpecError> {
        let group: SpecGroup = serde_json::from_str(json).map_err(|e| SpecError::Json {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;
        self.add_group(group)
    }

    /// Compile and register a whole group. Nothing is registered if any template fails.
    pub fn add_group(&mut self, group: SpecGroup) -> Result<(), SpecError> {
        let mut seen = BTreeSet::new();
        for spec in &group.transactions {
            if self.templates.contains_key(&spec.id) || !seen.insert(spec.id.as_str()) {
                return Err(SpecError::DuplicateSpec(spec.id.clone()));
            }
        }
        let compiled = group
            .transactions
            .into_iter()
            .map(Template::compile)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(group = %group.group, templates = compiled.len(), "registered group");
        self.groups.push(GroupSummary {
            name: group.group,
            description: group.description,
            templates: compiled.iter().map(|t| t.id().to_string()).collect(),
        });
        for template in compiled {
            self.templates.insert(template.id().to_string(), Arc::new(template));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Template>> {
        self.templates.get(id).cloned()
    }

    pub fn groups(&self) -> &[GroupSummary] {
        &self.groups
    }

    pub fn templates(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn open(&self, id: &str, safe: SafeContext) -> Result<Session, TemplateError> {
        self.get(id)
            .map(|t| Session::open(t, safe))
            .ok_or_else(|| TemplateError::UnknownTemplate(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP: &str = r#"{
        "group": "Basics",
        "transactions": [
            { "id": "a", "name": "A", "onFinalize": { "to": "safe.address" } },
            { "id": "b", "name": "B", "onFinalize": { "to": "safe.address" } }
        ]
    }"#;

    #[test]
    fn registers_groups_in_order() {
        let mut registry = SpecRegistry::new();
        registry.add_document("basics.json", GROUP).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.groups()[0].templates, ["a", "b"]);
        assert!(registry.get("b").is_some());
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn duplicate_ids_fail_without_partial_registration() {
        let mut registry = SpecRegistry::new();
        registry.add_document("basics.json", GROUP).unwrap();
        assert_eq!(
            registry.add_document("again.json", GROUP).unwrap_err(),
            SpecError::DuplicateSpec("a".into())
        );
        assert_eq!(registry.groups().len(), 1);

        let doubled = r#"{ "group": "X", "transactions": [
            { "id": "x", "name": "X", "onFinalize": { "to": "safe.address" } },
            { "id": "x", "name": "X", "onFinalize": { "to": "safe.address" } }
        ] }"#;
        assert!(matches!(
            registry.add_document("x.json", doubled),
            Err(SpecError::DuplicateSpec(_))
        ));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn malformed_documents_name_their_source() {
        let mut registry = SpecRegistry::new();
        match registry.add_document("broken.json", "{ \"group\": 1 }") {
            Err(SpecError::Json { source_name, .. }) => assert_eq!(source_name, "broken.json"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
