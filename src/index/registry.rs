//! Bidirectional mapping between form identifiers and (application, form) names.

use crate::index::models::FormId;
use std::collections::{BTreeMap, HashMap};

/// Name-pair to identifier registry.
///
/// Forward entries are grouped per application namespace; a reverse index
/// keeps each identifier bound to at most one pair.
#[derive(Debug, Clone, Default)]
pub struct IdentifierRegistry {
    apps: BTreeMap<String, BTreeMap<String, FormId>>,
    owners: HashMap<FormId, (String, String)>,
}

impl IdentifierRegistry {
    pub fn lookup(&self, app: &str, form: &str) -> Option<&FormId> {
        self.apps.get(app)?.get(form)
    }

    /// The pair an identifier is currently bound to.
    pub fn owner(&self, id: &str) -> Option<(&str, &str)> {
        self.owners
            .get(id)
            .map(|(app, form)| (app.as_str(), form.as_str()))
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.owners.contains_key(id)
    }

    /// Bind `(app, form)` to `id`.
    ///
    /// Replaces any previous identifier for the pair, and moves `id` off any
    /// other pair it was bound to so the old name no longer resolves.
    pub fn assign(&mut self, id: &str, app: &str, form: &str) {
        if let Some((old_app, old_form)) = self.owners.get(id).cloned() {
            if old_app == app && old_form == form {
                return;
            }
            self.remove_forward(&old_app, &old_form);
        }

        let previous = self
            .apps
            .entry(app.to_string())
            .or_default()
            .insert(form.to_string(), id.to_string());
        if let Some(previous) = previous {
            self.owners.remove(&previous);
        }
        self.owners
            .insert(id.to_string(), (app.to_string(), form.to_string()));
    }

    /// Remove the binding for `(app, form)`; returns the identifier it held.
    pub fn unbind(&mut self, app: &str, form: &str) -> Option<FormId> {
        let id = self.remove_forward(app, form)?;
        self.owners.remove(&id);
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// All bindings as `(app, form, id)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &FormId)> {
        self.apps.iter().flat_map(|(app, forms)| {
            forms
                .iter()
                .map(move |(form, id)| (app.as_str(), form.as_str(), id))
        })
    }

    fn remove_forward(&mut self, app: &str, form: &str) -> Option<FormId> {
        let forms = self.apps.get_mut(app)?;
        let id = forms.remove(form)?;
        if forms.is_empty() {
            self.apps.remove(app);
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_and_lookup() {
        let mut registry = IdentifierRegistry::default();
        registry.assign("id-1", "acme", "intake");
        assert_eq!(registry.lookup("acme", "intake").map(String::as_str), Some("id-1"));
        assert_eq!(registry.owner("id-1"), Some(("acme", "intake")));
        assert_eq!(registry.lookup("acme", "other"), None);
    }

    #[test]
    fn reassigning_pair_drops_old_identifier() {
        let mut registry = IdentifierRegistry::default();
        registry.assign("id-1", "acme", "intake");
        registry.assign("id-2", "acme", "intake");
        assert_eq!(registry.lookup("acme", "intake").map(String::as_str), Some("id-2"));
        assert!(!registry.contains_id("id-1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn moving_identifier_unbinds_old_pair() {
        let mut registry = IdentifierRegistry::default();
        registry.assign("id-1", "acme", "intake");
        registry.assign("id-1", "globex", "onboarding");
        assert_eq!(registry.lookup("acme", "intake"), None);
        assert_eq!(registry.owner("id-1"), Some(("globex", "onboarding")));
        assert_eq!(registry.iter().count(), 1);
    }

    #[test]
    fn unbind_prunes_empty_namespace() {
        let mut registry = IdentifierRegistry::default();
        registry.assign("id-1", "acme", "intake");
        registry.assign("id-2", "acme", "exit");

        assert_eq!(registry.unbind("acme", "intake").as_deref(), Some("id-1"));
        assert!(registry.apps.contains_key("acme"));
        assert_eq!(registry.unbind("acme", "intake"), None);

        registry.unbind("acme", "exit");
        assert!(!registry.apps.contains_key("acme"));
        assert!(registry.is_empty());
    }
}
