//! Static catalog of reusable activity templates.
//!
//! Seeded once at startup; lookups are by template id. The catalog itself
//! is immutable — per-loop customization lives on `ActivityInstance`.

use std::collections::HashMap;

use crate::models::{ActivityTemplate, LinkedTarget};

pub struct TemplateCatalog {
    templates: Vec<ActivityTemplate>,
    by_id: HashMap<String, usize>,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<ActivityTemplate>) -> Self {
        let by_id = templates
            .iter()
            .enumerate()
            .map(|(index, template)| (template.id.clone(), index))
            .collect();
        Self { templates, by_id }
    }

    pub fn seeded() -> Self {
        Self::new(seed_templates())
    }

    pub fn get(&self, template_id: &str) -> Option<&ActivityTemplate> {
        self.by_id
            .get(template_id)
            .map(|&index| &self.templates[index])
    }

    pub fn all(&self) -> &[ActivityTemplate] {
        &self.templates
    }

    pub fn by_category(&self, category: &str) -> Vec<&ActivityTemplate> {
        self.templates
            .iter()
            .filter(|template| template.category == category)
            .collect()
    }

    /// Display title for an instance: the per-loop override wins, then the
    /// template title, then the bare template id for orphaned references.
    pub fn effective_title(&self, instance: &crate::models::ActivityInstance) -> String {
        if let Some(title) = &instance.title {
            return title.clone();
        }
        match self.get(&instance.template_id) {
            Some(template) => template.title.clone(),
            None => instance.template_id.clone(),
        }
    }
}

fn template(
    id: &str,
    title: &str,
    emoji: &str,
    category: &str,
    default_linked_target: Option<LinkedTarget>,
) -> ActivityTemplate {
    ActivityTemplate {
        id: id.into(),
        title: title.into(),
        emoji: emoji.into(),
        category: category.into(),
        default_linked_target,
    }
}

fn seed_templates() -> Vec<ActivityTemplate> {
    vec![
        template("journal", "Journal", "📓", "mind", Some(LinkedTarget::Notes)),
        template("brainstorm", "Brainstorm", "💡", "mind", Some(LinkedTarget::Sparks)),
        template("review-tasks", "Review tasks", "✅", "mind", Some(LinkedTarget::Actions)),
        template("plan-path", "Plan a path", "🗺️", "mind", Some(LinkedTarget::Paths)),
        template("meditate", "Meditate", "🧘", "body", None),
        template("stretch", "Stretch", "🤸", "body", None),
        template("hydrate", "Drink water", "💧", "body", None),
        template("walk", "Take a walk", "🚶", "body", None),
        template("read", "Read", "📖", "learn", Some(LinkedTarget::Notes)),
        template("tidy", "Tidy up", "🧹", "home", None),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityInstance;

    #[test]
    fn lookup_by_id() {
        let catalog = TemplateCatalog::seeded();
        let journal = catalog.get("journal").unwrap();
        assert_eq!(journal.title, "Journal");
        assert_eq!(journal.default_linked_target, Some(LinkedTarget::Notes));
        assert!(catalog.get("nope").is_none());
    }

    #[test]
    fn effective_title_prefers_override() {
        let catalog = TemplateCatalog::seeded();
        let mut instance = ActivityInstance::from_template("a1".into(), "journal".into(), 0);
        assert_eq!(catalog.effective_title(&instance), "Journal");

        instance.title = Some("Evening journal".into());
        assert_eq!(catalog.effective_title(&instance), "Evening journal");
    }

    #[test]
    fn by_category_filters() {
        let catalog = TemplateCatalog::seeded();
        let body = catalog.by_category("body");
        assert!(body.iter().all(|t| t.category == "body"));
        assert!(!body.is_empty());
    }
}
