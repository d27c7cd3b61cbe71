use std::collections::{HashMap, HashSet};

use crate::state::Fighter;

/// Session-scoped list of known fighters. Names come from the unfiltered
/// directory load; weight classes accumulate from per-class loads and
/// per-fighter lookups.
#[derive(Debug, Clone, Default)]
pub struct FighterDirectory {
    fighters: Vec<Fighter>,
    index: HashMap<String, usize>,
    loaded_classes: HashSet<String>,
}

pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl FighterDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fighters(fighters: Vec<Fighter>) -> Self {
        let mut dir = Self::new();
        for fighter in fighters {
            let classes = fighter.weight_classes.clone();
            let idx = dir.ensure(&fighter.name);
            dir.fighters[idx].weight_classes = classes.clone();
            dir.loaded_classes.extend(classes);
        }
        dir
    }

    pub fn len(&self) -> usize {
        self.fighters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fighters.is_empty()
    }

    pub fn fighters(&self) -> &[Fighter] {
        &self.fighters
    }

    /// Replaces the name list, keeping weight classes already known for
    /// fighters that are still present.
    pub fn replace_names(&mut self, names: Vec<String>) {
        let mut known: HashMap<String, Vec<String>> = self
            .fighters
            .drain(..)
            .map(|f| (normalize_name(&f.name), f.weight_classes))
            .collect();
        self.index.clear();
        for name in names {
            let key = normalize_name(&name);
            if key.is_empty() || self.index.contains_key(&key) {
                continue;
            }
            let weight_classes = known.remove(&key).unwrap_or_default();
            self.index.insert(key, self.fighters.len());
            self.fighters.push(Fighter {
                name,
                weight_classes,
            });
        }
    }

    /// Marks every listed fighter as competing in `class`.
    pub fn record_class_members(&mut self, class: &str, names: Vec<String>) {
        for name in names {
            if normalize_name(&name).is_empty() {
                continue;
            }
            let idx = self.ensure(&name);
            let classes = &mut self.fighters[idx].weight_classes;
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
        self.loaded_classes.insert(class.to_string());
    }

    pub fn set_weight_classes(&mut self, name: &str, weight_classes: Vec<String>) {
        let idx = self.ensure(name);
        let classes = &mut self.fighters[idx].weight_classes;
        for class in weight_classes {
            if !classes.contains(&class) {
                classes.push(class);
            }
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&Fighter> {
        self.index
            .get(&normalize_name(name))
            .and_then(|idx| self.fighters.get(*idx))
    }

    /// True once membership for `class` has been loaded.
    pub fn class_loaded(&self, class: &str) -> bool {
        self.loaded_classes.contains(class)
    }

    pub fn in_class<'a>(&'a self, class: Option<&'a str>) -> impl Iterator<Item = &'a Fighter> + 'a {
        self.fighters.iter().filter(move |f| match class {
            Some(class) => f.weight_classes.iter().any(|c| c == class),
            None => true,
        })
    }

    fn ensure(&mut self, name: &str) -> usize {
        let key = normalize_name(name);
        if let Some(idx) = self.index.get(&key) {
            return *idx;
        }
        let idx = self.fighters.len();
        self.fighters.push(Fighter {
            name: name.trim().to_string(),
            weight_classes: Vec::new(),
        });
        self.index.insert(key, idx);
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolve_is_case_insensitive_and_trimmed() {
        let mut dir = FighterDirectory::new();
        dir.replace_names(names(&["Jon Jones", "Daniel Cormier"]));
        assert_eq!(dir.resolve("  jon JONES ").map(|f| f.name.as_str()), Some("Jon Jones"));
        assert!(dir.resolve("Jon").is_none());
    }

    #[test]
    fn replace_keeps_known_classes_and_drops_duplicates() {
        let mut dir = FighterDirectory::new();
        dir.replace_names(names(&["Jon Jones"]));
        dir.set_weight_classes("Jon Jones", names(&["Heavyweight"]));
        dir.replace_names(names(&["Jon Jones", "JON JONES", "Stipe Miocic"]));
        assert_eq!(dir.len(), 2);
        assert_eq!(
            dir.resolve("jon jones").map(|f| f.weight_classes.clone()),
            Some(names(&["Heavyweight"]))
        );
    }

    #[test]
    fn class_members_filter() {
        let mut dir = FighterDirectory::new();
        dir.replace_names(names(&["Jon Jones", "Khabib Nurmagomedov"]));
        assert!(!dir.class_loaded("Lightweight"));
        dir.record_class_members("Lightweight", names(&["Khabib Nurmagomedov", "Tony Ferguson"]));
        assert!(dir.class_loaded("Lightweight"));
        let lw: Vec<&str> = dir
            .in_class(Some("Lightweight"))
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(lw, vec!["Khabib Nurmagomedov", "Tony Ferguson"]);
        assert_eq!(dir.in_class(None).count(), 3);
    }
}
