use std::time::{Duration, Instant};

use crate::directory::{FighterDirectory, normalize_name};
use crate::state::Fighter;

pub const MIN_QUERY_CHARS: usize = 2;

/// Lazy, bounded walk over the directory yielding names that contain the
/// query. Cloning (or `restart`) replays the walk from the top.
#[derive(Debug, Clone)]
pub struct Suggestions<'a> {
    fighters: &'a [Fighter],
    query: String,
    class: Option<&'a str>,
    cursor: usize,
    remaining: usize,
    limit: usize,
}

pub fn suggest<'a>(
    directory: &'a FighterDirectory,
    query: &str,
    class: Option<&'a str>,
    limit: usize,
) -> Suggestions<'a> {
    let query = normalize_name(query);
    let limit = if query.chars().count() < MIN_QUERY_CHARS {
        0
    } else {
        limit
    };
    Suggestions {
        fighters: directory.fighters(),
        query,
        class,
        cursor: 0,
        remaining: limit,
        limit,
    }
}

impl Suggestions<'_> {
    pub fn restart(&self) -> Self {
        Self {
            cursor: 0,
            remaining: self.limit,
            ..self.clone()
        }
    }
}

impl<'a> Iterator for Suggestions<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 && self.cursor < self.fighters.len() {
            let fighter = &self.fighters[self.cursor];
            self.cursor += 1;
            if let Some(class) = self.class {
                if !fighter.weight_classes.iter().any(|c| c == class) {
                    continue;
                }
            }
            if normalize_name(&fighter.name).contains(&self.query) {
                self.remaining -= 1;
                return Some(fighter.name.as_str());
            }
        }
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct SuggestionPanel {
    items: Vec<String>,
    highlighted: Option<usize>,
    visible: bool,
    hide_at: Option<Instant>,
}

impl SuggestionPanel {
    pub fn update(
        &mut self,
        directory: &FighterDirectory,
        query: &str,
        class: Option<&str>,
        limit: usize,
    ) {
        self.items = suggest(directory, query, class, limit)
            .map(str::to_string)
            .collect();
        self.visible = !self.items.is_empty();
        self.highlighted = None;
        self.hide_at = None;
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn highlighted(&self) -> Option<usize> {
        if self.visible { self.highlighted } else { None }
    }

    pub fn move_selection(&mut self, step: isize) {
        if !self.visible || self.items.is_empty() {
            return;
        }
        let len = self.items.len() as isize;
        let next = match self.highlighted {
            Some(idx) => (idx as isize + step).rem_euclid(len),
            None if step < 0 => len - 1,
            None => 0,
        };
        self.highlighted = Some(next as usize);
    }

    /// Hands out the highlighted name and closes the panel.
    pub fn take_highlighted(&mut self) -> Option<String> {
        let idx = self.highlighted()?;
        let name = self.items.get(idx).cloned();
        self.hide();
        name
    }

    /// Schedules the panel to close; a pick made before the deadline still lands.
    pub fn blur(&mut self, now: Instant, grace: Duration) {
        if self.visible {
            self.hide_at = Some(now + grace);
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if self.hide_at.is_some_and(|at| now >= at) {
            self.hide();
        }
    }

    pub fn hide(&mut self) {
        self.items.clear();
        self.highlighted = None;
        self.visible = false;
        self.hide_at = None;
    }
}
