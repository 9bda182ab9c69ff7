use std::collections::HashSet;

use npc_link::{AvatarRecord, BackendPort, BackendRequest, LinkError};
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CatalogState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Saved characters offered on the load tab.
#[derive(Debug)]
pub(crate) struct AvatarCatalog {
    state: CatalogState,
    records: Vec<AvatarRecord>,
    query: String,
    selected: usize,
}

impl AvatarCatalog {
    pub(crate) fn new() -> Self {
        Self {
            state: CatalogState::Idle,
            records: Vec::new(),
            query: String::new(),
            selected: 0,
        }
    }

    pub(crate) fn state(&self) -> &CatalogState {
        &self.state
    }

    /// Fetches the list again; an in-flight request is not duplicated.
    pub(crate) fn refresh(&mut self, port: &mut dyn BackendPort) {
        if self.state == CatalogState::Loading {
            return;
        }
        self.state = CatalogState::Loading;
        self.records.clear();
        self.selected = 0;
        port.submit(BackendRequest::ListAvatars);
    }

    pub(crate) fn handle_avatars(&mut self, result: Result<Vec<AvatarRecord>, LinkError>) {
        match result {
            Ok(records) => {
                info!(count = records.len(), "avatars_loaded");
                self.records = records;
                self.state = CatalogState::Loaded;
            }
            Err(err) => {
                error!(error = %err, "avatars_load_failed");
                self.records.clear();
                self.state = CatalogState::Failed(format!("Could not load saved characters: {err}"));
            }
        }
        self.clamp_selection();
    }

    pub(crate) fn query(&self) -> &str {
        &self.query
    }

    pub(crate) fn query_mut(&mut self) -> &mut String {
        &mut self.query
    }

    /// Call after editing the query through `query_mut`.
    pub(crate) fn query_changed(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn visible(&self) -> Vec<&AvatarRecord> {
        dedupe_avatars(filter_avatars(&self.records, &self.query))
    }

    pub(crate) fn selected_index(&self) -> usize {
        self.selected
    }

    pub(crate) fn selected(&self) -> Option<&AvatarRecord> {
        self.visible().get(self.selected).copied()
    }

    pub(crate) fn select_next(&mut self) {
        let count = self.visible().len();
        if count > 0 {
            self.selected = (self.selected + 1).min(count - 1);
        }
    }

    pub(crate) fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Empty-state text, if the list shows nothing.
    pub(crate) fn empty_notice(&self) -> Option<&'static str> {
        if self.state != CatalogState::Loaded {
            return None;
        }
        if dedupe_avatars(self.records.iter().collect()).is_empty() {
            Some("No saved characters found. Create one from the Create tab.")
        } else if self.visible().is_empty() {
            Some("No characters match your search.")
        } else {
            None
        }
    }

    fn clamp_selection(&mut self) {
        let count = self.visible().len();
        self.selected = self.selected.min(count.saturating_sub(1));
    }
}

/// Case-insensitive substring match on the name against the trimmed query.
pub(crate) fn filter_avatars<'a>(records: &'a [AvatarRecord], query: &str) -> Vec<&'a AvatarRecord> {
    let needle = query.trim().to_lowercase();
    records
        .iter()
        .filter(|record| {
            record
                .name
                .as_deref()
                .unwrap_or_default()
                .to_lowercase()
                .contains(&needle)
        })
        .collect()
}

/// Keeps the first record per trimmed lowercase name; nameless records are skipped.
pub(crate) fn dedupe_avatars(records: Vec<&AvatarRecord>) -> Vec<&AvatarRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let Some(name) = record.name.as_deref().filter(|name| !name.is_empty()) else {
                return false;
            };
            seen.insert(name.trim().to_lowercase())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::controllers::test_support::RecordingPort;

    fn named(name: &str) -> AvatarRecord {
        AvatarRecord {
            name: Some(name.to_string()),
            ..AvatarRecord::default()
        }
    }

    fn names(records: &[&AvatarRecord]) -> Vec<String> {
        records
            .iter()
            .filter_map(|record| record.name.clone())
            .collect()
    }

    fn loaded(records: Vec<AvatarRecord>) -> AvatarCatalog {
        let mut catalog = AvatarCatalog::new();
        catalog.handle_avatars(Ok(records));
        catalog
    }

    #[test]
    fn dedupe_is_case_insensitive_and_trimmed() {
        let records = vec![named("Leo"), named("leo "), named("Ana")];
        let deduped = dedupe_avatars(records.iter().collect());
        assert_eq!(names(&deduped), vec!["Leo", "Ana"]);
    }

    #[test]
    fn dedupe_skips_nameless_records() {
        let records = vec![AvatarRecord::default(), named(""), named("Ana")];
        assert_eq!(names(&dedupe_avatars(records.iter().collect())), vec!["Ana"]);
    }

    #[test]
    fn filter_matches_substring_of_trimmed_query() {
        let records = vec![named("Leonard"), named("Ana"), named("Cleo")];
        assert_eq!(
            names(&filter_avatars(&records, "  LEO ")),
            vec!["Leonard", "Cleo"]
        );
        assert_eq!(filter_avatars(&records, "").len(), 3);
    }

    #[test]
    fn refresh_submits_once_while_loading() {
        let mut port = RecordingPort::default();
        let mut catalog = AvatarCatalog::new();
        catalog.refresh(&mut port);
        catalog.refresh(&mut port);
        assert_eq!(port.requests, vec![BackendRequest::ListAvatars]);
        assert_eq!(catalog.state(), &CatalogState::Loading);
    }

    #[test]
    fn failure_surfaces_message() {
        let mut catalog = AvatarCatalog::new();
        catalog.handle_avatars(Err(LinkError::Status {
            status: 500,
            detail: None,
            body: "boom".to_string(),
        }));
        assert_eq!(
            catalog.state(),
            &CatalogState::Failed("Could not load saved characters: Server returned 500: boom".to_string())
        );
    }

    #[test]
    fn selection_follows_visible_list() {
        let mut catalog = loaded(vec![named("Leo"), named("LEO"), named("Ana"), named("Bea")]);
        assert_eq!(catalog.visible().len(), 3);
        catalog.select_next();
        catalog.select_next();
        catalog.select_next();
        assert_eq!(catalog.selected().and_then(|r| r.name.clone()), Some("Bea".to_string()));

        catalog.query_mut().push('a');
        catalog.query_changed();
        assert_eq!(catalog.selected_index(), 0);
        assert_eq!(catalog.selected().and_then(|r| r.name.clone()), Some("Ana".to_string()));
        catalog.select_previous();
        assert_eq!(catalog.selected_index(), 0);
    }

    #[test]
    fn empty_notices_distinguish_no_data_from_no_match() {
        assert_eq!(
            loaded(Vec::new()).empty_notice(),
            Some("No saved characters found. Create one from the Create tab.")
        );
        let mut catalog = loaded(vec![named("Leo")]);
        assert_eq!(catalog.empty_notice(), None);
        catalog.query_mut().push_str("zed");
        assert_eq!(catalog.empty_notice(), Some("No characters match your search."));
    }
}
