use crate::diagnostics::Diagnostics;
use crate::input::InputSource;
use crate::persistence::{SelectionStore, HANDEDNESS_KEY, PROFILE_ID_KEY};
use crate::profile::local::LocalFile;
use crate::profile::{
    Handedness, HandednessQuery, LocalProfile, Profile, ProfileError, ProfileRepository,
    ProfileResolver, ProfilesList,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub enum SelectionEvent {
    #[default]
    Cleared,
    Changed {
        profile: Arc<Profile>,
        handedness: Handedness,
    },
}

/// A profile fetch issued for one selection generation.
#[derive(Debug, Clone)]
pub struct ProfileFetch {
    pub generation: u64,
    pub profile_id: String,
    repository: ProfileRepository,
}

#[derive(Debug)]
pub struct ProfileFetchResult {
    pub generation: u64,
    pub profile_id: String,
    pub result: Result<Profile, ProfileError>,
}

impl ProfileFetch {
    pub async fn run(self) -> ProfileFetchResult {
        let result = self
            .repository
            .fetch_profile(
                std::slice::from_ref(&self.profile_id),
                HandednessQuery::Any,
                None,
                false,
            )
            .await
            .map(|resolved| resolved.profile);
        ProfileFetchResult {
            generation: self.generation,
            profile_id: self.profile_id,
            result,
        }
    }
}

/// Profile and handedness selection.
#[derive(Debug)]
pub struct ProfileSelector {
    repository: ProfileRepository,
    store: SelectionStore,
    diagnostics: Diagnostics,
    local: LocalProfile,
    local_changes: watch::Receiver<Option<Arc<Profile>>>,

    profiles_list: Option<ProfilesList>,
    list_failed: bool,
    options: Vec<String>,
    known_ids: BTreeSet<String>,

    selected_profile_id: Option<String>,
    profile: Option<Arc<Profile>>,
    handedness_options: Vec<Handedness>,
    selected_handedness: Option<Handedness>,

    generation: u64,
    pending: Option<u64>,
    events: watch::Sender<SelectionEvent>,
}

impl ProfileSelector {
    pub fn new(
        repository: ProfileRepository,
        store: SelectionStore,
        diagnostics: Diagnostics,
    ) -> Self {
        let (events, _) = watch::channel(SelectionEvent::Cleared);
        let local = LocalProfile::new();
        let local_changes = local.subscribe();
        Self {
            repository,
            store,
            diagnostics,
            local,
            local_changes,
            profiles_list: None,
            list_failed: false,
            options: Vec::new(),
            known_ids: BTreeSet::new(),
            selected_profile_id: None,
            profile: None,
            handedness_options: Vec::new(),
            selected_handedness: None,
            generation: 0,
            pending: None,
            events,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionEvent> {
        self.events.subscribe()
    }

    pub fn repository(&self) -> &ProfileRepository {
        &self.repository
    }

    /// True while a profile fetch for the current selection is in flight.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn needs_profiles_list(&self) -> bool {
        self.profiles_list.is_none() && !self.list_failed
    }

    pub fn list_failed(&self) -> bool {
        self.list_failed
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn selected_profile_id(&self) -> Option<&str> {
        self.selected_profile_id.as_deref()
    }

    pub fn profile(&self) -> Option<&Arc<Profile>> {
        self.profile.as_ref()
    }

    pub fn handedness_options(&self) -> &[Handedness] {
        &self.handedness_options
    }

    pub fn selected_handedness(&self) -> Option<Handedness> {
        self.selected_handedness
    }

    pub fn local_profile(&self) -> &LocalProfile {
        &self.local
    }

    /// Caches `list` and selects the stored profile, or the first option.
    pub fn populate_profile_selector(&mut self, list: ProfilesList) -> Option<ProfileFetch> {
        self.profiles_list = Some(list);
        self.list_failed = false;
        self.repopulate()
    }

    pub fn profiles_list_failed(&mut self, err: &ProfileError) {
        debug!("Profiles list failed: {}", err);
        self.diagnostics.log(format!("Failed to load list: {}", err));
        self.list_failed = true;
        self.options.clear();
        self.known_ids.clear();
        self.clear_selection();
    }

    fn repopulate(&mut self) -> Option<ProfileFetch> {
        let list = self.profiles_list.as_ref()?;

        self.options = list
            .iter()
            .filter(|(_, entry)| !entry.deprecated)
            .map(|(id, _)| id.clone())
            .collect();
        self.known_ids = list.keys().cloned().collect();

        if let Some(local) = self.local.profile() {
            let id = local.profile_id.clone();
            if !self.options.contains(&id) {
                self.options.push(id.clone());
            }
            self.known_ids.insert(id);
        }

        let stored = self.store.take(PROFILE_ID_KEY);
        let selected = stored
            .filter(|id| self.options.contains(id))
            .or_else(|| self.options.first().cloned());

        match selected {
            Some(id) => self.select_profile_id(&id),
            None => {
                self.clear_selection();
                None
            }
        }
    }

    /// Starts a new selection generation for `profile_id`.
    ///
    /// The local profile is applied immediately; anything else returns a
    /// fetch ticket to run off the render loop.
    pub fn select_profile_id(&mut self, profile_id: &str) -> Option<ProfileFetch> {
        self.clear_selection();
        self.generation += 1;
        self.selected_profile_id = Some(profile_id.to_string());
        self.store.set(PROFILE_ID_KEY, profile_id);

        let local = self
            .local
            .profile()
            .filter(|local| local.profile_id == profile_id)
            .cloned();
        if let Some(local) = local {
            info!("Selected local profile {}", profile_id);
            self.pending = None;
            self.profile = Some(local);
            self.populate_handedness();
            return None;
        }

        info!("Fetching profile {} (generation {})", profile_id, self.generation);
        self.pending = Some(self.generation);
        Some(ProfileFetch {
            generation: self.generation,
            profile_id: profile_id.to_string(),
            repository: self.repository.clone(),
        })
    }

    /// Applies a finished fetch unless a newer selection superseded it.
    pub fn complete_profile_fetch(&mut self, fetched: ProfileFetchResult) {
        if fetched.generation != self.generation {
            debug!(
                "Discarding stale fetch of {} (generation {}, current {})",
                fetched.profile_id, fetched.generation, self.generation
            );
            return;
        }
        self.pending = None;

        match fetched.result {
            Ok(profile) => {
                self.profile = Some(Arc::new(profile));
                self.populate_handedness();
            }
            Err(e) => self.diagnostics.log(e.to_string()),
        }
    }

    fn populate_handedness(&mut self) {
        let Some(profile) = &self.profile else {
            return;
        };
        self.handedness_options = profile.handednesses().collect();

        let stored = self
            .store
            .take(HANDEDNESS_KEY)
            .and_then(|value| value.parse::<Handedness>().ok());
        let selected = stored
            .filter(|h| self.handedness_options.contains(h))
            .or_else(|| self.handedness_options.first().copied());
        self.select_handedness(selected);
    }

    /// Publishes the new selection; `None` clears it.
    pub fn select_handedness(&mut self, handedness: Option<Handedness>) {
        self.diagnostics.clear_all();
        self.selected_handedness = handedness;

        match (handedness, &self.profile) {
            (Some(handedness), Some(profile)) => {
                self.store.set(HANDEDNESS_KEY, handedness.as_str());
                info!("Selected {} ({})", profile.profile_id, handedness);
                self.events.send_replace(SelectionEvent::Changed {
                    profile: profile.clone(),
                    handedness,
                });
            }
            _ => {
                self.events.send_replace(SelectionEvent::Cleared);
            }
        }
    }

    fn clear_selection(&mut self) {
        self.pending = None;
        self.profile = None;
        self.handedness_options.clear();
        self.selected_handedness = None;
        self.events.send_replace(SelectionEvent::Cleared);
    }

    /// Builds a local profile from user files. Returns whether it was built.
    ///
    /// Outside the initial pass the stored profile id is pointed at the new
    /// profile so that the next repopulation selects it. The selector itself
    /// is repopulated by [`Self::poll_local_profile`].
    pub fn load_local_files(&mut self, files: &[LocalFile], initial: bool) -> bool {
        match self.local.load_files(files) {
            Ok(profile) => {
                if !initial {
                    self.store.set(PROFILE_ID_KEY, &profile.profile_id);
                }
                true
            }
            Err(e) => {
                self.diagnostics.log(e.to_string());
                false
            }
        }
    }

    /// Repopulates the selector once per local profile change.
    pub fn poll_local_profile(&mut self) -> Option<ProfileFetch> {
        if !self.local_changes.has_changed().unwrap_or(false) {
            return None;
        }
        let changed = self.local_changes.borrow_and_update().clone();
        let profile = changed?;
        debug!("Local profile {} changed", profile.profile_id);
        self.repopulate()
    }

    /// Snapshot for resolving input sources off the render loop.
    pub fn resolver(&self) -> ProfileResolver {
        ProfileResolver::new(
            self.repository.clone(),
            self.known_ids.clone(),
            self.local.snapshot(),
        )
    }

    /// `source` with the selected profile id as its only preference.
    pub fn forced_source(&self, source: &InputSource) -> Option<InputSource> {
        self.selected_profile_id
            .as_deref()
            .map(|id| source.with_forced_profile(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::repository::ProfileListEntry;
    use std::path::PathBuf;

    fn list(ids: &[(&str, bool)]) -> ProfilesList {
        ids.iter()
            .map(|(id, deprecated)| {
                (
                    id.to_string(),
                    ProfileListEntry {
                        path: format!("{}/profile.json", id),
                        deprecated: *deprecated,
                    },
                )
            })
            .collect()
    }

    fn profile(id: &str) -> Profile {
        Profile::from_json(
            format!(
                r#"{{ "profileId": "{}", "layouts": {{
                    "left": {{ "mapping": "", "components": {{}} }},
                    "right": {{ "mapping": "", "components": {{}} }}
                }} }}"#,
                id
            )
            .as_bytes(),
        )
        .unwrap()
    }

    fn selector(store: SelectionStore) -> ProfileSelector {
        ProfileSelector::new(
            ProfileRepository::Directory(PathBuf::from("profiles")),
            store,
            Diagnostics::new(),
        )
    }

    fn fetched(ticket: &ProfileFetch) -> ProfileFetchResult {
        ProfileFetchResult {
            generation: ticket.generation,
            profile_id: ticket.profile_id.clone(),
            result: Ok(profile(&ticket.profile_id)),
        }
    }

    #[test]
    fn deprecated_profiles_are_hidden_and_stored_id_wins() {
        let store = SelectionStore::in_memory();
        store.set(PROFILE_ID_KEY, "b");
        let mut selector = selector(store.clone());

        let ticket = selector
            .populate_profile_selector(list(&[("a", false), ("b", false), ("old", true)]))
            .unwrap();
        assert_eq!(selector.options(), ["a".to_string(), "b".to_string()]);
        assert_eq!(ticket.profile_id, "b");
        assert!(selector.is_busy());
        assert_eq!(store.get(PROFILE_ID_KEY).as_deref(), Some("b"));
    }

    #[test]
    fn stale_fetch_is_discarded() {
        let mut selector = selector(SelectionStore::in_memory());
        let events = selector.subscribe();
        let first = selector
            .populate_profile_selector(list(&[("a", false), ("b", false)]))
            .unwrap();
        let second = selector.select_profile_id("b").unwrap();

        selector.complete_profile_fetch(fetched(&first));
        assert!(selector.profile().is_none());
        assert!(selector.is_busy());

        selector.complete_profile_fetch(fetched(&second));
        assert!(!selector.is_busy());
        assert_eq!(selector.profile().unwrap().profile_id, "b");
        assert!(matches!(
            &*events.borrow(),
            SelectionEvent::Changed { profile, handedness: Handedness::Left } if profile.profile_id == "b"
        ));
    }

    #[test]
    fn stored_handedness_is_taken_once() {
        let store = SelectionStore::in_memory();
        store.set(HANDEDNESS_KEY, "right");
        let mut selector = selector(store.clone());
        let ticket = selector
            .populate_profile_selector(list(&[("a", false)]))
            .unwrap();
        selector.complete_profile_fetch(fetched(&ticket));
        assert_eq!(selector.selected_handedness(), Some(Handedness::Right));

        selector.select_handedness(Some(Handedness::Left));
        assert_eq!(store.get(HANDEDNESS_KEY).as_deref(), Some("left"));

        selector.select_handedness(None);
        assert!(matches!(*selector.subscribe().borrow(), SelectionEvent::Cleared));
    }

    #[test]
    fn failed_fetch_is_reported_and_ends_busy() {
        let diagnostics = Diagnostics::new();
        let mut selector = ProfileSelector::new(
            ProfileRepository::Directory(PathBuf::from("profiles")),
            SelectionStore::in_memory(),
            diagnostics.clone(),
        );
        let ticket = selector
            .populate_profile_selector(list(&[("a", false)]))
            .unwrap();
        selector.complete_profile_fetch(ProfileFetchResult {
            generation: ticket.generation,
            profile_id: ticket.profile_id,
            result: Err(ProfileError::NoMatch("No matching profile name found".to_string())),
        });
        assert!(!selector.is_busy());
        assert_eq!(
            diagnostics.messages(),
            vec!["No matching profile name found".to_string()]
        );
    }

    #[test]
    fn list_failure_is_reported() {
        let diagnostics = Diagnostics::new();
        let mut selector = ProfileSelector::new(
            ProfileRepository::Directory(PathBuf::from("profiles")),
            SelectionStore::in_memory(),
            diagnostics.clone(),
        );
        assert!(selector.needs_profiles_list());
        selector.profiles_list_failed(&ProfileError::Io {
            path: "profiles/profilesList.json".to_string(),
            message: "not found".to_string(),
        });
        assert!(selector.list_failed());
        assert!(!selector.needs_profiles_list());
        assert!(diagnostics.messages()[0].starts_with("Failed to load list"));
    }

    #[test]
    fn local_profile_is_selected_without_fetch() {
        let store = SelectionStore::in_memory();
        let mut selector = selector(store.clone());
        selector.populate_profile_selector(list(&[("a", false)]));

        let registry = r#"{
            "profileId": "local-test",
            "layouts": {
                "left": {
                    "selectComponentId": "trigger",
                    "components": { "trigger": { "type": "trigger" } },
                    "gamepad": { "mapping": "", "buttons": ["trigger"] }
                }
            }
        }"#;
        let files = [LocalFile {
            name: "local-test.json".to_string(),
            path: PathBuf::from("local-test.json"),
            contents: registry.as_bytes().to_vec(),
        }];

        assert!(selector.load_local_files(&files, false));
        assert_eq!(selector.selected_profile_id(), Some("a"));

        assert!(selector.poll_local_profile().is_none());
        assert_eq!(selector.selected_profile_id(), Some("local-test"));
        assert!(!selector.is_busy());
        assert!(selector.options().contains(&"local-test".to_string()));
        assert_eq!(selector.selected_handedness(), Some(Handedness::Left));
        assert!(selector
            .resolver()
            .uses_local(&["local-test".to_string()]));
    }

    #[test]
    fn initial_local_load_keeps_stored_selection() {
        let store = SelectionStore::in_memory();
        store.set(PROFILE_ID_KEY, "a");
        let mut selector = selector(store.clone());
        selector.populate_profile_selector(list(&[("a", false)]));
        // Populating took and rewrote the stored id
        assert_eq!(store.get(PROFILE_ID_KEY).as_deref(), Some("a"));

        let registry = r#"{
            "profileId": "local-test",
            "layouts": {
                "none": {
                    "selectComponentId": "trigger",
                    "components": { "trigger": { "type": "trigger" } }
                }
            }
        }"#;
        let files = [LocalFile {
            name: "local-test.json".to_string(),
            path: PathBuf::from("local-test.json"),
            contents: registry.as_bytes().to_vec(),
        }];
        assert!(selector.load_local_files(&files, true));
        let ticket = selector.poll_local_profile().unwrap();
        assert_eq!(ticket.profile_id, "a");
        assert!(selector.options().contains(&"local-test".to_string()));

        // Nothing new to react to
        assert!(selector.poll_local_profile().is_none());
    }

    #[test]
    fn failed_local_load_leaves_selection_alone() {
        let diagnostics = Diagnostics::new();
        let mut selector = ProfileSelector::new(
            ProfileRepository::Directory(PathBuf::from("profiles")),
            SelectionStore::in_memory(),
            diagnostics.clone(),
        );
        selector.populate_profile_selector(list(&[("a", false)]));

        let files = [LocalFile {
            name: "broken.json".to_string(),
            path: PathBuf::from("broken.json"),
            contents: br#"{ "layouts": {} }"#.to_vec(),
        }];
        assert!(!selector.load_local_files(&files, false));
        assert!(selector.poll_local_profile().is_none());
        assert_eq!(selector.selected_profile_id(), Some("a"));
        assert_eq!(selector.options(), ["a".to_string()]);
        assert_eq!(diagnostics.len(), 1);
    }
}
