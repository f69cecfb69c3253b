use super::SelectionError;
use crate::persistence::{SelectionStore, BACKGROUND_KEY};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info, warn};

const BACKGROUNDS_FILE: &str = "backgrounds.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct BackgroundSelector {
    dir: PathBuf,
    default_background: String,
    store: SelectionStore,
    backgrounds: BTreeMap<String, String>,
    selected: Option<String>,
    events: watch::Sender<Option<Background>>,
}

impl BackgroundSelector {
    pub fn new(dir: PathBuf, default_background: String, store: SelectionStore) -> Self {
        let (events, _) = watch::channel(None);
        Self {
            dir,
            default_background,
            store,
            backgrounds: BTreeMap::new(),
            selected: None,
            events,
        }
    }

    /// Reads `<dir>/backgrounds.json`, a map of background name to file.
    pub async fn fetch_list(dir: &Path) -> Result<BTreeMap<String, String>, SelectionError> {
        let path = dir.join(BACKGROUNDS_FILE);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| SelectionError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        serde_json::from_slice(&bytes).map_err(|e| SelectionError::BackgroundList(e.to_string()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Background>> {
        self.events.subscribe()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backgrounds.keys().map(String::as_str)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Selects the stored background, the default, or the first entry.
    pub fn populate(&mut self, backgrounds: BTreeMap<String, String>) {
        info!("Loaded {} backgrounds", backgrounds.len());
        self.backgrounds = backgrounds;

        let selected = self
            .store
            .get(BACKGROUND_KEY)
            .filter(|name| self.backgrounds.contains_key(name))
            .or_else(|| {
                self.backgrounds
                    .contains_key(&self.default_background)
                    .then(|| self.default_background.clone())
            })
            .or_else(|| self.backgrounds.keys().next().cloned());

        match selected {
            Some(name) => self.publish(name),
            None => {
                warn!("Background list is empty");
                self.selected = None;
                self.events.send_replace(None);
            }
        }
    }

    pub fn select(&mut self, name: &str) {
        if !self.backgrounds.contains_key(name) {
            warn!("Unknown background {}", name);
            return;
        }
        self.store.set(BACKGROUND_KEY, name);
        self.publish(name.to_string());
    }

    fn publish(&mut self, name: String) {
        let Some(file) = self.backgrounds.get(&name) else {
            return;
        };
        let background = Background {
            name: name.clone(),
            path: self.dir.join(file),
        };
        debug!("Background {} -> {}", name, background.path.display());
        self.selected = Some(name);
        self.events.send_replace(Some(background));
    }
}
