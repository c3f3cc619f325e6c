//! Server state and configuration.
//!
//! [`Desk`] holds the print settings and the shows with their win
//! histories, and decides what happens to each incoming win. [`AppState`]
//! adds the printer: jobs run one at a time behind a lock, with a short
//! cooldown against double prints.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::LabelConfig;
use crate::error::LabelError;
use crate::font::FontSet;
use crate::job;
use crate::layout::LabelRequest;
use crate::transport::{DeviceTransport, PrinterTransport};

/// Wins kept in the history; older ones are dropped.
pub const HISTORY_LIMIT: usize = 100;

/// Prints closer together than this are skipped.
pub const PRINT_COOLDOWN: Duration = Duration::from_millis(1500);

/// The browser extension counts as connected this long after a heartbeat.
pub const EXTENSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Show that always exists and cannot be ended or deleted.
pub const DEFAULT_SHOW: &str = "default";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:7777")
    pub listen_addr: String,
    /// Label layout and printer device
    pub label: LabelConfig,
    /// JSON file keeping settings and history across restarts
    pub state_path: Option<PathBuf>,
}

/// Kind of win reported by the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinKind {
    Sale,
    Giveaway,
}

/// One recorded win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Win {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: WinKind,
    pub name: String,
    pub item: String,
    pub price: Option<String>,
}

impl Win {
    pub fn new(kind: WinKind, name: &str, item: &str, price: Option<&str>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            kind,
            name: name.to_string(),
            item: item.to_string(),
            price: price.map(str::to_string),
        }
    }

    /// Giveaways repeat by buyer and item; sales also by price.
    fn same_win(&self, other: &Win) -> bool {
        let same_entry = self.kind == other.kind && self.name == other.name && self.item == other.item;
        match self.kind {
            WinKind::Giveaway => same_entry,
            WinKind::Sale => same_entry && self.price == other.price,
        }
    }

    pub fn to_request(&self) -> Result<LabelRequest, LabelError> {
        LabelRequest::new(&self.name, &self.item, self.price.as_deref())
    }
}

/// Printing switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub printing_enabled: bool,
    pub print_giveaways: bool,
    /// Items containing any of these (case-insensitive) are not printed
    pub exclusions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            printing_enabled: true,
            print_giveaways: true,
            exclusions: Vec::new(),
        }
    }
}

/// What to do with an incoming win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Already recorded; nothing stored
    Duplicate,
    /// No show is running; nothing stored
    NoActiveShow,
    /// Recorded but filtered out
    Excluded(&'static str),
    /// Recorded; printing is paused
    Logged,
    /// Recorded and should be printed
    Print,
}

/// One auction show and the wins recorded during it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub name: String,
    /// RFC 3339 creation time
    pub created: String,
    /// RFC 3339 time the show was ended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended: Option<String>,
    #[serde(default)]
    pub history: VecDeque<Win>,
}

impl Show {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            created: chrono::Utc::now().to_rfc3339(),
            ended: None,
            history: VecDeque::new(),
        }
    }
}

/// Id of a show name: lowercase, anything outside `[a-z0-9]` becomes `-`.
pub fn show_id(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect()
}

static NO_WINS: VecDeque<Win> = VecDeque::new();

/// Settings plus the shows and their win histories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Desk {
    pub settings: Settings,
    pub current_show: Option<String>,
    pub shows: BTreeMap<String, Show>,
}

impl Default for Desk {
    /// A fresh desk runs the default show.
    fn default() -> Self {
        let mut shows = BTreeMap::new();
        shows.insert(DEFAULT_SHOW.to_string(), Show::new("Default Show"));
        Self {
            settings: Settings::default(),
            current_show: Some(DEFAULT_SHOW.to_string()),
            shows,
        }
    }
}

impl Desk {
    /// Load a saved desk. A missing or unreadable file starts fresh.
    pub fn load(path: Option<&PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Self::default(),
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "state file corrupted, resetting");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// The running show, if any.
    pub fn current(&self) -> Option<&Show> {
        self.current_show.as_ref().and_then(|id| self.shows.get(id))
    }

    fn current_mut(&mut self) -> Option<&mut Show> {
        self.current_show.as_ref().and_then(|id| self.shows.get_mut(id))
    }

    /// Wins of the running show, oldest first. Empty without a show.
    pub fn history(&self) -> &VecDeque<Win> {
        self.current().map_or(&NO_WINS, |show| &show.history)
    }

    pub fn clear_history(&mut self) {
        if let Some(show) = self.current_mut() {
            show.history.clear();
        }
    }

    pub fn find_duplicate(&self, win: &Win) -> Option<&Win> {
        self.history().iter().find(|w| w.same_win(win))
    }

    pub fn is_excluded(&self, item: &str) -> bool {
        let item = item.to_lowercase();
        self.settings.exclusions.iter().any(|exclusion| {
            let pattern = exclusion.trim().to_lowercase();
            !pattern.is_empty() && item.contains(&pattern)
        })
    }

    /// Append `win` to the running show. Dropped when no show is running.
    pub fn record(&mut self, win: Win) {
        let Some(show) = self.current_mut() else {
            return;
        };
        show.history.push_back(win);
        while show.history.len() > HISTORY_LIMIT {
            show.history.pop_front();
        }
    }

    /// Record `win` unless it is a duplicate, and decide whether to print it.
    pub fn accept(&mut self, win: Win) -> Decision {
        if let Some(existing) = self.find_duplicate(&win) {
            tracing::info!(
                name = %win.name,
                item = %win.item,
                first_seen = existing.timestamp,
                "duplicate win rejected"
            );
            return Decision::Duplicate;
        }
        if self.current().is_none() {
            return Decision::NoActiveShow;
        }

        let excluded = self.is_excluded(&win.item);
        let kind = win.kind;
        self.record(win);

        if excluded {
            Decision::Excluded("Item matches exclusion filter")
        } else if kind == WinKind::Giveaway && !self.settings.print_giveaways {
            Decision::Excluded("Giveaway printing disabled")
        } else if self.settings.printing_enabled {
            Decision::Print
        } else {
            Decision::Logged
        }
    }

    /// Wins whose buyer or item contains `query`, case-insensitively.
    pub fn search(&self, query: &str) -> Vec<Win> {
        let query = query.to_lowercase();
        self.history()
            .iter()
            .filter(|w| w.name.to_lowercase().contains(&query) || w.item.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    /// Start a new, empty show and return its id. An existing show with
    /// the same id is replaced. The running show does not change.
    pub fn create_show(&mut self, name: &str) -> Result<String, &'static str> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Show name required");
        }
        let id = show_id(name);
        self.shows.insert(id.clone(), Show::new(name));
        Ok(id)
    }

    pub fn switch_show(&mut self, id: &str) -> Result<(), &'static str> {
        if !self.shows.contains_key(id) {
            return Err("Show not found");
        }
        self.current_show = Some(id.to_string());
        Ok(())
    }

    /// Mark the running show ended and leave no show running.
    pub fn end_show(&mut self) -> Result<String, &'static str> {
        let id = match self.current_show.take() {
            Some(id) if id != DEFAULT_SHOW => id,
            other => {
                self.current_show = other;
                return Err("No active show to end");
            }
        };
        if let Some(show) = self.shows.get_mut(&id) {
            show.ended = Some(chrono::Utc::now().to_rfc3339());
        }
        Ok(id)
    }

    pub fn delete_show(&mut self, id: &str) -> Result<(), &'static str> {
        if id == DEFAULT_SHOW {
            return Err("Cannot delete default show");
        }
        if self.shows.remove(id).is_none() {
            return Err("Show not found");
        }
        if self.current_show.as_deref() == Some(id) {
            self.current_show = None;
        }
        Ok(())
    }
}

/// Desk serialized under its lock, written to disk after the lock is released.
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    json: String,
}

/// Opens the printer for one job.
pub type Connector =
    Arc<dyn Fn() -> Result<Box<dyn PrinterTransport + Send>, LabelError> + Send + Sync>;

/// Connector for the configured device path.
pub fn device_connector(device: String) -> Connector {
    Arc::new(move || -> Result<Box<dyn PrinterTransport + Send>, LabelError> {
        let transport = DeviceTransport::open(&device)?;
        Ok(Box::new(transport))
    })
}

/// Outcome of a print attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintOutcome {
    Printed,
    /// Skipped, the previous print was too recent
    Cooldown,
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub fonts: FontSet,
    pub desk: tokio::sync::Mutex<Desk>,
    connector: Connector,
    /// Held for the whole job; stores when the last print started.
    last_print: Mutex<Option<Instant>>,
    /// Milliseconds since the Unix epoch of the last extension heartbeat
    last_heartbeat: Mutex<Option<i64>>,
    snapshots: AtomicU64,
    /// Generation of the snapshot on disk; held while writing.
    written: tokio::sync::Mutex<u64>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let connector = device_connector(config.label.printer.name.clone());
        Self::with_connector(config, connector)
    }

    pub fn with_connector(config: ServerConfig, connector: Connector) -> Self {
        let fonts = FontSet::load(&config.label.fonts);
        let desk = Desk::load(config.state_path.as_ref());
        Self {
            config,
            fonts,
            desk: tokio::sync::Mutex::new(desk),
            connector,
            last_print: Mutex::new(None),
            last_heartbeat: Mutex::new(None),
            snapshots: AtomicU64::new(0),
            written: tokio::sync::Mutex::new(0),
        }
    }

    /// Serialize `desk` while its lock is held. `None` without a state file.
    pub fn snapshot(&self, desk: &Desk) -> Option<Snapshot> {
        self.config.state_path.as_ref()?;
        match serde_json::to_string_pretty(desk) {
            Ok(json) => Some(Snapshot {
                generation: self.snapshots.fetch_add(1, Ordering::SeqCst) + 1,
                json,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize state");
                None
            }
        }
    }

    /// Write a snapshot to the state file, logging failures. A snapshot
    /// older than the one already written is skipped.
    pub async fn persist(&self, snapshot: Option<Snapshot>) {
        let (Some(snapshot), Some(path)) = (snapshot, self.config.state_path.as_ref()) else {
            return;
        };
        let mut written = self.written.lock().await;
        if snapshot.generation <= *written {
            return;
        }
        match tokio::fs::write(path, snapshot.json).await {
            Ok(()) => *written = snapshot.generation,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to write state file");
            }
        }
    }

    /// Note an extension heartbeat; returns its timestamp.
    pub fn heartbeat(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        *self.last_heartbeat.lock().unwrap_or_else(PoisonError::into_inner) = Some(now);
        now
    }

    pub fn last_heartbeat(&self) -> Option<i64> {
        *self.last_heartbeat.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a heartbeat arrived within [`EXTENSION_TIMEOUT`].
    pub fn extension_active(&self) -> bool {
        let timeout = EXTENSION_TIMEOUT.as_millis() as i64;
        let now = chrono::Utc::now().timestamp_millis();
        self.last_heartbeat().is_some_and(|t| now - t < timeout)
    }

    /// Print one label. Blocks; call from a blocking task.
    pub fn print_blocking(&self, request: &LabelRequest) -> Result<PrintOutcome, LabelError> {
        let mut last_print = self.last_print.lock().unwrap_or_else(PoisonError::into_inner);

        if last_print.is_some_and(|t| t.elapsed() < PRINT_COOLDOWN) {
            tracing::info!(buyer = %request.buyer, "cooldown active, skipped duplicate print");
            return Ok(PrintOutcome::Cooldown);
        }
        *last_print = Some(Instant::now());

        let transport = (self.connector)()?;
        job::print_with_fonts(request, &self.config.label, &self.fonts, transport)?;
        Ok(PrintOutcome::Printed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sale(name: &str, item: &str, price: Option<&str>) -> Win {
        Win::new(WinKind::Sale, name, item, price)
    }

    fn giveaway(name: &str, item: &str) -> Win {
        Win::new(WinKind::Giveaway, name, item, None)
    }

    #[test]
    fn test_sale_duplicates_include_price() {
        let mut desk = Desk::default();
        assert_eq!(desk.accept(sale("ann", "Gold Eagle", Some("$25"))), Decision::Print);
        assert_eq!(desk.accept(sale("ann", "Gold Eagle", Some("$25"))), Decision::Duplicate);
        assert_eq!(desk.accept(sale("ann", "Gold Eagle", Some("$30"))), Decision::Print);
        assert_eq!(desk.history().len(), 2);
    }

    #[test]
    fn test_giveaway_duplicates_ignore_price() {
        let mut desk = Desk::default();
        assert_eq!(desk.accept(giveaway("bob", "Penny")), Decision::Print);
        let mut again = giveaway("bob", "Penny");
        again.price = Some("$0".into());
        assert_eq!(desk.accept(again), Decision::Duplicate);
        assert_eq!(desk.accept(sale("bob", "Penny", None)), Decision::Print);
    }

    #[test]
    fn test_exclusions_are_recorded_but_not_printed() {
        let mut desk = Desk::default();
        desk.settings.exclusions = vec!["  SILVER ".into(), "".into()];

        assert_eq!(
            desk.accept(sale("ann", "1oz Silver Round", None)),
            Decision::Excluded("Item matches exclusion filter")
        );
        assert_eq!(desk.history().len(), 1);
        assert_eq!(desk.accept(sale("ann", "Gold Eagle", None)), Decision::Print);
    }

    #[test]
    fn test_empty_exclusion_matches_nothing() {
        let mut desk = Desk::default();
        desk.settings.exclusions = vec!["   ".into()];
        assert!(!desk.is_excluded("anything"));
    }

    #[test]
    fn test_giveaways_disabled() {
        let mut desk = Desk::default();
        desk.settings.print_giveaways = false;
        assert_eq!(
            desk.accept(giveaway("bob", "Penny")),
            Decision::Excluded("Giveaway printing disabled")
        );
        assert_eq!(desk.accept(sale("bob", "Dime", None)), Decision::Print);
    }

    #[test]
    fn test_paused_logs_only() {
        let mut desk = Desk::default();
        desk.settings.printing_enabled = false;
        assert_eq!(desk.accept(sale("ann", "Coin", None)), Decision::Logged);
        assert_eq!(desk.history().len(), 1);
    }

    #[test]
    fn test_history_is_capped() {
        let mut desk = Desk::default();
        for i in 0..HISTORY_LIMIT + 5 {
            desk.record(sale(&format!("buyer{}", i), "Coin", None));
        }
        assert_eq!(desk.history().len(), HISTORY_LIMIT);
        assert_eq!(desk.history().front().unwrap().name, "buyer5");
    }

    #[test]
    fn test_search() {
        let mut desk = Desk::default();
        desk.record(sale("Ann", "Gold Eagle", None));
        desk.record(sale("Bob", "Silver Dime", None));
        desk.record(sale("Goldie", "Penny", None));

        let names: Vec<String> = desk.search("GOLD").into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["Ann", "Goldie"]);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("label-desk-{}.json", std::process::id()));
        let mut desk = Desk::default();
        desk.settings.print_giveaways = false;
        desk.record(sale("Ann", "Gold Eagle", Some("$25")));

        fs::write(&path, serde_json::to_string_pretty(&desk).unwrap()).unwrap();
        assert_eq!(Desk::load(Some(&path)), desk);

        fs::write(&path, "{ not json").unwrap();
        let fresh = Desk::load(Some(&path));
        assert_eq!(fresh.settings, Settings::default());
        assert_eq!(fresh.current_show.as_deref(), Some(DEFAULT_SHOW));
        assert!(fresh.history().is_empty());

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_show_lifecycle() {
        let mut desk = Desk::default();
        desk.record(sale("Ann", "Gold Eagle", None));

        assert_eq!(desk.create_show("  "), Err("Show name required"));
        let id = desk.create_show("Friday Night Coins!").unwrap();
        assert_eq!(id, "friday-night-coins-");
        assert_eq!(desk.current_show.as_deref(), Some(DEFAULT_SHOW));

        desk.switch_show(&id).unwrap();
        assert!(desk.history().is_empty());
        desk.record(sale("Bob", "Dime", None));
        assert_eq!(desk.history().len(), 1);

        assert_eq!(desk.end_show(), Ok(id.clone()));
        assert_eq!(desk.current_show, None);
        assert!(desk.shows[&id].ended.is_some());
        assert_eq!(desk.shows[&id].history.len(), 1);
        assert_eq!(desk.shows[DEFAULT_SHOW].history.len(), 1);

        assert_eq!(desk.switch_show("missing"), Err("Show not found"));
        assert_eq!(desk.delete_show(DEFAULT_SHOW), Err("Cannot delete default show"));
        desk.switch_show(&id).unwrap();
        desk.delete_show(&id).unwrap();
        assert_eq!(desk.current_show, None);
        assert_eq!(desk.delete_show(&id), Err("Show not found"));
    }

    #[test]
    fn test_default_show_cannot_end() {
        let mut desk = Desk::default();
        assert_eq!(desk.end_show(), Err("No active show to end"));
        assert_eq!(desk.current_show.as_deref(), Some(DEFAULT_SHOW));
    }

    #[test]
    fn test_no_active_show_records_nothing() {
        let mut desk = Desk::default();
        desk.accept(sale("Ann", "Gold Eagle", None));
        desk.current_show = None;

        assert_eq!(desk.accept(sale("Bob", "Dime", None)), Decision::NoActiveShow);
        assert!(desk.history().is_empty());
        assert!(desk.search("dime").is_empty());
        assert_eq!(desk.shows[DEFAULT_SHOW].history.len(), 1);
    }

    #[tokio::test]
    async fn test_persist_writes_latest_snapshot() {
        let path = std::env::temp_dir().join(format!("label-persist-{}.json", std::process::id()));
        let config = ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            label: LabelConfig::m221(),
            state_path: Some(path.clone()),
        };
        let state = AppState::with_connector(config, device_connector("/nonexistent".into()));

        let mut desk = Desk::default();
        let older = state.snapshot(&desk);
        desk.settings.printing_enabled = false;
        let newer = state.snapshot(&desk);

        state.persist(newer).await;
        state.persist(older).await;
        assert_eq!(Desk::load(Some(&path)), desk);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_heartbeat_marks_extension_active() {
        let config = ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            label: LabelConfig::m221(),
            state_path: None,
        };
        let state = AppState::with_connector(config, device_connector("/nonexistent".into()));
        assert!(!state.extension_active());
        assert!(state.snapshot(&Desk::default()).is_none());

        let at = state.heartbeat();
        assert_eq!(state.last_heartbeat(), Some(at));
        assert!(state.extension_active());
    }

    #[test]
    fn test_win_json_shape() {
        let win = sale("Ann", "Coin", Some("$5"));
        let json = serde_json::to_value(&win).unwrap();
        assert_eq!(json["type"], "sale");
        assert_eq!(json["price"], "$5");
    }
}
