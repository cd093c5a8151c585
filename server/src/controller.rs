use crate::ai::{MovieOracle, MovieResult};
use crate::cache::MovieCache;
use crate::query_key::QueryKey;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Surface the controller renders into: a loading indicator and one result
/// area.
pub trait FormView {
    fn set_loading(&mut self, visible: bool);
    fn show(&mut self, panel: Panel);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Cache,
    Fresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageReason {
    MissingDate,
    FutureDate,
    InFlight,
    LookupFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Panel {
    Movie {
        source: ResultSource,
        key: String,
        movie: MovieResult,
    },
    Message {
        reason: MessageReason,
        text: String,
    },
}

/// User-facing strings.
#[derive(Debug, Clone)]
pub struct Messages {
    pub missing_date: String,
    pub future_date: String,
    pub in_flight: String,
    pub lookup_failed: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            missing_date: "Por favor, selecciona una fecha.".to_string(),
            future_date: "Por favor, selecciona una fecha en el pasado.".to_string(),
            in_flight: "Ya estamos buscando la película de ese mes, espera un momento.".to_string(),
            lookup_failed: "No se pudo obtener la película. Inténtalo de nuevo más tarde."
                .to_string(),
        }
    }
}

impl Messages {
    fn panel(&self, reason: MessageReason) -> Panel {
        let text = match reason {
            MessageReason::MissingDate => &self.missing_date,
            MessageReason::FutureDate => &self.future_date,
            MessageReason::InFlight => &self.in_flight,
            MessageReason::LookupFailed => &self.lookup_failed,
        };
        Panel::Message {
            reason,
            text: text.clone(),
        }
    }
}

pub struct FormController {
    cache: Arc<dyn MovieCache>,
    oracle: Arc<dyn MovieOracle>,
    clock: Arc<dyn Clock>,
    messages: Messages,
    in_flight: Mutex<HashSet<String>>,
}

/// Removes its key from the in-flight set when dropped, including when the
/// submitting task is cancelled mid-request.
struct InFlightGuard<'a> {
    keys: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.key);
    }
}

impl FormController {
    pub fn new(
        cache: Arc<dyn MovieCache>,
        oracle: Arc<dyn MovieOracle>,
        clock: Arc<dyn Clock>,
        messages: Messages,
    ) -> Self {
        Self {
            cache,
            oracle,
            clock,
            messages,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Handles one form submission. Every path ends with the loading
    /// indicator hidden and exactly one panel shown.
    pub async fn submit<V>(&self, raw_date: Option<&str>, view: &mut V)
    where
        V: FormView + Send,
    {
        let panel = self.resolve(raw_date, view).await;
        view.set_loading(false);
        view.show(panel);
    }

    async fn resolve<V>(&self, raw_date: Option<&str>, view: &mut V) -> Panel
    where
        V: FormView + Send,
    {
        let Some(date) = parse_birthdate(raw_date) else {
            return self.messages.panel(MessageReason::MissingDate);
        };
        if date > self.clock.today() {
            return self.messages.panel(MessageReason::FutureDate);
        }

        let key = QueryKey::from_birthdate(date);

        if let Some(panel) = self.cached_panel(&key).await {
            return panel;
        }

        let Some(_guard) = self.claim(&key) else {
            tracing::info!(key = %key, "Lookup already in flight");
            return self.messages.panel(MessageReason::InFlight);
        };

        // A lookup for this key may have finished between the read above
        // and the claim.
        if let Some(panel) = self.cached_panel(&key).await {
            return panel;
        }

        view.set_loading(true);

        match self.oracle.find_movie(&key).await {
            Ok(movie) => {
                if let Err(e) = self.cache.put(&key, &movie).await {
                    tracing::error!(key = %key, "Failed to store movie result: {}", e);
                }
                tracing::info!(key = %key, title = %movie.title, "Movie lookup succeeded");
                Panel::Movie {
                    source: ResultSource::Fresh,
                    key: key.as_cache_key(),
                    movie,
                }
            }
            Err(e) => {
                tracing::error!(key = %key, kind = e.kind(), "Movie lookup failed: {}", e);
                self.messages.panel(MessageReason::LookupFailed)
            }
        }
    }

    async fn cached_panel(&self, key: &QueryKey) -> Option<Panel> {
        match self.cache.get(key).await {
            Ok(Some(movie)) => {
                tracing::debug!(key = %key, "Movie cache hit");
                Some(Panel::Movie {
                    source: ResultSource::Cache,
                    key: key.as_cache_key(),
                    movie,
                })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, "Movie cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    fn claim(&self, key: &QueryKey) -> Option<InFlightGuard<'_>> {
        let key = key.as_cache_key();
        let mut keys = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            keys: &self.in_flight,
            key,
        })
    }
}

/// Accepts the `YYYY-MM-DD` value a date input submits. Blank and
/// unparseable input both count as no date.
pub fn parse_birthdate(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// View that records what was rendered, for surfaces that serialize the
/// outcome instead of drawing it.
#[derive(Debug, Default)]
pub struct CapturedView {
    pub loading: bool,
    pub loading_shown: bool,
    pub panels: Vec<Panel>,
}

impl FormView for CapturedView {
    fn set_loading(&mut self, visible: bool) {
        self.loading = visible;
        self.loading_shown |= visible;
    }

    fn show(&mut self, panel: Panel) {
        self.panels.push(panel);
    }
}

impl CapturedView {
    pub fn into_panel(self) -> Option<Panel> {
        self.panels.into_iter().next()
    }
}
