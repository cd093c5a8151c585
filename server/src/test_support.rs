//! Fakes shared by the unit tests.

use crate::ai::{AiError, MovieOracle, MovieResult};
use crate::cache::{CacheError, MovieCache};
use crate::controller::Clock;
use crate::query_key::QueryKey;
use async_trait::async_trait;
use axum::Router;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

pub fn sample_movie() -> MovieResult {
    MovieResult {
        title: "Perfect Days".to_string(),
        description: "Un conserje de Tokio encuentra belleza en la rutina.".to_string(),
        alternatives: vec!["Past Lives".to_string(), "Anatomía de una caída".to_string()],
    }
}

pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Cache whose operations complete without yielding, so tests can reason
/// about interleavings.
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<String, MovieResult>>,
    writes: Mutex<Vec<(String, MovieResult)>>,
    reads: AtomicUsize,
    hidden_reads: AtomicUsize,
    failing_reads: AtomicBool,
}

impl RecordingCache {
    pub fn seed(&self, key: &str, movie: MovieResult) {
        self.entries.lock().unwrap().insert(key.to_string(), movie);
    }

    /// The next `count` reads miss even when the entry exists.
    pub fn hide_next_reads(&self, count: usize) {
        self.hidden_reads.store(count, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        self.failing_reads.store(true, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<(String, MovieResult)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl MovieCache for RecordingCache {
    async fn get(&self, key: &QueryKey) -> Result<Option<MovieResult>, CacheError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads.load(Ordering::SeqCst) {
            let err = serde_json::from_str::<MovieResult>("{").unwrap_err();
            return Err(CacheError::Corrupt(err));
        }
        let hidden = self
            .hidden_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if hidden {
            return Ok(None);
        }
        Ok(self.entries.lock().unwrap().get(&key.as_cache_key()).cloned())
    }

    async fn put(&self, key: &QueryKey, movie: &MovieResult) -> Result<(), CacheError> {
        let key = key.as_cache_key();
        self.entries
            .lock()
            .unwrap()
            .insert(key.clone(), movie.clone());
        self.writes.lock().unwrap().push((key, movie.clone()));
        Ok(())
    }
}

pub struct ScriptedOracle {
    movie: Option<MovieResult>,
    failure: Mutex<Option<AiError>>,
    gate: Option<Notify>,
    last_key: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn succeeding(movie: MovieResult) -> Self {
        Self {
            movie: Some(movie),
            failure: Mutex::new(None),
            gate: None,
            last_key: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: AiError) -> Self {
        Self {
            movie: None,
            failure: Mutex::new(Some(error)),
            gate: None,
            last_key: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Lookups wait for `release` before answering.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn last_key(&self) -> Option<String> {
        self.last_key.lock().unwrap().clone()
    }
}

#[async_trait]
impl MovieOracle for ScriptedOracle {
    async fn find_movie(&self, key: &QueryKey) -> Result<MovieResult, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_key.lock().unwrap() = Some(key.as_cache_key());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match &self.movie {
            Some(movie) => Ok(movie.clone()),
            None => Err(self
                .failure
                .lock()
                .unwrap()
                .take()
                .unwrap_or(AiError::EmptyResponse)),
        }
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL of a local port with nothing listening on it.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
