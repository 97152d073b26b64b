//! [`Storage`]: backend selection, connection management, and schema
//! bookkeeping for one process.
//!
//! All process-wide state lives here rather than in globals, so tests can
//! build as many independent instances as they like and [`Storage::reset`]
//! returns one to its initial state.

use std::{
  path::PathBuf,
  sync::{
    Arc, OnceLock,
    atomic::{AtomicU8, AtomicUsize, Ordering},
  },
  time::{Duration, Instant},
};

use sofimar_core::{BackendKind, backend::Health};
use tokio::sync::{Mutex, OnceCell};

use crate::{
  Connection, Error, Result,
  embedded::EmbeddedConnection,
  networked::NetworkedConnection,
  schema::ensure_schema,
  selector::{Selection, select_backend},
};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StorageConfig {
  /// SQLite file used by the embedded backend and by fallback.
  pub embedded_path:   PathBuf,
  /// Upper bound on establishing a networked connection.
  pub connect_timeout: Duration,
}

impl StorageConfig {
  pub fn new(embedded_path: impl Into<PathBuf>) -> Self {
    Self { embedded_path: embedded_path.into(), connect_timeout: DEFAULT_CONNECT_TIMEOUT }
  }

  /// On serverless hosts (`VERCEL` set) only `/tmp` is writable.
  pub fn default_embedded_path(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if lookup("VERCEL").is_some() {
      PathBuf::from("/tmp/site.db")
    } else {
      PathBuf::from("site.db")
    }
  }
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self::new(Self::default_embedded_path(|name| std::env::var(name).ok()))
  }
}

// ─── State ───────────────────────────────────────────────────────────────────

/// Lifecycle of a [`Storage`]. Only moves forward until [`Storage::reset`].
/// Calls served by fallback do not advance it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StorageState {
  Unconfigured,
  BackendSelected,
  SchemaEnsured,
  Ready,
}

impl StorageState {
  fn from_u8(v: u8) -> Self {
    match v {
      0 => StorageState::Unconfigured,
      1 => StorageState::BackendSelected,
      2 => StorageState::SchemaEnsured,
      _ => StorageState::Ready,
    }
  }
}

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

// ─── Storage ─────────────────────────────────────────────────────────────────

pub struct Storage {
  config:           StorageConfig,
  lookup:           Lookup,
  selection:        OnceLock<Selection>,
  shared:           Mutex<Option<Arc<NetworkedConnection>>>,
  /// Held while a connect is in flight; records when the last one failed.
  connecting:       Mutex<Option<Instant>>,
  embedded_schema:  OnceCell<()>,
  networked_schema: OnceCell<()>,
  state:            AtomicU8,
  migrations:       AtomicUsize,
}

impl Storage {
  /// Storage reading backend variables from the process environment.
  pub fn new(config: StorageConfig) -> Self {
    Self::with_lookup(config, |name| std::env::var(name).ok())
  }

  /// Storage reading backend variables through `lookup`.
  pub fn with_lookup(
    config: StorageConfig,
    lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
  ) -> Self {
    Self {
      config,
      lookup: Arc::new(lookup),
      selection: OnceLock::new(),
      shared: Mutex::new(None),
      connecting: Mutex::new(None),
      embedded_schema: OnceCell::new(),
      networked_schema: OnceCell::new(),
      state: AtomicU8::new(StorageState::Unconfigured as u8),
      migrations: AtomicUsize::new(0),
    }
  }

  pub fn config(&self) -> &StorageConfig { &self.config }

  /// The backend choice, made on first call and cached.
  pub fn selection(&self) -> &Selection {
    self.selection.get_or_init(|| {
      let selection = select_backend(|name| (self.lookup)(name));
      match selection.source {
        Some(source) => tracing::info!(backend = %selection.kind, source, "backend selected"),
        None => tracing::info!(
          backend = %selection.kind,
          path = %self.config.embedded_path.display(),
          "backend selected"
        ),
      }
      self.advance(StorageState::BackendSelected);
      selection.clone()
    })
  }

  pub fn state(&self) -> StorageState {
    StorageState::from_u8(self.state.load(Ordering::Acquire))
  }

  /// Number of completed schema migration runs.
  pub fn migration_count(&self) -> usize { self.migrations.load(Ordering::Acquire) }

  fn advance(&self, to: StorageState) {
    self.state.fetch_max(to as u8, Ordering::AcqRel);
  }

  /// Forget the backend choice, the shared connection, and schema flags.
  pub fn reset(&mut self) {
    self.selection.take();
    self.shared.get_mut().take();
    self.connecting.get_mut().take();
    self.embedded_schema.take();
    self.networked_schema.take();
    *self.state.get_mut() = StorageState::Unconfigured as u8;
    *self.migrations.get_mut() = 0;
  }

  // ── Connections ───────────────────────────────────────────────────────

  /// Hand out a connection to the selected backend, falling back to the
  /// embedded database for this call if the networked one is unreachable.
  /// The schema is ensured on first use of each backend.
  pub async fn acquire(&self) -> Result<Connection> {
    let selection = self.selection();

    let conn = match (selection.kind, selection.url.as_deref()) {
      (BackendKind::Networked, Some(url)) => match self.shared_networked(url).await {
        Ok(client) => Connection::networked(client),
        Err(networked) => {
          tracing::warn!(
            error = %networked,
            "networked backend unavailable; using embedded for this call"
          );
          let embedded = self.open_embedded().await.map_err(|embedded| {
            Error::Connection(format!("networked: {networked}; embedded: {embedded}"))
          })?;
          Connection::embedded(embedded, true)
        }
      },
      _ => Connection::embedded(self.open_embedded().await?, false),
    };

    let ensured = self.ensure_schema_once(&conn).await;
    if ensured && !conn.is_fallback() {
      self.advance(StorageState::SchemaEnsured);
      self.advance(StorageState::Ready);
    }
    Ok(conn)
  }

  /// Return a connection. Embedded connections are closed; the shared
  /// networked connection stays open for reuse.
  pub async fn release(&self, conn: Connection) {
    if let Err(e) = conn.close().await {
      tracing::warn!(error = %e, "failed to close embedded connection");
    }
  }

  /// Acquire a connection and run a trivial query.
  pub async fn health(&self) -> Health {
    let configured = self.selection().kind;
    let conn = match self.acquire().await {
      Ok(conn) => conn,
      Err(e) => {
        return Health {
          configured,
          active: None,
          fallback: false,
          connected: false,
          error: Some(e.to_string()),
        };
      }
    };

    let probe = conn.fetch("SELECT 1 AS ok", Vec::new()).await;
    let health = Health {
      configured,
      active: Some(conn.kind()),
      fallback: conn.is_fallback(),
      connected: probe.is_ok(),
      error: probe.err().map(|e| e.to_string()),
    };
    self.release(conn).await;
    health
  }

  async fn open_embedded(&self) -> Result<EmbeddedConnection> {
    EmbeddedConnection::open(&self.config.embedded_path).await
  }

  /// Reuse the cached client if it still answers, otherwise open a new one.
  ///
  /// No lock is held across network I/O other than the connect itself, and
  /// callers that find a connect in flight wait for it at most
  /// `connect_timeout`. After a failed connect, attempts within the same
  /// window fail at once so queued callers fall back instead of retrying in
  /// series.
  async fn shared_networked(&self, url: &str) -> Result<Arc<NetworkedConnection>> {
    let timeout = self.config.connect_timeout;

    if let Some(client) = self.cached_networked().await {
      match client.ping(timeout).await {
        Ok(()) => return Ok(client),
        Err(e) => {
          tracing::info!(error = %e, "discarding dead networked connection");
          let mut shared = self.shared.lock().await;
          if shared.as_ref().is_some_and(|cached| Arc::ptr_eq(cached, &client)) {
            *shared = None;
          }
        }
      }
    }

    let mut last_failure = tokio::time::timeout(timeout, self.connecting.lock())
      .await
      .map_err(|_| Error::Connection("another connect attempt is still in flight".to_owned()))?;

    // Whoever held the gate may have connected already.
    if let Some(client) = self.cached_networked().await {
      return Ok(client);
    }
    if let Some(at) = *last_failure
      && at.elapsed() < timeout
    {
      return Err(Error::Connection(format!(
        "connect failed {:?} ago; not retrying yet",
        at.elapsed()
      )));
    }

    match NetworkedConnection::connect(url, timeout).await {
      Ok(client) => {
        let client = Arc::new(client);
        tracing::debug!("networked connection established");
        *self.shared.lock().await = Some(client.clone());
        *last_failure = None;
        Ok(client)
      }
      Err(e) => {
        *last_failure = Some(Instant::now());
        Err(e)
      }
    }
  }

  async fn cached_networked(&self) -> Option<Arc<NetworkedConnection>> {
    self.shared.lock().await.clone()
  }

  /// Run the migrator once per backend. Failures are logged and retried on
  /// the next acquire; the current call proceeds regardless.
  async fn ensure_schema_once(&self, conn: &Connection) -> bool {
    let cell = match conn.kind() {
      BackendKind::Embedded => &self.embedded_schema,
      BackendKind::Networked => &self.networked_schema,
    };

    let result = cell
      .get_or_try_init(|| async {
        let report = ensure_schema(conn).await?;
        self.migrations.fetch_add(1, Ordering::AcqRel);
        tracing::info!(
          backend = %conn.kind(),
          tables = report.tables,
          columns_added = report.columns_added,
          indexes = report.indexes,
          "schema ready"
        );
        Ok::<_, Error>(())
      })
      .await;

    match result {
      Ok(_) => true,
      Err(e) => {
        tracing::error!(backend = %conn.kind(), error = %e, "schema migration failed");
        false
      }
    }
  }
}
