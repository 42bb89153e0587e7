//! Linkbase Storage Layer
//!
//! Implements the `FragmentStore` and `RelationshipStore` traits using SQLite.
//!
//! # Architecture
//!
//! - Loader output (fragments, extended links, link members, arcs) is ingested
//!   through [`SqliteStore::load`]
//! - Networks are completed from those tables on demand
//! - Active relationships are persisted in a `relationships` table, one row
//!   per relationship key
//!
//! # Examples
//!
//! ```no_run
//! use linkbase_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready to ingest loader output
//! ```

#![warn(missing_docs)]

mod config;

pub use config::StoreConfig;

use linkbase_domain::{
    Analyser, AnalyserMode, Arc, ArcUse, DocumentRecord, ExtendedLink, Fragment, FragmentIndex,
    FragmentKind, FragmentStore, NetworkError, Networks, PersistedRelationship, RelationshipKey,
    RelationshipQuery, RelationshipStore, StoreSummary, Storer,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Network engine error
    #[error(transparent)]
    Network(#[from] NetworkError),
}

type FragmentRow = (String, String, Option<String>, Option<String>);

type ArcRow = (String, String, String, i32, String, String);

const FRAGMENT_COLUMNS: &str = "f.idx, f.kind, f.locator_target, f.name";

const RELATIONSHIP_COLUMNS: &str = "arc_idx, arc_role, link_idx, link_role, source_idx, \
     target_idx, arc_order, priority, prohibited, semantic_key, root";

/// SQLite-based implementation of the fragment and relationship stores
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own SqliteStore instance.
pub struct SqliteStore {
    conn: Connection,
    config: StoreConfig,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open(&StoreConfig {
            path: path.as_ref().to_path_buf(),
            ..StoreConfig::default()
        })
    }

    /// Open the database described by the configuration
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(config.busy_timeout())?;
        let mut store = Self {
            conn,
            config: config.clone(),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Ingest loader output in one transaction
    ///
    /// Records with an index that is already present replace the stored row.
    /// Returns the number of records written.
    pub fn load<I>(&mut self, records: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = DocumentRecord>,
    {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        for record in records {
            match record {
                DocumentRecord::Fragment(fragment) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO fragments (idx, kind, locator_target, name)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            fragment.index.as_str(),
                            fragment.kind.as_str(),
                            fragment.kind.locator_target().map(FragmentIndex::as_str),
                            fragment.name,
                        ],
                    )?;
                }
                DocumentRecord::ExtendedLink(link) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO extended_links (idx, role) VALUES (?1, ?2)",
                        params![link.index.as_str(), link.role],
                    )?;
                }
                DocumentRecord::Member {
                    link,
                    label,
                    fragment,
                } => {
                    tx.execute(
                        "INSERT OR IGNORE INTO link_members (link_idx, label, fragment_idx)
                         VALUES (?1, ?2, ?3)",
                        params![link.as_str(), label, fragment.as_str()],
                    )?;
                }
                DocumentRecord::Arc { link, from, to, arc } => {
                    tx.execute(
                        "INSERT OR REPLACE INTO arcs
                         (idx, link_idx, arcrole, from_label, to_label, arc_order, priority, arc_use, semantic_key)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            arc.index().as_str(),
                            link.as_str(),
                            arc.arcrole(),
                            from,
                            to,
                            arc.order(),
                            arc.priority(),
                            arc.arc_use().as_str(),
                            arc.semantic_key(),
                        ],
                    )?;
                }
            }
            count += 1;
        }
        tx.commit()?;
        debug!(records = count, "Loaded document records");
        Ok(count)
    }

    /// Analyser reading this store, with the given filter
    pub fn analyser(&self, mode: AnalyserMode) -> Analyser<'_, Self, Self> {
        Analyser::new(self, self, mode)
    }

    /// Analyser using the configured filter
    pub fn default_analyser(&self) -> Analyser<'_, Self, Self> {
        self.analyser(self.config.analyser_mode)
    }

    /// Complete every network the loaded documents define and persist it
    ///
    /// `timeout` bounds the whole pass; `None` falls back to the configured
    /// completion timeout. The relationships table is only written once
    /// every network has completed.
    pub fn store_all_relationships(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<StoreSummary, StoreError> {
        let timeout = self.completion_limit(timeout);
        let started = Instant::now();
        let mut networks = Networks::new();
        for arc_role in FragmentStore::arc_roles(&*self)? {
            let remaining = match timeout {
                Some(limit) => Some(
                    limit
                        .checked_sub(started.elapsed())
                        .ok_or(NetworkError::TimedOut(limit))?,
                ),
                None => None,
            };
            networks.complete_arc_role(&*self, &arc_role, remaining)?;
        }

        let summary = Storer::new(self).store_networks(&networks)?;
        info!(
            networks = networks.size(),
            stored = summary.stored,
            removed = summary.removed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stored all relationships"
        );
        Ok(summary)
    }

    fn completion_limit(&self, timeout: Option<Duration>) -> Option<Duration> {
        timeout.or_else(|| self.config.completion_timeout())
    }

    fn fragment_from_row(row: FragmentRow) -> Result<Fragment, StoreError> {
        let (idx, kind, locator_target, name) = row;
        let kind = FragmentKind::from_parts(&kind, locator_target.map(FragmentIndex::new))?;
        let mut fragment = Fragment::new(idx, kind);
        fragment.name = name;
        Ok(fragment)
    }

    fn arc_from_row(row: ArcRow) -> Result<Arc, StoreError> {
        let (idx, arcrole, order, priority, arc_use, semantic_key) = row;
        let arc_use = ArcUse::parse(&arc_use)
            .ok_or_else(|| StoreError::InvalidData(format!("Unknown arc use: {}", arc_use)))?;
        Ok(Arc::new(idx, arcrole, semantic_key)
            .with_order(&order)?
            .with_priority(priority)
            .with_use(arc_use))
    }

    /// Fragments labelled by one end of an arc
    fn arc_endpoints(&self, arc: &Arc, label_column: &str) -> Result<Vec<Fragment>, StoreError> {
        let known: bool = self
            .conn
            .query_row(
                "SELECT 1 FROM arcs WHERE idx = ?1",
                params![arc.index().as_str()],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !known {
            return Err(StoreError::NotFound(format!("arc {}", arc.index())));
        }

        let sql = format!(
            "SELECT {FRAGMENT_COLUMNS}
             FROM arcs a
             JOIN link_members m ON m.link_idx = a.link_idx AND m.label = a.{label_column}
             JOIN fragments f ON f.idx = m.fragment_idx
             WHERE a.idx = ?1
             ORDER BY f.idx"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![arc.index().as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<Result<Vec<FragmentRow>, _>>()?;

        rows.into_iter().map(Self::fragment_from_row).collect()
    }

    fn strings(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let values = stmt
            .query_map(args, |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(values)
    }
}

impl FragmentStore for SqliteStore {
    type Error = StoreError;

    fn get_fragment(&self, index: &FragmentIndex) -> Result<Option<Fragment>, StoreError> {
        let sql = format!("SELECT {FRAGMENT_COLUMNS} FROM fragments f WHERE f.idx = ?1");
        let row: Option<FragmentRow> = self
            .conn
            .query_row(&sql, params![index.as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .optional()?;

        row.map(Self::fragment_from_row).transpose()
    }

    fn link_roles(&self) -> Result<Vec<String>, StoreError> {
        self.strings("SELECT DISTINCT role FROM extended_links ORDER BY role", params![])
    }

    fn arc_roles(&self) -> Result<Vec<String>, StoreError> {
        self.strings("SELECT DISTINCT arcrole FROM arcs ORDER BY arcrole", params![])
    }

    fn extended_links_with_role(&self, link_role: &str) -> Result<Vec<ExtendedLink>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT idx, role FROM extended_links WHERE role = ?1 ORDER BY idx")?;
        let links = stmt
            .query_map(params![link_role], |row| {
                Ok(ExtendedLink::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    fn arcs_by_arcrole(&self, link: &ExtendedLink, arc_role: &str) -> Result<Vec<Arc>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT idx, arcrole, arc_order, priority, arc_use, semantic_key
             FROM arcs WHERE link_idx = ?1 AND arcrole = ?2 ORDER BY idx",
        )?;
        let rows = stmt
            .query_map(params![link.index.as_str(), arc_role], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<Result<Vec<ArcRow>, _>>()?;

        rows.into_iter().map(Self::arc_from_row).collect()
    }

    fn arc_sources(&self, arc: &Arc) -> Result<Vec<Fragment>, StoreError> {
        self.arc_endpoints(arc, "from_label")
    }

    fn arc_targets(&self, arc: &Arc) -> Result<Vec<Fragment>, StoreError> {
        self.arc_endpoints(arc, "to_label")
    }
}

impl RelationshipStore for SqliteStore {
    type Error = StoreError;

    fn query_relationships(
        &self,
        query: &RelationshipQuery,
    ) -> Result<Vec<PersistedRelationship>, StoreError> {
        let mut sql = format!("SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(arc_role) = &query.arc_role {
            sql.push_str(" AND arc_role = ?");
            params.push(Box::new(arc_role.clone()));
        }

        if let Some(link_role) = &query.link_role {
            sql.push_str(" AND link_role = ?");
            params.push(Box::new(link_role.clone()));
        }

        if let Some(source) = &query.source_index {
            sql.push_str(" AND source_idx = ?");
            params.push(Box::new(source.as_str().to_string()));
        }

        if let Some(target) = &query.target_index {
            sql.push_str(" AND target_idx = ?");
            params.push(Box::new(target.as_str().to_string()));
        }

        if query.roots_only {
            sql.push_str(" AND root = 1");
        }

        if !query.include_prohibited {
            sql.push_str(" AND prohibited = 0");
        }

        sql.push_str(" ORDER BY arc_role, link_role, source_idx, target_idx, semantic_key");

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let records = stmt
            .query_map(&param_refs[..], |row| {
                Ok(PersistedRelationship {
                    arc_index: FragmentIndex::new(row.get::<_, String>(0)?),
                    arc_role: row.get(1)?,
                    link_index: FragmentIndex::new(row.get::<_, String>(2)?),
                    link_role: row.get(3)?,
                    source_index: FragmentIndex::new(row.get::<_, String>(4)?),
                    target_index: FragmentIndex::new(row.get::<_, String>(5)?),
                    order: row.get(6)?,
                    priority: row.get(7)?,
                    prohibited: row.get(8)?,
                    semantic_key: row.get(9)?,
                    root: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn persist_relationship(&mut self, record: &PersistedRelationship) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO relationships
             (arc_idx, arc_role, link_idx, link_role, source_idx, target_idx, arc_order, priority, prohibited, semantic_key, root)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(arc_role, link_role, semantic_key, source_idx, target_idx) DO UPDATE SET
             arc_idx = excluded.arc_idx, link_idx = excluded.link_idx, arc_order = excluded.arc_order,
             priority = excluded.priority, prohibited = excluded.prohibited, root = excluded.root",
            params![
                record.arc_index.as_str(),
                &record.arc_role,
                record.link_index.as_str(),
                &record.link_role,
                record.source_index.as_str(),
                record.target_index.as_str(),
                &record.order,
                record.priority,
                record.prohibited,
                &record.semantic_key,
                record.root,
            ],
        )?;

        Ok(())
    }

    fn delete_relationship(&mut self, key: &RelationshipKey) -> Result<bool, StoreError> {
        let deleted = self.conn.execute(
            "DELETE FROM relationships
             WHERE arc_role = ?1 AND link_role = ?2 AND semantic_key = ?3
             AND source_idx = ?4 AND target_idx = ?5",
            params![
                &key.arc_role,
                &key.link_role,
                &key.semantic_key,
                key.source_index.as_str(),
                key.target_index.as_str(),
            ],
        )?;
        Ok(deleted > 0)
    }

    fn persisted_arc_roles(&self) -> Result<Vec<String>, StoreError> {
        self.strings(
            "SELECT DISTINCT arc_role FROM relationships ORDER BY arc_role",
            params![],
        )
    }

    fn persisted_link_roles(&self, arc_role: &str) -> Result<Vec<String>, StoreError> {
        self.strings(
            "SELECT DISTINCT link_role FROM relationships WHERE arc_role = ?1 ORDER BY link_role",
            params![arc_role],
        )
    }
}
