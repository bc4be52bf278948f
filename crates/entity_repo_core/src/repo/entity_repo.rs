//! Generic entity repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide typed CRUD and batch operations for any `Entity`.
//! - Delegate connection and transaction handling to a `SessionProvider`.
//!
//! # Invariants
//! - Each public operation runs in exactly one session; batch operations are
//!   all-or-nothing.
//! - Filter/patch attributes are validated before any SQL is executed.
//! - Returned entities are re-read from storage after every write.
//! - List results are ordered by `id` ascending.

use crate::logging::sanitize_message;
use crate::model::entity::{select_sql, validate_declaration, Entity, EntityId, ID_COLUMN};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::log_fields::{entity_fields, kwarg_fields, SensitiveKeys};
use crate::repo::query::{Filter, Patch};
use crate::session::SessionProvider;
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::marker::PhantomData;
use std::time::Instant;

/// Highest parameter index SQLite accepts in one statement.
const MAX_BIND_VARIABLES: usize = 32_766;
const MAX_LOG_ERROR_CHARS: usize = 512;

/// Base CRUD operations for one entity type.
pub trait EntityRepository<E: Entity> {
    /// Inserts `entity` and returns it with `id` and stored values populated.
    fn create(&self, entity: E) -> RepoResult<E>;

    /// Inserts all entities in one session.
    fn create_batch(&self, entities: Vec<E>) -> RepoResult<Vec<E>>;

    /// Loads one entity by primary key.
    fn get(&self, id: EntityId) -> RepoResult<E>;

    /// Loads all entities matching `filter`.
    fn get_batch(&self, filter: &Filter) -> RepoResult<Vec<E>>;

    /// Alias of [`EntityRepository::get_batch`].
    fn find(&self, filter: &Filter) -> RepoResult<Vec<E>> {
        self.get_batch(filter)
    }

    /// Loads the first entity matching `filter`, if any.
    fn find_one(&self, filter: &Filter) -> RepoResult<Option<E>>;

    /// Applies `patch` to the stored row of `entity` and returns the result.
    fn update(&self, entity: &E, patch: &Patch) -> RepoResult<E>;

    /// Applies the same `patch` to every entity in one session.
    fn update_batch(&self, entities: &[E], patch: &Patch) -> RepoResult<Vec<E>>;

    /// Deletes the stored row of `entity` and hands the entity back.
    fn delete(&self, entity: E) -> RepoResult<E>;

    /// Deletes all entities in one session.
    fn delete_batch(&self, entities: Vec<E>) -> RepoResult<Vec<E>>;
}

/// SQLite-backed repository for entity type `E`.
pub struct SqliteRepository<E, P> {
    provider: P,
    sensitive: SensitiveKeys,
    select_sql: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, P: SessionProvider> SqliteRepository<E, P> {
    /// Builds a repository after checking the entity declaration.
    ///
    /// # Errors
    /// - `RepoError::InvalidEntity` when `E` cannot be mapped onto SQL.
    pub fn try_new(provider: P) -> RepoResult<Self> {
        validate_declaration::<E>()?;
        Ok(Self {
            provider,
            sensitive: SensitiveKeys::default(),
            select_sql: select_sql::<E>(),
            _entity: PhantomData,
        })
    }

    /// Withholds the values of these attributes from every log line.
    pub fn with_sensitive_attributes<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sensitive = SensitiveKeys::new(keys);
        self
    }

    pub fn sensitive_attributes(&self) -> &SensitiveKeys {
        &self.sensitive
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn fetch_by_id(&self, conn: &Connection, id: EntityId) -> RepoResult<Option<E>> {
        let mut stmt = conn.prepare(&format!("{} WHERE {ID_COLUMN} = ?1", self.select_sql))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(E::from_row(row)?));
        }

        Ok(None)
    }

    fn fetch_existing(&self, conn: &Connection, id: EntityId) -> RepoResult<E> {
        self.fetch_by_id(conn, id)?
            .ok_or(RepoError::NotFound { entity: E::NAME, id })
    }

    /// Oversized `IN` lists are queried in parts within the same session;
    /// the merged result keeps the ascending id order and the limit.
    fn fetch_matching(&self, conn: &Connection, filter: &Filter, limit: Option<u32>) -> RepoResult<Vec<E>> {
        let parts = filter.split_for_binds(MAX_BIND_VARIABLES);
        if let [single] = parts.as_slice() {
            return self.fetch_part(conn, single, limit);
        }

        let mut entities: Vec<E> = Vec::new();
        for part in &parts {
            entities.extend(self.fetch_part(conn, part, limit)?);
        }
        entities.sort_by_key(|entity| entity.id());
        entities.dedup_by_key(|entity| entity.id());
        if let Some(limit) = limit {
            entities.truncate(limit as usize);
        }
        Ok(entities)
    }

    fn fetch_part(&self, conn: &Connection, filter: &Filter, limit: Option<u32>) -> RepoResult<Vec<E>> {
        let (where_clause, bind_values) = filter.to_where_clause();
        let mut sql = format!("{}{where_clause} ORDER BY {ID_COLUMN} ASC", self.select_sql);
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }
        Ok(entities)
    }

    fn insert_one(&self, conn: &Connection, entity: &E) -> RepoResult<E> {
        let mut columns = Vec::with_capacity(E::COLUMNS.len() + 1);
        let mut bind_values = Vec::with_capacity(E::COLUMNS.len() + 1);
        if let Some(id) = entity.id() {
            columns.push(ID_COLUMN);
            bind_values.push(Value::Integer(id));
        }
        for (column, value) in entity.values() {
            if !E::COLUMNS.contains(&column) {
                return Err(RepoError::UnknownAttribute {
                    entity: E::NAME,
                    attribute: column.to_string(),
                });
            }
            columns.push(column);
            bind_values.push(value);
        }

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", E::TABLE)
        } else {
            let placeholders = (1..=bind_values.len())
                .map(|index| format!("?{index}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({placeholders})",
                E::TABLE,
                columns.join(", ")
            )
        };
        conn.execute(&sql, params_from_iter(bind_values))?;

        let id = entity.id().unwrap_or_else(|| conn.last_insert_rowid());
        self.fetch_by_id(conn, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("{} row {id} vanished right after insert", E::NAME))
        })
    }

    fn update_one(&self, conn: &Connection, id: EntityId, patch: &Patch) -> RepoResult<E> {
        self.fetch_existing(conn, id)?;
        if !patch.is_empty() {
            let (set_clause, mut bind_values) = patch.to_set_clause();
            bind_values.push(Value::Integer(id));
            let sql = format!(
                "UPDATE {} SET {set_clause} WHERE {ID_COLUMN} = ?{}",
                E::TABLE,
                bind_values.len()
            );
            conn.execute(&sql, params_from_iter(bind_values))?;
        }
        self.fetch_existing(conn, id)
    }

    fn delete_one(&self, conn: &Connection, entity: &E) -> RepoResult<()> {
        let id = entity.id().ok_or(RepoError::MissingId { entity: E::NAME })?;
        let changed = conn.execute(
            &format!("DELETE FROM {} WHERE {ID_COLUMN} = ?1", E::TABLE),
            params![id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: E::NAME, id });
        }
        Ok(())
    }

    fn log_start(&self, event: &str, fields: &str) {
        info!(
            "event={event} module=repo status=start entity={}{fields}",
            E::NAME
        );
    }

    fn log_outcome<T>(&self, event: &str, started_at: Instant, result: &RepoResult<T>) {
        match result {
            Ok(_) => info!(
                "event={event} module=repo status=ok entity={} duration_ms={}",
                E::NAME,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event={event} module=repo status=error entity={} duration_ms={} error_code={} error={}",
                E::NAME,
                started_at.elapsed().as_millis(),
                err.code(),
                sanitize_message(&err.to_string(), MAX_LOG_ERROR_CHARS)
            ),
        }
    }

    fn log_each(&self, event: &str, entities: &[E]) {
        for entity in entities {
            debug!(
                "event={event} module=repo status=item entity={}{}",
                E::NAME,
                entity_fields(entity, &self.sensitive)
            );
        }
    }
}

impl<E: Entity, P: SessionProvider> EntityRepository<E> for SqliteRepository<E, P> {
    fn create(&self, entity: E) -> RepoResult<E> {
        let started_at = Instant::now();
        self.log_start("entity_create", &entity_fields(&entity, &self.sensitive));

        let result = self
            .provider
            .with_session(|conn| self.insert_one(conn, &entity))
            .map_err(|err| RepoError::could_not_create(E::NAME, err));

        self.log_outcome("entity_create", started_at, &result);
        result
    }

    fn create_batch(&self, entities: Vec<E>) -> RepoResult<Vec<E>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let started_at = Instant::now();
        self.log_start("entity_create_batch", &format!(" count={}", entities.len()));
        self.log_each("entity_create_batch", &entities);

        let result = self
            .provider
            .with_session(|conn| {
                entities
                    .iter()
                    .map(|entity| self.insert_one(conn, entity))
                    .collect::<RepoResult<Vec<_>>>()
            })
            .map_err(|err| RepoError::could_not_create(E::NAME, err));

        self.log_outcome("entity_create_batch", started_at, &result);
        result
    }

    fn get(&self, id: EntityId) -> RepoResult<E> {
        let started_at = Instant::now();
        self.log_start(
            "entity_get",
            &kwarg_fields(&Filter::by_id(id).log_pairs(), &self.sensitive),
        );

        let result = self
            .provider
            .with_session(|conn| self.fetch_existing(conn, id));

        self.log_outcome("entity_get", started_at, &result);
        result
    }

    fn get_batch(&self, filter: &Filter) -> RepoResult<Vec<E>> {
        let started_at = Instant::now();
        self.log_start(
            "entity_get_batch",
            &kwarg_fields(&filter.log_pairs(), &self.sensitive),
        );

        let result = filter.validate::<E>().and_then(|()| {
            self.provider
                .with_session(|conn| self.fetch_matching(conn, filter, None))
        });

        self.log_outcome("entity_get_batch", started_at, &result);
        result
    }

    fn find_one(&self, filter: &Filter) -> RepoResult<Option<E>> {
        let started_at = Instant::now();
        self.log_start(
            "entity_find_one",
            &kwarg_fields(&filter.log_pairs(), &self.sensitive),
        );

        let result = filter.validate::<E>().and_then(|()| {
            self.provider.with_session(|conn| {
                Ok(self.fetch_matching(conn, filter, Some(1))?.into_iter().next())
            })
        });

        self.log_outcome("entity_find_one", started_at, &result);
        result
    }

    fn update(&self, entity: &E, patch: &Patch) -> RepoResult<E> {
        let started_at = Instant::now();
        self.log_start(
            "entity_update",
            &format!(
                "{}{}",
                entity_fields(entity, &self.sensitive),
                kwarg_fields(&patch.log_pairs(), &self.sensitive)
            ),
        );

        let result = patch.validate::<E>().and_then(|()| {
            let id = entity.id().ok_or(RepoError::MissingId { entity: E::NAME })?;
            self.provider
                .with_session(|conn| self.update_one(conn, id, patch))
        });

        self.log_outcome("entity_update", started_at, &result);
        result
    }

    fn update_batch(&self, entities: &[E], patch: &Patch) -> RepoResult<Vec<E>> {
        let started_at = Instant::now();
        self.log_start(
            "entity_update_batch",
            &format!(
                " count={}{}",
                entities.len(),
                kwarg_fields(&patch.log_pairs(), &self.sensitive)
            ),
        );
        self.log_each("entity_update_batch", entities);

        let result = patch.validate::<E>().and_then(|()| {
            let ids = entities
                .iter()
                .map(|entity| entity.id().ok_or(RepoError::MissingId { entity: E::NAME }))
                .collect::<RepoResult<Vec<_>>>()?;
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            self.provider.with_session(|conn| {
                ids.iter()
                    .map(|id| self.update_one(conn, *id, patch))
                    .collect::<RepoResult<Vec<_>>>()
            })
        });

        self.log_outcome("entity_update_batch", started_at, &result);
        result
    }

    fn delete(&self, entity: E) -> RepoResult<E> {
        let started_at = Instant::now();
        self.log_start("entity_delete", &entity_fields(&entity, &self.sensitive));

        let result = self
            .provider
            .with_session(|conn| self.delete_one(conn, &entity))
            .map(|()| entity)
            .map_err(|err| RepoError::could_not_delete(E::NAME, err));

        self.log_outcome("entity_delete", started_at, &result);
        result
    }

    fn delete_batch(&self, entities: Vec<E>) -> RepoResult<Vec<E>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let started_at = Instant::now();
        self.log_start("entity_delete_batch", &format!(" count={}", entities.len()));
        self.log_each("entity_delete_batch", &entities);

        let result = self
            .provider
            .with_session(|conn| {
                for entity in &entities {
                    self.delete_one(conn, entity)?;
                }
                Ok(())
            })
            .map(|()| entities)
            .map_err(|err| RepoError::could_not_delete(E::NAME, err));

        self.log_outcome("entity_delete_batch", started_at, &result);
        result
    }
}
