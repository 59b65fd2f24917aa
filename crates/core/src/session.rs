use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dialect::Dialect;
use crate::fk_checker::{check_dependencies, dependency_rows_sql, referenced_values, DependencyCount};
use crate::mutation::{
    generate_batch_delete, generate_delete, generate_update, MutationError, MutationIntent,
    MutationTarget,
};
use crate::query_runner::{QueryBackend, QueryRunner, QueryRunnerError};
use crate::query_target::{has_join, resolve_target};
use crate::result_filter::{clamp_cursor, move_cursor, FilteredList};
use crate::results::{is_null, QueryResult};
use crate::schema::{self, ColumnInfo};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("query text is empty")]
    EmptyQuery,
    #[error("no rows to act on")]
    NoResults,
    #[error("no row selected")]
    NoRowSelected,
    #[error("nothing selected")]
    NothingSelected,
    #[error("could not determine which table this query reads from")]
    NoTargetTable,
    #[error("query reads from more than one table; edit and delete need a single-table query")]
    JoinedQuery,
    #[error("table `{0}` has no primary key")]
    MissingPrimaryKey(String),
    #[error("selected rows have no values referenced by `{0}`")]
    NoReferencedValues(String),
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error(transparent)]
    Backend(#[from] QueryRunnerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Databases,
    Tables,
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    /// Index into the unfiltered rows.
    pub row: usize,
    pub column: usize,
    pub original: String,
    pub buffer: String,
    /// Set by [`Session::set_field_null`]; typing clears it again.
    pub null: bool,
}

impl FieldEdit {
    /// `None` when the field is to become SQL NULL.
    #[must_use]
    pub fn new_value(&self) -> Option<&str> {
        (!self.null).then_some(self.buffer.as_str())
    }

    fn is_unchanged(&self) -> bool {
        match self.new_value() {
            Some(text) => text == self.original,
            None => is_null(&self.original),
        }
    }
}

/// A generated DELETE plus the advisory foreign-key review shown before it
/// runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub intent: MutationIntent,
    pub dependencies: Vec<DependencyCount>,
    pub cursor: usize,
    rows: Vec<Vec<String>>,
}

impl PendingDelete {
    #[must_use]
    pub fn selected_dependency(&self) -> Option<&DependencyCount> {
        self.dependencies.get(self.cursor)
    }

    #[must_use]
    pub fn has_references(&self) -> bool {
        self.dependencies
            .iter()
            .any(|dependency| dependency.count > 0)
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.dependencies.len();
        if len == 0 {
            return;
        }
        let step = delta.unsigned_abs() % len;
        self.cursor = if delta >= 0 {
            (self.cursor + step) % len
        } else {
            (self.cursor + len - step) % len
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOrigin {
    Results,
    TableList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaView {
    pub table: String,
    pub columns: FilteredList<ColumnInfo>,
    pub origin: SchemaOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    AwaitingQuery,
    Executed,
    FieldEditing(FieldEdit),
    ConfirmUpdate(MutationIntent),
    ConfirmDelete(PendingDelete),
    SchemaInspection(SchemaView),
}

impl SessionState {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::AwaitingQuery => "awaiting a query",
            Self::Executed => "viewing results",
            Self::FieldEditing(_) => "editing a field",
            Self::ConfirmUpdate(_) => "confirming an update",
            Self::ConfirmDelete(_) => "confirming a delete",
            Self::SchemaInspection(_) => "inspecting a schema",
        }
    }

    #[must_use]
    pub fn pending_mutation(&self) -> Option<&MutationIntent> {
        match self {
            Self::ConfirmUpdate(intent) => Some(intent),
            Self::ConfirmDelete(pending) => Some(&pending.intent),
            _ => None,
        }
    }
}

/// Which table the current result set maps to, worked out once per query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub target_table: Option<String>,
    pub primary_key: Vec<String>,
    pub joined: bool,
}

#[derive(Debug)]
pub struct Session<B: QueryBackend> {
    runner: QueryRunner<B>,
    screen: Screen,
    state: SessionState,
    databases: FilteredList<String>,
    tables: FilteredList<String>,
    query: String,
    columns: Vec<String>,
    rows: FilteredList<Vec<String>>,
    field_cursor: usize,
    resolution: Resolution,
    error: Option<String>,
    notice: Option<String>,
}

impl<B: QueryBackend> Session<B> {
    /// Dialects that cannot switch database start at the query view; otherwise
    /// the table list if a database is known, else the database list.
    #[must_use]
    pub fn new(backend: B, dialect: Dialect, database: Option<String>) -> Self {
        let runner = QueryRunner::new(backend, dialect).with_database(database);
        let screen = if !dialect.supports_database_switch() {
            Screen::Query
        } else if runner.database().is_some() {
            Screen::Tables
        } else {
            Screen::Databases
        };

        Self {
            runner,
            screen,
            state: SessionState::AwaitingQuery,
            databases: FilteredList::default(),
            tables: FilteredList::default(),
            query: String::new(),
            columns: Vec::new(),
            rows: FilteredList::default(),
            field_cursor: 0,
            resolution: Resolution::default(),
            error: None,
            notice: None,
        }
    }

    fn fail(&mut self, error: SessionError) -> SessionError {
        warn!(%error, state = self.state.label(), "session operation failed");
        self.error = Some(error.to_string());
        error
    }

    fn clear_messages(&mut self) {
        self.error = None;
        self.notice = None;
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidState {
            action,
            state: self.state.label(),
        }
    }

    fn clear_results(&mut self) {
        self.columns.clear();
        self.rows = FilteredList::default();
        self.field_cursor = 0;
        self.resolution = Resolution::default();
    }

    pub async fn start(&mut self) -> Result<(), SessionError> {
        self.clear_messages();
        let outcome = match self.screen {
            Screen::Databases => self.load_databases().await,
            Screen::Tables => self.load_tables().await,
            Screen::Query => Ok(()),
        };
        outcome.map_err(|error| self.fail(error))
    }

    async fn load_databases(&mut self) -> Result<(), SessionError> {
        let databases = schema::list_databases(&self.runner).await?;
        debug!(count = databases.len(), "loaded databases");
        self.databases = FilteredList::new(databases);
        self.screen = Screen::Databases;
        Ok(())
    }

    async fn load_tables(&mut self) -> Result<(), SessionError> {
        let tables = schema::list_tables(&self.runner).await?;
        debug!(count = tables.len(), "loaded tables");
        self.tables = FilteredList::new(tables);
        self.screen = Screen::Tables;
        Ok(())
    }

    pub async fn select_database(&mut self) -> Result<(), SessionError> {
        self.clear_messages();
        let outcome = self.select_database_inner().await;
        outcome.map_err(|error| self.fail(error))
    }

    async fn select_database_inner(&mut self) -> Result<(), SessionError> {
        let database = self
            .databases
            .selected()
            .cloned()
            .ok_or(SessionError::NothingSelected)?;
        self.runner.select_database(&database).await?;
        info!(%database, "selected database");
        self.load_tables().await
    }

    /// Drops any results and shows the table list of the current database.
    pub async fn open_table_list(&mut self) -> Result<(), SessionError> {
        self.clear_messages();
        self.clear_results();
        self.state = SessionState::AwaitingQuery;
        let outcome = self.load_tables().await;
        outcome.map_err(|error| self.fail(error))
    }

    pub fn open_query_editor(&mut self) {
        self.screen = Screen::Query;
    }

    /// Runs `SELECT *` against the table under the list cursor.
    pub async fn open_selected_table(&mut self) -> Result<(), SessionError> {
        let Some(table) = self.tables.selected().cloned() else {
            return Err(self.fail(SessionError::NothingSelected));
        };
        let sql = format!(
            "SELECT * FROM {}",
            self.runner.dialect().catalog().qualify_table_name(&table)
        );
        self.run_query(&sql).await
    }

    pub async fn inspect_selected_table(&mut self) -> Result<(), SessionError> {
        self.clear_messages();
        let Some(table) = self.tables.selected().cloned() else {
            return Err(self.fail(SessionError::NothingSelected));
        };
        let outcome = self.open_schema(table, SchemaOrigin::TableList).await;
        outcome.map_err(|error| self.fail(error))
    }

    pub async fn run_query(&mut self, sql: &str) -> Result<(), SessionError> {
        self.clear_messages();
        if !matches!(
            self.state,
            SessionState::AwaitingQuery | SessionState::Executed
        ) {
            let error = self.invalid("run a query");
            return Err(self.fail(error));
        }
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(self.fail(SessionError::EmptyQuery));
        }
        let outcome = self.execute_query(sql).await;
        outcome.map_err(|error| self.fail(error))
    }

    /// Replaces the result model. A failure clears the old results rather than
    /// leaving them on screen under a query that did not produce them.
    async fn execute_query(&mut self, sql: &str) -> Result<(), SessionError> {
        self.screen = Screen::Query;
        sql.clone_into(&mut self.query);
        match self.runner.execute(sql).await {
            Ok(result) => {
                info!(rows = result.rows.len(), "query executed");
                self.columns = result.columns;
                self.rows = FilteredList::new(result.rows);
                self.field_cursor = 0;
                self.state = SessionState::Executed;
                self.resolve(sql).await;
                Ok(())
            }
            Err(error) => {
                self.clear_results();
                self.state = SessionState::AwaitingQuery;
                Err(error.into())
            }
        }
    }

    /// Re-resolves target table and primary key. A failed key lookup is
    /// reported but leaves the results usable for browsing.
    async fn resolve(&mut self, sql: &str) {
        let joined = has_join(sql);
        let target_table = resolve_target(sql).map(|target| target.qualified_name());
        self.resolution = Resolution {
            target_table: target_table.clone(),
            primary_key: Vec::new(),
            joined,
        };

        let Some(table) = target_table.filter(|_| !joined) else {
            debug!(joined, "query has no single target table");
            return;
        };
        match schema::primary_key(&self.runner, &table).await {
            Ok(primary_key) => {
                debug!(%table, ?primary_key, "resolved primary key");
                self.resolution.primary_key = primary_key;
            }
            Err(error) => {
                warn!(%table, %error, "primary key lookup failed");
                self.error = Some(format!("primary key lookup for `{table}` failed: {error}"));
            }
        }
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        let query = self.query.clone();
        match self.runner.execute(&query).await {
            Ok(result) => {
                self.columns = result.columns;
                self.rows.replace_items(result.rows);
                self.field_cursor = clamp_cursor(self.field_cursor, self.columns.len());
                self.state = SessionState::Executed;
                Ok(())
            }
            Err(error) => {
                self.clear_results();
                self.state = SessionState::AwaitingQuery;
                Err(error.into())
            }
        }
    }

    pub fn set_result_filter(&mut self, term: &str) {
        self.rows.set_filter(term);
    }

    pub fn clear_result_filter(&mut self) {
        self.rows.clear_filter();
    }

    pub fn move_row(&mut self, delta: isize) {
        self.rows.move_cursor(delta);
    }

    pub fn move_field(&mut self, delta: isize) {
        self.field_cursor = move_cursor(self.field_cursor, delta, self.columns.len());
    }

    /// Filter for whichever list screen is showing.
    pub fn set_list_filter(&mut self, term: &str) {
        match self.screen {
            Screen::Databases => self.databases.set_filter(term),
            Screen::Tables => self.tables.set_filter(term),
            Screen::Query => {}
        }
    }

    pub fn move_list_cursor(&mut self, delta: isize) {
        match self.screen {
            Screen::Databases => self.databases.move_cursor(delta),
            Screen::Tables => self.tables.move_cursor(delta),
            Screen::Query => {}
        }
    }

    fn mutation_scope(&self) -> Result<(String, Vec<String>), SessionError> {
        if self.resolution.joined {
            return Err(SessionError::JoinedQuery);
        }
        let table = self
            .resolution
            .target_table
            .clone()
            .ok_or(SessionError::NoTargetTable)?;
        if self.resolution.primary_key.is_empty() {
            return Err(SessionError::MissingPrimaryKey(table));
        }
        Ok((table, self.resolution.primary_key.clone()))
    }

    pub fn begin_field_edit(&mut self) -> Result<(), SessionError> {
        self.clear_messages();
        if self.state != SessionState::Executed {
            let error = self.invalid("edit a field");
            return Err(self.fail(error));
        }
        let cell = self.rows.source_index(self.rows.cursor()).and_then(|row| {
            self.rows
                .items()
                .get(row)
                .and_then(|values| values.get(self.field_cursor))
                .map(|value| (row, value.clone()))
        });
        let Some((row, original)) = cell else {
            return Err(self.fail(SessionError::NoRowSelected));
        };

        let null = is_null(&original);
        self.state = SessionState::FieldEditing(FieldEdit {
            row,
            column: self.field_cursor,
            buffer: if null { String::new() } else { original.clone() },
            original,
            null,
        });
        Ok(())
    }

    /// Text being typed for the field. Handing it out drops a pending NULL,
    /// so whatever is typed next is written as text.
    #[must_use]
    pub fn field_buffer_mut(&mut self) -> Option<&mut String> {
        match &mut self.state {
            SessionState::FieldEditing(edit) => {
                edit.null = false;
                Some(&mut edit.buffer)
            }
            _ => None,
        }
    }

    /// Marks the field to be set to SQL NULL.
    pub fn set_field_null(&mut self) {
        if let SessionState::FieldEditing(edit) = &mut self.state {
            edit.buffer.clear();
            edit.null = true;
        }
    }

    pub fn cancel_field_edit(&mut self) {
        if matches!(self.state, SessionState::FieldEditing(_)) {
            self.state = SessionState::Executed;
        }
    }

    /// Turns the edit into a pending UPDATE. An unchanged value just returns
    /// to the results.
    pub fn commit_field_edit(&mut self) -> Result<(), SessionError> {
        self.clear_messages();
        let SessionState::FieldEditing(edit) = &self.state else {
            let error = self.invalid("commit an edit");
            return Err(self.fail(error));
        };
        let edit = edit.clone();
        self.state = SessionState::Executed;
        if edit.is_unchanged() {
            return Ok(());
        }

        let outcome = self.generate_update(&edit);
        match outcome {
            Ok(intent) => {
                debug!(sql = %intent.sql, "update pending confirmation");
                self.state = SessionState::ConfirmUpdate(intent);
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    fn generate_update(&self, edit: &FieldEdit) -> Result<MutationIntent, SessionError> {
        let (table, primary_key) = self.mutation_scope()?;
        let row = self
            .rows
            .items()
            .get(edit.row)
            .ok_or(SessionError::NoRowSelected)?;
        let target = MutationTarget::new(self.runner.dialect(), &table, &self.columns, &primary_key)?;
        Ok(generate_update(&target, row, edit.column, edit.new_value())?)
    }

    /// Prepares a DELETE for the filtered view: the selected row when one row
    /// is visible, every visible row otherwise. Referencing rows are counted
    /// for the confirmation but never block it.
    pub async fn begin_delete(&mut self) -> Result<(), SessionError> {
        self.clear_messages();
        if self.state != SessionState::Executed {
            let error = self.invalid("delete rows");
            return Err(self.fail(error));
        }
        let outcome = self.prepare_delete().await;
        match outcome {
            Ok(pending) => {
                debug!(
                    sql = %pending.intent.sql,
                    dependencies = pending.dependencies.len(),
                    "delete pending confirmation"
                );
                self.state = SessionState::ConfirmDelete(pending);
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    async fn prepare_delete(&self) -> Result<PendingDelete, SessionError> {
        if self.rows.is_empty() {
            return Err(SessionError::NoResults);
        }
        let (table, primary_key) = self.mutation_scope()?;
        let rows: Vec<Vec<String>> = if self.rows.len() > 1 {
            self.rows.visible().into_iter().cloned().collect()
        } else {
            vec![self
                .rows
                .selected()
                .cloned()
                .ok_or(SessionError::NoRowSelected)?]
        };
        let row_refs: Vec<&[String]> = rows.iter().map(Vec::as_slice).collect();

        let target = MutationTarget::new(self.runner.dialect(), &table, &self.columns, &primary_key)?;
        let intent = match row_refs.as_slice() {
            [row] => generate_delete(&target, row)?,
            _ => generate_batch_delete(&target, &row_refs)?,
        };
        let dependencies = check_dependencies(&self.runner, &table, &self.columns, &row_refs).await;
        let cursor = dependencies
            .iter()
            .position(|dependency| dependency.count > 0)
            .unwrap_or(0);

        Ok(PendingDelete {
            intent,
            dependencies,
            cursor,
            rows,
        })
    }

    /// Moves through the dependency list, wrapping at either end.
    pub fn move_dependency_cursor(&mut self, delta: isize) {
        if let SessionState::ConfirmDelete(pending) = &mut self.state {
            pending.move_cursor(delta);
        }
    }

    /// Leaves the delete confirmation and queries the referencing rows of the
    /// selected dependency instead.
    pub async fn drill_into_dependency(&mut self) -> Result<(), SessionError> {
        self.clear_messages();
        let lookup = match &self.state {
            SessionState::ConfirmDelete(pending) => pending.selected_dependency().map(|selected| {
                let row_refs: Vec<&[String]> = pending.rows.iter().map(Vec::as_slice).collect();
                let values = referenced_values(
                    &self.columns,
                    &row_refs,
                    &selected.dependency.referenced_column,
                );
                (selected.dependency.clone(), values)
            }),
            _ => {
                let error = self.invalid("follow a dependency");
                return Err(self.fail(error));
            }
        };
        let Some((dependency, values)) = lookup else {
            return Err(self.fail(SessionError::NothingSelected));
        };
        if values.is_empty() {
            return Err(self.fail(SessionError::NoReferencedValues(dependency.table)));
        }

        let sql = dependency_rows_sql(self.runner.dialect(), &dependency, &values);
        info!(table = %dependency.table, "following foreign key dependency");
        self.state = SessionState::Executed;
        let outcome = self.execute_query(&sql).await;
        outcome.map_err(|error| self.fail(error))
    }

    /// Executes the pending UPDATE or DELETE, then re-runs the query that
    /// produced the results. A failed mutation leaves the results untouched.
    pub async fn confirm(&mut self) -> Result<(), SessionError> {
        self.clear_messages();
        let Some(intent) = self.state.pending_mutation().cloned() else {
            let error = self.invalid("confirm");
            return Err(self.fail(error));
        };
        self.state = SessionState::Executed;

        if let Err(error) = self.runner.execute(&intent.sql).await {
            return Err(self.fail(error.into()));
        }
        info!(table = %intent.table, sql = %intent.sql, "mutation executed");

        let outcome = self.refresh().await;
        match outcome {
            Ok(()) => {
                self.notice = Some(intent.summary());
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    /// Discards whatever is pending without running any SQL.
    pub fn cancel(&mut self) {
        match self.state {
            SessionState::FieldEditing(_)
            | SessionState::ConfirmUpdate(_)
            | SessionState::ConfirmDelete(_) => self.state = SessionState::Executed,
            SessionState::SchemaInspection(_) => self.close_schema(),
            SessionState::AwaitingQuery | SessionState::Executed => {}
        }
    }

    /// Column details for the table behind the current results.
    pub async fn inspect_schema(&mut self) -> Result<(), SessionError> {
        self.clear_messages();
        if self.state != SessionState::Executed {
            let error = self.invalid("inspect the schema");
            return Err(self.fail(error));
        }
        let Some(table) = self.resolution.target_table.clone() else {
            return Err(self.fail(SessionError::NoTargetTable));
        };
        let outcome = self.open_schema(table, SchemaOrigin::Results).await;
        outcome.map_err(|error| self.fail(error))
    }

    async fn open_schema(&mut self, table: String, origin: SchemaOrigin) -> Result<(), SessionError> {
        let columns = schema::column_info(&self.runner, &table).await?;
        self.state = SessionState::SchemaInspection(SchemaView {
            table,
            columns: FilteredList::new(columns),
            origin,
        });
        Ok(())
    }

    pub fn set_schema_filter(&mut self, term: &str) {
        if let SessionState::SchemaInspection(view) = &mut self.state {
            view.columns.set_filter(term);
        }
    }

    pub fn move_schema_cursor(&mut self, delta: isize) {
        if let SessionState::SchemaInspection(view) = &mut self.state {
            view.columns.move_cursor(delta);
        }
    }

    pub fn close_schema(&mut self) {
        if let SessionState::SchemaInspection(view) = &self.state {
            self.state = match view.origin {
                SchemaOrigin::Results => SessionState::Executed,
                SchemaOrigin::TableList => SessionState::AwaitingQuery,
            };
        }
    }

    /// One step back: pending work is cancelled first, then results give way
    /// to the table list, then the table list to the database list.
    pub async fn go_back(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::FieldEditing(_)
            | SessionState::ConfirmUpdate(_)
            | SessionState::ConfirmDelete(_)
            | SessionState::SchemaInspection(_) => {
                self.cancel();
                return Ok(());
            }
            SessionState::AwaitingQuery | SessionState::Executed => {}
        }

        match self.screen {
            Screen::Query => self.open_table_list().await,
            Screen::Tables if self.runner.dialect().supports_database_switch() => {
                self.clear_messages();
                let outcome = self.load_databases().await;
                outcome.map_err(|error| self.fail(error))
            }
            Screen::Tables | Screen::Databases => Ok(()),
        }
    }

    pub async fn disconnect(&mut self) -> Result<(), SessionError> {
        self.clear_results();
        self.state = SessionState::AwaitingQuery;
        self.databases = FilteredList::default();
        self.tables = FilteredList::default();
        self.query.clear();
        self.runner.close().await?;
        info!("session closed");
        Ok(())
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.runner.dialect()
    }

    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.runner.database()
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn databases(&self) -> &FilteredList<String> {
        &self.databases
    }

    #[must_use]
    pub fn tables(&self) -> &FilteredList<String> {
        &self.tables
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &FilteredList<Vec<String>> {
        &self.rows
    }

    /// Copy of the full result model.
    #[must_use]
    pub fn result(&self) -> QueryResult {
        QueryResult::new(self.columns.clone(), self.rows.items().to_vec())
    }

    #[must_use]
    pub fn field_cursor(&self) -> usize {
        self.field_cursor
    }

    #[must_use]
    pub fn selected_row(&self) -> Option<&[String]> {
        self.rows.selected().map(Vec::as_slice)
    }

    #[must_use]
    pub fn selected_cell(&self) -> Option<&str> {
        self.selected_row()
            .and_then(|row| row.get(self.field_cursor))
            .map(String::as_str)
    }

    #[must_use]
    pub fn selected_row_json(&self) -> Option<String> {
        let index = self.rows.source_index(self.rows.cursor())?;
        let result = QueryResult::new(self.columns.clone(), vec![self.rows.items().get(index)?.clone()]);
        result.row_as_json(0)
    }

    #[must_use]
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    #[must_use]
    pub fn pending_sql(&self) -> Option<&str> {
        self.state
            .pending_mutation()
            .map(|intent| intent.sql.as_str())
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}
