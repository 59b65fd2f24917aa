use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::query_runner::{QueryBackend, QueryBackendError};
use crate::results::QueryResult;

type Response = Result<QueryResult, String>;

#[derive(Debug, Default)]
struct Script {
    responses: Vec<(String, Response)>,
    executed: Vec<String>,
    selected_database: Option<String>,
    closed: bool,
}

/// Backend that answers statements containing a registered fragment. The most
/// recently registered matching fragment wins; anything else gets an empty
/// grid.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().expect("script lock poisoned")
    }

    pub(crate) fn respond(&self, fragment: &str, columns: &[&str], rows: &[&[&str]]) {
        let result = QueryResult::new(
            columns.iter().map(ToString::to_string).collect(),
            rows.iter()
                .map(|row| row.iter().map(ToString::to_string).collect())
                .collect(),
        );
        self.lock()
            .responses
            .push((fragment.to_string(), Ok(result)));
    }

    pub(crate) fn fail(&self, fragment: &str, message: &str) {
        self.lock()
            .responses
            .push((fragment.to_string(), Err(message.to_string())));
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    pub(crate) fn executed_matching(&self, fragment: &str) -> Vec<String> {
        self.executed()
            .into_iter()
            .filter(|sql| sql.contains(fragment))
            .collect()
    }

    pub(crate) fn selected_database(&self) -> Option<String> {
        self.lock().selected_database.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn run_query(&self, sql: &str) -> Result<QueryResult, QueryBackendError> {
        let mut script = self.lock();
        script.executed.push(sql.to_string());
        let response = script
            .responses
            .iter()
            .rev()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, response)| response.clone());
        match response {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(QueryBackendError::new(message)),
            None => Ok(QueryResult::empty()),
        }
    }

    async fn select_database(&self, database: &str) -> Result<(), QueryBackendError> {
        self.lock().selected_database = Some(database.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), QueryBackendError> {
        self.lock().closed = true;
        Ok(())
    }
}
