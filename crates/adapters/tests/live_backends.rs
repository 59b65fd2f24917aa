use rowscope_adapters::{open_backend, probe};
use rowscope_core::config::ConnectionProfile;
use rowscope_core::dialect::Dialect;
use rowscope_core::session::{Screen, Session, SessionState};

fn integration_enabled(flag: &str) -> bool {
    matches!(std::env::var(flag).ok().as_deref(), Some("1"))
}

fn mysql_profile() -> ConnectionProfile {
    let url = std::env::var("ROWSCOPE_TEST_MYSQL_URL")
        .unwrap_or_else(|_| "mysql://root@127.0.0.1:3306".to_string());
    ConnectionProfile::new("mysql-integration", url)
}

fn postgres_profile() -> ConnectionProfile {
    let url = std::env::var("ROWSCOPE_TEST_POSTGRES_URL")
        .unwrap_or_else(|_| "postgres://postgres@127.0.0.1:5432/postgres".to_string());
    ConnectionProfile::new("postgres-integration", url)
}

#[tokio::test(flavor = "multi_thread")]
async fn mysql_session_edits_and_deletes_rows() {
    if !integration_enabled("ROWSCOPE_RUN_MYSQL_INTEGRATION") {
        return;
    }

    let profile = mysql_profile();
    let report = probe(&profile).await.expect("probe should succeed");
    assert_eq!(report.dialect, Dialect::MySql);

    let backend = open_backend(&profile).await.expect("backend should open");
    let mut admin = Session::new(backend, Dialect::MySql, None);
    admin.start().await.expect("database list should load");
    assert_eq!(admin.screen(), Screen::Databases);
    for statement in [
        "CREATE DATABASE IF NOT EXISTS rowscope_it",
        "DROP TABLE IF EXISTS rowscope_it.orders",
        "DROP TABLE IF EXISTS rowscope_it.customers",
        "CREATE TABLE rowscope_it.customers (id INT PRIMARY KEY, name VARCHAR(32))",
        "CREATE TABLE rowscope_it.orders (id INT PRIMARY KEY, customer_id INT, \
         FOREIGN KEY (customer_id) REFERENCES rowscope_it.customers(id))",
        "INSERT INTO rowscope_it.customers VALUES (1, 'ada'), (2, 'grace')",
        "INSERT INTO rowscope_it.orders VALUES (10, 1), (11, 1)",
    ] {
        admin
            .run_query(statement)
            .await
            .expect("fixture statement should run");
    }

    let mut scoped = profile.clone();
    scoped.database = Some("rowscope_it".to_string());
    let backend = open_backend(&scoped).await.expect("backend should open");
    let mut session = Session::new(backend, Dialect::MySql, Some("rowscope_it".to_string()));
    session.start().await.expect("table list should load");
    assert_eq!(session.screen(), Screen::Tables);
    assert_eq!(session.tables().items(), ["customers", "orders"]);

    session
        .run_query("SELECT * FROM customers ORDER BY id")
        .await
        .expect("select should run");
    assert_eq!(session.rows().len(), 2);
    assert_eq!(session.resolution().primary_key, ["id"]);

    session.move_field(1);
    session.begin_field_edit().expect("edit should start");
    *session.field_buffer_mut().expect("buffer") = "lovelace".to_string();
    session.commit_field_edit().expect("commit should stage update");
    session.confirm().await.expect("update should run");
    assert_eq!(session.selected_cell(), Some("lovelace"));

    session
        .run_query("SELECT 1 AS warmup; SELECT name FROM customers WHERE id = 1")
        .await
        .expect("multi-statement select should run");
    assert_eq!(session.columns(), ["name"]);
    assert_eq!(session.selected_cell(), Some("lovelace"));

    session
        .run_query("SELECT * FROM customers ORDER BY id")
        .await
        .expect("select should run");

    session.set_result_filter("lovelace");
    session.begin_delete().await.expect("delete should stage");
    let SessionState::ConfirmDelete(pending) = session.state() else {
        panic!("expected delete confirmation");
    };
    assert_eq!(pending.dependencies.len(), 1);
    assert_eq!(pending.dependencies[0].count, 2);
    session.cancel();

    session.disconnect().await.expect("disconnect should succeed");
    admin
        .run_query("DROP DATABASE rowscope_it")
        .await
        .expect("cleanup should run");
    admin.disconnect().await.expect("disconnect should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn postgres_session_reads_catalog_and_results() {
    if !integration_enabled("ROWSCOPE_RUN_POSTGRES_INTEGRATION") {
        return;
    }

    let profile = postgres_profile();
    probe(&profile).await.expect("probe should succeed");

    let backend = open_backend(&profile).await.expect("backend should open");
    let mut session = Session::new(backend, Dialect::Postgres, None);
    session.start().await.expect("start should succeed");
    assert_eq!(session.screen(), Screen::Query);

    for statement in [
        "DROP TABLE IF EXISTS rowscope_it_users",
        "CREATE TABLE rowscope_it_users (id INT PRIMARY KEY, email TEXT)",
        "INSERT INTO rowscope_it_users VALUES (1, 'a@example.com'), (2, NULL)",
    ] {
        session
            .run_query(statement)
            .await
            .expect("fixture statement should run");
    }

    session
        .run_query("SELECT id, email FROM rowscope_it_users ORDER BY id")
        .await
        .expect("select should run");
    assert_eq!(session.columns(), ["id", "email"]);
    assert_eq!(session.rows().len(), 2);
    session.move_field(1);
    session.begin_field_edit().expect("edit should start");
    session.set_field_null();
    session.commit_field_edit().expect("commit should stage update");
    assert_eq!(
        session.pending_sql(),
        Some("UPDATE rowscope_it_users SET email = NULL WHERE id = '1'")
    );
    session.confirm().await.expect("update should run");

    session
        .run_query("SELECT 1 AS warmup; SELECT COUNT(*) AS missing FROM rowscope_it_users WHERE email IS NULL")
        .await
        .expect("multi-statement select should run");
    assert_eq!(session.columns(), ["missing"]);
    assert_eq!(session.selected_cell(), Some("2"));

    session
        .run_query("DROP TABLE rowscope_it_users")
        .await
        .expect("cleanup should run");
    session.disconnect().await.expect("disconnect should succeed");
}
