//! End-to-end tests: real HTTP server on a loopback port, real client.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use portico_commons::{ColumnMetaData, Rep, TypedValue, GATEWAY_VERSION};
use portico_engine::mem::MemEngine;
use portico_link::{GatewayClient, LinkError, Serialization, StatementResult};
use portico_meta::MetaService;
use portico_server::routes::configure_routes;
use portico_session::{SessionConfig, SessionStore};

const SERVER_ADDRESS: &str = "e2e-host:8765";

async fn spawn_gateway(engine: &MemEngine) -> String {
    let store = Arc::new(SessionStore::new(SessionConfig::default()));
    let service = Arc::new(MetaService::new(
        Arc::new(engine.clone()),
        store,
        SERVER_ADDRESS,
    ));
    let data = web::Data::new(service);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .app_data(web::PayloadConfig::new(16 * 1024 * 1024))
            .configure(configure_routes)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let port = server.addrs()[0].port();
    actix_rt::spawn(server.run());
    format!("http://127.0.0.1:{}", port)
}

fn client(base_url: &str) -> GatewayClient {
    GatewayClient::builder().base_url(base_url).build().unwrap()
}

fn long_rows(count: i64) -> Vec<Vec<TypedValue>> {
    (0..count).map(|i| vec![TypedValue::Long(i)]).collect()
}

#[actix_rt::test]
async fn server_address_is_reported_on_open() {
    let engine = MemEngine::new();
    let base_url = spawn_gateway(&engine).await;
    let conn = client(&base_url).connect().await.unwrap();
    assert_eq!(conn.server_address(), SERVER_ADDRESS);
}

#[actix_rt::test]
async fn version_property_matches_the_build_constant() {
    let engine = MemEngine::new();
    let base_url = spawn_gateway(&engine).await;
    let mut conn = client(&base_url).connect().await.unwrap();
    let props = conn.database_properties().await.unwrap();
    assert_eq!(
        props.get("GATEWAY_VERSION"),
        Some(&TypedValue::String(GATEWAY_VERSION.to_string()))
    );
    conn.close().await.unwrap();
}

#[actix_rt::test]
async fn parallel_connections_are_independent_sessions() {
    let engine = MemEngine::new();
    let base_url = spawn_gateway(&engine).await;
    let gateway = client(&base_url);

    let mut first = gateway.connect().await.unwrap();
    let mut second = gateway.connect().await.unwrap();
    assert_ne!(first.id(), second.id());

    let result = first
        .execute_query("create local temporary table scratch (id integer)")
        .await
        .unwrap();
    assert!(matches!(result, StatementResult::UpdateCount(_)));

    // Visible on the creating session.
    match first.execute_query("select * from scratch").await.unwrap() {
        StatementResult::ResultSet(mut rs) => {
            assert!(rs.collect_rows().await.unwrap().is_empty());
        }
        StatementResult::UpdateCount(_) => panic!("expected a result set"),
    }

    // Invisible on the other session.
    let err = second
        .execute_query("select * from scratch")
        .await
        .unwrap_err();
    match err {
        LinkError::Remote { message, .. } => {
            assert!(message.contains("SCRATCH"), "unexpected message: {}", message)
        }
        other => panic!("expected remote error, got {}", other),
    }

    first.close().await.unwrap();
    second.close().await.unwrap();
}

#[actix_rt::test]
async fn result_sets_page_transparently_across_frames() {
    let engine = MemEngine::new();
    let columns: Vec<ColumnMetaData> = (0..950)
        .map(|i| ColumnMetaData::new(i, format!("c{:04}", i), Rep::Integer))
        .collect();
    engine.register_table("wide", columns, Vec::new());
    let base_url = spawn_gateway(&engine).await;

    let mut conn = client(&base_url).connect().await.unwrap();
    let mut rs = conn.get_columns(None, None, None, None).await.unwrap();
    let mut count = 0;
    while let Some(_row) = rs.next().await.unwrap() {
        count += 1;
    }
    assert_eq!(count, 950);
    conn.close().await.unwrap();
}

#[actix_rt::test]
async fn cancel_is_seen_at_the_next_row_and_close_stays_idempotent() {
    let engine = MemEngine::new();
    engine.register_table(
        "emp",
        vec![ColumnMetaData::new(0, "id", Rep::Long)],
        long_rows(250),
    );
    let base_url = spawn_gateway(&engine).await;

    let mut conn = client(&base_url).connect().await.unwrap();
    let mut stmt = conn.prepare("select * from emp").await.unwrap();
    let mut rs = match stmt.execute(Vec::new()).await.unwrap() {
        StatementResult::ResultSet(rs) => rs,
        StatementResult::UpdateCount(_) => panic!("expected rows"),
    };

    assert!(rs.next().await.unwrap().is_some());
    assert!(rs.next().await.unwrap().is_some());

    stmt.cancel();
    let err = rs.next().await.unwrap_err();
    assert_eq!(err.to_string(), "Statement canceled");

    // The statement is not auto-closed by cancellation.
    assert!(!stmt.is_closed());
    stmt.close().await.unwrap();
    stmt.close().await.unwrap();
    assert!(stmt.is_closed());
    conn.close().await.unwrap();
}

#[actix_rt::test]
async fn property_changes_reach_the_server_lazily_and_only_once() {
    let engine = MemEngine::new();
    let base_url = spawn_gateway(&engine).await;

    let mut conn = client(&base_url).connect().await.unwrap();
    conn.set_auto_commit(false);
    conn.set_read_only(true);
    assert!(conn.is_dirty());
    // Nothing has touched the engine yet.
    assert_eq!(engine.journal(), vec!["connect"]);

    conn.commit().await.unwrap();
    assert!(!conn.is_dirty());
    conn.commit().await.unwrap();

    // One property flush total: the second commit had a clean mirror on
    // the client and a clean dirty bit on the server.
    assert_eq!(
        engine.journal(),
        vec!["connect", "apply_props", "commit", "commit"]
    );
    conn.close().await.unwrap();
}

#[actix_rt::test]
async fn binary_serialization_round_trips_through_a_real_socket() {
    let engine = MemEngine::new();
    engine.register_query(
        "select * from nums",
        vec![ColumnMetaData::new(0, "n", Rep::Long)],
        long_rows(3),
    );
    let base_url = spawn_gateway(&engine).await;

    let gateway = GatewayClient::builder()
        .base_url(&base_url)
        .serialization(Serialization::Binary)
        .build()
        .unwrap();
    let mut conn = gateway.connect().await.unwrap();
    match conn.execute_query("select * from nums").await.unwrap() {
        StatementResult::ResultSet(mut rs) => {
            let rows = rs.collect_rows().await.unwrap();
            assert_eq!(rows, long_rows(3));
        }
        StatementResult::UpdateCount(_) => panic!("expected rows"),
    }
    conn.close().await.unwrap();
}

#[actix_rt::test]
async fn remote_errors_carry_the_cause_chain() {
    let engine = MemEngine::new();
    let base_url = spawn_gateway(&engine).await;

    let mut conn = client(&base_url).connect().await.unwrap();
    let err = conn.execute_query("select * from buffer").await.unwrap_err();
    match &err {
        LinkError::Remote {
            message,
            error_code,
            sql_state,
            stack_traces,
        } => {
            assert_eq!(*error_code, -1);
            assert_eq!(sql_state, "00000");
            assert!(message.contains("select * from buffer"));
            assert_eq!(stack_traces.len(), 2);
            assert!(err.detailed_message().contains(" -> "));
        }
        other => panic!("expected remote error, got {}", other),
    }
    conn.close().await.unwrap();
}

#[actix_rt::test]
async fn auto_commit_off_commit_and_rollback_scenario() {
    let engine = MemEngine::new();
    engine.set_cell("stock", 0);
    engine.set_cell("units_sold", 0);
    engine.register_adjust("update products set stock = stock + 10", "stock", 10);
    engine.register_adjust("update products set stock = stock - 5", "stock", -5);
    engine.register_adjust("update sales set units_sold = units_sold + 5", "units_sold", 5);
    engine.register_adjust("update products set stock = stock - 10", "stock", -10);
    engine.register_adjust(
        "update sales set units_sold = units_sold + 10",
        "units_sold",
        10,
    );
    let base_url = spawn_gateway(&engine).await;

    let mut conn = client(&base_url).connect().await.unwrap();
    conn.set_auto_commit(false);

    conn.execute_query("update products set stock = stock + 10").await.unwrap();
    conn.commit().await.unwrap();

    conn.execute_query("update products set stock = stock - 5").await.unwrap();
    conn.execute_query("update sales set units_sold = units_sold + 5").await.unwrap();
    conn.commit().await.unwrap();

    conn.execute_query("update products set stock = stock - 10").await.unwrap();
    conn.execute_query("update sales set units_sold = units_sold + 10").await.unwrap();
    conn.rollback().await.unwrap();

    assert_eq!(engine.cell("stock"), Some(5));
    assert_eq!(engine.cell("units_sold"), Some(5));
    conn.close().await.unwrap();
}
