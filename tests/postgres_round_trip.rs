mod common;

use faction_sim::db::{load_store, migrate};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

async fn setup() -> (PgPool, ContainerAsync<Postgres>) {
    let container = Postgres::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let pool = PgPoolOptions::new()
        .connect(&format!(
            "postgres://postgres:postgres@{}:{}/postgres",
            host, port
        ))
        .await
        .unwrap();
    (pool, container)
}

#[tokio::test]
#[ignore]
async fn load_populates_all_tables() {
    let (pool, _container) = setup().await;
    let store = common::build_test_store();

    migrate(&pool).await.unwrap();
    load_store(&pool, &store).await.unwrap();

    let faction_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM factions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(faction_count, 2);

    let rel_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM relationships")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rel_count, 1);

    let membership_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memberships")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(membership_count, 4);
}

#[tokio::test]
#[ignore]
async fn flat_columns_and_record_agree() {
    let (pool, _container) = setup().await;
    let store = common::build_test_store();

    migrate(&pool).await.unwrap();
    load_store(&pool, &store).await.unwrap();

    let rows = sqlx::query("SELECT id, name, influence, record FROM factions ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    for row in rows {
        let id: i64 = row.get("id");
        let name: String = row.get("name");
        let influence: f64 = row.get("influence");
        let record: serde_json::Value = row.get("record");
        assert_eq!(record["id"].as_i64().unwrap(), id);
        assert_eq!(record["name"].as_str().unwrap(), name);
        assert_eq!(record["influence"].as_f64().unwrap(), influence);
    }

    let at_war: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM relationships WHERE at_war AND stance = 'at_war'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(at_war, 1);
}
