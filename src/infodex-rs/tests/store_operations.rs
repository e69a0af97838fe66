mod common;

use std::time::Duration;

use infodex_rs::{
    CallContext, CancellationToken, FilterExpr, RangeBounds, SearchOptions, SortSpec, StoreError,
    UserRecord,
};

use common::{client, fixture, seed, spawn_engine, user};

fn ids(records: &[UserRecord]) -> Vec<i64> {
    records.iter().map(|record| record.id).collect()
}

#[actix_web::test]
async fn test_create_then_get_round_trips() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();
    let record = user(5, "nht", 40);

    client.create(&ctx, &record).await.unwrap();
    let fetched = client.get_by_id(&ctx, 5).await.unwrap();
    assert_eq!(fetched, Some(record));
}

#[actix_web::test]
async fn test_get_missing_is_none() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();

    // No index yet
    assert_eq!(client.get_by_id(&ctx, 4).await.unwrap(), None);

    seed(&client, &fixture()).await;
    assert_eq!(client.get_by_id(&ctx, 99).await.unwrap(), None);
}

#[actix_web::test]
async fn test_duplicate_create_conflicts() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();

    client.create(&ctx, &user(3, "lcq3", 36)).await.unwrap();
    let err = client.create(&ctx, &user(3, "other", 1)).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { id: 3 }));

    // The original document is untouched
    let stored = client.get_by_id(&ctx, 3).await.unwrap().unwrap();
    assert_eq!(stored.name, "lcq3");
}

#[actix_web::test]
async fn test_delete_by_id_is_idempotent() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();
    seed(&client, &fixture()).await;

    client.delete_by_id(&ctx, 10).await.unwrap();
    assert_eq!(client.get_by_id(&ctx, 10).await.unwrap(), None);
    client.delete_by_id(&ctx, 10).await.unwrap();
}

#[actix_web::test]
async fn test_range_search_sorted_descending() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();
    seed(&client, &fixture()).await;

    let filter = FilterExpr::range("age", RangeBounds::new().gt(35).lte(36));
    let found = client
        .search(&ctx, &filter, &SearchOptions::new().sort(SortSpec::desc("id")))
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![7, 4, 3]);
}

#[actix_web::test]
async fn test_inclusive_range_over_mixed_ages() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();
    seed(
        &client,
        &[user(1, "a", 10), user(2, "b", 35), user(3, "c", 36), user(4, "d", 40)],
    )
    .await;

    let found = client
        .search(
            &ctx,
            &FilterExpr::between("age", 35, 36),
            &SearchOptions::new().sort(SortSpec::desc("age")),
        )
        .await
        .unwrap();
    let ages: Vec<i64> = found.iter().map(|record| record.age).collect();
    assert_eq!(ages, vec![36, 35]);
}

#[actix_web::test]
async fn test_equality_with_negated_id() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();
    seed(&client, &fixture()).await;

    let filter = FilterExpr::and([
        FilterExpr::equals("age", 36),
        FilterExpr::not(FilterExpr::equals("id", 3)),
    ]);
    let found = client
        .search(&ctx, &filter, &SearchOptions::new().sort(SortSpec::asc("id")))
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![4, 7]);
}

#[actix_web::test]
async fn test_compound_filter_excludes_negated_id() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();
    seed(&client, &fixture()).await;

    let filter = FilterExpr::and([
        FilterExpr::between("age", 35, 36),
        FilterExpr::not(FilterExpr::equals("id", 3)),
    ]);
    let found = client
        .search(&ctx, &filter, &SearchOptions::new().sort(SortSpec::asc("id")))
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![2, 4, 7]);
}

#[actix_web::test]
async fn test_negated_range_with_alternatives_and_projection() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();
    seed(&client, &fixture()).await;

    let filter = FilterExpr::and([
        FilterExpr::not(FilterExpr::between("age", 10, 20)),
        FilterExpr::or([
            FilterExpr::equals("id", 4),
            FilterExpr::matches("name", "nht"),
        ]),
    ]);
    let options = SearchOptions::new()
        .sort(SortSpec::asc("id"))
        .project(["id", "name", "age"]);

    let found = client.search(&ctx, &filter, &options).await.unwrap();
    assert_eq!(ids(&found), vec![4, 5]);
    // Fields left out of the projection come back defaulted
    assert!(found.iter().all(|record| record.address.is_empty()));
    assert!(found.iter().all(|record| record.registered_at == 0));
    assert_eq!(found[1].name, "nht");
}

#[actix_web::test]
async fn test_terms_and_match_filters() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();
    seed(&client, &fixture()).await;

    let found = client
        .search(
            &ctx,
            &FilterExpr::is_in("name", ["lcq3", "lcq4"]),
            &SearchOptions::new().sort(SortSpec::asc("id")),
        )
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![3, 4]);

    let found = client
        .search(&ctx, &FilterExpr::matches("name", "lcq2"), &SearchOptions::new())
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![2]);
}

#[actix_web::test]
async fn test_paging() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();
    seed(&client, &fixture()).await;

    let options = SearchOptions::new().sort(SortSpec::asc("id")).page(1, 2);
    let found = client.search(&ctx, &FilterExpr::all(), &options).await.unwrap();
    assert_eq!(ids(&found), vec![3, 4]);
}

#[actix_web::test]
async fn test_empty_results() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();

    // Missing index reads as empty
    let found = client
        .search(&ctx, &FilterExpr::all(), &SearchOptions::new())
        .await
        .unwrap();
    assert!(found.is_empty());

    seed(&client, &fixture()).await;
    let found = client
        .search(&ctx, &FilterExpr::equals("age", 99), &SearchOptions::new())
        .await
        .unwrap();
    assert!(found.is_empty());

    let found = client
        .search(&ctx, &FilterExpr::Or(Vec::new()), &SearchOptions::new())
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[actix_web::test]
async fn test_delete_by_query_reports_count() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();

    assert_eq!(
        client
            .delete_by_query(&ctx, &FilterExpr::equals("age", 36))
            .await
            .unwrap(),
        0
    );

    seed(&client, &fixture()).await;
    let deleted = client
        .delete_by_query(&ctx, &FilterExpr::equals("age", 36))
        .await
        .unwrap();
    assert_eq!(deleted, 3);

    let remaining = client
        .search(&ctx, &FilterExpr::all(), &SearchOptions::new().sort(SortSpec::asc("id")))
        .await
        .unwrap();
    assert_eq!(ids(&remaining), vec![2, 5, 10]);
}

#[actix_web::test]
async fn test_cancelled_context_fails_without_writing() {
    let client = client(&spawn_engine());
    let token = CancellationToken::new();
    token.cancel();
    let cancelled = CallContext::background().with_cancellation(token);

    let err = client.create(&cancelled, &user(1, "a", 1)).await.unwrap_err();
    assert!(matches!(err, StoreError::Cancelled));

    let ctx = CallContext::background();
    assert_eq!(client.get_by_id(&ctx, 1).await.unwrap(), None);
}

#[actix_web::test]
async fn test_unreachable_engine_times_out_or_fails() {
    // Nothing listens on the discard port; either outcome is a failure
    let client = client("http://127.0.0.1:9");
    let ctx = CallContext::background().with_timeout(Duration::from_secs(5));

    let err = client.get_by_id(&ctx, 1).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Connection(_) | StoreError::Timeout
    ));
}

#[actix_web::test]
async fn test_concurrent_creates() {
    let client = client(&spawn_engine());
    let ctx = CallContext::background();

    let records: Vec<UserRecord> = (100..120).map(|id| user(id, "bulk", 20)).collect();
    let results =
        futures::future::join_all(records.iter().map(|record| client.create(&ctx, record))).await;
    assert!(results.iter().all(Result::is_ok));

    let found = client
        .search(
            &ctx,
            &FilterExpr::equals("name", "bulk"),
            &SearchOptions::new().page(0, 50),
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 20);
}

#[actix_web::test]
async fn test_engine_info() {
    let client = client(&spawn_engine());
    let info = client.info(&CallContext::background()).await.unwrap();
    assert_eq!(info.cluster_name, "infodex-dev");
    assert!(!info.version.number.is_empty());
}
