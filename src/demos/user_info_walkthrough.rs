//! User Info Walkthrough
//!
//! Replays the classic sequence of record operations against a running engine:
//! create, delete, get, and a series of filtered searches.
//!
//! Start an engine first (`cargo run -p infodex-server`), then run with:
//! cargo run -p infodex-rs --example user_info_walkthrough

use chrono::Utc;
use infodex_rs::{
    CallContext, Client, ClientConfig, FilterExpr, RangeBounds, SearchOptions, SortSpec,
    StoreError, UserRecord,
};
use tracing_subscriber::EnvFilter;

fn print_records(label: &str, records: &[UserRecord]) {
    println!("🔍 {} ({} hits)", label, records.len());
    for record in records {
        println!(
            "   id={} name={} age={} address={:?}",
            record.id, record.name, record.age, record.address
        );
    }
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("infodex_rs=info")),
        )
        .init();

    let config = ClientConfig::load("client.json").unwrap_or_else(|_| {
        tracing::warn!("Failed to load client.json, using defaults");
        ClientConfig::default()
    });
    let client = Client::from_config(config)?;
    let ctx = CallContext::background();

    let info = client.info(&ctx).await?;
    println!(
        "Connected to {} (cluster {}, version {})\n",
        info.name, info.cluster_name, info.version.number
    );

    let record = UserRecord {
        id: 5,
        name: "nht".to_string(),
        address: "Huzhou, Zhejiang".to_string(),
        age: 30,
        sex: infodex_core::SEX_FEMALE,
        registered_at: Utc::now().timestamp(),
    };
    match client.create(&ctx, &record).await {
        Ok(()) => println!("📝 Created user {}\n", record.id),
        Err(StoreError::Conflict { id }) => println!("📝 User {} already exists\n", id),
        Err(e) => return Err(e.into()),
    }

    client.delete_by_id(&ctx, 10).await?;
    println!("🗑  Deleted user 10\n");

    match client.get_by_id(&ctx, 4).await? {
        Some(found) => println!("📄 User 4: {:?}\n", found),
        None => println!("📄 User 4 not found\n"),
    }

    let searches = [
        ("name = lcq2", FilterExpr::matches("name", "lcq2"), SearchOptions::new()),
        (
            "name in (lcq3, lcq4)",
            FilterExpr::is_in("name", ["lcq3", "lcq4"]),
            SearchOptions::new(),
        ),
        (
            "age in (35, 36]",
            FilterExpr::range("age", RangeBounds::new().gt(35).lte(36)),
            SearchOptions::new(),
        ),
        (
            "age = 36 and id != 3",
            FilterExpr::and([
                FilterExpr::equals("age", 36),
                FilterExpr::not(FilterExpr::equals("id", 3)),
            ]),
            SearchOptions::new().sort(SortSpec::desc("age")),
        ),
        (
            "age in [35, 36] and id != 3",
            FilterExpr::and([
                FilterExpr::between("age", 35, 36),
                FilterExpr::not(FilterExpr::equals("id", 3)),
            ]),
            SearchOptions::new(),
        ),
        (
            "not age in [10, 20] and (id = 4 or name = nht)",
            FilterExpr::and([
                FilterExpr::not(FilterExpr::between("age", 10, 20)),
                FilterExpr::or([
                    FilterExpr::equals("id", 4),
                    FilterExpr::matches("name", "nht"),
                ]),
            ]),
            SearchOptions::new()
                .sort(SortSpec::desc("age"))
                .project(["id", "name", "age"]),
        ),
        (
            "name = lcq2, first page of one",
            FilterExpr::matches("name", "lcq2"),
            SearchOptions::new().page(0, 1),
        ),
    ];

    for (label, filter, options) in &searches {
        let records = client.search(&ctx, filter, options).await?;
        print_records(label, &records);
    }

    Ok(())
}
