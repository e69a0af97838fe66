use actix_web::web;
use infodex_core::config::EngineConfig;
use infodex_rs::{CallContext, Client, ClientConfig, UserRecord};
use infodex_server::AppState;

/// Start an in-memory engine on a free local port and return its base URL
pub fn spawn_engine() -> String {
    let state = web::Data::new(AppState::new(EngineConfig::default()));
    let (server, addr) =
        infodex_server::bind(state, "127.0.0.1:0", 1).expect("failed to bind dev engine");
    actix_web::rt::spawn(server);
    format!("http://{addr}")
}

pub fn client(base_url: &str) -> Client {
    let mut config = ClientConfig::for_address(base_url);
    config.refresh_on_write = true;
    Client::from_config(config).expect("failed to build client")
}

pub fn user(id: i64, name: &str, age: i64) -> UserRecord {
    UserRecord {
        id,
        name: name.to_string(),
        address: format!("{id} Main Street"),
        age,
        sex: if id % 2 == 0 { 1 } else { 2 },
        registered_at: 1_700_000_000 + id,
    }
}

/// The records the walkthrough starts from
pub fn fixture() -> Vec<UserRecord> {
    vec![
        user(2, "lcq2", 35),
        user(3, "lcq3", 36),
        user(4, "lcq4", 36),
        user(5, "nht", 40),
        user(7, "lcq7", 36),
        user(10, "lcq10", 10),
    ]
}

pub async fn seed(client: &Client, records: &[UserRecord]) {
    let ctx = CallContext::background();
    for record in records {
        client.create(&ctx, record).await.expect("failed to seed record");
    }
}
