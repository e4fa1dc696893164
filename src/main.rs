use dotenv::dotenv;
use reenvio::bot::handler::Handler;
use reenvio::bot::telegram_client::Api;
use reenvio::cleaner;
use reenvio::db;
use reenvio::deliver::ForwardJob;
use reenvio::events::EventBus;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let db_pool = db::create_connection_pool();

    {
        let mut connection = db::fetch_connection(&db_pool).expect("Failed to connect to the database");
        db::run_migrations(&mut connection);
    }

    let events = EventBus::new(256);
    let api = Api::new();

    tokio::spawn(cleaner::run_cleaner(db_pool.clone(), events.clone()));

    let forward_job = Arc::new(
        ForwardJob::builder()
            .db_pool(db_pool.clone())
            .relay(api.clone())
            .events(events)
            .build(),
    );

    tokio::task::spawn_blocking(move || Handler::start(api, db_pool, forward_job))
        .await
        .expect("The update handler panicked");
}
