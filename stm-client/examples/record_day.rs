use std::env;
use std::error::Error;

use stm_client::{EntryPayload, OfflineClient, Written};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::from_filename("./stm-client/.env.local").ok();
    let base_url = env::var("STM_API_URL").expect("STM_API_URL must be set");
    let email = env::var("STM_EMAIL").expect("STM_EMAIL must be set");
    let password = env::var("STM_PASSWORD").expect("STM_PASSWORD must be set");
    let store_path = env::var("STM_STORE").unwrap_or_else(|_| "stm-offline.sqlite".to_string());

    let client = OfflineClient::new(&base_url, &store_path)?;
    let user = client.login(&email, &password).await?;
    println!("Logged in as {} <{}>", user.name, user.email);

    let today = chrono::Local::now().date_naive();
    let morning = EntryPayload {
        date: Some(today),
        code: Some("ADI".to_string()),
        start: Some("08:00".to_string()),
        end: Some("12:00".to_string()),
        description: Some("Sprint work".to_string()),
        ..Default::default()
    };
    let lunch = EntryPayload {
        date: Some(today),
        code: Some("X".to_string()),
        start: Some("12:00".to_string()),
        end: Some("12:30".to_string()),
        ..Default::default()
    };

    for payload in [morning, lunch] {
        match client.create_entry(&payload).await {
            Ok(Written::Applied(entry)) => println!(
                "Recorded {} {}-{} ({})",
                entry.date, entry.start, entry.end, entry.code
            ),
            Ok(Written::Queued { queue_id }) => {
                println!("Offline, queued as op {queue_id} for replay")
            }
            Err(err) => println!("Rejected: {err}"),
        }
    }

    let summary = client.trigger_replay().await?;
    println!(
        "Replay: {:?}, {} sent, {} still queued",
        summary.outcome, summary.replayed, summary.remaining
    );

    println!("\nEntries on record:");
    for entry in client.entries().await? {
        println!(
            "{} {}-{} {:<4} {}",
            entry.date,
            entry.start,
            entry.end,
            entry.code,
            entry.area_or_customer.unwrap_or_default()
        );
    }

    Ok(())
}
