use carboncare_client::prelude::*;
use carboncare_client::notify::Level;
use dotenv::dotenv;
use std::env;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match AppConfig::validate_env() {
        Ok(warnings) => {
            for warning in warnings {
                tracing::warn!("{}", warning);
            }
        }
        Err(e) => {
            eprintln!("Environment is incomplete: {}", e);
            return Err(e.into());
        }
    }

    let config = AppConfig::from_env();
    let client = CarbonCare::with_store(
        config,
        std::sync::Arc::new(FileStore::new(".carboncare/credentials.json")),
    )?;

    match client.api().health().await {
        Ok(health) => println!("Backend status: {}", health.status),
        Err(e) => println!("Backend unreachable: {}", e),
    }

    println!("\n1. Restore the previous session");
    let mut status = client.auth().restore().await;
    println!("Session: {:?}", status);

    if status != SessionStatus::Authenticated {
        let email = env::var("CARBONCARE_DEMO_EMAIL").ok();
        let password = env::var("CARBONCARE_DEMO_PASSWORD").ok();
        if let (Some(email), Some(password)) = (email, password) {
            println!("\n2. Sign in as {}", email);
            if client.auth().login(&email, &password).await.is_ok() {
                status = SessionStatus::Authenticated;
            }
        } else {
            println!("Set CARBONCARE_DEMO_EMAIL and CARBONCARE_DEMO_PASSWORD to sign in");
        }
    }

    println!("\n3. Load everything");
    if let Err(e) = client.sync().await {
        println!("Some queries failed: {}", e);
    }

    for mission in client.missions().missions().iter().take(5) {
        println!("  #{} {} ({} pts)", mission.id, mission.title, mission.points);
    }

    if status == SessionStatus::Authenticated {
        let summary = client.dashboard();
        println!("\n4. Dashboard");
        println!("{}", serde_json::to_string_pretty(&summary)?);

        if let Some(wallet) = client.wallet().wallet() {
            println!("Wallet: {} points, Rp {}", wallet.points, wallet.rupiah);
        }
    }

    println!("\nLanguage: {}", client.language().await?.name());
    println!("Current view: {}", client.navigator().current());

    for notification in client.notifier().drain() {
        let tag = match notification.level {
            Level::Success => "ok",
            Level::Error => "error",
        };
        println!("[{}] {}", tag, notification.message);
    }

    Ok(())
}
