use std::sync::Arc;

use inbox_sweep::classifier::Classifier;
use inbox_sweep::config::SweepConfig;
use inbox_sweep::ledger::ProcessedLedger;
use inbox_sweep::llm::create_backend;
use inbox_sweep::mailstore::{GmailStore, MailStore};
use inbox_sweep::pipeline::{InboxSweeper, RunReport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match SweepConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("📬 Inbox Sweep v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.backend.model_name());
    eprintln!("   Action: {}", config.action);

    let store: Arc<dyn MailStore> = Arc::new(GmailStore::new(config.gmail_token.clone()));

    // No identity means no safe ledger file; nothing else is worth doing.
    let address = match store.profile_address().await {
        Ok(address) => address,
        Err(e) => {
            eprintln!("Error: failed to resolve account identity: {e}");
            std::process::exit(1);
        }
    };
    eprintln!("   Account: {address}");

    let ledger = match ProcessedLedger::load(&config.cache_dir, &address) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("   Inspect or move the ledger file before re-running.");
            std::process::exit(1);
        }
    };
    eprintln!(
        "   Ledger: {} ({} messages already handled)\n",
        ledger.path().display(),
        ledger.len()
    );

    let backend = create_backend(&config)?;
    let classifier = Classifier::new(backend, &config.first_name, &config.last_name);
    let mut sweeper = InboxSweeper::new(
        store,
        classifier,
        ledger,
        config.action,
        config.unparseable,
    );

    let report = sweeper.run().await;
    print_report(&report);

    if let Err(e) = config.settings().save(&config.settings_path) {
        tracing::warn!(error = %e, "Failed to persist settings");
    }

    if let Some(reason) = &report.fetch_error {
        eprintln!("Sweep stopped early: {reason}");
        eprintln!(
            "Progress up to that point is recorded in {}",
            sweeper.ledger().path().display()
        );
        std::process::exit(1);
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("{:^50}", "Statistics Report");
    println!("{}", "-".repeat(50));
    println!("{:<35}{}", "Total unread emails fetched", report.total_unread);
    println!("{:<35}{}", "Total pages fetched", report.pages_fetched);
    println!("{:<35}{}", "Total emails handled", report.handled);
    println!("{:<35}{}", "Emails kept as personal", report.kept);
    println!("{:<35}{}", "Skipped (already handled)", report.skipped_processed);
    println!("{:<35}{}", "Unparseable messages", report.parse_failures);
    println!("{:<35}{}", "Final number of unread emails", report.remaining_unread());
    println!("{:<35}{}", "Language model used", report.model);
    println!("{}", "-".repeat(50));
}
