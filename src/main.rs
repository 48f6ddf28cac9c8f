//! Demo: an email open that arrives while its contact is still replicating.

use bounce_reset::config::Config;
use bounce_reset::lifecycle::{setup_tracing, EmailOpenedPipeline};
use bounce_reset::model::{
    Contact, ContactIdentifier, EmailAddress, EmailAddressList, EmailOpen, EmailOpenedArgs,
};
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let mut config = Config::load().map_err(|e| e.to_string())?;
    if config.replication_lag_ms == 0 {
        // Make the store lag behind so the read retry has something to absorb.
        config.replication_lag_ms = 1_200;
    }
    info!(?config, "Starting email-opened pipeline");

    let pipeline = EmailOpenedPipeline::new(&config);

    let alice = ContactIdentifier::new("demo", "alice");
    let emails = EmailAddressList::new(
        "work",
        EmailAddress::new("alice@example.com").with_bounce_count(3),
    )
    .with_other("home", EmailAddress::new("alice@home.example").with_bounce_count(1));

    let version = pipeline
        .store_client()
        .upsert(Contact::new(alice.clone()).with_emails(emails))
        .await
        .map_err(|e| e.to_string())?;
    info!(identifier = %alice, version, "Contact seeded");

    let args = EmailOpenedArgs::new(EmailOpen::new(alice.clone(), "welcome-1"))
        .with_campaign("onboarding");

    let span = tracing::info_span!("email_opened");
    let result = async { pipeline.process(&args).await }.instrument(span).await;

    match result {
        Ok(outcome) => info!(?outcome, "Email opened event processed"),
        Err(e) => error!(error = %e, "Email opened event failed"),
    }

    pipeline.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
