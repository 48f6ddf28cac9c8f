use crate::config::Config;
use crate::model::EmailOpenedArgs;
use crate::processors::{Outcome, ProcessError, ResetContactEmailBounceCount};
use crate::store::{ContactStore, StoreClient};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runtime orchestrator for the email-opened pipeline.
///
/// `EmailOpenedPipeline` is responsible for:
/// - **Lifecycle Management**: Starting and stopping the contact store task
/// - **Dependency Wiring**: Handing the store client, retry policies and the
///   cancellation token to the processor
///
/// # Example
///
/// ```ignore
/// let pipeline = EmailOpenedPipeline::new(&Config::load()?);
///
/// let outcome = pipeline.process(&args).await?;
///
/// pipeline.shutdown().await?;
/// ```
pub struct EmailOpenedPipeline {
    store_client: StoreClient,
    processor: ResetContactEmailBounceCount<StoreClient>,
    cancellation: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl EmailOpenedPipeline {
    /// Spawns the contact store and wires the processor from `config`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(config: &Config) -> Self {
        let (store, store_client) = ContactStore::new(&config.to_store_options());
        let handle = tokio::spawn(store.run());

        let cancellation = CancellationToken::new();
        let processor = ResetContactEmailBounceCount::with_config(
            store_client.clone(),
            config,
            cancellation.clone(),
        );

        Self {
            store_client,
            processor,
            cancellation,
            handle,
        }
    }

    pub async fn process(&self, args: &EmailOpenedArgs) -> Result<Outcome, ProcessError> {
        self.processor.process(args).await
    }

    /// Direct access to the store, e.g. to seed contacts.
    pub fn store_client(&self) -> &StoreClient {
        &self.store_client
    }

    /// Aborts every in-flight and future `process` call with
    /// [`ProcessError::Cancelled`].
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Gracefully shuts down the pipeline.
    ///
    /// Drops every client so the store's channel closes, then waits for the
    /// store task to finish. Returns an error if the task panicked.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down pipeline...");

        // The processor's session factory holds a client too.
        drop(self.processor);
        drop(self.store_client);

        if let Err(e) = self.handle.await {
            error!("Store task failed: {:?}", e);
            return Err(format!("Store task failed: {:?}", e));
        }

        info!("Pipeline shutdown complete.");
        Ok(())
    }
}
