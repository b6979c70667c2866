//! Loads the credential pool the way the service would and prints a redacted report.
//! Used in deployment checks to confirm keys are reachable without printing them.

use anyhow::{bail, Context};
use gen_guard::config::GuardConfig;
use gen_guard::credentials::{CredentialPool, EnvSecretSource, KeyringSecretSource, SecretSource};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = GuardConfig::from_env().context("reading GEN_GUARD_* configuration")?;

    let source: Arc<dyn SecretSource> = match std::env::args().nth(1).as_deref() {
        Some("--env") => Arc::new(EnvSecretSource),
        _ => Arc::new(KeyringSecretSource::new(config.keyring_service.clone())),
    };

    let pool = CredentialPool::new(source.clone(), config.credentials.clone());
    let count = pool.ensure_loaded().await;

    println!("=== Credential Pool ===");
    println!("secret name:     {}", pool.secret_name());
    println!("secret source:   {}", source.name());
    println!("usable keys:     {}", count);
    for (index, fingerprint) in pool.fingerprints().iter().enumerate() {
        println!("  [{}] key#{}", index, fingerprint);
    }

    println!("\n=== Effective Settings ===");
    println!("max attempts:    {}", config.retry.max_attempts);
    println!("backoff base:    {:?}", config.retry.base_delay);
    println!("worst backoff:   {:?}", config.retry.worst_case_backoff(config.retry.attempts_for(count)));
    match config.deadline {
        Some(deadline) => println!("deadline:        {:?}", deadline),
        None => println!("deadline:        none"),
    }
    println!(
        "rate limit:      {} requests / {:?}",
        config.rate_limit.max_requests, config.rate_limit.window
    );
    println!(
        "content cache:   {} (collection '{}')",
        if config.cache.enabled { "enabled" } else { "disabled" },
        config.cache.collection
    );

    if count == 0 {
        bail!(
            "no usable credentials: set the '{}' secret or environment variable",
            pool.secret_name()
        );
    }
    Ok(())
}
