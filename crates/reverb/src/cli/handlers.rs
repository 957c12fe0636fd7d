//! Subcommand handlers.

use super::{Cli, Commands, ReviewAction};
use crate::{EngageContext, ReplyPipeline, ReverbConfig, check_profile};
use anyhow::{Context, bail};
use reverb_core::{CollectedItem, Credential, Platform, ReviewStatus, TracingSink};
use reverb_models::GeminiClient;
use reverb_rate_limit::{ApiCallTracker, ApiKeyPool, CallKey};
use reverb_review::{ReviewQueue, post_approved};
use reverb_social::{check_profile_credentials, poster_for};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Runs the parsed command against `config`.
///
/// # Errors
///
/// Returns the first failure of the selected command.
pub async fn run(cli: Cli, config: ReverbConfig) -> anyhow::Result<()> {
    let profile = cli.profile;
    check_profile(&profile)?;
    match cli.command {
        Commands::Quota {
            service,
            method,
            model,
            key_suffix,
        } => show_quota(&config, &service, &method, model, key_suffix),
        Commands::Keys { api_keys } => list_keys(&config, api_keys.as_deref()).await,
        Commands::Credentials { name } => {
            let name = name.unwrap_or(profile);
            check_profile(&name)?;
            show_credentials(&name);
            Ok(())
        }
        Commands::Generate {
            input,
            api_keys,
            api_key,
            model,
            workers,
            run,
            limit,
        } => {
            let config = match model {
                Some(model) => {
                    let generation = config.generation().clone().with_model(model);
                    config.with_generation(generation)
                }
                None => config,
            };
            let options = GenerateOptions {
                api_keys,
                api_key,
                workers,
                run,
                limit,
            };
            generate(config, &profile, &input, options).await
        }
        Commands::Review { action } => {
            let context = EngageContext::new(config, None)?;
            review(&context.review_queue(&profile), action).await
        }
        Commands::Post { platform, limit } => post(config, &profile, platform, limit).await,
    }
}

fn show_quota(
    config: &ReverbConfig,
    service: &str,
    method: &str,
    model: Option<String>,
    key_suffix: Option<String>,
) -> anyhow::Result<()> {
    let tracker = ApiCallTracker::open(config.paths().call_log(), config.quotas().clone())?;

    let model = model.or_else(|| {
        (service == config.generation().service()).then(|| config.generation().model().clone())
    });
    let mut key = CallKey::new(service, method);
    if let Some(model) = model {
        key = key.with_model(model);
    }
    if let Some(suffix) = key_suffix {
        key = key.with_key_suffix(suffix);
    }

    let info = tracker.get_quota_info(&key)?;
    println!("{}", info);
    println!("{}", tracker.can_make_call(&key));
    Ok(())
}

async fn list_keys(config: &ReverbConfig, api_keys: Option<&str>) -> anyhow::Result<()> {
    let pool = ApiKeyPool::from_list_or_env(api_keys, config.pool());
    let suffixes = pool.suffixes().await;
    if suffixes.is_empty() {
        println!(
            "No API keys configured (set {} or pass --api-keys)",
            config.pool().env_var()
        );
        return Ok(());
    }
    println!("{} key(s):", suffixes.len());
    for suffix in suffixes {
        println!("  …{}", suffix);
    }
    Ok(())
}

fn show_credentials(profile: &str) {
    println!("Credentials for profile '{}':", profile);
    for check in check_profile_credentials(profile) {
        println!("  {}", check);
    }
}

struct GenerateOptions {
    api_keys: Option<String>,
    api_key: Option<String>,
    workers: Option<usize>,
    run: Option<u32>,
    limit: Option<usize>,
}

#[instrument(skip(config, options), fields(input = %input.display()))]
async fn generate(
    config: ReverbConfig,
    profile: &str,
    input: &Path,
    options: GenerateOptions,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let mut items: Vec<CollectedItem> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of collected items", input.display()))?;
    if let Some(limit) = options.limit {
        items.truncate(limit);
    }

    let context =
        EngageContext::with_sink(config, options.api_keys.as_deref(), Arc::new(TracingSink))?;
    if let Some(key) = options.api_key {
        context.pool().set_explicit_key(Credential::new(key)).await;
    }
    if context.pool().size().await == 0 {
        bail!(
            "No API keys configured: set {} or pass --api-keys",
            context.config().pool().env_var()
        );
    }

    let generator = Arc::new(context.guarded(Arc::new(GeminiClient::new())));
    let mut pipeline = ReplyPipeline::new(generator, context.config().reply().prompt().as_str())
        .with_sink(context.sink().clone());
    if let Some(workers) = options.workers {
        pipeline = pipeline.with_workers(workers);
    }

    let queue = context.review_queue(profile);
    let summary = pipeline.run(&queue, profile, &items, options.run).await?;
    println!(
        "Generated {} replies ({} failed, {} without an API key, {} already queued)",
        summary.generated(),
        summary.failed(),
        summary.no_api_key(),
        summary.skipped()
    );
    Ok(())
}

async fn review(queue: &ReviewQueue, action: ReviewAction) -> anyhow::Result<()> {
    match action {
        ReviewAction::List { status, json } => {
            let entries = queue.list(status).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            for entry in &entries {
                println!(
                    "{}\t{}\t{}",
                    entry.tweet_id(),
                    entry.status(),
                    entry.generated_reply()
                );
            }
            println!("{} entries", entries.len());
        }
        ReviewAction::Approve { ids } => {
            for id in ids {
                let entry = queue.approve(&id).await?;
                println!("{} -> {}", id, entry.status());
            }
        }
        ReviewAction::Reject { ids } => {
            for id in ids {
                let entry = queue.reject(&id).await?;
                println!("{} -> {}", id, entry.status());
            }
        }
        ReviewAction::Edit { id, reply } => {
            let entry = queue.edit(&id, &reply).await?;
            println!("{} updated: {}", id, entry.generated_reply());
        }
        ReviewAction::Delete { id } => {
            if queue.delete(&id).await? {
                println!("{} deleted", id);
            } else {
                println!("{} not found", id);
            }
        }
    }
    Ok(())
}

#[instrument(skip(config))]
async fn post(
    config: ReverbConfig,
    profile: &str,
    platform: Platform,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let poster = poster_for(platform, profile)?;
    let context = EngageContext::with_sink(config, None, Arc::new(TracingSink))?;
    let queue = context.review_queue(profile);

    let approved = queue.list(Some(ReviewStatus::Approved)).await?.len();
    info!(approved, "Posting approved replies");

    let summary = post_approved(&queue, poster.as_ref(), limit).await?;
    println!(
        "Processed {}: {} posted, {} failed",
        summary.processed(),
        summary.posted(),
        summary.failed()
    );
    Ok(())
}
