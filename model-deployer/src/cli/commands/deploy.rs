//! One-shot deploy and undeploy commands

use crate::cli::app::{DeployArgs, UndeployArgs};
use anyhow::{Context, Result, bail};
use model_deployer_core::{DeployerConfig, HttpCollection, ModelCollection, ModelId};
use std::path::PathBuf;
use tracing::info;

fn collection(config: &DeployerConfig) -> Result<HttpCollection> {
    let url = config.collection_url();
    model_deployer_core::config::validate_collection_url(&url)?;
    Ok(HttpCollection::new(&url, config.request_timeout())?)
}

/// Identifier for `args`: explicit `--id`, else derived from the file name
fn deploy_id(args: &DeployArgs) -> Result<ModelId> {
    match &args.id {
        Some(id) => ModelId::new(id.as_str()).with_context(|| format!("'{}' is not a valid model identifier", id)),
        None => ModelId::from_path(&args.file)
            .with_context(|| format!("Cannot derive a model identifier from {}", args.file.display())),
    }
}

pub async fn deploy(args: DeployArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = super::load_config(config_path.as_deref())?;
    args.collection.apply(&mut config);

    if !args.file.is_file() {
        bail!("{} is not a file", args.file.display());
    }

    let id = deploy_id(&args)?;
    let collection = collection(&config)?;

    info!("Deploying model {} from {}", id, args.file.display());
    collection.deploy(&id, &args.file).await.with_context(|| format!("Failed to deploy model {}", id))?;

    println!("Deployed {} to {}", id, collection.target(&id));
    Ok(())
}

pub async fn undeploy(args: UndeployArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = super::load_config(config_path.as_deref())?;
    args.collection.apply(&mut config);

    let id = ModelId::new(args.id.as_str())
        .with_context(|| format!("'{}' is not a valid model identifier", args.id))?;
    let collection = collection(&config)?;

    info!("Undeploying model {}", id);
    collection.undeploy(&id).await.with_context(|| format!("Failed to undeploy model {}", id))?;

    println!("Undeployed {} from {}", id, collection.target(&id));
    Ok(())
}
