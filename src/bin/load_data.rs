use std::{env, path::Path};

use foodgram_api::{
    config::EnvConfig,
    context::Context,
    error::ApiError,
    schema::{NewIngredient, NewTag},
};
use serde::de::DeserializeOwned;

async fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ApiError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to read {}: {e}", path.display())))?;

    Ok(serde_json::from_slice(&raw)?)
}

async fn load(ctx: &Context, ingredients: &Path, tags: Option<&Path>) -> Result<(), ApiError> {
    let rows: Vec<NewIngredient> = read_rows(ingredients).await?;
    let total = rows.len();
    let mut inserted = 0;
    for row in rows {
        if ctx.store.insert_ingredient(row).await? {
            inserted += 1;
        }
    }
    log::info!("Loaded {inserted} of {total} ingredients");

    if let Some(tags) = tags {
        let rows: Vec<NewTag> = read_rows(tags).await?;
        let total = rows.len();
        let mut inserted = 0;
        for row in rows {
            if ctx.store.insert_tag(row).await? {
                inserted += 1;
            }
        }
        log::info!("Loaded {inserted} of {total} tags");
    }

    ctx.invalidate_catalog().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(ingredients) = args.first() else {
        eprintln!("usage: load_data <ingredients.json> [tags.json]");
        std::process::exit(2);
    };

    let config = EnvConfig::from_env();
    if config.db_url.is_none() {
        log::warn!("DATABASE_URL is not set, loaded rows are discarded on exit");
    }

    let result = match Context::from_config(config).await {
        Ok(ctx) => load(&ctx, Path::new(ingredients), args.get(1).map(Path::new)).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}
