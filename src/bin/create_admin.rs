use std::env;

use foodgram_api::{
    api::users::create_account, config::EnvConfig, context::Context, error::ApiError,
    schema::{RegisterPayload, UserRole},
};

const USAGE: &str = "usage: create_admin <email> <username> <password> [first_name] [last_name]";

async fn create(ctx: &Context, args: &[String]) -> Result<(), ApiError> {
    let arg = |i: usize| args.get(i).cloned();
    let payload = RegisterPayload {
        email: arg(0),
        username: arg(1),
        password: arg(2),
        first_name: arg(3).or_else(|| Some(String::from("Site"))),
        last_name: arg(4).or_else(|| Some(String::from("Admin"))),
    };

    let user = create_account(ctx, payload, UserRole::Admin).await?;
    println!("Created admin {} with id {}", user.username, user.id);
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    let config = EnvConfig::from_env();
    if config.db_url.is_none() {
        log::warn!("DATABASE_URL is not set, the account is discarded on exit");
    }

    let result = match Context::from_config(config).await {
        Ok(ctx) => create(&ctx, &args).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}
