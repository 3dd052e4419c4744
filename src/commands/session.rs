use anyhow::Result;
use soot_core::SootConfig;
use soot_server::db;
use soot_server::store::accounts;

pub async fn run(config: &SootConfig, email: &str, name: Option<&str>) -> Result<()> {
    if !email.contains('@') {
        anyhow::bail!("'{email}' is not an email address");
    }

    let pool = db::connect(&config.expanded_database_url()).await?;

    let user = accounts::find_or_create(&pool, email, name).await?;
    let token = accounts::issue_session(&pool, &user.id, config.session_ttl_days).await?;

    println!("Session for {} ({}), valid {} days:\n", user.name, user.email, config.session_ttl_days);
    println!("  Authorization: Bearer {token}");

    Ok(())
}
