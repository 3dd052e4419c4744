use anyhow::Result;
use owo_colors::OwoColorize;
use soot_core::SootConfig;
use soot_server::db;

pub async fn run(config: &SootConfig, to: Option<&str>, status_only: bool) -> Result<()> {
    let pool = db::connect(&config.expanded_database_url()).await?;

    if status_only {
        for (name, applied) in db::status(&pool).await? {
            if applied {
                println!("  {} {}", "✓".green(), name);
            } else {
                println!("  {} {}", "·".dimmed(), name.dimmed());
            }
        }
        return Ok(());
    }

    let applied = db::migrate_to(&pool, to).await?;
    if applied.is_empty() {
        println!("{}", "Database is up to date".dimmed());
        return Ok(());
    }

    for name in &applied {
        println!("  {}", format!("Applied: {name}").green());
    }

    Ok(())
}
