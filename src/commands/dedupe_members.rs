use anyhow::Result;
use owo_colors::OwoColorize;
use soot_core::SootConfig;
use soot_server::db;
use soot_server::store::houses;

pub async fn run(config: &SootConfig, apply: bool) -> Result<()> {
    let pool = db::connect(&config.expanded_database_url()).await?;
    let duplicates = houses::find_duplicate_memberships(&pool).await?;

    if duplicates.is_empty() {
        println!("{}", "No duplicate memberships".dimmed());
        return Ok(());
    }

    for group in &duplicates {
        println!(
            "{} in house {}",
            group.keep.email.bold(),
            group.house_id.dimmed()
        );
        println!("  keep    {} ({})", group.keep.id, group.keep.role);
        for member in &group.remove {
            println!("  {} {} ({})", "remove".red(), member.id, member.role);
        }
    }

    if !apply {
        println!("\nRun `soot dedupe-members --apply` to delete the duplicate rows.");
        return Ok(());
    }

    let removed = houses::remove_duplicate_memberships(&pool, &duplicates).await?;
    println!("\n{}", format!("Removed {removed} duplicate row(s)").green());

    Ok(())
}
