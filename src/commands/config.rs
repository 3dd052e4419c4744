use anyhow::Result;
use owo_colors::OwoColorize;
use soot_core::SootConfig;

pub fn run() -> Result<()> {
    let config_path = SootConfig::config_path()?;
    let config = SootConfig::load()?;

    println!("{}", "Paths".bold());
    println!("  Config:     {}", config_path.display());
    println!("  Database:   {}", config.expanded_database_url());

    println!("\n{}", "Server".bold());
    println!("  Bind:       {}", config.bind);
    println!("  Public URL: {}", config.public_url);

    println!("\n{}", "Calendar".bold());
    println!(
        "  Feed window: {} days back, {} days ahead",
        config.feed_past_days, config.feed_future_days
    );
    println!("  Leap days:   {:?}", config.leap_day_policy);

    Ok(())
}
