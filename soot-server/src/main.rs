use anyhow::Result;
use soot_core::SootConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = SootConfig::load()?;
    soot_server::logging::init(config.log_json);
    soot_server::serve(config, true).await
}
