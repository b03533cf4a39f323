use std::path::PathBuf;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    sketchboard::logging::init();

    let script = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: sketchboard <script.json>")?;
    let layers = sketchboard::run(&script)
        .with_context(|| format!("failed to replay {}", script.display()))?;

    let json = serde_json::to_string_pretty(&layers).context("failed to encode layer list")?;
    println!("{json}");
    Ok(())
}
