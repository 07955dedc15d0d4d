use quarry_plugin::Resolver;
use quarry_sql::SqlResolver;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

pub fn run(uri: &str, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let resolver = SqlResolver::new();
    let id = resolver
        .find_asset(uri)
        .ok_or_else(|| format!("'{uri}' did not resolve"))?;
    let asset = resolver
        .open_asset(&id)
        .ok_or_else(|| format!("failed to fetch '{id}'"))?;

    let bytes = asset.buffer();
    match output {
        Some(path) => {
            std::fs::write(&path, &bytes)?;
            info!("wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            std::io::stdout().write_all(&bytes)?;
        }
    }
    Ok(())
}
