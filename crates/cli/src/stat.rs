use quarry_plugin::Resolver;
use quarry_sql::SqlResolver;

pub fn run(uri: &str) -> Result<(), Box<dyn std::error::Error>> {
    let resolver = SqlResolver::new();
    let id = resolver
        .find_asset(uri)
        .ok_or_else(|| format!("'{uri}' did not resolve"))?;
    match resolver.get_timestamp(&id) {
        Some(stamp) => {
            println!("{id}\t{stamp}");
            Ok(())
        }
        None => Err(format!("no timestamp available for '{id}'").into()),
    }
}
