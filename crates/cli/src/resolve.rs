use quarry_plugin::Resolver;
use quarry_sql::SqlResolver;

pub fn run(uri: &str) -> Result<(), Box<dyn std::error::Error>> {
    let resolver = SqlResolver::new();
    if !resolver.matches_schema(uri) {
        return Err(format!("'{uri}' is not a sql:// path").into());
    }
    match resolver.find_asset(uri) {
        Some(id) => {
            println!("{id}");
            Ok(())
        }
        None => Err(format!("'{uri}' did not resolve").into()),
    }
}
