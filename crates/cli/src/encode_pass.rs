use quarry_sql::obfuscate;

pub fn run(password: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", obfuscate::encode(password));
    Ok(())
}
