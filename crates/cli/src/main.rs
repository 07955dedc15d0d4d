fn main() {
    if let Err(e) = quarry_cli::run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
