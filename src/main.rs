fn main() {
    if let Err(err) = travel_ledger::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
