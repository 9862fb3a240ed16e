fn main() {
    if let Err(err) = csv2rangedb::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
