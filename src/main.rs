fn main() {
    let code = gofile::run_cli();
    if code != 0 {
        std::process::exit(code);
    }
}
