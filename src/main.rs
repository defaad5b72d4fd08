fn main() {
    if let Err(err) = fallwatch_lib::run() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
