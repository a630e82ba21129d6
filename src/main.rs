fn main() {
    std::process::exit(stampede::entry::run());
}
