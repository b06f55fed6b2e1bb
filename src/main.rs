use astcache::cli;
use clap::Parser;

fn main() {
    astcache::logging::init();

    let cli = cli::Cli::parse();
    let code = cli::run(cli);
    std::process::exit(code);
}
