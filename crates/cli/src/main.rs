use clap::Parser;

#[tokio::main]
async fn main() {
    if let Err(err) = meson_cli::run(meson_cli::args::Cli::parse()).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
