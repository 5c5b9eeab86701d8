use storage_probe_cli::run_cli;

#[tokio::main]
async fn main() {
    // Logging may not be initialized when the error is raised, so report
    // on stderr directly
    if let Err(e) = run_cli().await {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}
