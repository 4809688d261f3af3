#[tokio::main]
async fn main() {
    let code = clamsweep::app::startup::startup().await;
    clamsweep::core::logging::flush_logging();
    std::process::exit(code);
}
