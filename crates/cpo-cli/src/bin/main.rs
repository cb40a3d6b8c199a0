#[tokio::main]
async fn main() {
    let code = cpo_cli::run().await;
    std::process::exit(code);
}
