#[tokio::main]
async fn main() {
    let code = taskgate::app::startup::startup().await;
    std::process::exit(code);
}
