#[tokio::main]
async fn main() {
    lunchette::start_server().await;
}
