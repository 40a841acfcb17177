#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockmeta_server::start().await
}
