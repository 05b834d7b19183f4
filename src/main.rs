#[tokio::main]
async fn main() -> anyhow::Result<()> {
    livegraph::run().await
}
