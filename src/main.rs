#[tokio::main]
async fn main() -> anyhow::Result<()> {
    scan_bridge_lib::run().await
}
