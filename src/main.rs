#[tokio::main]
async fn main() -> anyhow::Result<()> {
    printdesk::bootstrapper::run().await
}
