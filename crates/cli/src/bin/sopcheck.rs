use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    sopcheck_cli::main_entry().await
}
