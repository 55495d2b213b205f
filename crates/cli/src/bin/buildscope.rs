use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    buildscope_cli::main_entry().await
}
