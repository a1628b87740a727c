use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    toolbelt::cli::run().await
}
