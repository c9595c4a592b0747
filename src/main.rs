use hemmer_provider_awx::{init_logging, serve, AwxProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    serve(AwxProvider::new()).await
}
