#[tokio::main]
async fn main() {
    if let Err(error) = elektro_celje_outage_lib::run().await {
        eprintln!("elektro-celje-outage: {error}");
        std::process::exit(1);
    }
}
