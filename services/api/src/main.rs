use gatepass_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("gatepass error: {err}");
        std::process::exit(1);
    }
}
