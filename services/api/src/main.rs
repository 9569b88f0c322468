use orgportal_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("portal error: {err}");
        std::process::exit(1);
    }
}
