use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    boxup::cli::main().await
}
