use std::process::ExitCode;

mod app;
mod logging;

#[tokio::main]
async fn main() -> ExitCode {
    let args = workflow_courier::cli::parse();
    app::run(args).await
}
