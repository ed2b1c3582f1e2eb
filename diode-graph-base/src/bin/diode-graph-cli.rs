use std::process::ExitCode;

use diode_graph_base::Tool;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    Tool::new().run_main().await
}
