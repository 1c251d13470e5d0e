use std::process::ExitCode;

/// Binary entrypoint for the `fwstatus` executable.
///
/// Keeps the binary thin: all business logic lives in the `fwstatus_lib` crate
/// so unit tests can import library functions directly.
#[tokio::main]
async fn main() -> ExitCode {
    fwstatus_lib::run().await
}
