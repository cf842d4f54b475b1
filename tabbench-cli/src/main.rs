//! Entry point of the `bench` binary.
//!
//! Prepares a benchmark dataset on the selected device, renders a summary to
//! stdout and maps failures to a non-zero exit status. Logging is initialised
//! first so every later step can emit structured diagnostics via `tracing`.

use std::env;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};

use tabbench_cli::{
    cli::{CliError, render_summary, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

/// Collect the arguments, run the selected generator and render the summary.
fn try_main() -> Result<()> {
    let args = env::args_os()
        .skip(1)
        .map(|arg| {
            arg.into_string()
                .map_err(|raw| anyhow!("argument `{}` is not valid UTF-8", raw.to_string_lossy()))
        })
        .collect::<Result<Vec<_>>>()?;

    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    if let Some(summary) = run_cli(&args, &mut writer).context("failed to prepare dataset")? {
        render_summary(&summary, &mut writer).context("failed to render summary")?;
    }
    writer.flush().context("failed to flush output")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        let (code, detail_code) = err
            .downcast_ref::<CliError>()
            .and_then(|cli_error| match cli_error {
                CliError::Dataset(dataset) => {
                    Some((Some(dataset.code()), dataset.detail_code()))
                }
                _ => None,
            })
            .unwrap_or((None, None));

        let code_field = code.map(|code| field::display(code.as_str()));
        let detail_code_field = detail_code.map(field::display);
        let message = format!("{err:#}");

        error!(
            error = message.as_str(),
            code = code_field,
            detail_code = detail_code_field,
            "command execution failed"
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
