use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormatType {
    Json,
    Terminal,
}

// Logs go to stderr, stdout carries command output.
pub fn tracing_set(format: &LogFormatType) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormatType::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormatType::Terminal => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
