//! `query-v2`: run the demonstration query, or replay a captured V2 body.
//!
//! ```text
//! query-v2                       # demonstration query against the mock session
//! query-v2 response.json         # decode a saved response body
//! query-v2 --markdown --database Samples
//! ```
//!
//! Rendered output goes to stdout; logs go to stderr (`RUST_LOG` or
//! `--log-level`, default `warn`).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use queryv2_client::decoder::DecoderConfig;
use queryv2_client::render::RenderOptions;
use queryv2_client::transport::{FrameStream, MockSession, ResultSetStream, DEMO_QUERY};
use queryv2_client::{decode_and_render, QueryClientBuilder, QueryOutput, QueryV2Error};

const APPLICATION_NAME: &str = "query-v2";

#[derive(Parser, Debug)]
#[command(name = "query-v2", version, about)]
struct Args {
    /// Captured V2 response body to replay instead of the demonstration query
    path: Option<PathBuf>,

    /// Database for the demonstration query
    #[arg(long, env = "QUERYV2_DATABASE", default_value = "Samples")]
    database: String,

    /// Render tables as markdown
    #[arg(long, default_value_t = false)]
    markdown: bool,

    /// Leave `:type` annotations out of header lines
    #[arg(long, default_value_t = false)]
    no_type_annotation: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn render_options(&self) -> RenderOptions {
        RenderOptions::default()
            .markdown(self.markdown)
            .include_column_type_annotation(!self.no_type_annotation)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    let options = args.render_options();
    let result = match &args.path {
        Some(path) => replay(path, options).await,
        None => run_demo(&args.database, options).await,
    };

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(error = %e, "query aborted");
            eprintln!("Exception raised: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = write_stdout(&output.text) {
        eprintln!("Exception raised: {}", e);
        return ExitCode::from(1);
    }

    if output.completion.is_failure() {
        eprintln!("{}", output.summary());
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}

fn write_stdout(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .init();
}

async fn run_demo(database: &str, options: RenderOptions) -> Result<QueryOutput, QueryV2Error> {
    let client = QueryClientBuilder::new()
        .application_name(APPLICATION_NAME)
        .render_options(options)
        .build(MockSession::demo());

    tracing::info!(database, query = DEMO_QUERY, "running demonstration query");
    client.execute(database, DEMO_QUERY).await
}

async fn replay(path: &Path, options: RenderOptions) -> Result<QueryOutput, QueryV2Error> {
    tracing::info!(path = %path.display(), "replaying response body");
    let pending = async move {
        let file = tokio::fs::File::open(path).await?;
        Ok::<_, QueryV2Error>(Box::new(FrameStream::new(file)) as Box<dyn ResultSetStream>)
    };
    decode_and_render(pending, &DecoderConfig::default(), &options).await
}
