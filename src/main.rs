use clap::{Parser, Subcommand};
use image_derivatives::config::{self, ServiceConfig};
use image_derivatives::envelope::Failure;
use image_derivatives::imaging::{DerivativeGenerator, RustBackend};
use image_derivatives::logging;
use image_derivatives::pipeline::{FAILURE_MESSAGE, Pipeline};
use image_derivatives::presign::{self, ImageQuery};
use image_derivatives::response::Response;
use image_derivatives::store::{FsStore, ObjectStore};
use image_derivatives::types::{RequestContext, TriggerEvent};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "image-derivatives")]
#[command(about = "Resized image derivatives with client-safe outcome envelopes")]
#[command(long_about = "\
Resized image derivatives with client-safe outcome envelopes

Objects live in a local store at <store-root>/<bucket>/<key>. Processing a
trigger event for input/abc.jpg writes:

  resized/abc/50.jpg
  resized/abc/100.jpg
  resized/abc/500.jpg

Every command prints an HTTP-style JSON response and exits non-zero when its
status is not 200.

Run 'image-derivatives gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    /// Store root, overriding [store] root from the config
    #[arg(long, global = true)]
    store_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline for an object-created event (JSON file)
    Process {
        #[arg(long)]
        event: PathBuf,
    },
    /// Issue a presigned upload URL for a new image
    UploadUrl {
        #[arg(long)]
        image_name: Option<String>,
    },
    /// Issue a presigned download URL for an uploaded image
    DownloadUrl {
        #[arg(long)]
        image_name: Option<String>,
    },
    /// Copy a local file into the store
    Put {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        key: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Remove an object from the store
    Delete {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        key: String,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    logging::init(&config.log_level)?;

    let root = cli
        .store_root
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.store.root));
    let store = Arc::new(FsStore::new(root, config.store.signing_secret.clone()));
    let ctx = RequestContext::generate(config.function_name.clone());

    let response = match cli.command {
        Command::Process { event } => process(&ctx, &config, store, &event).await?,
        Command::UploadUrl { image_name } => {
            let query = ImageQuery { image_name };
            presign::issue_upload_url(&ctx, store.as_ref(), &config, &query).await
        }
        Command::DownloadUrl { image_name } => {
            let query = ImageQuery { image_name };
            presign::issue_download_url(&ctx, store.as_ref(), &config, &query).await
        }
        Command::Put { bucket, key, file } => {
            let bytes = std::fs::read(&file)?;
            let size = bytes.len();
            match store.put(&bucket, &key, bytes).await {
                Ok(()) => Response::success(
                    &ctx,
                    "Stored object",
                    Some(serde_json::json!({ "bucket": bucket, "key": key, "size": size })),
                ),
                Err(e) => Response::from_failure(&ctx, &Failure::from(e), "Fail to store object"),
            }
        }
        Command::Delete { bucket, key } => match store.delete(&bucket, &key).await {
            Ok(()) => Response::success(
                &ctx,
                "Deleted object",
                Some(serde_json::json!({ "bucket": bucket, "key": key })),
            ),
            Err(e) => Response::from_failure(&ctx, &Failure::from(e), "Fail to delete object"),
        },
        Command::GenConfig => return Ok(()),
    };

    let status = response.status_code();
    println!("{}", serde_json::to_string_pretty(&response.into_http())?);
    if status != 200 {
        std::process::exit(1);
    }
    Ok(())
}

/// Parse the event file and run one pipeline invocation.
async fn process(
    ctx: &RequestContext,
    config: &ServiceConfig,
    store: Arc<FsStore>,
    event_path: &std::path::Path,
) -> Result<Response, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(event_path)?;
    let event: TriggerEvent = match serde_json::from_str(&content) {
        Ok(event) => event,
        Err(e) => {
            let failure = Failure::payload_not_valid(e.to_string());
            return Ok(Response::from_failure(ctx, &failure, FAILURE_MESSAGE));
        }
    };

    let specs = config.derivatives.specs();
    let generator = DerivativeGenerator::new(
        RustBackend::new(),
        config.derivatives.quality(),
        specs.len(),
    )?;
    let store: Arc<dyn ObjectStore> = store;
    let pipeline = Pipeline::new(store, Arc::new(generator), specs);
    Ok(pipeline.handle(ctx, &event).await)
}
