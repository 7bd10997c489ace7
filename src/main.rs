use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, span, Level};

use s3crud::{
    adapters::memory::MemoryClient,
    config,
    dispatch::{Dispatcher, LocalInvoker},
    model::error::{ErrorKind, StoreError},
    storage::Storage,
    util,
};

const DEMO_APPEND_MESSAGE: &str = "Message added by lambda!!!";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Send task envelopes to the remote function
    Remote,
    /// Call S3 from this process
    Direct,
    /// Run the task handler in process against an in-memory store
    Local,
}

#[derive(Parser, Debug)]
#[command(name = "s3crud", version, about = "Bucket and object CRUD on S3")]
struct Cli {
    #[command(flatten)]
    aws: config::AwsArgs,

    #[arg(long, value_enum, default_value_t = Mode::Remote)]
    mode: Mode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    MakeBucket {
        bucket: String,
    },
    /// Empty and delete a bucket
    DeleteBucket {
        bucket: String,
    },
    DeleteObject {
        bucket: String,
        key: String,
    },
    List {
        bucket: String,
    },
    Read {
        bucket: String,
        key: String,
    },
    Write {
        bucket: String,
        key: String,
        data: String,
    },
    /// Upload a local text file
    Upload {
        path: PathBuf,
        bucket: String,
        /// Object key, defaults to the file name
        #[arg(long)]
        name: Option<String>,
    },
    Append {
        bucket: String,
        key: String,
        data: String,
    },
    /// Create a bucket, upload `*.txt` files, edit them and clean up
    Demo {
        #[arg(long, default_value = "davis-crud-bucket")]
        bucket: String,
        #[arg(long, default_value = "./import")]
        import_dir: PathBuf,
    },
}

/// Where operations go: straight to the store or through the dispatcher.
enum Backend<'a> {
    Direct(Storage<'a>),
    Remote(Dispatcher<'a>),
}

impl Backend<'_> {
    fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        match self {
            Backend::Direct(storage) => storage.create_bucket(bucket),
            Backend::Remote(dispatcher) => dispatcher.create_bucket(bucket),
        }
    }

    fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        match self {
            Backend::Direct(storage) => storage.delete_bucket(bucket),
            Backend::Remote(dispatcher) => dispatcher.delete_bucket(bucket),
        }
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        match self {
            Backend::Direct(storage) => storage.delete_object(bucket, key),
            Backend::Remote(dispatcher) => dispatcher.delete_object(bucket, key),
        }
    }

    /// Listing text as `get_objects` reports it. Remote listings pass through unchanged.
    fn listing(&self, bucket: &str) -> Result<String, StoreError> {
        match self {
            Backend::Direct(storage) => Ok(util::object::format_listing(
                bucket,
                &storage.list_objects(bucket)?,
            )),
            Backend::Remote(dispatcher) => dispatcher.list_bucket_contents(bucket),
        }
    }

    fn read_object(&self, bucket: &str, key: &str) -> Result<String, StoreError> {
        match self {
            Backend::Direct(storage) => storage.read_object(bucket, key),
            Backend::Remote(dispatcher) => dispatcher.read_object(bucket, key),
        }
    }

    fn write_object(&self, bucket: &str, key: &str, data: &str) -> Result<(), StoreError> {
        match self {
            Backend::Direct(storage) => storage.write_object(bucket, key, data),
            Backend::Remote(dispatcher) => dispatcher.write_object(bucket, key, data),
        }
    }

    fn upload_file(
        &self,
        path: &Path,
        bucket: &str,
        name: Option<&str>,
    ) -> Result<String, StoreError> {
        match self {
            Backend::Direct(storage) => {
                let key = util::object::object_name_for(path, name)?;
                let data = std::fs::read_to_string(path)?;
                storage.write_object(bucket, &key, &data)?;
                Ok(key)
            }
            Backend::Remote(dispatcher) => dispatcher.upload_file(path, bucket, name),
        }
    }

    fn append_object(&self, bucket: &str, key: &str, data: &str) -> Result<(), StoreError> {
        match self {
            Backend::Direct(storage) => storage.append_object(bucket, key, data),
            Backend::Remote(dispatcher) => dispatcher.append_object(bucket, key, data),
        }
    }
}

fn print_listing(backend: &Backend, bucket: &str) -> Result<(), StoreError> {
    print!("{}", backend.listing(bucket)?);

    Ok(())
}

fn text_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

fn demo(backend: &Backend, bucket: &str, import_dir: &Path) -> Result<(), StoreError> {
    let span = span!(Level::INFO, "demo", context = "demo");
    let _e = span.enter();
    info!(bucket = bucket, import_dir = %import_dir.display(), "called");

    backend.create_bucket(bucket)?;

    for file in text_files(import_dir)? {
        let key = backend.upload_file(&file, bucket, None)?;
        info!(path = %file.display(), key = key, "uploaded");
    }
    print_listing(backend, bucket)?;

    backend.delete_object(bucket, "file1.txt")?;
    print_listing(backend, bucket)?;

    backend.append_object(bucket, "file2.txt", DEMO_APPEND_MESSAGE)?;
    println!("{}", backend.read_object(bucket, "file2.txt")?);

    backend.delete_bucket(bucket)
}

fn execute(backend: &Backend, command: &Command) -> Result<(), StoreError> {
    match command {
        Command::MakeBucket { bucket } => backend.create_bucket(bucket),
        Command::DeleteBucket { bucket } => backend.delete_bucket(bucket),
        Command::DeleteObject { bucket, key } => backend.delete_object(bucket, key),
        Command::List { bucket } => print_listing(backend, bucket),
        Command::Read { bucket, key } => {
            println!("{}", backend.read_object(bucket, key)?);
            Ok(())
        }
        Command::Write { bucket, key, data } => backend.write_object(bucket, key, data),
        Command::Upload { path, bucket, name } => {
            let key = backend.upload_file(path, bucket, name.as_deref())?;
            info!(key = key, "uploaded");
            Ok(())
        }
        Command::Append { bucket, key, data } => backend.append_object(bucket, key, data),
        Command::Demo { bucket, import_dir } => demo(backend, bucket, import_dir),
    }
}

fn run(cli: Cli) -> Result<(), StoreError> {
    match cli.mode {
        Mode::Local => {
            let client = MemoryClient::new();
            let invoker = LocalInvoker::new(&client);
            let dispatcher = Dispatcher::new(
                &invoker,
                &cli.aws.function_name,
                cli.aws.region_or_default(),
            );
            execute(&Backend::Remote(dispatcher), &cli.command)
        }
        Mode::Direct => {
            let sdk_config = util::poll::block_on(cli.aws.load_sdk_config());
            let client = config::s3_client(&sdk_config, None);
            execute(&Backend::Direct(Storage::new(&client)), &cli.command)
        }
        Mode::Remote => {
            let sdk_config = util::poll::block_on(cli.aws.load_sdk_config());
            let client = config::lambda_client(&sdk_config);
            let dispatcher = Dispatcher::new(
                &client,
                &cli.aws.function_name,
                &config::region_name(&sdk_config),
            );
            execute(&Backend::Remote(dispatcher), &cli.command)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().json().init();

    let span = span!(Level::INFO, "main", context = "main");
    let _e = span.enter();
    info!("called");

    let cli = Cli::parse();
    info!(mode = ?cli.mode, command = ?cli.command, "args");

    // SDK futures are polled from a blocking thread while the runtime drives I/O.
    let res = tokio::task::spawn_blocking(move || run(cli))
        .await
        .unwrap_or_else(|err| {
            Err(StoreError::new(
                ErrorKind::Service,
                format!("operation task failed: {}", err),
            ))
        });

    match res {
        Err(err) => {
            error!(error_message=%err, error_group="main");
            ExitCode::FAILURE
        }
        Ok(()) => ExitCode::SUCCESS,
    }
}
