use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use stegocrypt::{
    config::Config,
    image_io, packer,
    pipeline::StegoPipeline,
    stego::{self, CapacityReport, CapacityStatus},
};
use tokio::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// StegoCrypt - hide encrypted files inside PNG images
#[derive(Parser)]
#[command(name = "stegocrypt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "STEGOCRYPT_CONFIG", default_value = "stegocrypt.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Hide a file inside a carrier image
    Hide {
        /// Carrier image (PNG, BMP or JPEG)
        carrier: PathBuf,

        /// File to hide
        payload: PathBuf,

        /// Output PNG path (defaults to <carrier>_stego.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Encryption password
        #[arg(short, long, env = "STEGOCRYPT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Recover a hidden file from a stego image
    Reveal {
        /// Stego image
        image: PathBuf,

        /// Directory to write the recovered file into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Decryption password
        #[arg(short, long, env = "STEGOCRYPT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show how much data an image can hold
    Capacity {
        /// Carrier image
        image: PathBuf,

        /// File to check against the capacity
        #[arg(long)]
        payload: Option<PathBuf>,
    },

    /// Encrypt text to Base64
    EncryptText {
        text: String,

        #[arg(short, long, env = "STEGOCRYPT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Decrypt Base64 produced by encrypt-text
    DecryptText {
        encoded: String,

        #[arg(short, long, env = "STEGOCRYPT_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Use RUST_LOG to control log level (e.g., RUST_LOG=info,stegocrypt=debug)
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(command = command_name(&cli.command), "StegoCrypt starting");

    match cli.command {
        Commands::Init => cmd_init(&cli.config).await,

        Commands::Hide {
            carrier,
            payload,
            output,
            password,
        } => cmd_hide(&cli.config, &carrier, &payload, output, &password).await,

        Commands::Reveal {
            image,
            output_dir,
            password,
        } => cmd_reveal(&cli.config, &image, &output_dir, &password).await,

        Commands::Capacity { image, payload } => cmd_capacity(&image, payload.as_deref()).await,

        Commands::EncryptText { text, password } => {
            let cfg = Config::load_with_env(Some(&cli.config))?;
            let spinner = create_spinner("Deriving key...");
            let encoded = cfg.cipher().encrypt_text(&text, &password).await?;
            spinner.finish_and_clear();
            println!("{}", encoded);
            Ok(())
        }

        Commands::DecryptText { encoded, password } => {
            let cfg = Config::load_with_env(Some(&cli.config))?;
            let spinner = create_spinner("Deriving key...");
            let text = cfg.cipher().decrypt_text(&encoded, &password).await;
            spinner.finish_and_clear();
            println!("{}", text?);
            Ok(())
        }
    }
}

/// Subcommand name for logging; never logs arguments, they may hold passwords
fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Init => "init",
        Commands::Hide { .. } => "hide",
        Commands::Reveal { .. } => "reveal",
        Commands::Capacity { .. } => "capacity",
        Commands::EncryptText { .. } => "encrypt-text",
        Commands::DecryptText { .. } => "decrypt-text",
    }
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Write a default configuration file
async fn cmd_init(config_path: &str) -> Result<()> {
    if fs::try_exists(config_path).await.unwrap_or(false) {
        anyhow::bail!(
            "Configuration file '{}' already exists. Remove it first or use a different path.",
            config_path
        );
    }

    let cfg = Config::default();
    let config_json = serde_json::to_string_pretty(&cfg)?;
    fs::write(config_path, config_json)
        .await
        .with_context(|| format!("writing config to '{}'", config_path))?;

    println!("Initialization complete!");
    println!("Config:          {}", config_path);
    println!("Cipher variant:  {}", cfg.cipher_variant);
    println!("Compression:     {}", cfg.compress);
    println!("KDF iterations:  {}", cfg.kdf_iterations);

    Ok(())
}

/// Hide a file inside a carrier image
async fn cmd_hide(
    config_path: &str,
    carrier_path: &Path,
    payload_path: &Path,
    output: Option<PathBuf>,
    password: &str,
) -> Result<()> {
    let cfg = Config::load_with_env(Some(config_path))?;
    let pipeline = StegoPipeline::from_config(&cfg);

    let carrier = image_io::load_carrier(carrier_path)?;
    let file = packer::read_file(payload_path).await?;

    let estimate = StegoPipeline::estimate_payload_size(file.data.len(), &file.filename);
    let report = CapacityReport::new(carrier.width(), carrier.height(), estimate);
    if report.status == CapacityStatus::Error {
        eprintln!(
            "Warning: {} may not fit ({} estimated, {} available)",
            file.filename,
            stego::format_bytes(estimate as u64),
            stego::format_bytes(report.capacity as u64)
        );
    }

    let spinner = create_spinner(&format!("Hiding {}...", file.filename));
    let result = pipeline.conceal(&carrier, &file, password).await;
    let result = match result {
        Ok(r) => r,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    let output_path = output.unwrap_or_else(|| image_io::stego_output_name(carrier_path));
    image_io::save_png(&result.image, &output_path)?;

    let used = CapacityReport::new(carrier.width(), carrier.height(), result.original_size);
    spinner.finish_with_message(format!(
        "Hidden {} in {} ({} of {} used, {:.1}%)",
        file.filename,
        output_path.display(),
        stego::format_bytes(result.original_size as u64),
        stego::format_bytes(used.capacity as u64),
        used.usage_percent
    ));
    println!("Share the PNG as-is: re-encoding it (e.g. as JPEG) destroys the hidden data.");
    Ok(())
}

/// Recover a hidden file
async fn cmd_reveal(config_path: &str, image_path: &Path, output_dir: &Path, password: &str) -> Result<()> {
    let cfg = Config::load_with_env(Some(config_path))?;
    let pipeline = StegoPipeline::from_config(&cfg);

    let image = image_io::load_carrier(image_path)?;

    let spinner = create_spinner("Extracting and decrypting...");
    let file = match pipeline.reveal(&image, password).await {
        Ok(f) => f,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    // Only the final path component of the embedded name is trusted
    let name = Path::new(&file.filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "recovered.bin".to_string());

    fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let out_path = output_dir.join(&name);
    fs::write(&out_path, &file.data)
        .await
        .with_context(|| format!("writing {}", out_path.display()))?;

    spinner.finish_with_message(format!(
        "Recovered {} ({}, {}) -> {}",
        name,
        file.type_description(),
        stego::format_bytes(file.data.len() as u64),
        out_path.display()
    ));
    Ok(())
}

/// Show capacity of an image, optionally against a payload
async fn cmd_capacity(image_path: &Path, payload: Option<&Path>) -> Result<()> {
    let image = image_io::load_carrier(image_path)?;
    let capacity = image.capacity();

    println!("Image:     {} ({}x{})", image_path.display(), image.width(), image.height());
    println!("Capacity:  {} ({} bytes)", stego::format_bytes(capacity as u64), capacity);

    if let Some(payload_path) = payload {
        let size = fs::metadata(payload_path)
            .await
            .with_context(|| format!("reading metadata for {}", payload_path.display()))?
            .len() as usize;
        let name = payload_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let estimate = StegoPipeline::estimate_payload_size(size, &name);
        let report = CapacityReport::new(image.width(), image.height(), estimate);

        println!();
        println!("Payload:   {} ({})", payload_path.display(), stego::format_bytes(size as u64));
        println!("Estimated: {} ({:.1}% of capacity)", stego::format_bytes(estimate as u64), report.usage_percent);
        let remaining = if report.remaining >= 0 {
            stego::format_bytes(report.remaining as u64)
        } else {
            format!("-{}", stego::format_bytes(report.remaining.unsigned_abs()))
        };
        println!("Remaining: {}", remaining);
        println!(
            "Status:    {}",
            match report.status {
                CapacityStatus::Ok => "fits",
                CapacityStatus::Warning => "fits, but close to the limit",
                CapacityStatus::Error => "too large for this image",
            }
        );
    }

    Ok(())
}
