//! gcm - dispatch push messages and manage the device registry.

mod config;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use color_eyre::eyre::{WrapErr as _, bail};
use gcm_core::{Device, MessageStatus, SendOptions};
use gcm_push::HttpGateway;
use gcm_service::{Dispatcher, SendReport, mark_inactive};
use gcm_storage::{DeviceFilter, DeviceStore as _, MessageStore as _, SqliteStorage};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "gcm")]
#[command(about = "Push message dispatch and device registry", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message
    #[command(group(
        ArgGroup::new("target")
            .required(true)
            .args(["topic", "device", "all_active"]),
    ))]
    Send {
        /// JSON payload delivered as the message data
        #[arg(long)]
        data: String,

        /// Send to a topic
        #[arg(long)]
        topic: Option<String>,

        /// Send to registered devices by id
        #[arg(long, num_args = 1..)]
        device: Vec<String>,

        /// Send to every active device
        #[arg(long)]
        all_active: bool,

        #[arg(long)]
        collapse_key: Option<String>,

        /// Ask the gateway to validate without delivering
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage registered devices
    Devices {
        #[command(subcommand)]
        command: DeviceCommands,
    },

    /// Inspect message records
    Messages {
        #[command(subcommand)]
        command: MessageCommands,
    },
}

#[derive(Subcommand)]
enum DeviceCommands {
    /// List devices
    List {
        /// Only active devices
        #[arg(long)]
        active: bool,
    },

    /// Register or update a device
    Add {
        device_id: String,
        token: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        active: bool,
    },

    /// Deactivate a device
    Deactivate { device_id: String },
}

#[derive(Subcommand)]
enum MessageCommands {
    /// List messages still awaiting a gateway reply
    Pending,
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).wrap_err("failed to load config")?;

    let storage =
        SqliteStorage::new(&config.database.url).wrap_err("failed to initialize storage")?;

    storage
        .run_migrations()
        .wrap_err("failed to run migrations")?;

    match cli.command {
        Commands::Send {
            data,
            topic,
            device,
            all_active,
            collapse_key,
            dry_run,
        } => {
            let payload: serde_json::Value =
                serde_json::from_str(&data).wrap_err("--data is not valid JSON")?;

            let mut options = SendOptions {
                collapse_key,
                ..SendOptions::default()
            };
            if dry_run {
                options.dry_run = Some(true);
            }

            let gateway = HttpGateway::new(config.gateway.to_gateway_config()?);
            let dispatcher = Dispatcher::new(storage, gateway)
                .with_status_policy(config.dispatch.status_policy)
                .with_failure_rule(config.dispatch.failure_rule);

            let report = if let Some(topic) = topic {
                Some(dispatcher.send_to_topic(&topic, &payload, options).await?)
            } else {
                let filter = if all_active {
                    DeviceFilter::all().active(true)
                } else {
                    DeviceFilter::by_ids(&device)
                };
                dispatcher
                    .send_to_filtered(&filter, &payload, options)
                    .await?
            };

            cmd_report(report)?;
        }
        Commands::Devices { command } => match command {
            DeviceCommands::List { active } => {
                let filter = if active {
                    DeviceFilter::all().active(true)
                } else {
                    DeviceFilter::all()
                };

                for device in storage.filter_devices(&filter)? {
                    println!(
                        "{}\t{}\t{}\t{}",
                        device.device_id,
                        if device.is_active { "active" } else { "inactive" },
                        device.display_name.as_deref().unwrap_or("-"),
                        device.registration_token,
                    );
                }
            }
            DeviceCommands::Add {
                device_id,
                token,
                name,
                active,
            } => {
                let mut device = Device::new(device_id, token).with_active(active);
                if let Some(name) = name {
                    device = device.with_display_name(name);
                }

                storage.save_device(&device)?;
                println!("registered {}", device);
            }
            DeviceCommands::Deactivate { device_id } => {
                let Some(mut device) = storage.find_device(&device_id)? else {
                    bail!("unknown device {}", device_id);
                };

                mark_inactive(&storage, &mut device, None)?;
                println!("deactivated {}", device);
            }
        },
        Commands::Messages { command } => match command {
            MessageCommands::Pending => {
                for message in storage.messages_with_status(MessageStatus::Pending)? {
                    println!(
                        "{}\t{}\t{} devices\t{}",
                        message.id,
                        message.created_at.to_rfc3339(),
                        message.devices.len(),
                        message.payload,
                    );
                }
            }
        },
    }

    Ok(())
}

fn cmd_report(report: Option<SendReport>) -> color_eyre::eyre::Result<()> {
    let Some(report) = report else {
        println!("no matching devices, nothing sent");
        return Ok(());
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).wrap_err("failed to render report")?
    );

    if report.status == MessageStatus::Failed {
        bail!("message {} failed", report.message_id);
    }

    Ok(())
}
