//! Binary entry point for the skiff CLI.

mod cli;

use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use cli::{Cli, CreateCommand};
use skiff::{
    ConfigError, CreateRequest, DigitalOceanClient, DigitalOceanConfig, Droplet, FileInventory,
    Instance, Inventory, InventoryError, Lifecycle, LifecycleError, LifecycleSettings, Resource,
    SshKey,
};

type App = Lifecycle<DigitalOceanClient, FileInventory>;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error("instance {0} is not in the inventory")]
    UnknownInstance(String),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

fn build_app() -> Result<App, CliError> {
    let config = DigitalOceanConfig::load_without_cli_args()?;
    config.validate()?;
    let client = DigitalOceanClient::new(&config)?;
    let inventory = FileInventory::new(config.inventory_path());
    Ok(Lifecycle::new(
        client,
        inventory,
        LifecycleSettings::from_config(&config),
    ))
}

fn lookup(app: &App, name: &str) -> Result<Instance, CliError> {
    app.inventory()
        .get(name)?
        .ok_or_else(|| CliError::UnknownInstance(name.to_owned()))
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let app = build_app()?;
    let stdout = io::stdout();
    match cli {
        Cli::Create(command) => {
            let instance = create(&app, command).await?;
            writeln!(stdout.lock(), "created {} at {}", instance.name, instance.ip)?;
        }
        Cli::Destroy(arg) => {
            let instance = lookup(&app, &arg.name)?;
            app.destroy(&instance).await?;
            app.inventory().remove(&instance.name)?;
            writeln!(stdout.lock(), "destroyed {}", instance.name)?;
        }
        Cli::Boot(arg) => {
            let instance = lookup(&app, &arg.name)?;
            write_state(stdout.lock(), &instance, &app.boot(&instance).await?)?;
        }
        Cli::Shutdown(arg) => {
            let instance = lookup(&app, &arg.name)?;
            write_state(stdout.lock(), &instance, &app.shutdown(&instance).await?)?;
        }
        Cli::Reboot(arg) => {
            let instance = lookup(&app, &arg.name)?;
            write_state(stdout.lock(), &instance, &app.reboot(&instance).await?)?;
        }
        Cli::Rebuild(command) => {
            let instance = lookup(&app, &command.name)?;
            let droplet = app.rebuild(&instance, &command.image).await?;
            write_state(stdout.lock(), &instance, &droplet)?;
        }
        Cli::Resize(command) => {
            let instance = lookup(&app, &command.name)?;
            let droplet = app.resize(&instance, &command.size).await?;
            write_state(stdout.lock(), &instance, &droplet)?;
        }
        Cli::Snapshot(command) => {
            let instance = lookup(&app, &command.name)?;
            let droplet = app.snapshot(&instance, &command.snapshot_name).await?;
            write_state(stdout.lock(), &instance, &droplet)?;
        }
        Cli::Sync(arg) => {
            let instance = lookup(&app, &arg.name)?;
            write_state(stdout.lock(), &instance, &app.sync(&instance).await?)?;
        }
        Cli::Instances => write_droplets(stdout.lock(), &app.instances().await?)?,
        Cli::Images => write_resources(stdout.lock(), &app.images().await?)?,
        Cli::Sizes => write_resources(stdout.lock(), &app.sizes().await?)?,
        Cli::Regions => write_resources(stdout.lock(), &app.regions().await?)?,
        Cli::Snapshots => write_resources(stdout.lock(), &app.snapshots().await?)?,
        Cli::Keys => write_keys(stdout.lock(), &app.keys().await?)?,
    }
    Ok(())
}

async fn create(app: &App, command: CreateCommand) -> Result<Instance, CliError> {
    if app.inventory().get(&command.name)?.is_some() {
        return Err(InventoryError::DuplicateInstance { name: command.name }.into());
    }

    let request = CreateRequest {
        name: command.name,
        image: command.image,
        size: command.size,
        region: command.region,
        public_key: command.ssh_pub_key.map(Utf8PathBuf::from),
        ssh_key: command.ssh_key,
        ssh_port: command.ssh_port,
        backups: command.backups_enabled,
        private_networking: command.private_networking,
    };
    let instance = app.create(&request).await?;
    app.inventory().insert(instance.clone())?;
    Ok(instance)
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn write_state(mut target: impl Write, instance: &Instance, droplet: &Droplet) -> io::Result<()> {
    writeln!(
        target,
        "{}\t{}\t{}",
        instance.name,
        droplet.status,
        or_dash(droplet.first_ipv4())
    )
}

fn write_droplets(mut target: impl Write, droplets: &[Droplet]) -> io::Result<()> {
    for droplet in droplets {
        writeln!(
            target,
            "{}\t{}\t{}\t{}",
            droplet.id,
            droplet.name,
            droplet.status,
            or_dash(droplet.first_ipv4())
        )?;
    }
    Ok(())
}

fn write_resources(mut target: impl Write, resources: &[Resource]) -> io::Result<()> {
    for resource in resources {
        let id = resource
            .id
            .as_ref()
            .map_or_else(|| String::from("-"), ToString::to_string);
        writeln!(
            target,
            "{id}\t{}\t{}",
            or_dash(resource.name.as_deref()),
            or_dash(resource.slug.as_deref())
        )?;
    }
    Ok(())
}

fn write_keys(mut target: impl Write, keys: &[SshKey]) -> io::Result<()> {
    for key in keys {
        writeln!(
            target,
            "{}\t{}\t{}",
            key.id,
            key.name,
            or_dash(key.fingerprint.as_deref())
        )?;
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
