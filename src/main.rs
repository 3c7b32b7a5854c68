use clap::Parser;
use notify_relay::adapters::csv_import::import_contacts;
use notify_relay::app::{media_upload_from_path, RelayApp};
use notify_relay::config::cli::{
    BulkCommand, Command, ContactsCommand, GroupsCommand, MediaCommand, SendCommand,
    TemplatesCommand,
};
use notify_relay::config::{CliConfig, LogFormat, RelayConfig};
use notify_relay::core::membership::add_members;
use notify_relay::domain::model::{MediaKind, Phone, SendPayload, TenantId};
use notify_relay::domain::ports::RecipientStore;
use notify_relay::utils::error::Result;
use notify_relay::utils::{logger, validation::Validate};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code());
        }
    };

    // 初始化日誌
    match config.logging.format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting notify-relay");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    if !config.has_default_credentials() && config.tenants.is_empty() {
        tracing::warn!("No WhatsApp credentials configured; outbound commands will fail");
    }

    if let Err(e) = run(cli, config).await {
        tracing::error!("❌ Command failed: {} (Severity: {:?})", e, e.severity());
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());

        std::process::exit(e.severity().exit_code());
    }
}

fn load_config(cli: &CliConfig) -> Result<RelayConfig> {
    cli.validate()?;

    let mut config = match &cli.config {
        Some(path) => RelayConfig::from_file(path)?,
        None => RelayConfig::from_env()?,
    };
    if let Some(store) = &cli.store {
        config.store.path = store.clone();
    }

    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: CliConfig, config: RelayConfig) -> Result<()> {
    let tenant = cli.tenant_id();
    let app = RelayApp::open(&config).await?;

    match cli.command {
        Command::Contacts { action } => contacts(&app, action).await,
        Command::Groups { action } => groups(&app, action).await,
        Command::Send { action } => send(&app, &tenant, action).await,
        Command::Media {
            action: MediaCommand::Upload { file },
        } => {
            let upload = media_upload_from_path(&file)?;
            let handle = app.dispatcher.upload_media(&tenant, upload).await?;
            tracing::info!("✅ Uploaded {} as media {}", file.display(), handle.id);
            print_json(&handle)
        }
        Command::Templates {
            action: TemplatesCommand::List,
        } => print_json(&app.dispatcher.list_templates(&tenant).await?),
        Command::Bulk { action } => bulk(&app, &tenant, action).await,
    }
}

async fn contacts(app: &RelayApp, action: ContactsCommand) -> Result<()> {
    match action {
        ContactsCommand::Add { name, phone } => {
            let contact = app.store.add_contact(&name, &Phone::parse(&phone)?).await?;
            app.save().await?;
            print_json(&contact)
        }
        ContactsCommand::List => print_json(&app.store.list_contacts().await?),
        ContactsCommand::Import { file } => {
            let data = std::fs::read(&file)?;
            let report = import_contacts(app.store.as_ref(), &data).await?;
            app.save().await?;
            tracing::info!(
                "✅ Imported {} contacts from {} ({} row errors)",
                report.added_contacts,
                file.display(),
                report.errors.len()
            );
            print_json(&report)
        }
    }
}

async fn groups(app: &RelayApp, action: GroupsCommand) -> Result<()> {
    match action {
        GroupsCommand::Create { name } => {
            let group = app.store.create_group(&name).await?;
            app.save().await?;
            print_json(&group)
        }
        GroupsCommand::List => print_json(&app.store.list_groups().await?),
        GroupsCommand::AddMembers {
            group_id,
            contact_ids,
            phones,
        } => {
            let report = add_members(app.store.as_ref(), group_id, &contact_ids, &phones).await?;
            app.save().await?;
            print_json(&report)
        }
        GroupsCommand::Members { group_id } => print_json(&app.store.list_members(group_id).await?),
    }
}

async fn send(app: &RelayApp, tenant: &TenantId, action: SendCommand) -> Result<()> {
    let (to, payload) = match action {
        SendCommand::Text { to, text } => (to, SendPayload::text(&text)?),
        SendCommand::Template {
            to,
            name,
            language,
            params,
        } => (to, SendPayload::template(&name, &language, params)?),
        SendCommand::Media {
            to,
            media_id,
            kind,
            caption,
        } => {
            let kind: MediaKind = kind.parse()?;
            (to, SendPayload::media(&media_id, kind, caption.as_deref())?)
        }
    };

    let to = Phone::parse(&to)?;
    let response = app.dispatcher.dispatch(tenant, &to, &payload).await?;
    tracing::info!("✅ {} message sent to {}", payload.mode(), to);
    print_json(&response)
}

async fn bulk(app: &RelayApp, tenant: &TenantId, action: BulkCommand) -> Result<()> {
    match action {
        BulkCommand::Preview(args) => {
            let request = args.into_body()?.into_request()?;
            print_json(&app.coordinator.preview(tenant, &request).await?)
        }
        BulkCommand::Send(args) => {
            let request = args.into_body()?.into_request()?;

            let cancel = CancellationToken::new();
            let watcher = {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::warn!("Interrupted, skipping recipients not yet dispatched");
                        cancel.cancel();
                    }
                })
            };

            let result = app.coordinator.bulk_send(tenant, &request, &cancel).await;
            watcher.abort();

            let summary = result?;
            if summary.failed.is_empty() && summary.skipped.is_empty() {
                tracing::info!("✅ Sent to all {} recipients", summary.requested);
            }
            print_json(&summary)
        }
    }
}
