use crate::core::request::BulkSendBody;
use crate::domain::model::{ContactId, GroupId, TenantId};
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "notify-relay")]
#[command(about = "WhatsApp notification relay: contacts, groups and bulk sends")]
pub struct CliConfig {
    #[arg(long, short, global = true, help = "TOML config file (environment variables are used when omitted)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Override the recipient store snapshot path")]
    pub store: Option<String>,

    #[arg(long, global = true, default_value = TenantId::DEFAULT, help = "Tenant whose credentials are used")]
    pub tenant: String,

    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Manage contacts
    Contacts {
        #[command(subcommand)]
        action: ContactsCommand,
    },
    /// Manage groups and their members
    Groups {
        #[command(subcommand)]
        action: GroupsCommand,
    },
    /// Send one message to one recipient
    Send {
        #[command(subcommand)]
        action: SendCommand,
    },
    /// Upload media to the provider
    Media {
        #[command(subcommand)]
        action: MediaCommand,
    },
    /// Inspect message templates
    Templates {
        #[command(subcommand)]
        action: TemplatesCommand,
    },
    /// Preview or send to many recipients
    Bulk {
        #[command(subcommand)]
        action: BulkCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ContactsCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
    },
    List,
    /// Import a CSV with headers name,phone[,group]
    Import { file: PathBuf },
}

#[derive(Debug, Clone, Subcommand)]
pub enum GroupsCommand {
    Create {
        #[arg(long)]
        name: String,
    },
    List,
    AddMembers {
        #[arg(long)]
        group_id: GroupId,
        #[arg(long, value_delimiter = ',')]
        contact_ids: Vec<ContactId>,
        #[arg(long, value_delimiter = ',')]
        phones: Vec<String>,
    },
    Members { group_id: GroupId },
}

#[derive(Debug, Clone, Subcommand)]
pub enum SendCommand {
    Text {
        #[arg(long)]
        to: String,
        #[arg(long)]
        text: String,
    },
    Template {
        #[arg(long)]
        to: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "en_US")]
        language: String,
        #[arg(long = "param", help = "Body parameter, repeat in order")]
        params: Vec<String>,
    },
    Media {
        #[arg(long)]
        to: String,
        #[arg(long)]
        media_id: String,
        #[arg(long, default_value = "document")]
        kind: String,
        #[arg(long)]
        caption: Option<String>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum MediaCommand {
    Upload { file: PathBuf },
}

#[derive(Debug, Clone, Subcommand)]
pub enum TemplatesCommand {
    List,
}

#[derive(Debug, Clone, Subcommand)]
pub enum BulkCommand {
    Preview(BulkArgs),
    Send(BulkArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct BulkArgs {
    #[arg(long, help = "JSON request body file; replaces the flags below")]
    pub request: Option<PathBuf>,

    #[arg(long, help = "text | template | media")]
    pub mode: Option<String>,
    #[arg(long)]
    pub text: Option<String>,
    #[arg(long)]
    pub template_name: Option<String>,
    #[arg(long, default_value = "en_US")]
    pub language: String,
    #[arg(long = "param")]
    pub params: Vec<String>,
    #[arg(long)]
    pub media_id: Option<String>,
    #[arg(long, help = "image | video | audio | document (default document)")]
    pub media_type: Option<String>,
    #[arg(long)]
    pub caption: Option<String>,

    #[arg(long, value_delimiter = ',')]
    pub phones: Vec<String>,
    #[arg(long)]
    pub group_id: Option<GroupId>,
}

impl BulkArgs {
    pub fn into_body(self) -> Result<BulkSendBody> {
        if let Some(path) = self.request {
            let data = std::fs::read(&path)?;
            return BulkSendBody::from_json(&data);
        }

        let mode = self
            .mode
            .ok_or_else(|| RelayError::validation("mode", "--mode or --request is required"))?;

        Ok(BulkSendBody {
            mode,
            text: self.text,
            template_name: self.template_name,
            language: Some(self.language),
            parameters: self.params,
            media_id: self.media_id,
            media_type: self.media_type,
            caption: self.caption,
            phones: self.phones,
            group_id: self.group_id,
        })
    }
}

impl CliConfig {
    pub fn tenant_id(&self) -> TenantId {
        TenantId(self.tenant.trim().to_string())
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("tenant", &self.tenant)?;
        if let Some(store) = &self.store {
            crate::utils::validation::validate_path("store", store)?;
        }
        Ok(())
    }
}
