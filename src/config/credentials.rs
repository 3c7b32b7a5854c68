use crate::config::toml_config::RelayConfig;
use crate::domain::model::{ProviderCredentials, TenantId};
use crate::domain::ports::CredentialProvider;
use crate::utils::error::{RelayError, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// Read-only credential sets taken from configuration.
///
/// The `[provider]` section backs the default tenant, `[tenants.<id>]`
/// sections back the others.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredCredentials {
    tenants: HashMap<TenantId, ProviderCredentials>,
}

impl ConfiguredCredentials {
    pub fn from_config(config: &RelayConfig) -> Self {
        let mut tenants = HashMap::new();

        if let (Some(phone_number_id), Some(access_token)) = (
            config.provider.phone_number_id.clone(),
            config.provider.access_token.clone(),
        ) {
            tenants.insert(
                TenantId::default_tenant(),
                ProviderCredentials {
                    phone_number_id,
                    access_token,
                    business_account_id: config.provider.business_account_id.clone(),
                },
            );
        }

        for (tenant, creds) in &config.tenants {
            tenants.insert(
                TenantId(tenant.clone()),
                ProviderCredentials {
                    phone_number_id: creds.phone_number_id.trim().to_string(),
                    access_token: creds.access_token.trim().to_string(),
                    business_account_id: creds.business_account_id.clone(),
                },
            );
        }

        Self { tenants }
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }
}

#[async_trait]
impl CredentialProvider for ConfiguredCredentials {
    async fn credentials_for(&self, tenant: &TenantId) -> Result<ProviderCredentials> {
        self.tenants
            .get(tenant)
            .filter(|c| !c.phone_number_id.is_empty() && !c.access_token.is_empty())
            .cloned()
            .ok_or_else(|| {
                RelayError::config(format!(
                    "WhatsApp credentials are not configured for tenant '{}'",
                    tenant
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_and_named_tenants() {
        let config = RelayConfig::from_toml_str(
            r#"
[provider]
phone_number_id = "1234"
access_token = "main-token"

[tenants.acme]
phone_number_id = "9999"
access_token = "acme-token"
business_account_id = "waba-acme"
"#,
        )
        .unwrap();
        let credentials = ConfiguredCredentials::from_config(&config);
        assert_eq!(credentials.tenant_count(), 2);

        let default = credentials
            .credentials_for(&TenantId::default_tenant())
            .await
            .unwrap();
        assert_eq!(default.phone_number_id, "1234");

        let acme = credentials
            .credentials_for(&TenantId("acme".into()))
            .await
            .unwrap();
        assert_eq!(acme.access_token, "acme-token");
        assert_eq!(acme.template_account_id(), "waba-acme");
    }

    #[tokio::test]
    async fn test_unconfigured_tenant_is_config_error() {
        let credentials = ConfiguredCredentials::from_config(&RelayConfig::default());
        let err = credentials
            .credentials_for(&TenantId::default_tenant())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::ConfigError { .. }));
    }
}
