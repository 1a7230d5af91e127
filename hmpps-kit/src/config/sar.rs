use confique::Config;

/// Subject access request endpoint settings
#[derive(Debug, Config, Clone)]
pub struct SarConfig {
    /// Role accepted in addition to `SAR_DATA_ACCESS`
    #[config(env = "HMPPS_SAR_ADDITIONAL_ACCESS_ROLE")]
    pub additional_access_role: Option<String>,

    #[config(nested)]
    pub template: SarTemplateConfig,
}

/// Settings for the static template served at `/subject-access-request/template`
#[derive(Debug, Config, Clone)]
pub struct SarTemplateConfig {
    /// Expose the template endpoint (default: false)
    #[config(env = "HMPPS_SAR_TEMPLATE_ENABLED", default = false)]
    pub enabled: bool,

    /// Path to the template file, mandatory when the endpoint is enabled
    #[config(env = "HMPPS_SAR_TEMPLATE_PATH")]
    pub path: Option<String>,
}

impl SarConfig {
    /// Roles allowed to call the subject access request endpoint
    pub fn access_roles(&self) -> Vec<String> {
        let mut roles = vec![crate::sar::SAR_DATA_ACCESS_ROLE.to_string()];
        if let Some(role) = self
            .additional_access_role
            .as_deref()
            .map(str::trim)
            .filter(|role| !role.is_empty())
        {
            roles.push(role.to_string());
        }
        roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(additional: Option<&str>) -> SarConfig {
        SarConfig {
            additional_access_role: additional.map(str::to_string),
            template: SarTemplateConfig {
                enabled: false,
                path: None,
            },
        }
    }

    #[test]
    fn test_access_roles_default() {
        assert_eq!(config(None).access_roles(), vec!["SAR_DATA_ACCESS"]);
    }

    #[test]
    fn test_access_roles_with_additional_role() {
        assert_eq!(
            config(Some("ROLE_EXTRA")).access_roles(),
            vec!["SAR_DATA_ACCESS", "ROLE_EXTRA"]
        );
    }

    #[test]
    fn test_access_roles_ignores_blank_additional_role() {
        assert_eq!(config(Some("  ")).access_roles(), vec!["SAR_DATA_ACCESS"]);
    }
}
