use crate::config::SarTemplateConfig;
use log::{error, info};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SarConfigError {
    #[error("Mandatory configuration blank/missing: HMPPS services implementing a subject access request service MUST provide a configuration value for 'sar.template.path'")]
    MissingTemplatePath,
    #[error("Invalid subject access request configuration. Configured subject access request template file: 'sar.template.path={0}' not found")]
    TemplateNotFound(String),
}

/// Template used by the SAR service to render this service's data into the report
#[derive(Debug, Clone)]
pub struct SarTemplate {
    path: PathBuf,
}

impl SarTemplate {
    /// `Ok(None)` when the template endpoint is disabled. When enabled the
    /// path must be set and point at an existing file.
    pub fn load(config: &SarTemplateConfig) -> Result<Option<Self>, SarConfigError> {
        if !config.enabled {
            return Ok(None);
        }
        let path = config
            .path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .ok_or(SarConfigError::MissingTemplatePath)?;
        if !Path::new(path).is_file() {
            return Err(SarConfigError::TemplateNotFound(path.to_string()));
        }
        info!("Serving subject access request template from {}", path);
        Ok(Some(Self {
            path: PathBuf::from(path),
        }))
    }

    /// Reads the file afresh on every call
    pub async fn read(&self) -> std::io::Result<String> {
        tokio::fs::read_to_string(&self.path).await.inspect_err(|err| {
            error!(
                "error getting subject access request template: path={}: {}",
                self.path.display(),
                err
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config(enabled: bool, path: Option<&str>) -> SarTemplateConfig {
        SarTemplateConfig {
            enabled,
            path: path.map(str::to_string),
        }
    }

    #[test]
    fn test_disabled_template() {
        assert!(SarTemplate::load(&config(false, None)).unwrap().is_none());
    }

    #[test]
    fn test_blank_path() {
        assert_eq!(
            SarTemplate::load(&config(true, Some("  "))).unwrap_err(),
            SarConfigError::MissingTemplatePath
        );
        let err = SarTemplate::load(&config(true, None)).unwrap_err();
        assert!(err.to_string().starts_with("Mandatory configuration blank/missing"));
    }

    #[test]
    fn test_missing_file() {
        let err =
            SarTemplate::load(&config(true, Some("/no/such/template.mustache"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid subject access request configuration. Configured subject access request template file: 'sar.template.path=/no/such/template.mustache' not found"
        );
    }

    #[tokio::test]
    async fn test_reads_template() {
        let dir = std::env::temp_dir().join(format!("sar-template-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("template.mustache");
        fs::write(&file, "<h1>{{prisonerNumber}}</h1>").unwrap();

        let template = SarTemplate::load(&config(true, file.to_str())).unwrap().unwrap();
        assert_eq!(template.read().await.unwrap(), "<h1>{{prisonerNumber}}</h1>");

        fs::remove_file(&file).unwrap();
        assert!(template.read().await.is_err());
    }
}
