//! Server configuration, read from TOML.
//!
//! Every field has a default, so an empty document is a valid config:
//!
//! ```toml
//! [diagnostics]
//! source = "Ariadne"
//! related_information = "auto"   # auto | always | never
//! call_information = true
//!
//! [hover]
//! format = "auto"                # auto | plaintext | markdown
//!
//! [logging]
//! filter = "ariadne_lsp=info,ariadne_core=info"
//! ```

use std::path::{Path, PathBuf};

use lsp_types::{ClientCapabilities, MarkupKind};
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_LOG_FILTER: &str = "ariadne_lsp=info,ariadne_core=info";

/// File name looked up by [`ServerConfig::find`].
pub const CONFIG_FILE: &str = "ariadne.toml";

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub diagnostics: DiagnosticsSection,
    pub hover: HoverSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DiagnosticsSection {
    /// Source tag of the synthetic call-information diagnostics.
    pub source: String,
    pub related_information: Toggle,
    pub call_information: bool,
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            source: ariadne_core::DEFAULT_SOURCE.to_string(),
            related_information: Toggle::Auto,
            call_information: true,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct HoverSection {
    pub format: HoverFormat,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSection {
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HoverFormat {
    #[default]
    Auto,
    Plaintext,
    Markdown,
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Nearest `ariadne.toml` in `start` or one of its parents.
    pub fn find(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// The configuration at `explicit`, else the nearest `ariadne.toml` from
    /// the working directory, else the defaults. Returns the file used.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Option<PathBuf>, Self), ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::current_dir()
                .ok()
                .and_then(|dir| Self::find(&dir)),
        };
        match path {
            Some(path) => {
                let config = Self::load(&path)?;
                Ok((Some(path), config))
            }
            None => Ok((None, Self::default())),
        }
    }

    /// Resolve the options that depend on what the client declared.
    pub fn client_options(&self, capabilities: &ClientCapabilities) -> ClientOptions {
        let text = capabilities.text_document.as_ref();

        let client_related = text
            .and_then(|t| t.publish_diagnostics.as_ref())
            .and_then(|p| p.related_information)
            .unwrap_or(false);
        let related_information = match self.diagnostics.related_information {
            Toggle::Auto => client_related,
            Toggle::Always => true,
            Toggle::Never => false,
        };

        let client_markdown = text
            .and_then(|t| t.hover.as_ref())
            .and_then(|h| h.content_format.as_ref())
            .and_then(|formats| formats.first())
            .is_some_and(|kind| *kind == MarkupKind::Markdown);
        let hover_markdown = match self.hover.format {
            HoverFormat::Auto => client_markdown,
            HoverFormat::Plaintext => false,
            HoverFormat::Markdown => true,
        };

        ClientOptions {
            related_information,
            hover_markdown,
            call_information: self.diagnostics.call_information,
        }
    }
}

/// Options in effect for the connected client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientOptions {
    pub related_information: bool,
    pub hover_markdown: bool,
    pub call_information: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::{
        HoverClientCapabilities, PublishDiagnosticsClientCapabilities,
        TextDocumentClientCapabilities,
    };

    fn capabilities(related: bool, formats: Vec<MarkupKind>) -> ClientCapabilities {
        ClientCapabilities {
            text_document: Some(TextDocumentClientCapabilities {
                publish_diagnostics: Some(PublishDiagnosticsClientCapabilities {
                    related_information: Some(related),
                    ..Default::default()
                }),
                hover: Some(HoverClientCapabilities {
                    dynamic_registration: None,
                    content_format: Some(formats),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.diagnostics.source, "Ariadne");
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn parses_every_section() {
        let config = ServerConfig::from_toml_str(
            r#"
[diagnostics]
source = "wala"
related_information = "never"
call_information = false

[hover]
format = "markdown"

[logging]
filter = "ariadne_lsp=debug"
"#,
        )
        .unwrap();
        assert_eq!(config.diagnostics.source, "wala");
        assert_eq!(config.diagnostics.related_information, Toggle::Never);
        assert!(!config.diagnostics.call_information);
        assert_eq!(config.hover.format, HoverFormat::Markdown);
        assert_eq!(config.logging.filter, "ariadne_lsp=debug");
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ariadne-config-{}-{name}", std::process::id()));
        std::fs::create_dir_all(dir.join("src").join("pkg")).unwrap();
        dir
    }

    #[test]
    fn nearest_config_file_is_found_from_nested_directories() {
        let root = scratch_dir("find");
        std::fs::write(root.join(CONFIG_FILE), "[hover]\nformat = \"markdown\"\n").unwrap();

        let found = ServerConfig::find(&root.join("src").join("pkg")).unwrap();
        assert_eq!(found, root.join(CONFIG_FILE));
        let (used, config) = ServerConfig::resolve(Some(&found)).unwrap();
        assert_eq!(used.as_deref(), Some(found.as_path()));
        assert_eq!(config.hover.format, HoverFormat::Markdown);

        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let root = scratch_dir("missing");
        let err = ServerConfig::resolve(Some(&root.join(CONFIG_FILE))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn rejects_unknown_toggle_values() {
        assert!(ServerConfig::from_toml_str("[hover]\nformat = \"html\"\n").is_err());
    }

    #[test]
    fn auto_follows_client_capabilities() {
        let config = ServerConfig::default();
        let options = config.client_options(&capabilities(
            true,
            vec![MarkupKind::Markdown, MarkupKind::PlainText],
        ));
        assert!(options.related_information);
        assert!(options.hover_markdown);

        let options = config.client_options(&ClientCapabilities::default());
        assert!(!options.related_information);
        assert!(!options.hover_markdown);
    }

    #[test]
    fn first_declared_hover_format_wins() {
        let config = ServerConfig::default();
        let options = config.client_options(&capabilities(
            false,
            vec![MarkupKind::PlainText, MarkupKind::Markdown],
        ));
        assert!(!options.hover_markdown);
    }

    #[test]
    fn overrides_beat_client_capabilities() {
        let mut config = ServerConfig::default();
        config.diagnostics.related_information = Toggle::Never;
        config.hover.format = HoverFormat::Plaintext;
        let options = config.client_options(&capabilities(true, vec![MarkupKind::Markdown]));
        assert!(!options.related_information);
        assert!(!options.hover_markdown);
    }
}
