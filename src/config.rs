//! Configuração do voxrelay carregada a partir de `voxrelay.toml`.
//!
//! A struct [`VoxrelayConfig`] contém todos os parâmetros configuráveis,
//! divididos em seções `[gateway]`, `[workflow]` e `[trigger]`.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `VOXRELAY_API_KEY` e `VOXRELAY_GATEWAY_URL` têm
//! precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::trigger::EventRule;
use crate::workflow::WorkflowConfig;

/// Nome do arquivo procurado no diretório atual quando `--config` não é dado.
pub const DEFAULT_CONFIG_FILE: &str = "voxrelay.toml";

/// Configuração de nível superior carregada de `voxrelay.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoxrelayConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub workflow: WorkflowSettings,

    #[serde(default)]
    pub trigger: TriggerSettings,
}

/// Endereço e limites de tempo do gateway de capacidades.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// URL base do gateway HTTP.
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// Chave enviada no cabeçalho `x-api-key`. Vazia desativa o cabeçalho.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Parâmetros do motor de workflow, em unidades amigáveis para TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSettings {
    /// Intervalo entre consultas ao job de transcrição.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Máximo de consultas antes de desistir com `PollTimeout`.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Limite total de uma execução.
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,

    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Idioma detectado que dispensa tradução.
    #[serde(default = "default_skip_language")]
    pub skip_language: String,
}

/// Regra de disparo: bucket monitorado e prefixo das chaves aceitas.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerSettings {
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default = "default_prefix")]
    pub prefix: String,
}

// Valor padrão para a URL do gateway: serviço local.
fn default_gateway_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

// O workflow original consulta o job a cada 30 segundos.
fn default_poll_interval_secs() -> u64 {
    30
}

// 18 tentativas de 30s deixam folga para a latência de cada consulta dentro
// do limite de 10 minutos da execução.
fn default_max_poll_attempts() -> u32 {
    18
}

fn default_execution_timeout_secs() -> u64 {
    600
}

fn default_voice() -> String {
    "Joanna".to_string()
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_skip_language() -> String {
    "en-US".to_string()
}

fn default_prefix() -> String {
    "uploads/".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            api_key: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            execution_timeout_secs: default_execution_timeout_secs(),
            voice: default_voice(),
            target_language: default_target_language(),
            skip_language: default_skip_language(),
        }
    }
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: default_prefix(),
        }
    }
}

impl GatewayConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl WorkflowSettings {
    /// Converte as configurações do arquivo na configuração do motor.
    pub fn to_workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_poll_attempts: self.max_poll_attempts,
            execution_timeout: Duration::from_secs(self.execution_timeout_secs),
            voice: self.voice.clone(),
            target_language: self.target_language.clone(),
            skip_language: self.skip_language.clone(),
        }
    }
}

impl TriggerSettings {
    pub fn to_rule(&self) -> EventRule {
        EventRule::new(self.bucket.clone(), self.prefix.clone())
    }
}

impl VoxrelayConfig {
    /// Carrega a configuração de `voxrelay.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Carrega a configuração do caminho informado, aplicando as variáveis de
    /// ambiente por cima.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<VoxrelayConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        // Variáveis de ambiente têm precedência sobre o arquivo de configuração.
        if let Some(key) = non_empty_env("VOXRELAY_API_KEY") {
            config.gateway.api_key = key;
        }
        if let Some(url) = non_empty_env("VOXRELAY_GATEWAY_URL") {
            config.gateway.url = url;
        }

        Ok(config)
    }

    /// Rejeita combinações em que o limite de consultas nunca seria atingido
    /// antes do timeout da execução.
    pub fn validate(&self) -> Result<()> {
        let workflow = self.workflow.to_workflow_config();
        if !workflow.poll_budget_fits() {
            bail!(
                "{} polls every {}s do not fit in the {}s execution timeout",
                self.workflow.max_poll_attempts,
                self.workflow.poll_interval_secs,
                self.workflow.execution_timeout_secs
            );
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = VoxrelayConfig::default();
        assert_eq!(config.gateway.url, "http://127.0.0.1:8080");
        assert!(config.gateway.api_key.is_empty());
        assert_eq!(config.workflow.poll_interval_secs, 30);
        assert_eq!(config.workflow.max_poll_attempts, 18);
        assert_eq!(config.workflow.execution_timeout_secs, 600);
        assert!(config.validate().is_ok());
        assert_eq!(config.workflow.voice, "Joanna");
        assert_eq!(config.workflow.skip_language, "en-US");
        assert_eq!(config.trigger.prefix, "uploads/");
        assert!(config.trigger.bucket.is_none());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            [workflow]
            poll_interval_secs = 5
            voice = "Matthew"

            [trigger]
            bucket = "audio-bucket"
        "#;
        let config: VoxrelayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.workflow.poll_interval_secs, 5);
        assert_eq!(config.workflow.voice, "Matthew");
        assert_eq!(config.workflow.max_poll_attempts, 18);
        assert_eq!(config.trigger.bucket.as_deref(), Some("audio-bucket"));
        assert_eq!(config.trigger.prefix, "uploads/");
        assert_eq!(config.gateway.request_timeout_secs, 120);
    }

    #[test]
    fn workflow_settings_convert_to_durations() {
        let settings = WorkflowSettings {
            poll_interval_secs: 2,
            execution_timeout_secs: 90,
            ..Default::default()
        };
        let workflow = settings.to_workflow_config();
        assert_eq!(workflow.poll_interval, Duration::from_secs(2));
        assert_eq!(workflow.execution_timeout, Duration::from_secs(90));
        assert_eq!(workflow.target_language, "en");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxrelay.toml");
        std::fs::write(&path, "[workflow]\nmax_poll_attempts = 3\n").unwrap();

        let config = VoxrelayConfig::load_from(&path).unwrap();
        assert_eq!(config.workflow.max_poll_attempts, 3);
    }

    #[test]
    fn load_from_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = VoxrelayConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.workflow.poll_interval_secs, 30);
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxrelay.toml");
        std::fs::write(&path, "[workflow\npoll_interval_secs = ").unwrap();

        assert!(VoxrelayConfig::load_from(&path).is_err());
    }

    #[test]
    fn validate_rejects_a_poll_bound_beyond_the_timeout() {
        let mut config = VoxrelayConfig::default();
        config.workflow.max_poll_attempts = 20;

        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "20 polls every 30s do not fit in the 600s execution timeout"
        );
    }

    // Único teste que mexe no ambiente do processo, para não competir com outro.
    #[test]
    fn environment_overrides_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxrelay.toml");
        std::fs::write(
            &path,
            "[gateway]\nurl = \"http://file:9000\"\napi_key = \"from-file\"\n",
        )
        .unwrap();

        // SAFETY: nenhum outro teste lê ou altera estas variáveis.
        unsafe {
            std::env::set_var("VOXRELAY_API_KEY", "from-env");
            std::env::set_var("VOXRELAY_GATEWAY_URL", "http://env:9100");
        }
        let overridden = VoxrelayConfig::load_from(&path).unwrap();

        unsafe {
            std::env::set_var("VOXRELAY_API_KEY", "");
            std::env::set_var("VOXRELAY_GATEWAY_URL", "");
        }
        let empty = VoxrelayConfig::load_from(&path).unwrap();

        unsafe {
            std::env::remove_var("VOXRELAY_API_KEY");
            std::env::remove_var("VOXRELAY_GATEWAY_URL");
        }

        assert_eq!(overridden.gateway.api_key, "from-env");
        assert_eq!(overridden.gateway.url, "http://env:9100");
        assert_eq!(empty.gateway.api_key, "from-file");
        assert_eq!(empty.gateway.url, "http://file:9000");
    }
}
