//! Interface de linha de comando do voxrelay baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, poll, demo)
//! e flags globais (--config, --verbose, --json-logs, --poll-interval,
//! --max-poll-attempts).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// voxrelay: transcreve, traduz e re-sintetiza áudio enviado a um bucket.
#[derive(Debug, Parser)]
#[command(name = "voxrelay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./voxrelay.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Emite logs estruturados em JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json_logs: bool,

    /// Intervalo entre consultas ao job, em segundos.
    #[arg(long, global = true)]
    pub poll_interval: Option<u64>,

    /// Número máximo de consultas ao job de transcrição.
    #[arg(long, global = true)]
    pub max_poll_attempts: Option<u32>,
}

/// Origem do evento de disparo: par bucket/chave ou arquivo JSON.
#[derive(Debug, Args)]
#[group(required = true, multiple = true)]
pub struct TriggerArgs {
    /// Bucket do objeto enviado.
    #[arg(long, requires = "key", conflicts_with = "event")]
    pub bucket: Option<String>,

    /// Chave do objeto enviado (ex.: uploads/aula.wav).
    #[arg(long, conflicts_with = "event")]
    pub key: Option<String>,

    /// Arquivo JSON com o evento de criação de objeto.
    #[arg(long)]
    pub event: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o workflow para um objeto enviado, usando o gateway HTTP.
    Run {
        #[command(flatten)]
        trigger: TriggerArgs,
    },

    /// Consulta um job de transcrição até ele terminar.
    Poll {
        /// Nome do job (ex.: uploads/aula.wav_job).
        job_name: String,
    },

    /// Executa a demonstração embutida contra um adaptador simulado.
    Demo {
        /// Idioma que a transcrição simulada vai detectar.
        #[arg(long, default_value = "fr-FR")]
        language: String,

        /// Quantas consultas retornam IN_PROGRESS antes de concluir.
        #[arg(long, default_value_t = 2)]
        pending_polls: usize,
    },
}
