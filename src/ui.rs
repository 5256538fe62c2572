//! Interface de terminal do voxrelay: spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`ExecutionProgress`] acompanha visualmente
//! uma execução do workflow no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::VoxrelayError;
use crate::workflow::{ExecutionOutcome, ExecutionRecord, State};

/// Indicador visual de progresso para uma execução no terminal.
///
/// Exibe um spinner com o estado atual e mensagens coloridas para
/// sucesso (verde) e falha (vermelho).
pub struct ExecutionProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    dim: Style,
}

impl ExecutionProgress {
    /// Inicia o spinner com a chave do objeto e retorna a instância de progresso.
    pub fn start(key: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Preprocess: {key}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Retorna um observador que atualiza o spinner a cada estado visitado,
    /// pronto para [`Engine::with_observer`](crate::workflow::Engine::with_observer).
    pub fn observer(&self) -> impl Fn(State) + Send + Sync + 'static {
        let pb = self.pb.clone();
        let dim = self.dim.clone();
        move |state| {
            if state == State::Wait {
                pb.println(format!("  {} waiting for transcription", dim.apply_to("…")));
            }
            pb.set_message(state.to_string());
        }
    }

    /// Finaliza o spinner e exibe o resultado final da execução.
    pub fn complete(&self, outcome: &ExecutionOutcome) {
        self.pb.finish_and_clear();
        match outcome {
            ExecutionOutcome::Success { artifact_key } => {
                println!("  {} Stored {artifact_key}", self.green.apply_to("✓"));
            }
            ExecutionOutcome::Failure(failure) => {
                println!("  {} {failure}", self.red.apply_to("✗"));
            }
        }
    }
}

/// Imprime o registro da execução formatado em JSON com estilo colorido.
pub fn print_record(record: &ExecutionRecord) -> Result<(), VoxrelayError> {
    let json = serde_json::to_string_pretty(record)?;
    let style = if record.outcome.is_success() {
        Style::new().green().bold()
    } else {
        Style::new().red().bold()
    };
    println!();
    println!("{}", style.apply_to("─── Execution Record ───"));
    println!("{json}");
    Ok(())
}
