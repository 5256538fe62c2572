//! Tipos de erro normalizados do adaptador de serviços externos.
//!
//! Define [`AdapterError`]: toda falha de uma capacidade externa (transcrição,
//! tradução, síntese ou armazenamento) chega ao motor com uma destas variantes.
//! O adaptador não decide se o erro é fatal; quem decide é o estágio chamador.

use thiserror::Error;

/// Erros que podem ocorrer ao invocar uma capacidade externa.
///
/// - [`Api`](AdapterError::Api): o serviço respondeu com status de erro
/// - [`Unavailable`](AdapterError::Unavailable): falha de rede ou timeout
/// - [`Decode`](AdapterError::Decode): a resposta não pôde ser interpretada
/// - [`Endpoint`](AdapterError::Endpoint): URL do gateway inválida
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Erro retornado pelo serviço (ex.: 400 pedido inválido, 500 erro interno).
    #[error("service error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// O serviço não pôde ser alcançado (DNS, conexão recusada, timeout).
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Resposta recebida, mas em formato inesperado.
    #[error("failed to decode service response: {0}")]
    Decode(String),

    /// O endereço configurado para o gateway não é uma URL base válida.
    #[error("invalid gateway endpoint: {0}")]
    Endpoint(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AdapterError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            AdapterError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            AdapterError::Unavailable(err.to_string())
        }
    }
}
