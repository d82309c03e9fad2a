use crate::{
    lang::ParseError, middleware::LanguageError, planning::PlanningError, policy::PolicyError,
    rules::RegistryError, serve::ProtocolError,
};

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Configuration, raised before any search starts
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Planning(#[from] PlanningError),
    #[error(transparent)]
    Language(#[from] LanguageError),
    #[error(transparent)]
    Parse(#[from] ParseError),

    // Search and serving
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
