use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("ai service disabled: no api key configured")]
    Disabled,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no response content from ai service")]
    EmptyResponse,

    #[error("unparsable ai response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid ai response: {0}")]
    Invalid(String),
}
