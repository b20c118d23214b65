#[derive(Debug, thiserror::Error)]
pub enum SpkError {
    #[error("Error parsing sprite data: {source}")]
    NomError {
        #[source]
        source: nom::Err<nom::error::Error<Vec<u8>>>,
    },
    #[error("Error opening sprite pack: {source}")]
    IOError {
        #[from]
        source: std::io::Error,
    },
}
