use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("chain error: {0}")]
    Chain(#[from] wisp_chain::ChainError),

    #[error("network error: {0}")]
    Net(#[from] wisp_net::NetError),

    #[error("no confirming peer can serve the header download")]
    NoServingPeer,

    #[error("header batch is not parent-linked")]
    DiscontinuousBatch,

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
