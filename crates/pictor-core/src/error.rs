pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid transform list near `{remainder}`")]
    TransformParse { remainder: String },

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("document has no root element")]
    MissingRoot,

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("gzip stream error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoded document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid engine config: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("unknown node {node}")]
    UnknownNode { node: pictor_dom::NodeId },

    #[error("node {node} is not attached to a parent")]
    Detached { node: pictor_dom::NodeId },
}
