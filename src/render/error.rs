/// Failures preparing or drawing a single shape. The movie renderer skips the shape and
/// keeps going.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("vertex pool exhausted: requested {requested} vertices, {available} available")]
    VertexPoolExhausted { requested: usize, available: usize },

    #[error("texture unavailable: {0}")]
    TextureUnavailable(String),

    #[error("character {0} cannot be rendered")]
    UnsupportedCharacter(u16),

    #[error("character {0} is missing from the dictionary")]
    MissingCharacter(u16),
}
