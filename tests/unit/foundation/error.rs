use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        MarqueeError::load("x")
            .to_string()
            .contains("load error:")
    );
    assert!(
        MarqueeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        MarqueeError::from(VmFault::NotCallable("x".to_string()))
            .to_string()
            .contains("vm fault:")
    );
    assert!(
        MarqueeError::from(RenderError::VertexPoolExhausted {
            requested: 3,
            available: 0
        })
        .to_string()
        .contains("render error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = MarqueeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn json_errors_map_to_serde() {
    let err: MarqueeError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, MarqueeError::Serde(_)));
}
