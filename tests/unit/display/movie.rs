use super::*;

const MOVIE: &str = r#"{
    "frame_rate": 10,
    "stage": {"x0": 0, "y0": 0, "x1": 100, "y1": 100},
    "characters": {
        "1": {"Shape": {
            "fill_styles": [{"Solid": {"color": {"r": 255, "g": 0, "b": 0, "a": 255}}}],
            "paths": [{"fill": 0, "path": "M0,0 L10,0 L0,10 Z"}]
        }}
    },
    "exports": {"Tri": 1},
    "frames": [
        {"tags": [{"Place": {
            "depth": 1,
            "character": 1,
            "events": [{"events": ["Load"], "script": {"ops": [{"PushConst": 0}, "Trace"], "consts": ["hi"]}}]
        }}]},
        {"tags": [{"Remove": {"depth": 1}}]}
    ]
}"#;

fn with_frames(frames: &str) -> String {
    let mut movie: serde_json::Value = serde_json::from_str(MOVIE).unwrap();
    movie["frames"] = serde_json::from_str(frames).unwrap();
    movie.to_string()
}

#[test]
fn parses_and_validates_a_json_movie() {
    let movie = MovieDef::from_json(MOVIE).unwrap();
    assert_eq!(movie.frames.len(), 2);
    assert_eq!(movie.export("Tri"), Some(CharacterId(1)));
    assert_eq!(movie.frame_period(), 0.1);
    assert_eq!(movie.version, 8);
    let Some(CharacterDef::Shape(shape)) = movie.character(CharacterId(1)) else {
        panic!("expected a shape");
    };
    assert_eq!(shape.bounds(), Rect::new(0.0, 0.0, 10.0, 10.0));
    let ControlTag::Place(place) = &movie.frames[0].tags[0] else {
        panic!("expected a place tag");
    };
    assert_eq!(place.events[0].events, vec![ClipEvent::Load]);
}

#[test]
fn placing_a_missing_character_is_a_load_error() {
    let text = with_frames(r#"[{"tags": [{"Place": {"depth": 1, "character": 9}}]}]"#);
    let err = MovieDef::from_json(&text).unwrap_err();
    assert!(matches!(err, MarqueeError::Load(msg) if msg.contains("missing character 9")));
}

#[test]
fn sprites_that_contain_themselves_are_rejected() {
    let mut movie: serde_json::Value = serde_json::from_str(MOVIE).unwrap();
    movie["characters"]["5"] = serde_json::json!({"Sprite": {"frames": [
        {"tags": [{"Place": {"depth": 1, "character": 1}}]},
        {"tags": [{"Place": {"depth": 2, "character": 6}}]}
    ]}});
    movie["characters"]["6"] = serde_json::json!({"Sprite": {"frames": [
        {"tags": [{"Place": {"depth": 1, "character": 5}}]}
    ]}});
    let err = MovieDef::from_json(&movie.to_string()).unwrap_err();
    assert!(matches!(err, MarqueeError::Load(msg) if msg.contains("placement cycle")));

    movie["characters"]["6"] = serde_json::json!({"Sprite": {"frames": [
        {"tags": [{"Place": {"depth": 1, "character": 6}}]}
    ]}});
    assert!(MovieDef::from_json(&movie.to_string()).is_err());

    // Shared children are not cycles.
    movie["characters"]["6"] = serde_json::json!({"Sprite": {"frames": [
        {"tags": [{"Place": {"depth": 1, "character": 1}}]}
    ]}});
    MovieDef::from_json(&movie.to_string()).unwrap();
}

#[test]
fn invalid_code_images_are_load_errors() {
    let text = with_frames(r#"[{"tags": [{"DoAction": {"script": {"ops": [{"Jump": 5}]}}}]}]"#);
    assert!(matches!(
        MovieDef::from_json(&text),
        Err(MarqueeError::Load(_))
    ));
}

#[test]
fn empty_timelines_are_rejected() {
    let text = with_frames("[]");
    assert!(MovieDef::from_json(&text).is_err());
}

#[test]
fn event_masks_combine_events() {
    let mask = EventMask::from_events(&[ClipEvent::Load, ClipEvent::KeyDown]);
    assert!(mask.contains(ClipEvent::Load));
    assert!(mask.contains(ClipEvent::KeyDown));
    assert!(!mask.contains(ClipEvent::Init));
    assert!(EventMask::NONE.is_empty());
}

#[test]
fn static_loader_resolves_registered_urls() {
    let mut loader = StaticLoader::new();
    loader.insert("lib.json", MovieDef::from_json(MOVIE).unwrap());
    assert!(loader.load("lib.json").is_ok());
    assert!(matches!(loader.load("nope"), Err(MarqueeError::Load(_))));
}
