use super::*;

#[test]
fn well_known_names_have_fixed_ids() {
    let t = StringTable::new();
    assert_eq!(t.lookup("__proto__"), Some(names::PROTO));
    assert_eq!(t.lookup("prototype"), Some(names::PROTOTYPE));
    assert_eq!(t.lookup("this"), Some(names::THIS));
    assert_eq!(t.lookup("onEnterFrame"), Some(names::ON_ENTER_FRAME));
    assert_eq!(t.len(), StringTable::reserved_len());
}

#[test]
fn intern_resolve_roundtrip_and_stable_ids() {
    let mut t = StringTable::new();
    let words = ["x", "velocity", "", "x", "Velocity", "prototype"];
    let ids: Vec<NameId> = words.iter().map(|w| t.intern(w)).collect();
    for (w, id) in words.iter().zip(&ids) {
        assert_eq!(t.resolve(*id), Some(*w));
    }
    assert_eq!(ids[0], ids[3]);
    assert_ne!(ids[1], ids[4]);
    assert_eq!(ids[5], names::PROTOTYPE);
}

#[test]
fn user_names_allocate_after_reserved_range() {
    let mut t = StringTable::new();
    let id = t.intern("score");
    assert_eq!(id.0 as usize, StringTable::reserved_len());
    assert!(t.resolve(NameId(10_000)).is_none());
}
