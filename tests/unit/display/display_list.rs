use super::*;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::display::instance::{CharacterInstance, InstanceArena, InstanceKind};
use crate::display::movie::{Frame, MovieDef};
use crate::foundation::core::{Rect, Rgba8};

fn ids(n: usize) -> Vec<InstanceId> {
    let movie = Rc::new(MovieDef {
        frame_rate: 12.0,
        stage: Rect::new(0.0, 0.0, 100.0, 100.0),
        background: Rgba8::WHITE,
        version: 8,
        characters: BTreeMap::new(),
        exports: HashMap::new(),
        frames: vec![Frame::default()],
    });
    let mut arena = InstanceArena::new();
    (0..n)
        .map(|_| arena.insert(CharacterInstance::new(movie.clone(), None, InstanceKind::Shape)))
        .collect()
}

fn order(list: &DisplayList) -> Vec<(i32, InstanceId)> {
    list.iter().map(|(d, l)| (d.0, l.instance)).collect()
}

#[test]
fn show_then_remove_leaves_other_depths_in_order() {
    let id = ids(4);
    let mut list = DisplayList::new();
    list.show_object(Depth(1), Some(CharacterId(1)), id[0], None);
    list.show_object(Depth(5), Some(CharacterId(1)), id[1], None);
    list.show_object(Depth(9), Some(CharacterId(1)), id[2], None);
    let before = order(&list);

    list.show_object(Depth(7), Some(CharacterId(2)), id[3], None);
    assert_eq!(list.len(), 4);
    assert_eq!(list.remove_object(id[3]), Some(Depth(7)));
    assert_eq!(order(&list), before);
}

#[test]
fn showing_on_an_occupied_depth_returns_the_previous_layer() {
    let id = ids(2);
    let mut list = DisplayList::new();
    assert!(list.show_object(Depth(2), None, id[0], None).is_none());
    let old = list.show_object(Depth(2), None, id[1], Some(Depth(4))).unwrap();
    assert_eq!(old.instance, id[0]);
    assert_eq!(list.len(), 1);
    assert_eq!(list.get(Depth(2)).unwrap().clip_depth, Some(Depth(4)));
}

#[test]
fn removing_a_missing_instance_is_a_no_op() {
    let id = ids(2);
    let mut list = DisplayList::new();
    list.show_object(Depth(1), None, id[0], None);
    assert_eq!(list.remove_object(id[1]), None);
    assert_eq!(list.len(), 1);
}

#[test]
fn next_highest_depth() {
    let id = ids(2);
    let mut list = DisplayList::new();
    assert_eq!(list.get_next_highest_depth(), Depth(0));
    list.show_object(Depth(7), None, id[0], None);
    list.show_object(Depth(3), None, id[1], None);
    assert_eq!(list.get_next_highest_depth(), Depth(8));
    assert_eq!(list.get_object_depth(id[1]), Some(Depth(3)));
}

#[test]
fn swap_exchanges_or_moves() {
    let id = ids(2);
    let mut list = DisplayList::new();
    list.show_object(Depth(1), None, id[0], None);
    list.show_object(Depth(2), None, id[1], None);
    assert!(list.swap(Depth(1), Depth(2)));
    assert_eq!(order(&list), vec![(1, id[1]), (2, id[0])]);

    assert!(list.swap(Depth(2), Depth(10)));
    assert_eq!(order(&list), vec![(1, id[1]), (10, id[0])]);

    assert!(!list.swap(Depth(3), Depth(4)));
}

#[test]
fn clear_returns_layers_in_depth_order() {
    let id = ids(2);
    let mut list = DisplayList::new();
    list.show_object(Depth(4), None, id[0], None);
    list.show_object(Depth(-1), None, id[1], None);
    let layers = list.clear();
    assert_eq!(layers[0].instance, id[1]);
    assert_eq!(layers[1].instance, id[0]);
    assert!(list.is_empty());
}
