//! Save/load behaviour of whole scene trees

// Tests are allowed to use expect/unwrap for cleaner error messages
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use carve_core::prelude::*;
use carve_scene::{SceneError, import_into, load_file, load_str, save_file, to_json_string};
use std::fs;
use std::path::PathBuf;

/// Fresh scratch directory per test
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("carve-scene-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn sample_tree() -> SceneTree {
    let mut tree = SceneTree::new();
    let body = tree
        .add_child(tree.root(), Node::difference().named("body"))
        .unwrap();
    tree.add_child(
        body,
        Node::cuboid(Vec3::new(1.0, 0.5, 2.0))
            .rotated(30.0, Vec3::new(1.0, 1.0, 0.0))
            .with_material(2),
    )
    .unwrap();
    let hole = tree
        .add_child(body, Node::cylinder(0.25).translated(Vec3::new(0.0, 0.0, 1.0)))
        .unwrap();
    tree.set_subtract(hole, true).unwrap();

    let extras = tree.add_child(tree.root(), Node::union()).unwrap();
    tree.add_child(extras, Node::torus(1.5, 0.3).with_hidden(true))
        .unwrap();
    tree.add_child(
        extras,
        Node::line(2.0, 0.1)
            .named("rod")
            .scaled(Vec3::new(1.0, 3.0, 1.0)),
    )
    .unwrap();
    tree.add_child(extras, Node::intersection()).unwrap();
    tree
}

fn assert_same_subtree(a: &SceneTree, a_id: NodeId, b: &SceneTree, b_id: NodeId) {
    let x = a.node(a_id).unwrap();
    let y = b.node(b_id).unwrap();

    assert_eq!(x.name, y.name);
    assert_eq!(x.hidden, y.hidden);
    assert_eq!(x.material, y.material);
    match (x.kind(), y.kind()) {
        (NodeKind::Torus { ring_ratio: r }, NodeKind::Torus { ring_ratio: s }) => {
            assert_relative_eq!(r, s, epsilon = 1e-5);
        }
        (NodeKind::Line { half_height_ratio: r }, NodeKind::Line { half_height_ratio: s }) => {
            assert_relative_eq!(r, s, epsilon = 1e-5);
        }
        (k, l) => assert_eq!(k, l),
    }

    let (s, t) = (&x.transform, &y.transform);
    assert!(s.translation.abs_diff_eq(t.translation, 1e-5), "{} translation", x.name);
    assert!(s.scale.abs_diff_eq(t.scale, 1e-5), "{} scale", x.name);
    assert!(s.rotation.approx_eq(t.rotation, 1e-5), "{} rotation", x.name);

    let (xs, ys) = (a.children(a_id), b.children(b_id));
    assert_eq!(xs.len(), ys.len());
    for (l, m) in xs.iter().zip(ys) {
        assert_eq!(l.subtract, m.subtract);
        assert_same_subtree(a, l.id, b, m.id);
    }
}

#[test]
fn export_then_import_reproduces_tree() {
    let tree = sample_tree();
    let json = to_json_string(&tree).unwrap();
    let loaded = load_str(&json, ".").expect("exported scene should load");

    assert_eq!(loaded.len(), tree.len());
    assert_same_subtree(&tree, tree.root(), &loaded, loaded.root());
}

#[test]
fn difference_turned_union_still_reloads() {
    let mut tree = sample_tree();
    let body = tree.find_by_name("body").unwrap();
    tree.set_kind(body, NodeKind::Union).unwrap();

    let loaded = load_str(&to_json_string(&tree).unwrap(), ".").expect("union should load");
    let body = loaded.find_by_name("body").unwrap();
    assert_eq!(loaded.node(body).unwrap().kind(), NodeKind::Union);
    assert!(loaded.children(body).iter().all(|link| !link.subtract));
    assert_same_subtree(&tree, tree.root(), &loaded, loaded.root());

    assert!(matches!(
        tree.set_kind(body, NodeKind::Sphere),
        Err(Error::KindChange(..))
    ));
}

#[test]
fn reloaded_tree_compiles_identically() {
    let tree = sample_tree();
    let loaded = load_str(&to_json_string(&tree).unwrap(), ".").unwrap();

    let a = SceneCompiler::default().compile(&tree).unwrap();
    let b = SceneCompiler::default().compile(&loaded).unwrap();
    assert_eq!(a.operations, b.operations);
    assert_eq!(a.primitives.len(), b.primitives.len());
}

#[test]
fn save_and_load_file() {
    let dir = scratch_dir("save");
    let path = dir.join("scene.json");
    let tree = sample_tree();

    save_file(&tree, &path).unwrap();
    let loaded = load_file(&path).unwrap();
    assert_same_subtree(&tree, tree.root(), &loaded, loaded.root());
}

#[test]
fn missing_file_reports_path() {
    let dir = scratch_dir("missing");
    let path = dir.join("nope.json");
    match load_file(&path) {
        Err(SceneError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn refs_splice_in_other_files() {
    let dir = scratch_dir("refs");
    fs::create_dir_all(dir.join("parts")).unwrap();
    fs::write(
        dir.join("parts/wheel.json"),
        r#"{
            "type": "torus",
            "majorRadius": 1.0,
            "ringRadius": 0.25,
            "transform": { "position": [1, 0, 0] }
        }"#,
    )
    .unwrap();
    fs::write(
        dir.join("parts/pair.json"),
        r#"[
            { "type": "ref", "path": "wheel.json", "name": "left" },
            { "type": "sphere", "radius": 0.5 }
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("car.json"),
        r#"{
            "type": "union",
            "children": [
                {
                    "type": "ref",
                    "path": "parts/pair.json",
                    "name": "axle",
                    "transform": { "position": [0, 2, 0], "scale": 2 }
                }
            ]
        }"#,
    )
    .unwrap();

    let tree = load_file(dir.join("car.json")).unwrap();

    let axle = tree.find_by_name("axle").expect("ref node keeps its name");
    let axle_node = tree.node(axle).unwrap();
    assert_eq!(axle_node.kind(), NodeKind::Union);
    assert_eq!(axle_node.transform.translation, Vec3::new(0.0, 2.0, 0.0));
    assert_eq!(axle_node.transform.scale, Vec3::splat(2.0));
    assert_eq!(tree.children(axle).len(), 2);

    let left = tree.node(tree.find_by_name("left").unwrap()).unwrap();
    assert_eq!(left.kind(), NodeKind::Torus { ring_ratio: 0.25 });
    assert_eq!(left.transform.translation, Vec3::X);
}

#[test]
fn ref_cycles_are_rejected() {
    let dir = scratch_dir("cycle");
    fs::write(dir.join("a.json"), r#"{ "type": "ref", "path": "b.json" }"#).unwrap();
    fs::write(
        dir.join("b.json"),
        r#"{ "type": "union", "children": [{ "type": "ref", "path": "a.json" }] }"#,
    )
    .unwrap();

    assert!(matches!(
        load_file(dir.join("a.json")),
        Err(SceneError::RefCycle(_))
    ));
}

#[test]
fn import_into_appends_under_parent() {
    let mut tree = sample_tree();
    let rod = tree.find_by_name("rod").unwrap();
    let extras = tree.parent(rod).unwrap();
    let before = tree.children(extras).len();

    let added = import_into(
        &mut tree,
        extras,
        r#"[{ "type": "sphere", "radius": 1 }, { "type": "box", "size": 1 }]"#,
        ".",
    )
    .unwrap();

    assert_eq!(added.len(), 2);
    assert_eq!(tree.children(extras).len(), before + 2);
    assert_eq!(tree.parent(added[1]), Some(extras));
}

#[test]
fn import_into_primitive_is_rejected() {
    let mut tree = sample_tree();
    let rod = tree.find_by_name("rod").unwrap();
    let len = tree.len();

    let result = import_into(&mut tree, rod, r#"{ "type": "sphere", "radius": 1 }"#, ".");
    assert!(matches!(
        result,
        Err(SceneError::Core(Error::NotAContainer(_)))
    ));
    assert_eq!(tree.len(), len);
}
