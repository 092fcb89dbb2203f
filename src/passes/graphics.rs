//! QGraphicsItem scene-argument removal.
//!
//! Qt5 dropped the trailing `scene` constructor argument from the graphics
//! item classes; callers add the item to the scene instead. The scene is
//! identified by keyword (`scene=`, a bare `scene`, `self.scene`) or by
//! arity heuristics over the positional forms; an arity that stays
//! ambiguous gets an annotation instead of a guess.

use crate::core::SourceDocument;
use crate::passes::sentinel_line;
use crate::state::MigrationState;

const ITEMS: [&str; 10] = [
    "QAbstractGraphicsShapeItem",
    "QGraphicsEllipseItem",
    "QGraphicsItem",
    "QGraphicsLineItem",
    "QGraphicsPathItem",
    "QGraphicsPixmapItem",
    "QGraphicsPolygonItem",
    "QGraphicsRectItem",
    "QGraphicsSimpleTextItem",
    "QGraphicsTextItem",
];

const FIXME: &str = "Can't identify the QGraphicsScene in the arguments of the QGraphicsItem";

/// Naive argument split of a `(...)` tail; nested commas are not this
/// rewrite's concern, constructor forms are flat.
fn tail_args(tail: &str) -> Vec<String> {
    let trimmed = tail.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);
    inner.split(',').map(|a| a.trim().to_owned()).collect()
}

/// Pull the scene out of an argument list when it is spelled explicitly.
fn take_scene_keyword(args: &mut Vec<String>) -> Option<String> {
    for idx in 0..args.len() {
        let arg = &args[idx];
        if arg.starts_with("scene=") || arg.starts_with("scene =") {
            let value = args.remove(idx);
            return value.split_once('=').map(|(_, v)| v.trim().to_owned());
        }
        if arg == "scene" || arg == "self.scene" {
            return Some(args.remove(idx));
        }
    }
    None
}

fn keyword_index(keyword: &str, args: &[String]) -> Option<usize> {
    args.iter().position(|arg| {
        arg.starts_with(&format!("{keyword}="))
            || arg.starts_with(&format!("{keyword} ="))
            || arg == keyword
            || arg == &format!("self.{keyword}")
    })
}

/// Outcome of the positional-arity rules shared by call sites and
/// subclass `__init__` forwards. `offset` is 1 when `self` leads the list.
enum Arity {
    NoScene,
    Last,
    Ambiguous,
}

fn positional_scene(args: &[String], offset: usize) -> Arity {
    let n = args.len() - offset;
    match n {
        0 | 1 => Arity::NoScene,
        2 => {
            let a = &args[offset];
            let b = &args[offset + 1];
            if (a == "*args" || a == "* args") && (b == "**kwargs" || b == "** kwargs") {
                Arity::NoScene
            } else if a == "None" {
                // (parent=None, scene)
                Arity::Last
            } else {
                match keyword_index("parent", args) {
                    Some(i) if i == offset => Arity::Last,
                    Some(i) if i == offset + 1 => Arity::NoScene,
                    _ => Arity::Ambiguous,
                }
            }
        }
        3 => Arity::Last,
        4 | 5 => Arity::NoScene,
        6 => Arity::Last,
        _ => Arity::Ambiguous,
    }
}

/// Rewrite instantiations of `obj` in the document.
fn rewrite_item_uses(doc: &mut SourceDocument, state: &mut MigrationState, obj: &str) {
    let mut idx = 0;
    while idx < doc.len() {
        let line = doc.line(idx);
        let skip = !line.is_code()
            || line.text.trim_start().starts_with("import ")
            || line.text.trim_start().starts_with("from ");
        if skip || !line.text.contains(obj) {
            idx += 1;
            continue;
        }
        if line.is_class() {
            idx = rewrite_subclass(doc, state, idx, obj);
            continue;
        }

        let text = line.text.clone();
        let mut marker = obj.to_owned();
        let Some((mut head, mut tail)) = text.split_once(&marker) else {
            idx += 1;
            continue;
        };
        // QGraphicsItemGroup shares the QGraphicsItem prefix.
        if tail.starts_with("Group") {
            marker.push_str("Group");
            match text.split_once(&marker) {
                Some((h, t)) => {
                    head = h;
                    tail = t;
                }
                None => {
                    idx += 1;
                    continue;
                }
            }
        }
        let tail = tail.to_owned();
        if !tail.trim_start().starts_with('(') {
            idx += 1;
            continue;
        }
        let Some((reference, _)) = head.split_once('=') else {
            idx += 1;
            continue;
        };
        let reference = reference.to_owned();

        let indent = line.indent().to_owned();
        let mut args = tail_args(&tail);
        let mut scene = take_scene_keyword(&mut args);
        if scene.is_none() {
            match positional_scene(&args, 0) {
                Arity::NoScene => {
                    idx += 1;
                    continue;
                }
                Arity::Last => scene = args.pop(),
                Arity::Ambiguous => {
                    doc.insert(idx, sentinel_line(&indent, FIXME));
                    idx += 2;
                    continue;
                }
            }
        }

        let replacement = format!("({})\n", args.join(", "));
        doc.set_text(idx, text.replacen(&tail, &replacement, 1));
        if let Some(scene) = scene.filter(|s| s != "None") {
            idx += 1;
            doc.insert(
                idx,
                format!("{indent}{scene}.addItem({})\n", reference.trim()),
            );
        }
        idx += 1;
    }
    let _ = state;
}

/// A class deriving a graphics item forwards its constructor arguments; the
/// scene comes out of the `super()`/`__init__` call and the item adds itself.
fn rewrite_subclass(
    doc: &mut SourceDocument,
    _state: &mut MigrationState,
    class_idx: usize,
    item: &str,
) -> usize {
    let class_name = doc
        .line(class_idx)
        .class_name()
        .unwrap_or_default()
        .to_owned();
    let super_marker = format!("super({class_name}");
    let init_marker = format!("{item}.__init__");

    let mut count = class_idx + 1;
    let mut body_indent: Option<usize> = None;
    while count < doc.len() {
        let line = doc.line(count);
        if !line.is_code() {
            count += 1;
            continue;
        }
        let text = line.text.clone();
        let stripped = text.trim_start();

        if stripped.starts_with("def __init__") {
            body_indent = Some(line.indent().len());
            count += 1;
            continue;
        }
        let is_forward =
            stripped.starts_with(&super_marker) || text.contains(&init_marker);
        if !is_forward {
            if let Some(indent) = body_indent {
                if line.indent().len() < indent {
                    return count + 1;
                }
            }
            count += 1;
            continue;
        }

        let ind = line.indent().to_owned();
        let Some((_, tail)) = text.split_once("__init__") else {
            count += 1;
            continue;
        };
        let tail = tail.to_owned();
        let mut args = tail_args(&tail);
        let mut scene = take_scene_keyword(&mut args);
        if scene.is_none() {
            match positional_scene(&args, 1) {
                Arity::NoScene => return count + 1,
                Arity::Last => scene = args.pop(),
                Arity::Ambiguous => {
                    doc.insert(count, sentinel_line(&ind, FIXME));
                    return count + 2;
                }
            }
        }

        let replacement = format!("({})\n", args.join(", "));
        doc.set_text(count, text.replacen(&tail, &replacement, 1));
        if let Some(scene) = scene.filter(|s| s != "None") {
            count += 1;
            doc.insert(
                count,
                format!("{ind}if {scene} is not None: {scene}.addItem(self)\n"),
            );
        }
        return count + 1;
    }
    count + 1
}

/// The pass entry point: every graphics item class in turn.
pub fn fix_qgraphicsitem(doc: &mut SourceDocument, state: &mut MigrationState) {
    for item in ITEMS {
        rewrite_item_uses(doc, state, item);
    }
}
