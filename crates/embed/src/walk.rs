//! Last-resort structural scavenging for media in unrecognized shapes.

use serde_json::Value;
use tracing::warn;

use crate::shape::ImageItem;
use crate::{Media, resolve_image};

/// How many nodes the walk will visit before giving up.
///
/// The walk runs over freshly-deserialized trees, so there are no reference
/// cycles to detect — but a budget still bounds worst-case work against
/// adversarially deep or wide values deterministically.
const NODE_BUDGET: usize = 256;

/// Field names that conventionally hold media arrays.
const MEDIA_KEYS: [&str; 2] = ["images", "media"];

/// Walk the whole value looking for anything that resembles an image array.
///
/// An explicit work-stack, not recursion: the budget is the termination
/// proof, independent of input shape. Only pre-rendered URLs are trusted
/// here — in an unrecognized shape there is no telling whose repo a bare
/// blob belongs to, so no URL synthesis. Results append to `out` up to
/// `limit`.
pub(crate) fn scavenge(value: &Value, limit: usize, out: &mut Vec<Media>) {
    let mut stack: Vec<&Value> = vec![value];
    let mut visited: usize = 0;
    while let Some(node) = stack.pop() {
        if out.len() >= limit {
            return;
        }
        visited += 1;
        if visited > NODE_BUDGET {
            warn!(budget = NODE_BUDGET, "node budget exhausted while scavenging for media");
            return;
        }
        match node {
            Value::Object(fields) => {
                for (key, child) in fields {
                    if MEDIA_KEYS.contains(&key.as_str()) && child.is_array() {
                        harvest(child, limit, out);
                        if out.len() >= limit {
                            return;
                        }
                    } else {
                        stack.push(child);
                    }
                }
            },
            Value::Array(items) => stack.extend(items.iter()),
            _ => {},
        }
    }
}

/// Pull whatever carries a usable URL out of a candidate array.
fn harvest(array: &Value, limit: usize, out: &mut Vec<Media>) {
    for item in ImageItem::from_array(array) {
        if out.len() >= limit {
            return;
        }
        if let Some(media) = resolve_image(&item) {
            out.push(media);
        }
    }
}
