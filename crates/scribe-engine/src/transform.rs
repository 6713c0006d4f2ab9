//! Forward transformation of pending edits over already-applied edits.
//!
//! When a client computed an edit against a stale sequence number, the
//! sequencer composes the op forward over every edit applied since that
//! base. Rules:
//!
//! - an applied insertion at or before a pending position shifts it right
//!   by the inserted length (the applied edit wins position ties);
//! - an applied deletion before a pending position shifts it left; a
//!   position inside the deleted span clamps to the span's start;
//! - an applied insertion strictly inside a pending delete range extends
//!   the range, so the concurrent insertion is consumed by the delete;
//! - a pending delete fully consumed by an applied delete degenerates to a
//!   zero-length op, which is still sequenced and acknowledged.

use scribe_core::EditKind;

/// Map a coordinate forward over an applied deletion of `length` at `start`.
fn map_over_delete(coord: usize, start: usize, length: usize) -> usize {
    let end = start + length;
    if coord <= start {
        coord
    } else if coord >= end {
        coord - length
    } else {
        start
    }
}

/// Transform `pending` so it applies cleanly after `applied`.
pub fn transform_kind(pending: &EditKind, applied: &EditKind) -> EditKind {
    match (pending, applied) {
        (
            EditKind::Insert { position, text },
            EditKind::Insert {
                position: ap,
                text: atext,
            },
        ) => {
            let shift = atext.chars().count();
            let position = if *ap <= *position {
                position + shift
            } else {
                *position
            };
            EditKind::Insert {
                position,
                text: text.clone(),
            }
        }
        (
            EditKind::Insert { position, text },
            EditKind::Delete {
                position: dp,
                length: dlen,
            },
        ) => EditKind::Insert {
            position: map_over_delete(*position, *dp, *dlen),
            text: text.clone(),
        },
        (
            EditKind::Delete { position, length },
            EditKind::Insert {
                position: ap,
                text: atext,
            },
        ) => {
            let shift = atext.chars().count();
            let end = position + length;
            if *ap <= *position {
                EditKind::Delete {
                    position: position + shift,
                    length: *length,
                }
            } else if *ap >= end {
                EditKind::Delete {
                    position: *position,
                    length: *length,
                }
            } else {
                // Insert landed inside the range being deleted
                EditKind::Delete {
                    position: *position,
                    length: length + shift,
                }
            }
        }
        (
            EditKind::Delete { position, length },
            EditKind::Delete {
                position: dp,
                length: dlen,
            },
        ) => {
            let from = map_over_delete(*position, *dp, *dlen);
            let to = map_over_delete(position + length, *dp, *dlen);
            EditKind::Delete {
                position: from,
                length: to - from,
            }
        }
    }
}

/// Apply `kind` to `text`, splicing at character offsets.
///
/// Callers must have validated the range against the current text first.
pub fn apply_kind(text: &str, kind: &EditKind) -> String {
    match kind {
        EditKind::Insert { position, text: insertion } => {
            let byte = char_to_byte(text, *position);
            let mut out = String::with_capacity(text.len() + insertion.len());
            out.push_str(&text[..byte]);
            out.push_str(insertion);
            out.push_str(&text[byte..]);
            out
        }
        EditKind::Delete { position, length } => {
            let start = char_to_byte(text, *position);
            let end = char_to_byte(text, position + length);
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..start]);
            out.push_str(&text[end..]);
            out
        }
    }
}

/// Whether `kind` fits inside a document of `len` characters.
pub fn validate_kind(kind: &EditKind, len: usize) -> bool {
    match kind {
        EditKind::Insert { position, .. } => *position <= len,
        EditKind::Delete { position, length } => position + length <= len,
    }
}

fn char_to_byte(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(position: usize, text: &str) -> EditKind {
        EditKind::Insert {
            position,
            text: text.to_string(),
        }
    }

    fn delete(position: usize, length: usize) -> EditKind {
        EditKind::Delete { position, length }
    }

    #[test]
    fn test_insert_shifted_by_earlier_insert() {
        let t = transform_kind(&insert(5, "x"), &insert(2, "ab"));
        assert_eq!(t, insert(7, "x"));
    }

    #[test]
    fn test_insert_unshifted_by_later_insert() {
        let t = transform_kind(&insert(1, "x"), &insert(4, "ab"));
        assert_eq!(t, insert(1, "x"));
    }

    #[test]
    fn test_insert_tie_applied_wins() {
        let t = transform_kind(&insert(3, "x"), &insert(3, "yy"));
        assert_eq!(t, insert(5, "x"));
    }

    #[test]
    fn test_insert_shifted_left_by_delete() {
        let t = transform_kind(&insert(8, "x"), &delete(2, 3));
        assert_eq!(t, insert(5, "x"));
    }

    #[test]
    fn test_insert_inside_deleted_span_clamps() {
        let t = transform_kind(&insert(4, "x"), &delete(2, 5));
        assert_eq!(t, insert(2, "x"));
    }

    #[test]
    fn test_delete_before_applied_insert_unchanged() {
        // "hello world": delete [0,5) vs applied insert at 5
        let t = transform_kind(&delete(0, 5), &insert(5, ","));
        assert_eq!(t, delete(0, 5));
    }

    #[test]
    fn test_delete_after_applied_insert_shifts() {
        let t = transform_kind(&delete(4, 2), &insert(1, "abc"));
        assert_eq!(t, delete(7, 2));
    }

    #[test]
    fn test_delete_extended_by_interior_insert() {
        let t = transform_kind(&delete(2, 4), &insert(4, "zz"));
        assert_eq!(t, delete(2, 6));
    }

    #[test]
    fn test_delete_overlapping_delete_clamps() {
        // pending [3,8), applied [5,10): tail of pending was consumed
        let t = transform_kind(&delete(3, 5), &delete(5, 5));
        assert_eq!(t, delete(3, 2));
    }

    #[test]
    fn test_delete_fully_consumed_degenerates() {
        let t = transform_kind(&delete(4, 2), &delete(2, 6));
        assert_eq!(t, delete(2, 0));
    }

    #[test]
    fn test_apply_insert() {
        assert_eq!(apply_kind("hello world", &insert(5, ",")), "hello, world");
        assert_eq!(apply_kind("", &insert(0, "hi")), "hi");
        assert_eq!(apply_kind("ab", &insert(2, "c")), "abc");
    }

    #[test]
    fn test_apply_delete() {
        assert_eq!(apply_kind("hello, world", &delete(0, 5)), ", world");
        assert_eq!(apply_kind("abc", &delete(1, 1)), "ac");
        assert_eq!(apply_kind("abc", &delete(0, 3)), "");
    }

    #[test]
    fn test_apply_multibyte() {
        // Char offsets, not byte offsets
        assert_eq!(apply_kind("héllo", &insert(2, "x")), "héxllo");
        assert_eq!(apply_kind("héllo", &delete(1, 2)), "hlo");
    }

    #[test]
    fn test_validate_kind() {
        assert!(validate_kind(&insert(5, "x"), 5));
        assert!(!validate_kind(&insert(6, "x"), 5));
        assert!(validate_kind(&delete(3, 2), 5));
        assert!(!validate_kind(&delete(3, 3), 5));
        assert!(validate_kind(&delete(0, 0), 0));
    }
}
