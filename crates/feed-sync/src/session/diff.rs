//! Change notifications between two views of one session.

use std::collections::HashSet;

use feed_core::{ChangeKind, ContentId, SessionChange, SessionId};

/// Changes turning `before` into `kept + appended`.
///
/// `kept` must be `before` with some ids removed, in the same order.
/// Removed runs come first, highest position first, then changed runs, then
/// one inserted range for the tail. Each range is valid against the list as
/// left by the changes emitted before it.
pub(crate) fn session_changes(
    session: SessionId,
    before: &[ContentId],
    kept: &[ContentId],
    appended: usize,
    changed: &HashSet<ContentId>,
) -> Vec<SessionChange> {
    let mut out = Vec::new();
    let still_there: HashSet<&ContentId> = kept.iter().collect();

    let removed_positions: Vec<usize> = before
        .iter()
        .enumerate()
        .filter(|(_, id)| !still_there.contains(id))
        .map(|(pos, _)| pos)
        .collect();
    for (start, len) in runs(&removed_positions).into_iter().rev() {
        out.push(change(session, start, len, ChangeKind::Removed));
    }

    let changed_positions: Vec<usize> = kept
        .iter()
        .enumerate()
        .filter(|(_, id)| changed.contains(*id))
        .map(|(pos, _)| pos)
        .collect();
    for (start, len) in runs(&changed_positions) {
        out.push(change(session, start, len, ChangeKind::Changed));
    }

    if appended > 0 {
        out.push(change(session, kept.len(), appended, ChangeKind::Inserted));
    }
    out
}

fn change(
    session: SessionId,
    range_start: usize,
    range_length: usize,
    kind: ChangeKind,
) -> SessionChange {
    SessionChange {
        session,
        range_start,
        range_length,
        kind,
    }
}

/// Group sorted positions into `(start, len)` runs of consecutive values.
fn runs(positions: &[usize]) -> Vec<(usize, usize)> {
    let mut out: Vec<(usize, usize)> = Vec::new();
    for &pos in positions {
        match out.last_mut() {
            Some((start, len)) if *start + *len == pos => *len += 1,
            _ => out.push((pos, 1)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<ContentId> {
        values.iter().map(|v| ContentId::new(*v)).collect()
    }

    /// Replays changes against `before`, returning the final list length and
    /// checking every range stays in bounds.
    fn replay(before: usize, changes: &[SessionChange]) -> usize {
        let mut len = before;
        for c in changes {
            match c.kind {
                ChangeKind::Removed => {
                    assert!(c.range_start + c.range_length <= len, "{c:?}");
                    len -= c.range_length;
                }
                ChangeKind::Changed => assert!(c.range_start + c.range_length <= len, "{c:?}"),
                ChangeKind::Inserted => {
                    assert!(c.range_start <= len, "{c:?}");
                    len += c.range_length;
                }
            }
        }
        len
    }

    #[test]
    fn removals_are_emitted_back_to_front() {
        let session = SessionId::new_random();
        let before = ids(&["a", "b", "c", "d", "e"]);
        let kept = ids(&["a", "d"]);

        let changes = session_changes(session, &before, &kept, 0, &HashSet::new());
        let kinds: Vec<(usize, usize)> = changes
            .iter()
            .map(|c| (c.range_start, c.range_length))
            .collect();
        assert_eq!(kinds, vec![(4, 1), (1, 2)]);
        assert_eq!(replay(before.len(), &changes), kept.len());
    }

    #[test]
    fn changed_positions_use_post_removal_indexes() {
        let session = SessionId::new_random();
        let before = ids(&["a", "b", "c"]);
        let kept = ids(&["b", "c"]);
        let changed: HashSet<ContentId> = ids(&["c"]).into_iter().collect();

        let changes = session_changes(session, &before, &kept, 2, &changed);
        assert_eq!(
            changes,
            vec![
                change(session, 0, 1, ChangeKind::Removed),
                change(session, 1, 1, ChangeKind::Changed),
                change(session, 2, 2, ChangeKind::Inserted),
            ]
        );
        assert_eq!(replay(before.len(), &changes), 4);
    }

    #[test]
    fn untouched_session_gets_nothing() {
        let before = ids(&["a", "b"]);
        let changes =
            session_changes(SessionId::new_random(), &before, &before, 0, &HashSet::new());
        assert!(changes.is_empty());
    }
}
