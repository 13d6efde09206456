use super::*;
use shared::{domain::Todo, resource::Todos};

fn todo(id: i64, text: &str) -> Todo {
    Todo {
        id: RecordId(id),
        todo: text.to_string(),
        completed: false,
        user_id: 1,
    }
}

fn ids(store: &RecordStore<Todos>) -> Vec<i64> {
    store.merged().iter().map(|todo| todo.id.0).collect()
}

#[test]
fn merged_view_lists_page_then_overlay() {
    let mut store = RecordStore::<Todos>::new();
    store.apply_page(1, vec![todo(1, "a"), todo(2, "b")]);
    store.insert_provisional(2, todo(300, "local"));

    assert_eq!(ids(&store), vec![1, 2, 300]);
    assert_eq!(store.status(RecordId(1)), Some(EntryStatus::Confirmed));
    assert_eq!(store.status(RecordId(300)), Some(EntryStatus::Provisional));
}

#[test]
fn overlay_survives_page_changes() {
    let mut store = RecordStore::<Todos>::new();
    store.apply_page(1, vec![todo(1, "a")]);
    store.insert_provisional(2, todo(300, "local"));
    store.apply_page(3, vec![todo(11, "k")]);

    assert_eq!(ids(&store), vec![11, 300]);
    assert!(!store.contains(RecordId(1)));
}

#[test]
fn provisional_entry_is_confirmed_once_a_page_contains_it() {
    let mut store = RecordStore::<Todos>::new();
    store.apply_page(1, vec![todo(1, "a")]);
    store.insert_provisional(2, todo(31, "local"));
    store.apply_page(3, vec![todo(30, "x"), todo(31, "server copy")]);

    assert_eq!(ids(&store), vec![30, 31]);
    assert_eq!(store.provisional_len(), 0);
    assert_eq!(store.status(RecordId(31)), Some(EntryStatus::Confirmed));
    assert_eq!(store.get(RecordId(31)).map(|t| t.todo.as_str()), Some("server copy"));
}

#[test]
fn replace_rewrites_page_entries_in_place() {
    let mut store = RecordStore::<Todos>::new();
    store.apply_page(1, vec![todo(1, "a"), todo(2, "b"), todo(3, "c")]);

    assert!(store.replace(2, todo(2, "edited")));
    assert_eq!(ids(&store), vec![1, 2, 3]);
    assert_eq!(store.get(RecordId(2)).map(|t| t.todo.as_str()), Some("edited"));
    assert!(!store.replace(3, todo(99, "missing")));
}

#[test]
fn older_page_does_not_override_newer_local_edit() {
    let mut store = RecordStore::<Todos>::new();
    store.apply_page(1, vec![todo(1, "a")]);
    // fetch #2 is in flight when edit #3 lands
    store.replace(3, todo(1, "edited"));
    store.apply_page(2, vec![todo(1, "a")]);

    assert_eq!(store.get(RecordId(1)).map(|t| t.todo.as_str()), Some("edited"));

    // a page requested after the edit is authoritative again
    store.apply_page(4, vec![todo(1, "server")]);
    assert_eq!(store.get(RecordId(1)).map(|t| t.todo.as_str()), Some("server"));
}

#[test]
fn older_page_cannot_resurrect_deleted_record() {
    let mut store = RecordStore::<Todos>::new();
    store.apply_page(1, vec![todo(1, "a"), todo(2, "b")]);
    assert!(store.remove(3, RecordId(2)));
    store.apply_page(2, vec![todo(1, "a"), todo(2, "b")]);
    assert_eq!(ids(&store), vec![1]);

    store.apply_page(4, vec![todo(1, "a"), todo(2, "b")]);
    assert_eq!(ids(&store), vec![1, 2]);
}

#[test]
fn removing_overlay_only_record() {
    let mut store = RecordStore::<Todos>::new();
    store.insert_provisional(1, todo(50, "x"));
    store.insert_provisional(2, todo(51, "y"));
    assert!(store.remove(3, RecordId(50)));
    assert_eq!(ids(&store), vec![51]);
    assert!(!store.remove(4, RecordId(50)));
}

#[test]
fn recreating_a_deleted_id_is_visible() {
    let mut store = RecordStore::<Todos>::new();
    store.apply_page(1, vec![todo(7, "a")]);
    store.remove(2, RecordId(7));
    store.insert_provisional(3, todo(7, "again"));
    assert_eq!(ids(&store), vec![7]);
    assert_eq!(store.status(RecordId(7)), Some(EntryStatus::Provisional));
}

#[test]
fn duplicate_ids_in_a_page_collapse() {
    let mut store = RecordStore::<Todos>::new();
    store.apply_page(1, vec![todo(1, "a"), todo(1, "dup"), todo(2, "b")]);
    assert_eq!(ids(&store), vec![1, 2]);
}

#[test]
fn fallback_ids_are_distinct_from_everything_seen() {
    let mut store = RecordStore::<Todos>::new();
    store.apply_page(1, vec![todo(500, "a")]);

    let first = store.fallback_id(10);
    assert_eq!(first, RecordId(501));
    let second = store.fallback_id(10);
    assert_eq!(second, RecordId(502));
    let third = store.fallback_id(1_700_000_000_000_000);
    assert_eq!(third, RecordId(1_700_000_000_000_000));
    let fourth = store.fallback_id(1_700_000_000_000_000);
    assert!(fourth > third);
}

#[test]
fn merged_entries_report_status() {
    let mut store = RecordStore::<Todos>::new();
    store.apply_page(1, vec![todo(1, "a")]);
    store.insert_provisional(2, todo(9, "b"));
    let statuses: Vec<_> = store
        .merged_entries()
        .into_iter()
        .map(|entry| entry.status)
        .collect();
    assert_eq!(
        statuses,
        vec![EntryStatus::Confirmed, EntryStatus::Provisional]
    );
}
