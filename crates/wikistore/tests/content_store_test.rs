use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;
use wikistore::record::{decode, encode, Metadata, PageRecord};
use wikistore::store::fs::ContentStore;
use wikistore::store::PageStore;
use wikistore::WikiError;

fn setup() -> (TempDir, ContentStore) {
    let dir = TempDir::new().unwrap();
    let store = ContentStore::new(dir.path());
    (dir, store)
}

fn titled(title: &str, body: &str) -> PageRecord {
    let mut metadata = Metadata::new();
    metadata.push("title", title);
    PageRecord::new(metadata, body)
}

#[test]
fn test_notes_today_scenario() {
    let (dir, store) = setup();
    store.save("notes/today", &titled("Today", "Hello"), None).unwrap();

    let on_disk = fs::read_to_string(dir.path().join("notes/today.md")).unwrap();
    assert_eq!(on_disk, "title: Today\n\nHello");

    let page = store.get("notes/today").unwrap().unwrap();
    assert_eq!(page.title(), "Today");
    assert_eq!(page.tags(), "");
    assert_eq!(page.body, "Hello");
    assert!(page.html.contains("<p>Hello</p>"));
}

#[test]
fn test_escaping_identifiers_are_rejected_everywhere() {
    let (dir, store) = setup();
    let escapes = ["../x", "a/../../x", "/../x"];
    for id in escapes {
        assert!(
            matches!(
                store.save(id, &titled("x", "x"), None),
                Err(WikiError::PathEscape { .. })
            ),
            "save {}",
            id
        );
        assert!(!store.exists(id));
        assert!(matches!(store.load(id), Err(WikiError::PathEscape { .. })));
        assert!(matches!(store.delete(id), Err(WikiError::PathEscape { .. })));
    }
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    assert!(!dir.path().parent().unwrap().join("x.md").exists());
}

#[test]
fn test_record_text_survives_store_round_trip() {
    let (_dir, store) = setup();
    let raw = "title: Multi\ntags: a, b\nalias: one\nalias: two\n\nline 1\n\nline 3\n";
    let record = decode(raw);
    store.save("multi", &record, None).unwrap();
    assert_eq!(store.load("multi").unwrap(), encode(&record));
    assert_eq!(encode(&decode(&store.load("multi").unwrap())), raw);

    let page = store.get("multi").unwrap().unwrap();
    assert_eq!(
        page.get_metadata("alias").unwrap(),
        ["one".to_string(), "two".to_string()]
    );
}

#[test]
fn test_concurrent_writers_never_tear_a_file() {
    let (_dir, store) = setup();
    let bodies: Vec<String> = (0..4)
        .map(|i| char::from(b'a' + i).to_string().repeat(256 * 1024))
        .collect();
    store.save("big", &titled("Big", &bodies[0]), None).unwrap();

    let done = AtomicBool::new(false);
    std::thread::scope(|scope| {
        for body in &bodies {
            let store = &store;
            scope.spawn(move || {
                for _ in 0..10 {
                    store.save("big", &titled("Big", body), None).unwrap();
                }
            });
        }

        let store = &store;
        let bodies = &bodies;
        let done = &done;
        scope.spawn(move || {
            while !done.load(Ordering::SeqCst) {
                let page = store.get("big").unwrap().unwrap();
                assert!(
                    bodies.contains(&page.body),
                    "read a mixed or partial body of {} bytes",
                    page.body.len()
                );
            }
        });

        // Writers are joined when the scope ends; stop the reader after a
        // bounded amount of work.
        std::thread::sleep(std::time::Duration::from_millis(200));
        done.store(true, Ordering::SeqCst);
    });

    let page = store.get("big").unwrap().unwrap();
    assert!(bodies.contains(&page.body));
}

#[test]
fn test_no_temp_files_remain_after_many_saves() {
    let (dir, store) = setup();
    for i in 0..20 {
        store
            .save("sub/page", &titled("P", &format!("v{}", i)), None)
            .unwrap();
    }
    let names: Vec<_> = fs::read_dir(dir.path().join("sub"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["page.md"]);
}

#[test]
fn test_index_by_tag_and_search() {
    let (_dir, store) = setup();
    let mut tagged = Metadata::new();
    tagged.push("title", "Zeta");
    tagged.push("tags", "howto, rust");
    store
        .save("guides/zeta", &PageRecord::new(tagged, "Cargo usage"), None)
        .unwrap();
    let mut other = Metadata::new();
    other.push("title", "alpha");
    other.push("tags", "rust");
    store
        .save("alpha", &PageRecord::new(other, "Borrowing"), None)
        .unwrap();

    let rust: Vec<_> = store
        .index_by_tag("rust")
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(rust, ["alpha", "guides/zeta"]);

    let found = store.search("cargo", true).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "guides/zeta");
    assert!(store.search("cargo", false).unwrap().is_empty());
}
