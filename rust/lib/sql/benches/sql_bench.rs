use criterion::{black_box, criterion_group, criterion_main, Criterion};

use droplink_sql::{SQLStore, SqliteStore, Value};

const LINKS: i64 = 10_000;

fn links_table() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .exec_batch(
            "CREATE TABLE links (
                id TEXT PRIMARY KEY,
                profile_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                clicks INTEGER NOT NULL DEFAULT 0,
                data TEXT NOT NULL
            );
            CREATE INDEX idx_links_profile ON links(profile_id, position);",
        )
        .unwrap();
    for i in 0..LINKS {
        store
            .exec(
                "INSERT INTO links (id, profile_id, position, data) VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::Text(format!("link-{}", i)),
                    Value::Text(format!("profile-{}", i / 10)),
                    Value::Integer(i % 10),
                    Value::Text(format!("{{\"title\":\"Link {}\"}}", i)),
                ],
            )
            .unwrap();
    }
    store
}

fn bench_click_increment(c: &mut Criterion) {
    let store = links_table();

    let mut i = 0i64;
    c.bench_function("sqlite_click_increment", |b| {
        b.iter(|| {
            let n = store
                .exec(
                    "UPDATE links SET clicks = clicks + 1 WHERE id = ?1",
                    &[Value::Text(format!("link-{}", black_box(i % LINKS)))],
                )
                .unwrap();
            assert_eq!(n, 1);
            i += 1;
        });
    });
}

fn bench_profile_links(c: &mut Criterion) {
    let store = links_table();

    let mut i = 0i64;
    c.bench_function("sqlite_profile_links_10", |b| {
        b.iter(|| {
            let rows = store
                .query(
                    "SELECT data, clicks FROM links WHERE profile_id = ?1 ORDER BY position",
                    &[Value::Text(format!("profile-{}", black_box(i % (LINKS / 10))))],
                )
                .unwrap();
            assert_eq!(rows.len(), 10);
            i += 1;
        });
    });
}

criterion_group!(benches, bench_click_increment, bench_profile_links);
criterion_main!(benches);
