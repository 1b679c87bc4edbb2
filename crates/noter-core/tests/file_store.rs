use noter_core::{Config, EntryDraft, HashingParams, Noter};
use noter_types::VisibilityFilter;
use std::time::Duration;

fn config_at(path: std::path::PathBuf) -> Config {
    Config {
        db_path: Some(path),
        query_timeout: Duration::from_secs(5),
        hashing: HashingParams::cheap(),
    }
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_at(dir.path().join("noter.db"));

    let (user, entry) = {
        let noter = Noter::open(&config).unwrap();
        let user = noter.identity.sign_up("Ann", "ann@example.com", "password1").unwrap();
        let entry = noter
            .entries
            .create(
                &EntryDraft {
                    title: "kept".into(),
                    body: "on disk".into(),
                    ttl_days: 7,
                    is_public: false,
                },
                user,
            )
            .unwrap();
        (user, entry)
    };

    let noter = Noter::open(&config).unwrap();
    assert_eq!(noter.identity.authenticate("ann@example.com", "password1").unwrap(), user);
    let got = noter.entries.get(&entry.to_string(), Some(user)).unwrap();
    assert_eq!(got.entry.body, "on disk");
    assert_eq!(noter.entries.count(&VisibilityFilter::owned_private(user)).unwrap(), 1);
}

#[test]
fn concurrent_writers_share_one_handle() {
    let dir = tempfile::tempdir().unwrap();
    let noter = Noter::open(&config_at(dir.path().join("noter.db"))).unwrap();
    let user = noter.identity.sign_up("Ann", "ann@example.com", "password1").unwrap();

    std::thread::scope(|s| {
        for t in 0..4 {
            let entries = noter.entries.clone();
            s.spawn(move || {
                for i in 0..5 {
                    entries
                        .create(
                            &EntryDraft {
                                title: format!("t{t}-{i}"),
                                body: "b".into(),
                                ttl_days: 1,
                                is_public: true,
                            },
                            user,
                        )
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(noter.entries.count(&VisibilityFilter::public()).unwrap(), 20);
}
