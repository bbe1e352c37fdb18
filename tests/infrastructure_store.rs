//! Store, query builder, relations and pagination against SQLite

use crimson::core::config::DatabaseData;
use crimson::domain::{Area, AreaFrame, AreaHandler, Character, User};
use crimson::infrastructure::store::{operations, Database, Model, Value};
use crimson::CrimsonError;

async fn saved_user(db: &Database, name: &str) -> User {
    let mut user = User::new(name, "hash");
    db.save(&mut user).await.unwrap();
    user
}

async fn saved_character(db: &Database, user: &User, name: &str) -> Character {
    let mut character = Character::new(user.id, name, "F");
    db.save(&mut character).await.unwrap();
    character
}

#[tokio::test]
async fn test_save_assigns_id() {
    let db = Database::open_in_memory().unwrap();
    let mut user = User::new("alice", "hash");
    assert!(user.is_new_record());

    db.save(&mut user).await.unwrap();
    assert!(user.id > 0);
    assert!(!user.is_new_record());

    let found = db.find_by_id::<User>(user.id).await.unwrap().unwrap();
    assert_eq!(found, user);
    assert!(db.exists::<User>(user.id).await.unwrap());
    assert!(!db.exists::<User>(9999).await.unwrap());
}

#[tokio::test]
async fn test_save_updates_existing_row() {
    let db = Database::open_in_memory().unwrap();
    let mut user = saved_user(&db, "bob").await;
    let id = user.id;

    user.password = "changed".to_string();
    db.save(&mut user).await.unwrap();

    assert_eq!(user.id, id);
    assert_eq!(db.count::<User>().await.unwrap(), 1);
    db.purge_cache::<User>();
    let found = db.find_by_id::<User>(id).await.unwrap().unwrap();
    assert_eq!(found.password, "changed");
}

#[tokio::test]
async fn test_save_missing_row_fails() {
    let db = Database::open_in_memory().unwrap();
    let mut ghost = User::new("ghost", "hash");
    ghost.id = 4242;

    let err = db.save(&mut ghost).await.unwrap_err();
    assert!(matches!(err, CrimsonError::Storage(_)));
    assert!(db.find_by_id::<User>(4242).await.unwrap().is_none());
    assert_eq!(db.count::<User>().await.unwrap(), 0);
}

#[tokio::test]
async fn test_cached_models_skip_the_store() {
    let db = Database::open_in_memory().unwrap();
    let user = saved_user(&db, "carol").await;
    let id = user.id;

    db.execute(move |conn| {
        conn.execute("UPDATE users SET password = 'raw' WHERE id = ?1", [id])?;
        Ok(())
    })
    .await
    .unwrap();

    // still the cached copy
    let cached = db.find_by_id::<User>(id).await.unwrap().unwrap();
    assert_eq!(cached.password, "hash");

    let mut refreshed = cached.clone();
    assert!(db.refresh(&mut refreshed).await.unwrap());
    assert_eq!(refreshed.password, "raw");
    let cached = db.find_by_id::<User>(id).await.unwrap().unwrap();
    assert_eq!(cached.password, "raw");
}

#[tokio::test]
async fn test_uncached_models_read_through() {
    let db = Database::open_in_memory().unwrap();
    let user = saved_user(&db, "dave").await;
    let character = saved_character(&db, &user, "Knight").await;
    let id = character.id;

    db.execute(move |conn| {
        conn.execute("UPDATE characters SET coins = 50 WHERE id = ?1", [id])?;
        Ok(())
    })
    .await
    .unwrap();

    let found = db.find_by_id::<Character>(id).await.unwrap().unwrap();
    assert_eq!(found.coins, 50);
    assert_eq!(db.cache().len::<Character>(), 0);
}

#[tokio::test]
async fn test_delete_evicts() {
    let db = Database::open_in_memory().unwrap();
    let mut user = saved_user(&db, "erin").await;
    assert_eq!(db.cache().len::<User>(), 1);

    db.delete(&user).await.unwrap();
    assert!(db.find_by_id::<User>(user.id).await.unwrap().is_none());
    assert!(!db.refresh(&mut user).await.unwrap());
}

#[tokio::test]
async fn test_find_helpers() {
    let db = Database::open_in_memory().unwrap();
    let mut ids = Vec::new();
    for name in ["amy", "ann", "ben", "bea", "cal"] {
        ids.push(saved_user(&db, name).await.id);
    }

    let all = db.find_all::<User>().await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(db.all::<User>().await.unwrap().len(), 5);

    let a_names = db
        .find_where::<User>("name LIKE ?", vec!["a%".to_string().into()])
        .await
        .unwrap();
    assert_eq!(a_names.len(), 2);

    let ben = db
        .find_first_where::<User>("LOWER(name) = LOWER(?)", vec!["BEN".to_string().into()])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ben.name, "ben");

    let picked = db
        .where_in::<User>("name", vec!["cal".to_string().into(), "amy".to_string().into(), "nobody".to_string().into()])
        .await
        .unwrap();
    assert_eq!(picked.len(), 2);
    assert!(db.where_in::<User>("name", Vec::new()).await.unwrap().is_empty());
    assert!(db.where_in::<User>("bad column", vec![1.into()]).await.is_err());

    let by_ids = db.where_in_ids::<User>(&[ids[0], 9999, ids[4]]).await.unwrap();
    assert_eq!(by_ids.len(), 2);

    assert_eq!(
        db.count_where::<User>("name LIKE ?", vec!["b%".to_string().into()]).await.unwrap(),
        2
    );

    let by_sql = db
        .find_by_sql::<User>("SELECT * FROM users WHERE id > ? ORDER BY id", vec![ids[2].into()])
        .await
        .unwrap();
    assert_eq!(by_sql.len(), 2);
}

#[tokio::test]
async fn test_bulk_update_and_delete() {
    let db = Database::open_in_memory().unwrap();
    let user = saved_user(&db, "frank").await;
    saved_character(&db, &user, "One").await;
    saved_character(&db, &user, "Two").await;

    let updated = db
        .update_all::<Character>("coins = coins + ?", vec![Value::Integer(10)])
        .await
        .unwrap();
    assert_eq!(updated, 2);
    assert_eq!(
        db.count_where::<Character>("coins = ?", vec![10.into()]).await.unwrap(),
        2
    );

    let deleted = db
        .delete_where::<Character>("name = ?", vec!["One".to_string().into()])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(db.count::<Character>().await.unwrap(), 1);
}

#[tokio::test]
async fn test_bulk_update_purges_cache() {
    let db = Database::open_in_memory().unwrap();
    let user = saved_user(&db, "gina").await;

    db.update_all::<User>("password = ?", vec!["reset".to_string().into()])
        .await
        .unwrap();
    let found = db.find_by_id::<User>(user.id).await.unwrap().unwrap();
    assert_eq!(found.password, "reset");
}

#[tokio::test]
async fn test_row_conversion_failure() {
    let db = Database::open_in_memory().unwrap();
    saved_user(&db, "hank").await;

    let err = db
        .find_by_sql::<Character>("SELECT id FROM users", Vec::new())
        .await
        .unwrap_err();
    match err {
        CrimsonError::InvalidFieldValue(message) => assert!(message.contains("characters")),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_transaction_commit_and_rollback() {
    let db = Database::open_in_memory().unwrap();

    let result: Result<(), CrimsonError> = db
        .transaction(|tx| {
            operations::insert(tx, &User::new("t1", "h"))?;
            Err(CrimsonError::Storage("boom".to_string()))
        })
        .await;
    assert!(result.is_err());
    assert_eq!(db.count::<User>().await.unwrap(), 0);

    let ids = db
        .transaction(|tx| {
            let a = operations::insert(tx, &User::new("t1", "h"))?;
            let b = operations::insert(tx, &User::new("t2", "h"))?;
            Ok(vec![a, b])
        })
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(db.count::<User>().await.unwrap(), 2);
}

#[tokio::test]
async fn test_duplicate_insert_is_entity_creation_error() {
    let db = Database::open_in_memory().unwrap();
    saved_user(&db, "ivy").await;

    let mut dup = User::new("IVY", "h");
    let err = db.save(&mut dup).await.unwrap_err();
    assert!(matches!(err, CrimsonError::EntityCreation(_)));
    assert!(dup.is_new_record());
}

#[tokio::test]
async fn test_query_builder() {
    let db = Database::open_in_memory().unwrap();
    for name in ["a", "b", "c", "d", "e"] {
        saved_user(&db, name).await;
    }

    let rows = db
        .query::<User>()
        .where_op("name", ">", "a".to_string())
        .order_by("name", "desc")
        .limit(2)
        .get()
        .await
        .unwrap();
    let names: Vec<&str> = rows.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["e", "d"]);

    let skipped = db
        .query::<User>()
        .order_by("id", "asc")
        .offset(3)
        .get()
        .await
        .unwrap();
    assert_eq!(skipped.len(), 2);

    let first = db
        .query::<User>()
        .order_by("name", "asc")
        .first()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.name, "a");

    let found = db.query::<User>().find(first.id).await.unwrap().unwrap();
    assert_eq!(found, first);
    assert!(db.query::<User>().find(12345).await.unwrap().is_none());

    let count = db
        .query::<User>()
        .where_op("name", "in_list", "x".to_string())
        .count()
        .await;
    assert!(count.is_err());

    assert_eq!(
        db.query::<User>().where_op("name", "!=", "c".to_string()).count().await.unwrap(),
        4
    );
}

#[tokio::test]
async fn test_paginator() {
    let db = Database::open_in_memory().unwrap();
    for i in 0..7 {
        saved_user(&db, &format!("user{}", i)).await;
    }
    saved_user(&db, "other").await;

    let mut pages = db
        .paginate::<User>(3)
        .with_condition("name LIKE ?", vec!["user%".to_string().into()])
        .order_by_raw("id ASC");

    assert_eq!(pages.count().await.unwrap(), 7);
    assert_eq!(pages.total_pages().await.unwrap(), 3);
    assert_eq!(pages.page_count().await.unwrap(), 3);

    let page = pages.get_page(1).await.unwrap();
    assert_eq!(page.len(), 3);
    assert_eq!(page[0].name, "user0");
    assert!(!pages.has_previous());
    assert!(pages.has_next().await.unwrap());

    assert_eq!(pages.next_page().await.unwrap().len(), 3);
    let last = pages.next_page().await.unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].name, "user6");
    assert_eq!(pages.current_page(), 3);
    assert!(!pages.has_next().await.unwrap());

    pages.prev_page().await.unwrap();
    assert_eq!(pages.current_page(), 2);
    assert!(pages.has_previous());

    pages.get_page(0).await.unwrap();
    assert_eq!(pages.current_page(), 1);
    pages.prev_page().await.unwrap();
    assert_eq!(pages.current_page(), 1);
}

#[tokio::test]
async fn test_paginator_minimum_page_size() {
    let db = Database::open_in_memory().unwrap();
    saved_user(&db, "solo").await;
    saved_user(&db, "duo").await;

    let mut pages = db.paginate::<User>(0);
    assert_eq!(pages.page_size(), 1);
    assert_eq!(pages.total_pages().await.unwrap(), 2);
    assert_eq!(pages.get_page(2).await.unwrap().len(), 1);

    let mut wide = db.paginate::<User>(u64::MAX);
    assert!(wide.get_page(u64::MAX).await.unwrap().is_empty());
    assert_eq!(wide.get_page(1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_one_to_many_and_many_to_one() {
    let db = Database::open_in_memory().unwrap();
    let owner = saved_user(&db, "owner").await;
    let loner = saved_user(&db, "loner").await;
    saved_character(&db, &owner, "First").await;
    saved_character(&db, &owner, "Second").await;

    let users = vec![owner.clone(), loner.clone()];
    let characters = db
        .load_related::<User, Character>(&users, "characters")
        .await
        .unwrap();
    assert_eq!(characters[&owner.id].len(), 2);
    assert!(characters[&loner.id].is_empty());

    let owned = characters[&owner.id].clone();
    let owners = db
        .load_related::<Character, User>(&owned, "user")
        .await
        .unwrap();
    for character in &owned {
        assert_eq!(owners[&character.id], vec![owner.clone()]);
    }
}

#[tokio::test]
async fn test_many_to_many() {
    let db = Database::open_in_memory().unwrap();
    let mut areas = Vec::new();
    for name in ["town", "forest", "empty"] {
        let mut area = Area {
            name: name.to_string(),
            ..Default::default()
        };
        db.save(&mut area).await.unwrap();
        areas.push(area);
    }
    let mut frames = Vec::new();
    for name in ["Enter", "Shop", "Gate"] {
        let mut frame = AreaFrame {
            id: 0,
            name: name.to_string(),
        };
        db.save(&mut frame).await.unwrap();
        frames.push(frame);
    }

    let links = vec![
        (areas[0].id, frames[1].id),
        (areas[0].id, frames[0].id),
        (areas[1].id, frames[2].id),
        (areas[1].id, frames[0].id),
    ];
    db.execute(move |conn| {
        for (area, frame) in links {
            conn.execute(
                "INSERT INTO areas_frames_links (area_id, frame_id) VALUES (?1, ?2)",
                [area, frame],
            )?;
        }
        Ok(())
    })
    .await
    .unwrap();

    let related = db
        .load_related::<Area, AreaFrame>(&areas, "frames")
        .await
        .unwrap();

    // link insertion order, not frame id order
    let names = |id: i64| -> Vec<String> { related[&id].iter().map(|f| f.name.clone()).collect() };
    assert_eq!(names(areas[0].id), vec!["Shop", "Enter"]);
    assert_eq!(names(areas[1].id), vec!["Gate", "Enter"]);
    assert!(related[&areas[2].id].is_empty());
}

#[tokio::test]
async fn test_query_with_relation() {
    let db = Database::open_in_memory().unwrap();
    let mut area = Area {
        name: "castle".to_string(),
        asset: "castle.swf".to_string(),
        ..Default::default()
    };
    db.save(&mut area).await.unwrap();

    for (handler, order) in [("spawn", 2), ("intro", 1)] {
        let mut row = AreaHandler {
            area_id: area.id,
            handler: handler.to_string(),
            order,
            ..Default::default()
        };
        db.save(&mut row).await.unwrap();
    }

    let (areas, handlers) = db
        .query::<Area>()
        .with("handlers")
        .where_eq("id", area.id)
        .get_with::<AreaHandler>("handlers")
        .await
        .unwrap();
    assert_eq!(areas.len(), 1);
    assert_eq!(handlers[&area.id].len(), 2);

    let ordered = db
        .query::<AreaHandler>()
        .order_by("order", "asc")
        .get()
        .await
        .unwrap();
    assert_eq!(ordered[0].handler, "intro");
    assert_eq!(ordered[0].parameter, None);
}

#[tokio::test]
async fn test_relation_errors() {
    let db = Database::open_in_memory().unwrap();
    let users = vec![saved_user(&db, "x").await];

    let err = db
        .load_related::<User, Character>(&users, "pets")
        .await
        .unwrap_err();
    assert!(matches!(err, CrimsonError::RelationNotFound(_)));

    let err = db
        .load_related::<User, Area>(&users, "characters")
        .await
        .unwrap_err();
    assert!(matches!(err, CrimsonError::Storage(_)));

    let empty: Vec<User> = Vec::new();
    let loaded = db
        .load_related::<User, Character>(&empty, "characters")
        .await
        .unwrap();
    assert!(loaded.is_empty());
}

#[tokio::test]
async fn test_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("game.db");
    let config = DatabaseData {
        path: path.to_string_lossy().to_string(),
    };

    {
        let db = Database::from_config(&config).unwrap();
        saved_user(&db, "persisted").await;
    }

    assert!(path.exists());
    let db = Database::open(&path).unwrap();
    let users = db.all::<User>().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "persisted");
}
