#[cfg(test)]
mod tests {
    use chrono::Duration;
    use pawdoc::config::DatabaseConfig;
    use pawdoc::db::connection;
    use pawdoc::db::service::{DbService, SessionClose};
    use pawdoc::db::DbPool;

    // In-memory database just for tests
    fn get_test_db() -> DbPool {
        let config = DatabaseConfig {
            path: ":memory:".to_string(),
        };
        connection::get_connection(&config).unwrap()
    }

    #[test]
    fn test_pet_lifecycle() {
        let pool = get_test_db();
        let conn = pool.lock().unwrap();

        // 1. Insert Pet
        let pet = DbService::insert_pet(
            &conn,
            Some(1),
            "Rex",
            "Dog",
            "Labrador",
            4,
            "arthritis",
            "limping",
        )
        .unwrap();
        assert_eq!(pet.name, "Rex");
        assert_eq!(pet.user_id, Some(1));
        assert!(pet.thread_id.is_none());

        // 2. Get / List
        let fetched = DbService::get_pet(&conn, pet.id).unwrap().unwrap();
        assert_eq!(fetched.id, pet.id);
        let list = DbService::list_pets(&conn, 1).unwrap();
        assert_eq!(list.len(), 1);

        // 3. Attach a conversation thread
        assert!(DbService::update_pet_thread(&conn, pet.id, "thread_abc").unwrap());
        let with_thread = DbService::get_pet(&conn, pet.id).unwrap().unwrap();
        assert_eq!(with_thread.thread_id.as_deref(), Some("thread_abc"));

        // 4. Health update rewrites condition fields
        assert!(DbService::update_pet_health(&conn, pet.id, "no more limping", "recovering").unwrap());
        let updated = DbService::get_pet(&conn, pet.id).unwrap().unwrap();
        assert_eq!(updated.symptoms, "no more limping");
        assert_eq!(updated.disease, "recovering");

        // 5. Unknown pet updates affect nothing
        assert!(!DbService::update_pet_thread(&conn, 9999, "thread_x").unwrap());
    }

    #[test]
    fn test_message_lifecycle_with_metrics() {
        let pool = get_test_db();
        let conn = pool.lock().unwrap();

        let pet =
            DbService::insert_pet(&conn, None, "Mia", "Cat", "Siamese", 2, "none", "healthy")
                .unwrap();

        let inbound = DbService::insert_message(
            &conn,
            pet.id,
            "thread_1",
            None,
            "user",
            "Why is my cat sneezing?",
            None,
            true,
            None,
        )
        .unwrap();
        assert_eq!(inbound.role, "user");
        assert!(inbound.response_time_ms.is_none());
        assert!(inbound.source.is_none());

        let outbound = DbService::insert_message(
            &conn,
            pet.id,
            "thread_1",
            None,
            "assistant",
            "Sneezing in cats is often caused by mild upper respiratory irritation.",
            Some(1840),
            true,
            Some("assistant"),
        )
        .unwrap();
        assert_eq!(outbound.role, "assistant");
        assert_eq!(outbound.response_time_ms, Some(1840));
        assert_eq!(outbound.source.as_deref(), Some("assistant"));
        assert!(outbound.is_understood);

        let history = DbService::chat_history(&conn, pet.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
    }

    #[test]
    fn test_pet_delete_cascades() {
        let pool = get_test_db();
        let conn = pool.lock().unwrap();

        let pet =
            DbService::insert_pet(&conn, Some(7), "Tico", "Bird", "Parrot", 1, "none", "healthy")
                .unwrap();
        let msg = DbService::insert_message(
            &conn, pet.id, "thread_2", None, "user", "hello", None, true, None,
        )
        .unwrap();
        DbService::insert_topic(&conn, msg.id, "General Care").unwrap();
        DbService::insert_feedback(&conn, pet.id, "thread_2", 5, Some("great")).unwrap();

        DbService::delete_pet(&conn, pet.id).unwrap();

        assert!(DbService::get_pet(&conn, pet.id).unwrap().is_none());
        assert!(DbService::chat_history(&conn, pet.id).unwrap().is_empty());
        assert!(DbService::topic_counts(&conn).unwrap().is_empty());
        assert!(DbService::rating_counts(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_session_close_is_idempotent() {
        let pool = get_test_db();
        let conn = pool.lock().unwrap();

        let session = DbService::open_session(&conn, Some(3), "desktop").unwrap();
        assert!(session.end_time.is_none());
        assert_eq!(session.messages_count, 0);

        DbService::bump_session_messages(&conn, session.id, 2).unwrap();
        DbService::bump_session_messages(&conn, session.id, 2).unwrap();
        let counted = DbService::get_session(&conn, session.id).unwrap().unwrap();
        assert_eq!(counted.messages_count, 4);

        // First close sets the end timestamp
        assert_eq!(
            DbService::end_session(&conn, session.id).unwrap(),
            SessionClose::Closed
        );
        let closed = DbService::get_session(&conn, session.id).unwrap().unwrap();
        let first_end = closed.end_time.expect("end_time should be set");

        // Second close reports already-ended and keeps the original timestamp
        assert_eq!(
            DbService::end_session(&conn, session.id).unwrap(),
            SessionClose::AlreadyEnded
        );
        let still_closed = DbService::get_session(&conn, session.id).unwrap().unwrap();
        assert_eq!(still_closed.end_time, Some(first_end));

        assert_eq!(
            DbService::end_session(&conn, uuid::Uuid::new_v4()).unwrap(),
            SessionClose::NotFound
        );
    }

    #[test]
    fn test_staleness_rule() {
        let pool = get_test_db();
        let conn = pool.lock().unwrap();
        let threshold = Duration::seconds(300);

        let pet =
            DbService::insert_pet(&conn, None, "Max", "Dog", "Beagle", 6, "allergy", "itching")
                .unwrap();

        // Freshly inserted pets were just updated
        assert!(!DbService::pet_needs_update(&conn, pet.id, threshold).unwrap());

        // Age the record past the threshold
        conn.execute(
            "UPDATE pets SET last_updated = CAST(CURRENT_TIMESTAMP AS TIMESTAMP) - INTERVAL 10 MINUTE WHERE id = ?",
            duckdb::params![pet.id],
        )
        .unwrap();
        assert!(DbService::pet_needs_update(&conn, pet.id, threshold).unwrap());

        // touch_pet resets the clock
        DbService::touch_pet(&conn, pet.id).unwrap();
        assert!(!DbService::pet_needs_update(&conn, pet.id, threshold).unwrap());

        // Unknown pets always want an update
        assert!(DbService::pet_needs_update(&conn, 424242, threshold).unwrap());
    }

    #[test]
    fn test_admin_aggregations() {
        let pool = get_test_db();
        let conn = pool.lock().unwrap();

        let user_id = DbService::insert_user(&conn, "owner@example.com", "Owner").unwrap();
        let dog = DbService::insert_pet(
            &conn, Some(user_id), "Rex", "Dog", "Labrador", 4, "arthritis", "limping",
        )
        .unwrap();
        DbService::insert_pet(
            &conn, Some(user_id), "Mia", "Cat", "Siamese", 2, "arthritis", "stiffness",
        )
        .unwrap();
        DbService::insert_feedback(&conn, dog.id, "thread_1", 4, None).unwrap();
        DbService::insert_feedback(&conn, dog.id, "thread_1", 2, Some("slow answer")).unwrap();

        let stats = DbService::overall_stats(&conn).unwrap();
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_pets, 2);
        assert_eq!(stats.avg_rating, Some(3.0));

        let types = DbService::pet_type_counts(&conn).unwrap();
        assert_eq!(types.len(), 2);

        let diseases = DbService::disease_counts(&conn).unwrap();
        assert_eq!(diseases[0].label, "arthritis");
        assert_eq!(diseases[0].count, 2);

        let session = DbService::open_session(&conn, Some(user_id), "mobile").unwrap();
        DbService::bump_session_messages(&conn, session.id, 2).unwrap();
        let session_stats = DbService::session_stats(&conn).unwrap();
        assert_eq!(session_stats.total_sessions, 1);
        assert_eq!(session_stats.open_sessions, 1);
        assert_eq!(session_stats.devices[0].label, "mobile");
    }
}
