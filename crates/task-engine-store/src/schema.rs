//! Diesel table definitions for the relational schema in the persistence contract.

diesel::table! {
    use diesel::sql_types::*;

    tasks (task_id) {
        task_id -> Varchar,
        #[sql_name = "type"]
        task_type -> Varchar,
        status -> Varchar,
        data -> Json,
        handler_url -> Nullable<Varchar>,
        retry_count -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;

    task_events (event_id) {
        event_id -> Varchar,
        task_id -> Varchar,
        event_type -> Varchar,
        metadata -> Json,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(task_events -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, task_events);
