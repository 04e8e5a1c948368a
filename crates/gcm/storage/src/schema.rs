//! Diesel schema definitions.

diesel::table! {
    devices (device_id) {
        device_id -> Text,
        registration_token -> Text,
        display_name -> Nullable<Text>,
        is_active -> Bool,
        created_at -> Timestamp,
        modified_at -> Timestamp,
    }
}

diesel::table! {
    messages (id) {
        id -> Text,
        topic -> Text,
        created_at -> Timestamp,
        payload -> Text,
        response -> Text,
        status -> Text,
    }
}

diesel::table! {
    message_devices (message_id, device_id) {
        message_id -> Text,
        device_id -> Text,
    }
}

diesel::joinable!(message_devices -> messages (message_id));
diesel::joinable!(message_devices -> devices (device_id));

diesel::allow_tables_to_appear_in_same_query!(devices, messages, message_devices);
