//! Hand-maintained Diesel schema, kept in lockstep with `migrations/`.

diesel::table! {
    app_user (id) {
        id -> Uuid,
        name -> Text,
        email -> Text,
        password_hash -> Text,
        otp_hash -> Nullable<Text>,
        otp_issued_at -> Nullable<Timestamptz>,
        is_verified -> Bool,
        is_active -> Bool,
        manual_block_override -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    admin_account (id) {
        id -> Uuid,
        name -> Text,
        email -> Text,
        password_hash -> Text,
        is_active -> Bool,
        is_superuser -> Bool,
        last_login_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    profile (id) {
        id -> Uuid,
        user_id -> Uuid,
        blood_group -> Text,
        city -> Text,
        contact_number -> Nullable<Text>,
        role -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    donation_request (id) {
        id -> Uuid,
        requester_id -> Uuid,
        donor_id -> Uuid,
        blood_group -> Text,
        urgency -> Text,
        notes -> Nullable<Text>,
        requester_confirmed -> Nullable<Bool>,
        donor_confirmed -> Nullable<Bool>,
        status -> Text,
        counted_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    call_log (id) {
        id -> Uuid,
        caller_id -> Uuid,
        receiver_id -> Uuid,
        donation_request_id -> Nullable<Uuid>,
        duration_seconds -> Int4,
        outcome -> Text,
        notes -> Nullable<Text>,
        donor_reply -> Nullable<Text>,
        replied_at -> Nullable<Timestamptz>,
        confirmation_email_sent_at -> Nullable<Timestamptz>,
        counted_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    monthly_tracker (id) {
        id -> Uuid,
        user_id -> Uuid,
        month -> Date,
        completed_calls_count -> Int4,
        monthly_goal_completed -> Bool,
        goal_completed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(profile -> app_user (user_id));
diesel::joinable!(monthly_tracker -> app_user (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    app_user,
    admin_account,
    profile,
    donation_request,
    call_log,
    monthly_tracker,
);
