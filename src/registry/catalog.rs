//! Built-in feature catalogue

use super::{AccessorSpec, DefaultTable, FeatureDescriptor, PRIMARY_ACCESSOR, PRIMARY_FEATURE};
use once_cell::sync::Lazy;

static CATALOG: Lazy<Vec<FeatureDescriptor>> = Lazy::new(|| {
    let suffixed = |suffix: &str| DefaultTable::suffixed(suffix);
    let keyed = |name: &str, accessor: &str, suffix: &str, columns: &[&str]| {
        FeatureDescriptor::new(name)
            .accessor(AccessorSpec::new(accessor, suffixed(suffix), columns))
            .template(name)
            .depends_on(PRIMARY_FEATURE)
    };

    vec![
        FeatureDescriptor::new(PRIMARY_FEATURE)
            .accessor(AccessorSpec::new(
                PRIMARY_ACCESSOR,
                DefaultTable::Pluralized,
                &["id", "email", "status_id"],
            ))
            .accessor(AccessorSpec::new(
                "password_hash_table",
                suffixed("_password_hashes"),
                &["id", "password_hash"],
            ))
            .template(PRIMARY_FEATURE),
        keyed("remember", "remember_table", "_remember_keys", &["id", "key", "deadline"]),
        keyed(
            "verify_account",
            "verify_account_table",
            "_verification_keys",
            &["id", "key", "requested_at", "email_last_sent"],
        ),
        keyed(
            "verify_login_change",
            "verify_login_change_table",
            "_login_change_keys",
            &["id", "key", "login", "deadline"],
        ),
        keyed(
            "reset_password",
            "reset_password_table",
            "_password_reset_keys",
            &["id", "key", "deadline", "email_last_sent"],
        ),
        keyed(
            "lockout",
            "account_login_failures_table",
            "_login_failures",
            &["id", "number"],
        )
        .accessor(AccessorSpec::new(
            "account_lockouts_table",
            suffixed("_lockouts"),
            &["id", "key", "deadline", "email_last_sent"],
        )),
        keyed(
            "email_auth",
            "email_auth_table",
            "_email_auth_keys",
            &["id", "key", "deadline", "email_last_sent"],
        ),
        keyed(
            "otp",
            "otp_keys_table",
            "_otp_keys",
            &["id", "key", "num_failures", "last_use"],
        ),
        keyed(
            "otp_unlock",
            "otp_unlock_table",
            "_otp_unlocks",
            &["id", "num_successes", "next_auth_attempt_after"],
        )
        .depends_on("otp"),
        keyed("recovery_codes", "recovery_codes_table", "_recovery_codes", &["id", "code"]),
        keyed(
            "sms_codes",
            "sms_codes_table",
            "_sms_codes",
            &["id", "phone_number", "num_failures", "code", "code_issued_at"],
        ),
        keyed(
            "webauthn",
            "webauthn_user_ids_table",
            "_webauthn_user_ids",
            &["id", "webauthn_id"],
        )
        .accessor(AccessorSpec::new(
            "webauthn_keys_table",
            suffixed("_webauthn_keys"),
            &["account_id", "webauthn_id", "public_key", "sign_count", "last_use"],
        )),
        keyed(
            "active_sessions",
            "active_sessions_table",
            "_active_session_keys",
            &["account_id", "session_id", "created_at", "last_use"],
        ),
        keyed(
            "account_expiration",
            "account_activity_table",
            "_activity_times",
            &["id", "last_activity_at", "last_login_at", "expired_at"],
        ),
        keyed(
            "audit_logging",
            "audit_logging_table",
            "_authentication_audit_logs",
            &["id", "account_id", "at", "message", "metadata"],
        ),
        keyed(
            "password_expiration",
            "password_expiration_table",
            "_password_change_times",
            &["id", "changed_at"],
        ),
        keyed(
            "disallow_password_reuse",
            "previous_password_hash_table",
            "_previous_password_hashes",
            &["id", "account_id", "password_hash"],
        ),
        keyed("single_session", "single_session_table", "_session_keys", &["id", "key"]),
        keyed(
            "jwt_refresh",
            "jwt_refresh_token_table",
            "_jwt_refresh_keys",
            &["id", "account_id", "key", "deadline"],
        ),
    ]
});

pub fn lookup(name: &str) -> Option<&'static FeatureDescriptor> {
    CATALOG.iter().find(|f| f.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|f| f.name.as_str())
}

pub fn all() -> &'static [FeatureDescriptor] {
    &CATALOG
}
