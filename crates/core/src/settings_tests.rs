// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_are_valid() {
    assert_eq!(Settings::default().validate(), Ok(()));
}

#[test]
fn zero_max_users_is_rejected() {
    let settings = Settings {
        max_users: 0,
        ..Settings::default()
    };
    assert_eq!(settings.validate(), Err(SettingsError::ZeroMaxUsers));
}

#[test]
fn zero_timeouts_are_rejected() {
    let settings = Settings {
        choice_timeout: Duration::ZERO,
        ..Settings::default()
    };
    assert_eq!(
        settings.validate(),
        Err(SettingsError::ZeroTimeout("choice_timeout"))
    );

    let settings = Settings {
        reservation_timeout: Duration::ZERO,
        ..Settings::default()
    };
    assert_eq!(
        settings.validate(),
        Err(SettingsError::ZeroTimeout("reservation_timeout"))
    );
}

#[test]
fn settings_serialize_with_humantime_durations() {
    let json = serde_json::to_value(Settings::default()).expect("serialize");
    assert_eq!(json["max_users"], 3);
    assert_eq!(json["choice_timeout"], "30s");
    assert_eq!(json["reservation_timeout"], "2m");
}
