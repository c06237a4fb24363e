use std::env;

use cleancrew_be::config::Config;
use pretty_assertions::assert_eq;
use serial_test::serial;

const CONFIG_KEYS: &[&str] = &[
    "DATABASE_URL",
    "HOST",
    "PORT",
    "ENVIRONMENT",
    "BASE_URL",
    "RECURRENCE_CONCURRENCY",
    "TRAVEL_TIMEOUT_SECS",
    "TRAVEL_CACHE_TTL_SECS",
    "ROUTE_TABLE_PATH",
];

fn snapshot_env() -> Vec<(&'static str, Option<String>)> {
    CONFIG_KEYS
        .iter()
        .map(|&key| (key, env::var(key).ok()))
        .collect()
}

fn clear_env() {
    for key in CONFIG_KEYS {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn restore_env(saved: Vec<(&'static str, Option<String>)>) {
    for (key, value) in saved {
        unsafe {
            match value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn config_falls_back_to_defaults() {
    let saved = snapshot_env();
    clear_env();

    let config = Config::from_env_only().unwrap();

    assert_eq!(config.database_url, "postgres://@localhost:5432/cleancrew");
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 8080);
    assert_eq!(config.environment, "development");
    assert_eq!(config.client_base_url, "http://localhost:3000");
    assert_eq!(config.recurrence_concurrency, 8);
    assert_eq!(config.travel_timeout_secs, 5);
    assert_eq!(config.travel_cache_ttl_secs, 900);
    assert_eq!(config.route_table_path, None);
    assert!(config.is_development());
    assert!(!config.is_production());

    restore_env(saved);
}

#[test]
#[serial]
fn config_reads_custom_values() {
    let saved = snapshot_env();
    clear_env();

    unsafe {
        env::set_var("DATABASE_URL", "postgres://cleancrew@db:5432/scheduling");
        env::set_var("HOST", "0.0.0.0");
        env::set_var("PORT", "3000");
        env::set_var("ENVIRONMENT", "production");
        env::set_var("RECURRENCE_CONCURRENCY", "4");
        env::set_var("TRAVEL_TIMEOUT_SECS", "2");
        env::set_var("ROUTE_TABLE_PATH", "/etc/cleancrew/routes.json");
    }

    let config = Config::from_env_only().unwrap();

    assert_eq!(
        config.database_url,
        "postgres://cleancrew@db:5432/scheduling"
    );
    assert_eq!(config.server_address(), "0.0.0.0:3000");
    assert!(config.is_production());
    assert_eq!(config.recurrence_concurrency, 4);
    assert_eq!(config.travel_timeout_secs, 2);
    assert_eq!(
        config.route_table_path.as_deref(),
        Some("/etc/cleancrew/routes.json")
    );

    restore_env(saved);
}

#[test]
#[serial]
fn unparseable_numbers_fall_back_to_defaults() {
    let saved = snapshot_env();
    clear_env();

    unsafe {
        env::set_var("PORT", "not-a-port");
        env::set_var("RECURRENCE_CONCURRENCY", "lots");
    }

    let config = Config::from_env_only().unwrap();

    assert_eq!(config.port, 8080);
    assert_eq!(config.recurrence_concurrency, 8);

    restore_env(saved);
}
