//! Record fixtures and test setup helpers.

use relay_data::{Record, RecordIdentity};
use tracing_subscriber::EnvFilter;

/// Identity of a `planet` record.
pub fn planet(id: &str) -> RecordIdentity {
    RecordIdentity::new("planet", id)
}

/// Identity of a `moon` record.
pub fn moon(id: &str) -> RecordIdentity {
    RecordIdentity::new("moon", id)
}

/// Identity of a `star` record.
pub fn star(id: &str) -> RecordIdentity {
    RecordIdentity::new("star", id)
}

/// Earth, with a name, a remote id, its moon and its sun.
pub fn earth() -> Record {
    Record::new(planet("earth"))
        .with_attribute("name", "Earth")
        .with_key("remoteId", "p3")
        .with_has_many("moons", vec![moon("luna")])
        .with_has_one("sun", Some(star("sol")))
}

/// Luna, pointing back at Earth.
pub fn luna() -> Record {
    Record::new(moon("luna"))
        .with_attribute("name", "Luna")
        .with_has_one("planet", Some(planet("earth")))
}

/// The sun.
pub fn sol() -> Record {
    Record::new(star("sol")).with_attribute("name", "Sol")
}

/// A small solar system: [`earth`], [`luna`] and [`sol`].
pub fn solar_system() -> Vec<Record> {
    vec![earth(), luna(), sol()]
}

/// Installs a `fmt` subscriber that writes through the test harness.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Safe to call from
/// every test; only the first call installs a subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_link_up() {
        let earth = earth();
        let luna = luna();

        assert!(earth.is(&planet("earth")));
        assert_eq!(earth.key("remoteId"), Some("p3"));
        assert!(luna.relationship_data("planet").is_some());
        assert_eq!(solar_system().len(), 3);
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
