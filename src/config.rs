use ini::Ini;
use std::path::Path;
use std::time::Duration;

use crate::routing::identifier::MAX_RING_BITS;

/// Runtime parameters of a single node.
///
/// All peers of one ring must agree on `ring_bits`; the remaining values
/// are local tuning knobs.
#[derive(Clone, Debug)]
pub struct Config {
    /// Address the peer-to-peer interface binds to; hashing this string
    /// yields the node's identifier.
    pub listen_address: String,
    /// Address the api interface binds to.
    pub api_address: String,
    /// Width m of the identifier space [0, 2^m).
    pub ring_bits: u8,
    /// Pause between two runs of the stabilization procedures.
    pub stabilize_interval: Duration,
    /// Timeout for liveness probes and stabilization calls.
    pub ping_timeout: Duration,
    /// Timeout for client-driven lookups and storage forwarding.
    pub lookup_timeout: Duration,
    /// Worker threads per listener.
    pub worker_threads: usize,
}

impl Config {
    /// Creates a config for the given addresses with default parameters.
    pub fn new<S: Into<String>, T: Into<String>>(listen_address: S, api_address: T) -> Self {
        Config {
            listen_address: listen_address.into(),
            api_address: api_address.into(),
            ring_bits: MAX_RING_BITS,
            stabilize_interval: Duration::from_secs(1),
            ping_timeout: Duration::from_secs(2),
            lookup_timeout: Duration::from_secs(10),
            worker_threads: 4,
        }
    }

    /// Loads the `[chord]` section of an ini file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
        let conf = Ini::load_from_file(path)?;

        let section = conf.section(Some("chord"))
            .ok_or("missing section `chord`")?;

        let listen_address = section.get("listen_address")
            .ok_or("missing value `listen_address`")?
            .to_string();

        let api_address = section.get("api_address")
            .ok_or("missing value `api_address`")?
            .to_string();

        let mut config = Config::new(listen_address, api_address);

        if let Some(value) = section.get("ring_bits") {
            config.ring_bits = value.parse()?;
        }

        if let Some(value) = section.get("stabilize_interval_ms") {
            config.stabilize_interval = Duration::from_millis(value.parse()?);
        }

        if let Some(value) = section.get("ping_timeout_ms") {
            config.ping_timeout = Duration::from_millis(value.parse()?);
        }

        if let Some(value) = section.get("lookup_timeout_ms") {
            config.lookup_timeout = Duration::from_millis(value.parse()?);
        }

        if let Some(value) = section.get("worker_threads") {
            config.worker_threads = value.parse()?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Rejects parameter combinations no ring can run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.ring_bits == 0 || self.ring_bits > MAX_RING_BITS {
            return Err(format!(
                "ring_bits must lie in 1..={}, got {}",
                MAX_RING_BITS, self.ring_bits
            ).into());
        }

        if self.worker_threads == 0 {
            return Err("worker_threads must be at least 1".into());
        }

        if self.stabilize_interval.as_millis() == 0 {
            return Err("stabilize_interval_ms must be positive".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_full_section() {
        let path = std::env::temp_dir().join("chord-config-test.ini");
        fs::write(
            &path,
            "[chord]\n\
             listen_address = 127.0.0.1:8000\n\
             api_address = 127.0.0.1:8001\n\
             ring_bits = 8\n\
             stabilize_interval_ms = 250\n\
             ping_timeout_ms = 500\n\
             lookup_timeout_ms = 4000\n\
             worker_threads = 2\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!("127.0.0.1:8000", config.listen_address);
        assert_eq!("127.0.0.1:8001", config.api_address);
        assert_eq!(8, config.ring_bits);
        assert_eq!(Duration::from_millis(250), config.stabilize_interval);
        assert_eq!(Duration::from_millis(500), config.ping_timeout);
        assert_eq!(Duration::from_secs(4), config.lookup_timeout);
        assert_eq!(2, config.worker_threads);
    }

    #[test]
    fn defaults_apply_when_values_missing() {
        let path = std::env::temp_dir().join("chord-config-defaults.ini");
        fs::write(
            &path,
            "[chord]\n\
             listen_address = 127.0.0.1:8000\n\
             api_address = 127.0.0.1:8001\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(MAX_RING_BITS, config.ring_bits);
        assert_eq!(Duration::from_secs(1), config.stabilize_interval);
        assert_eq!(Duration::from_secs(2), config.ping_timeout);
        assert_eq!(Duration::from_secs(10), config.lookup_timeout);
    }

    #[test]
    fn rejects_out_of_range_ring_bits() {
        let mut config = Config::new("127.0.0.1:8000", "127.0.0.1:8001");
        config.ring_bits = 0;
        assert!(config.validate().is_err());

        config.ring_bits = MAX_RING_BITS + 1;
        assert!(config.validate().is_err());
    }
}
