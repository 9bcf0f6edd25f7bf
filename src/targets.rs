//! Target registration and connection
//!
//! A target names where the command interpreter lives and how to reach it,
//! in `name:key=value,...` form: `sim:peripheral=echo`,
//! `serial:dev=/dev/ttyACM0,baud=115200`, `tcp:host=127.0.0.1,port=2121`.

use std::collections::HashMap;

use spibridge_core::config::BusConfig;
use spibridge_host::Transport;
use thiserror::Error;

/// Errors raised while resolving a target string
#[derive(Debug, Error)]
pub enum TargetError {
    /// Parameter not written as `key=value`
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    BadParameter(String),

    /// Target name not known or not compiled in
    #[error("Unknown target '{0}' (see 'spibridge list-targets')")]
    UnknownTarget(String),

    /// Required parameter absent
    #[error("Target '{target}' requires parameter '{key}'")]
    MissingParameter {
        /// Target name
        target: String,
        /// Parameter name
        key: &'static str,
    },

    /// Parameter value could not be parsed
    #[error("Invalid value '{value}' for parameter '{key}'")]
    InvalidValue {
        /// Parameter name
        key: String,
        /// Offending value
        value: String,
    },

    /// Parameter not understood by the target
    #[error("Target '{target}' does not accept parameter '{key}'")]
    UnknownParameter {
        /// Target name
        target: String,
        /// Parameter name
        key: String,
    },
}

/// Information about a target kind
pub struct TargetInfo {
    /// Name used in target strings
    pub name: &'static str,
    /// Short description including accepted parameters
    pub description: &'static str,
}

/// Get information about all targets enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_targets() -> Vec<TargetInfo> {
    let mut targets = Vec::new();

    #[cfg(feature = "sim")]
    targets.push(TargetInfo {
        name: "sim",
        description: "In-process simulated interpreter (period=<cyc>,delay=<cyc>,peripheral=echo|zero)",
    });

    #[cfg(feature = "serial")]
    targets.push(TargetInfo {
        name: "serial",
        description: "Interpreter behind a serial port (dev=<port>,baud=<rate>)",
    });

    #[cfg(feature = "tcp")]
    targets.push(TargetInfo {
        name: "tcp",
        description: "Interpreter behind a TCP socket (host=<addr>,port=<port>)",
    });

    targets
}

/// Generate a short list of target names for CLI help
pub fn target_names_short() -> String {
    let targets = available_targets();
    let names: Vec<&str> = targets.iter().map(|t| t.name).collect();
    names.join(", ")
}

/// A parsed target string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetParams {
    /// Target name
    pub name: String,
    /// Parameters in key=value form
    pub params: HashMap<String, String>,
}

impl TargetParams {
    /// Parse `name[:key=value,...]`
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

        let mut params = HashMap::new();
        if !opts_str.is_empty() {
            for opt in opts_str.split(',') {
                let (key, value) = opt
                    .split_once('=')
                    .ok_or_else(|| TargetError::BadParameter(opt.to_string()))?;
                params.insert(key.to_string(), value.to_string());
            }
        }

        Ok(Self {
            name: name.to_string(),
            params,
        })
    }

    /// Reject parameters outside `known`
    fn expect_only(&self, known: &[&str]) -> Result<(), TargetError> {
        match self.params.keys().find(|k| !known.contains(&k.as_str())) {
            Some(key) => Err(TargetError::UnknownParameter {
                target: self.name.clone(),
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Get a required string parameter
    fn require(&self, key: &'static str) -> Result<&str, TargetError> {
        self.params
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| TargetError::MissingParameter {
                target: self.name.clone(),
                key,
            })
    }

    /// Get an optional parameter parsed as `V`
    fn parsed<V: std::str::FromStr>(&self, key: &str) -> Result<Option<V>, TargetError> {
        self.params
            .get(key)
            .map(|value| {
                value.parse().map_err(|_| TargetError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                })
            })
            .transpose()
    }
}

/// Open the transport named by `target`
///
/// `bus` configures the simulated interpreter; remote interpreters have their
/// bus options fixed when they are built.
#[cfg_attr(not(feature = "sim"), allow(unused_variables))]
pub fn open_target(
    target: &str,
    bus: &BusConfig,
) -> Result<Box<dyn Transport>, Box<dyn std::error::Error>> {
    let params = TargetParams::parse(target)?;
    log::debug!("Opening target '{}' with {:?}", params.name, params.params);

    match params.name.as_str() {
        #[cfg(feature = "sim")]
        "sim" => open_sim(&params, bus),

        #[cfg(feature = "serial")]
        "serial" => {
            params.expect_only(&["dev", "baud"])?;
            let dev = params.require("dev")?;
            let baud = params.parsed("baud")?;
            Ok(Box::new(spibridge_host::SerialTransport::open(dev, baud)?))
        }

        #[cfg(feature = "tcp")]
        "tcp" => {
            params.expect_only(&["host", "port"])?;
            let host = params.require("host")?;
            let port = params
                .parsed("port")?
                .ok_or(TargetError::MissingParameter {
                    target: params.name.clone(),
                    key: "port",
                })?;
            Ok(Box::new(spibridge_host::TcpTransport::connect(host, port)?))
        }

        _ => {
            Err(TargetError::UnknownTarget(params.name.clone()).into())
        }
    }
}

#[cfg(feature = "sim")]
fn open_sim(
    params: &TargetParams,
    bus: &BusConfig,
) -> Result<Box<dyn Transport>, Box<dyn std::error::Error>> {
    use spibridge_core::config::{Timing, DEFAULT_SYS_CLK_HZ};
    use spibridge_device::{Echo, Peripheral, Scripted};
    use spibridge_host::SimTransport;

    params.expect_only(&["period", "delay", "peripheral"])?;

    let derived = Timing::derive(DEFAULT_SYS_CLK_HZ, bus)?;
    let timing = Timing::new(
        params.parsed("period")?.unwrap_or(derived.period_cyc()),
        params.parsed("delay")?.unwrap_or(derived.delay_cyc()),
    )?;

    let peripheral: Box<dyn Peripheral> = match params.params.get("peripheral").map(String::as_str) {
        None | Some("echo") => Box::new(Echo::default()),
        Some("zero") => Box::new(Scripted::new(0x00)),
        Some(other) => {
            return Err(TargetError::InvalidValue {
                key: "peripheral".to_string(),
                value: other.to_string(),
            }
            .into())
        }
    };

    log::info!(
        "Simulating SPI mode {} with a {} cycle clock period",
        bus.mode(),
        timing.period_cyc()
    );
    Ok(Box::new(SimTransport::with_peripheral(*bus, timing, peripheral)))
}
